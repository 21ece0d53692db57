//! Zoom rendering over every video in a directory.

use std::path::{Path, PathBuf};

use rhythmcam_beat_model::ZoomRenderResult;
use rhythmcam_common::error::{RhythmError, RhythmResult};

use crate::zoom::{ZoomRequest, RHYTHM_SUFFIX};
use crate::RhythmEngine;

/// File extensions picked up by a batch run, compared case-insensitively.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Per-file outcomes of [`RhythmEngine::render_zoom_batch`], in file-name order.
#[derive(Debug, Default)]
pub struct BatchZoomReport {
    pub results: Vec<(PathBuf, ZoomRenderResult)>,
}

impl BatchZoomReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.success).count()
    }

    /// Inputs whose render failed.
    pub fn failed(&self) -> Vec<&Path> {
        self.results
            .iter()
            .filter(|(_, r)| !r.success)
            .map(|(path, _)| path.as_path())
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|(_, r)| r.success)
    }
}

/// Videos directly inside `dir`, sorted by path.
///
/// Earlier outputs (`*_rhythm.*`) are skipped so re-running a batch into its
/// own input directory does not zoom the zoomed files again.
pub fn find_videos(dir: &Path) -> RhythmResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RhythmError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }

    let output_stem = RHYTHM_SUFFIX.trim_end_matches(".mp4");
    let mut videos = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_video = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        let is_output = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.ends_with(output_stem))
            .unwrap_or(false);
        if is_video && !is_output {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

impl RhythmEngine {
    /// Render every video in `input_dir`, writing `<stem>_rhythm.mp4` files
    /// into `output_dir` (default: the engine's output directory).
    ///
    /// One file failing does not stop the batch; its error is in the report.
    /// Fails outright only when the directory is missing or holds no videos.
    pub fn render_zoom_batch(
        &self,
        input_dir: &Path,
        request: &ZoomRequest,
        output_dir: Option<&Path>,
    ) -> RhythmResult<BatchZoomReport> {
        let videos = find_videos(input_dir)?;
        if videos.is_empty() {
            return Err(RhythmError::unsupported(format!(
                "no video files ({}) in {}",
                VIDEO_EXTENSIONS.join(", "),
                input_dir.display()
            )));
        }
        let output_dir = output_dir.unwrap_or(self.config().output_dir.as_path());
        std::fs::create_dir_all(output_dir)?;

        tracing::info!(
            input = %input_dir.display(),
            output = %output_dir.display(),
            videos = videos.len(),
            "Starting batch zoom"
        );

        let mut report = BatchZoomReport::default();
        for (index, video) in videos.into_iter().enumerate() {
            let stem = video
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            let target = output_dir.join(format!("{stem}{RHYTHM_SUFFIX}"));
            tracing::info!(file = index + 1, media = %video.display(), "Batch item");

            let result = self.render_zoom_to(&video, request, Some(&target));
            report.results.push((video, result));
        }

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.results.len() - report.succeeded(),
            "Batch zoom finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_videos_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.MOV", "a.mp4", "notes.txt", "a_rhythm.mp4", "c.webm", "song.wav"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("d.mp4")).unwrap();

        let found: Vec<String> = find_videos(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, vec!["a.mp4", "b.MOV", "c.webm"]);
    }

    #[test]
    fn test_find_videos_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            find_videos(&missing),
            Err(RhythmError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_report_counts() {
        let report = BatchZoomReport {
            results: vec![
                (
                    PathBuf::from("a.mp4"),
                    ZoomRenderResult::rendered(PathBuf::from("a_rhythm.mp4")),
                ),
                (PathBuf::from("b.mp4"), ZoomRenderResult::failed("boom")),
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), vec![Path::new("b.mp4")]);
        assert!(!report.all_succeeded());
    }
}
