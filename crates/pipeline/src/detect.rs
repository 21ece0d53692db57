//! Beat detection for a single media file.

use std::path::{Path, PathBuf};

use rhythmcam_beat_model::{BeatDetection, BeatsData};
use rhythmcam_common::error::{RhythmError, RhythmResult};
use rhythmcam_processing_core::{BeatSelector, BeatSelectorConfig};

use crate::RhythmEngine;

/// Suffix of saved beat files.
pub const BEATS_SUFFIX: &str = "_beats.json";

impl RhythmEngine {
    /// Detect strength-weighted beats in `media`.
    ///
    /// `None` arguments fall back to the configured sensitivity and the
    /// media's own frame rate. Never panics or returns an error value: all
    /// failures land in [`BeatDetection::error`].
    pub fn detect_beats(
        &self,
        media: &Path,
        sensitivity: Option<f64>,
        fps: Option<u32>,
    ) -> BeatDetection {
        match self.try_detect_beats(media, sensitivity, fps) {
            Ok(detection) => detection,
            Err(err) => {
                tracing::error!(media = %media.display(), error = %err, "Beat detection failed");
                BeatDetection::not_found(None, err.to_string())
            }
        }
    }

    fn try_detect_beats(
        &self,
        media: &Path,
        sensitivity: Option<f64>,
        fps: Option<u32>,
    ) -> RhythmResult<BeatDetection> {
        let config = self.config();
        let parts = self.collaborators();
        let sensitivity = sensitivity.unwrap_or(config.sensitivity);

        if !media.exists() {
            return Err(RhythmError::FileNotFound {
                path: media.to_path_buf(),
            });
        }

        // Audio-only inputs may not probe as video; that is fine.
        let info = match parts.video.probe(media) {
            Ok(info) => Some(info),
            Err(err) => {
                tracing::debug!(error = %err, "probe failed, using decoded audio length");
                None
            }
        };
        let audio = parts.audio.decode(media, config.sample_rate)?;

        let fps = fps
            .filter(|&f| f > 0)
            .or_else(|| info.as_ref().map(|i| i.fps_or(config.fallback_fps)))
            .unwrap_or(config.fallback_fps);
        let duration = info
            .as_ref()
            .map(|i| i.duration_secs)
            .filter(|&d| d > 0.0)
            .unwrap_or_else(|| audio.duration_secs());

        tracing::debug!(
            media = %media.display(),
            extractor = parts.extractor.name(),
            hop = parts.extractor.hop_size(),
            "analyzing audio"
        );
        let features = parts.extractor.analyze(&audio.samples, audio.sample_rate)?;
        let selector = BeatSelector::new(BeatSelectorConfig { sensitivity, fps });
        let beats = selector.select(&features.envelope, &features.beat_frames);

        if beats.is_empty() {
            let err = RhythmError::no_beats("try a higher sensitivity");
            tracing::warn!(media = %media.display(), error = %err, "No beats detected");
            return Ok(BeatDetection::not_found(
                Some(BeatsData::empty(duration, fps)),
                err.to_string(),
            ));
        }

        let data = BeatsData {
            bpm: features.tempo,
            duration,
            fps,
            beats,
        };
        tracing::info!(
            media = %media.display(),
            bpm = data.bpm,
            beats = data.beats.len(),
            strong = data.strong_count(),
            "Beats detected"
        );
        Ok(BeatDetection::found(data))
    }

    /// Save `data` as `<output_dir>/<stem>_beats.json` (or `path`).
    pub fn save_beats(
        &self,
        data: &BeatsData,
        media: &Path,
        path: Option<&Path>,
    ) -> RhythmResult<PathBuf> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.output_path_for(media, BEATS_SUFFIX));
        data.save(&path)
            .map_err(|e| RhythmError::Other(anyhow::Error::new(e)))?;
        tracing::info!(path = %path.display(), "Beats saved");
        Ok(path)
    }
}
