//! Rendering a zoom composition to a video file.

use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::RgbImage;
use rhythmcam_common::error::{RhythmError, RhythmResult};
use rhythmcam_media_io::process::{command_exists, stderr_tail};
use rhythmcam_media_io::EncoderSettings;

use crate::compositor::{apply_composition, FrameComposition};

/// Everything needed to render one zoomed clip.
#[derive(Debug, Clone)]
pub struct ZoomComposition {
    /// Source video; its first audio stream is carried over if present.
    pub source: PathBuf,

    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_secs: f64,

    /// One entry per output frame, in order.
    pub frames: Vec<FrameComposition>,
}

impl ZoomComposition {
    pub fn total_frames(&self) -> u64 {
        self.frames.len() as u64
    }

    /// Frames that actually need a crop.
    pub fn zoomed_frames(&self) -> usize {
        self.frames.iter().filter(|f| !f.passthrough).count()
    }
}

/// Encoder options for a render.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub encoder: EncoderSettings,

    /// Copy the source audio into the output.
    pub keep_audio: bool,
}

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Render progress report.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    pub frames_rendered: u64,
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: RenderStage,
}

/// Stages of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Trait for render backends.
pub trait Renderer {
    /// Render `composition` to `output_path`.
    fn render(
        &self,
        composition: &ZoomComposition,
        output_path: &Path,
        options: &RenderOptions,
    ) -> RhythmResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Decodes raw frames with one ffmpeg process, zooms them in-process, and
/// encodes them with a second.
#[derive(Default)]
pub struct FfmpegFrameRenderer {
    progress: Option<ProgressCallback>,
}

impl FfmpegFrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn report(&self, report: RenderProgress) {
        if let Some(cb) = &self.progress {
            cb(report);
        }
    }

    fn decoder_args(composition: &ZoomComposition) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            composition.source.to_string_lossy().into_owned(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-vf".to_string(),
            format!("fps={}", composition.fps),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "pipe:1".to_string(),
        ]
    }

    fn encoder_args(
        composition: &ZoomComposition,
        output_path: &Path,
        options: &RenderOptions,
    ) -> Vec<String> {
        let mut args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-s".to_string(),
            format!("{}x{}", composition.width, composition.height),
            "-r".to_string(),
            composition.fps.to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
        ];
        if options.keep_audio {
            args.extend([
                "-i".to_string(),
                composition.source.to_string_lossy().into_owned(),
                "-map".to_string(),
                "0:v:0".to_string(),
                "-map".to_string(),
                "1:a:0?".to_string(),
            ]);
        }
        args.extend(options.encoder.video_args());
        if options.keep_audio {
            args.extend(options.encoder.audio_args());
        }
        args.extend([
            "-t".to_string(),
            format!("{:.6}", composition.duration_secs),
            "-movflags".to_string(),
            "+faststart".to_string(),
            output_path.to_string_lossy().into_owned(),
        ]);
        args
    }
}

impl Renderer for FfmpegFrameRenderer {
    fn render(
        &self,
        composition: &ZoomComposition,
        output_path: &Path,
        options: &RenderOptions,
    ) -> RhythmResult<()> {
        if composition.width == 0 || composition.height == 0 || composition.fps == 0 {
            return Err(RhythmError::render("composition has zero size or frame rate"));
        }
        if !composition.source.exists() {
            return Err(RhythmError::FileNotFound {
                path: composition.source.clone(),
            });
        }

        let total_frames = composition.total_frames();
        self.report(RenderProgress {
            progress: 0.0,
            frames_rendered: 0,
            total_frames,
            eta_secs: 0.0,
            stage: RenderStage::Preparing,
        });

        let decoder_args = Self::decoder_args(composition);
        let encoder_args = Self::encoder_args(composition, output_path, options);
        tracing::debug!(decoder = ?decoder_args, encoder = ?encoder_args, "Running ffmpeg");

        let mut decoder = Command::new("ffmpeg")
            .args(&decoder_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RhythmError::render(format!("Failed to start ffmpeg decoder: {e}")))?;
        let mut encoder = Command::new("ffmpeg")
            .args(&encoder_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RhythmError::render(format!("Failed to start ffmpeg encoder: {e}")))?;

        tracing::info!(
            decoder_pid = decoder.id(),
            encoder_pid = encoder.id(),
            total_frames,
            zoomed_frames = composition.zoomed_frames(),
            "ffmpeg processes started"
        );

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let decoder_stderr = spawn_stderr_reader(decoder.stderr.take());
        let encoder_stderr = spawn_stderr_reader(encoder.stderr.take());

        let pumped = {
            let stdout = decoder
                .stdout
                .take()
                .ok_or_else(|| RhythmError::render("Failed to capture ffmpeg decoder stdout"))?;
            let stdin = encoder
                .stdin
                .take()
                .ok_or_else(|| RhythmError::render("Failed to capture ffmpeg encoder stdin"))?;
            self.pump_frames(composition, stdout, stdin)
        };

        let decoder_status = decoder
            .wait()
            .map_err(|e| RhythmError::render(format!("Failed to wait on ffmpeg decoder: {e}")))?;
        let encoder_status = encoder
            .wait()
            .map_err(|e| RhythmError::render(format!("Failed to wait on ffmpeg encoder: {e}")))?;
        let decoder_log = join_stderr(decoder_stderr);
        let encoder_log = join_stderr(encoder_stderr);

        if !encoder_status.success() {
            self.report_failure(total_frames);
            return Err(RhythmError::render(format!(
                "ffmpeg encode failed (status {}): {}",
                encoder_status,
                stderr_tail(&encoder_log, 6)
            )));
        }
        // The decoder is killed by SIGPIPE when we stop reading early; only
        // treat its failure as fatal if we also ran out of frames.
        let frames_written = match pumped {
            Ok(written) => written,
            Err(err) => {
                self.report_failure(total_frames);
                return Err(err);
            }
        };
        if frames_written == 0 {
            self.report_failure(total_frames);
            return Err(RhythmError::render(format!(
                "no frames decoded from {} (decoder status {}): {}",
                composition.source.display(),
                decoder_status,
                stderr_tail(&decoder_log, 6)
            )));
        }

        self.report(RenderProgress {
            progress: 1.0,
            frames_rendered: frames_written,
            total_frames,
            eta_secs: 0.0,
            stage: RenderStage::Complete,
        });
        tracing::info!(
            frames = frames_written,
            output = %output_path.display(),
            "Render finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "ffmpeg-rawvideo"
    }
}

impl FfmpegFrameRenderer {
    /// Move frames decoder -> zoom -> encoder. Returns frames written.
    fn pump_frames(
        &self,
        composition: &ZoomComposition,
        decoder_out: impl Read,
        mut encoder_in: impl Write,
    ) -> RhythmResult<u64> {
        let frame_bytes = composition.width as usize * composition.height as usize * 3;
        let total_frames = composition.total_frames();
        let mut reader = BufReader::new(decoder_out);
        let mut buf = vec![0u8; frame_bytes];
        let started = std::time::Instant::now();
        let mut written = 0u64;

        for frame_plan in &composition.frames {
            if !read_frame(&mut reader, &mut buf)? {
                tracing::warn!(
                    frame = frame_plan.frame_index,
                    total_frames,
                    "source ran out of frames early"
                );
                break;
            }
            let frame = RgbImage::from_raw(composition.width, composition.height, buf)
                .ok_or_else(|| RhythmError::render("decoded frame has the wrong size"))?;
            let out = apply_composition(&frame, frame_plan);
            encoder_in
                .write_all(out.as_raw())
                .map_err(|e| RhythmError::render(format!("Failed writing frame to encoder: {e}")))?;
            drop(out);
            buf = frame.into_raw();
            written += 1;

            if written % 30 == 0 {
                let elapsed = started.elapsed().as_secs_f64();
                self.report(progress_report(written, total_frames, elapsed));
            }
        }

        self.report(RenderProgress {
            progress: 1.0,
            frames_rendered: written,
            total_frames,
            eta_secs: 0.0,
            stage: RenderStage::Finalizing,
        });
        Ok(written)
    }

    fn report_failure(&self, total_frames: u64) {
        self.report(RenderProgress {
            progress: 0.0,
            frames_rendered: 0,
            total_frames,
            eta_secs: 0.0,
            stage: RenderStage::Failed,
        });
    }
}

/// Fill `buf` with one frame. `Ok(false)` on a clean end of stream.
fn read_frame(reader: &mut impl Read, buf: &mut [u8]) -> RhythmResult<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .map_err(|e| RhythmError::render(format!("Failed reading decoded frame: {e}")))?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(RhythmError::render(format!(
                "truncated frame: {filled} of {} bytes",
                buf.len()
            )));
        }
        filled += n;
    }
    Ok(true)
}

fn spawn_stderr_reader(
    stderr: Option<std::process::ChildStderr>,
) -> Option<std::thread::JoinHandle<String>> {
    stderr.map(|stderr| {
        std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        })
    })
}

fn join_stderr(task: Option<std::thread::JoinHandle<String>>) -> String {
    task.map(|t| {
        t.join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
    })
    .unwrap_or_default()
}

fn progress_report(frames_rendered: u64, total_frames: u64, elapsed_secs: f64) -> RenderProgress {
    let progress = if total_frames == 0 {
        0.0
    } else {
        (frames_rendered as f64 / total_frames as f64).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    RenderProgress {
        progress,
        frames_rendered,
        total_frames,
        eta_secs,
        stage: RenderStage::Rendering,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::compute_compositions;
    use rhythmcam_beat_model::{BeatEvent, ZoomParameters};
    use rhythmcam_processing_core::ZoomProfile;
    use std::sync::{Arc, Mutex};

    fn composition(width: u32, height: u32, fps: u32, secs: f64) -> ZoomComposition {
        let profile = ZoomProfile::new(
            &[BeatEvent::at(0.1, 1.0, fps)],
            ZoomParameters::new(1.0, 1.5, 0.2).unwrap(),
        );
        ZoomComposition {
            source: PathBuf::from("clip.mp4"),
            width,
            height,
            fps,
            duration_secs: secs,
            frames: compute_compositions(&profile, fps, secs, width, height),
        }
    }

    #[test]
    fn test_progress_report_eta() {
        let report = progress_report(50, 100, 10.0);
        assert!((report.progress - 0.5).abs() < 1e-12);
        assert!((report.eta_secs - 10.0).abs() < 1e-9);
        assert_eq!(report.stage, RenderStage::Rendering);
        assert_eq!(progress_report(0, 0, 1.0).progress, 0.0);
    }

    #[test]
    fn test_encoder_args_map_optional_audio() {
        let comp = composition(8, 6, 10, 1.0);
        let options = RenderOptions {
            keep_audio: true,
            ..Default::default()
        };
        let args = FfmpegFrameRenderer::encoder_args(&comp, Path::new("out.mp4"), &options);
        assert!(args.windows(2).any(|w| w[0] == "-s" && w[1] == "8x6"));
        assert!(args.contains(&"1:a:0?".to_string()));
        assert!(args.contains(&"aac".to_string()));

        let silent = FfmpegFrameRenderer::encoder_args(&comp, Path::new("out.mp4"), &RenderOptions::default());
        assert!(!silent.contains(&"1:a:0?".to_string()));
    }

    #[test]
    fn test_pump_frames_applies_zoom_per_frame() {
        let comp = composition(8, 6, 10, 0.5);
        let frame_bytes = 8 * 6 * 3;
        let input: Vec<u8> = (0..comp.frames.len() * frame_bytes)
            .map(|i| (i % 251) as u8)
            .collect();
        let mut output = Vec::new();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let renderer = FfmpegFrameRenderer::new()
            .with_progress(Box::new(move |p| sink.lock().unwrap().push(p.stage)));

        let written = renderer
            .pump_frames(&comp, input.as_slice(), &mut output)
            .unwrap();
        assert_eq!(written, 5);
        assert_eq!(output.len(), 5 * frame_bytes);
        // frame 0 (t=0.0) sits inside the beat window
        assert_ne!(&output[..frame_bytes], &input[..frame_bytes]);
        // frame 4 (t=0.4) is outside the window and passes through
        assert_eq!(&output[4 * frame_bytes..], &input[4 * frame_bytes..]);
        assert_eq!(
            seen.lock().unwrap().last().copied(),
            Some(RenderStage::Finalizing)
        );
    }

    #[test]
    fn test_pump_frames_stops_at_end_of_stream() {
        let comp = composition(4, 4, 10, 1.0);
        let input = vec![7u8; 3 * 4 * 4 * 3];
        let mut output = Vec::new();
        let written = FfmpegFrameRenderer::new()
            .pump_frames(&comp, input.as_slice(), &mut output)
            .unwrap();
        assert_eq!(written, 3);
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let comp = composition(4, 4, 10, 1.0);
        let input = vec![7u8; 10];
        let mut output = Vec::new();
        assert!(FfmpegFrameRenderer::new()
            .pump_frames(&comp, input.as_slice(), &mut output)
            .is_err());
    }
}
