//! RhythmCam Pipeline
//!
//! The three public operations, each returning a structured result:
//! - **align:** Sync a dance video's audio to a reference track and mux
//! - **detect_beats:** Strength-weighted beat events for a media file
//! - **render_zoom:** Render a beat-driven zoom effect onto a video
//!
//! [`RhythmEngine::render_zoom_batch`] runs `render_zoom` over a directory.
//!
//! Collaborators (codecs, muxer, feature extractor, renderer) are injected
//! as trait objects; [`Collaborators::ffmpeg`] wires the default adapters.

pub mod align;
pub mod batch;
pub mod detect;
pub mod scratch;
pub mod zoom;

use std::path::{Path, PathBuf};

use rhythmcam_audio_analysis::{FeatureExtractor, OnsetFeatureExtractor};
use rhythmcam_common::config::AppConfig;
use rhythmcam_media_io::{
    AudioCodec, EncoderSettings, FfmpegAudioCodec, FfmpegMuxer, FfmpegVideoCodec, Muxer,
    VideoCodec,
};
use rhythmcam_render_engine::{FfmpegFrameRenderer, Renderer};

pub use align::SyncPipeline;
pub use batch::BatchZoomReport;
pub use zoom::ZoomRequest;

/// Engine settings resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rate all audio is decoded at for analysis and muxing.
    pub sample_rate: u32,

    pub max_offset_secs: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub window_half_width_secs: f64,
    pub sensitivity: f64,

    /// Frame rate used when a source does not report one.
    pub fallback_fps: u32,

    pub encoder: EncoderSettings,
    pub output_dir: PathBuf,

    /// Parent of scratch areas; `None` uses the system temp dir.
    pub scratch_base: Option<PathBuf>,
}

impl From<&AppConfig> for EngineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            sample_rate: config.analysis.sample_rate,
            max_offset_secs: config.align.max_offset_secs,
            zoom_min: config.zoom.zoom_min,
            zoom_max: config.zoom.zoom_max,
            window_half_width_secs: config.zoom.window_half_width_secs,
            sensitivity: config.zoom.sensitivity,
            fallback_fps: config.zoom.fallback_fps,
            encoder: EncoderSettings::from(&config.render),
            output_dir: config.paths.output_dir.clone(),
            scratch_base: config.paths.scratch_dir.clone(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// External collaborators the engine drives.
pub struct Collaborators {
    pub audio: Box<dyn AudioCodec>,
    pub video: Box<dyn VideoCodec>,
    pub muxer: Box<dyn Muxer>,
    pub extractor: Box<dyn FeatureExtractor>,
    pub renderer: Box<dyn Renderer>,
}

impl Collaborators {
    /// ffmpeg-backed codecs, muxer, and renderer with the spectral-flux extractor.
    pub fn ffmpeg(config: &AppConfig) -> Self {
        Self {
            audio: Box::new(FfmpegAudioCodec::new()),
            video: Box::new(FfmpegVideoCodec::new()),
            muxer: Box::new(FfmpegMuxer::new(EncoderSettings::from(&config.render))),
            extractor: Box::new(OnsetFeatureExtractor::from_analysis_config(&config.analysis)),
            renderer: Box::new(FfmpegFrameRenderer::new()),
        }
    }
}

/// Entry point for all RhythmCam operations.
pub struct RhythmEngine {
    config: EngineConfig,
    parts: Collaborators,
}

impl RhythmEngine {
    pub fn new(config: EngineConfig, parts: Collaborators) -> Self {
        Self { config, parts }
    }

    /// Engine with the default ffmpeg adapters.
    pub fn with_ffmpeg(config: &AppConfig) -> Self {
        Self::new(EngineConfig::from(config), Collaborators::ffmpeg(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.parts
    }

    /// Where `<stem><suffix>` lands in the output directory.
    pub fn output_path_for(&self, media: &Path, suffix: &str) -> PathBuf {
        let stem = media
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.config.output_dir.join(format!("{stem}{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_from_app_config() {
        let mut app = AppConfig::default();
        app.align.max_offset_secs = 3.0;
        app.paths.output_dir = PathBuf::from("/srv/out");
        let config = EngineConfig::from(&app);
        assert_eq!(config.sample_rate, 22050);
        assert_eq!(config.max_offset_secs, 3.0);
        assert_eq!(config.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.encoder.video_codec, "libx264");
    }

    #[test]
    fn test_output_path_uses_stem() {
        let app = AppConfig::default();
        let engine = RhythmEngine::with_ffmpeg(&app);
        assert_eq!(
            engine.output_path_for(Path::new("/videos/dance.take2.mp4"), "_aligned.mp4"),
            PathBuf::from("output/dance.take2_aligned.mp4")
        );
    }
}
