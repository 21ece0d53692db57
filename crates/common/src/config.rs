//! Application configuration.
//!
//! Configuration is an explicit value handed to the engine at construction.
//! Nothing here is process-global: two engines built from different configs
//! never share directories or scratch areas.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RhythmError, RhythmResult};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Audio analysis parameters.
    pub analysis: AnalysisConfig,

    /// Alignment defaults.
    pub align: AlignDefaults,

    /// Beat-zoom defaults.
    pub zoom: ZoomDefaults,

    /// Encoder settings for rendered and muxed output.
    pub render: RenderDefaults,

    /// Output and scratch locations.
    pub paths: PathsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Parameters of the onset analysis front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rate audio is decoded at before analysis (Hz).
    pub sample_rate: u32,

    /// Samples between consecutive onset-envelope frames.
    pub hop_length: usize,

    /// FFT window size for the spectral flux.
    pub fft_size: usize,
}

/// Defaults for `align`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignDefaults {
    /// Largest offset searched in either direction (seconds).
    pub max_offset_secs: f64,
}

/// Defaults for `detect_beats` and `render_zoom`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomDefaults {
    pub zoom_min: f64,
    pub zoom_max: f64,

    /// Half-width of each beat's influence window (seconds).
    pub window_half_width_secs: f64,

    /// Beat sensitivity in `[0.0, 1.0]`; higher keeps more beats.
    pub sensitivity: f64,

    /// Frame rate used when the source does not report one.
    pub fallback_fps: u32,
}

/// Encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// ffmpeg video encoder name.
    pub video_codec: String,

    /// x264/x265 preset.
    pub preset: String,

    /// Constant rate factor.
    pub crf: u8,

    /// ffmpeg audio encoder name.
    pub audio_codec: String,

    pub audio_bitrate_kbps: u32,
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory rendered and aligned files are written to.
    pub output_dir: PathBuf,

    /// Parent of per-invocation scratch directories. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "rhythmcam=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            hop_length: 512,
            fft_size: 2048,
        }
    }
}

impl Default for AlignDefaults {
    fn default() -> Self {
        Self {
            max_offset_secs: 5.0,
        }
    }
}

impl Default for ZoomDefaults {
    fn default() -> Self {
        Self {
            zoom_min: 1.0,
            zoom_max: 1.3,
            window_half_width_secs: 0.2,
            sensitivity: 0.5,
            fallback_fps: 30,
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 18,
            audio_codec: "aac".to_string(),
            audio_bitrate_kbps: 192,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            scratch_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> RhythmResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Reject values the analysis and zoom stages cannot work with.
    pub fn validate(&self) -> RhythmResult<()> {
        if self.analysis.sample_rate == 0 {
            return Err(RhythmError::config("analysis.sample_rate must be > 0"));
        }
        if self.analysis.hop_length == 0 {
            return Err(RhythmError::config("analysis.hop_length must be > 0"));
        }
        if self.analysis.fft_size < self.analysis.hop_length {
            return Err(RhythmError::config(
                "analysis.fft_size must be at least analysis.hop_length",
            ));
        }
        if self.align.max_offset_secs <= 0.0 {
            return Err(RhythmError::config("align.max_offset_secs must be > 0"));
        }
        if self.zoom.zoom_min < 1.0 || self.zoom.zoom_max < self.zoom.zoom_min {
            return Err(RhythmError::config(
                "zoom requires 1.0 <= zoom_min <= zoom_max",
            ));
        }
        if self.zoom.window_half_width_secs <= 0.0 {
            return Err(RhythmError::config(
                "zoom.window_half_width_secs must be > 0",
            ));
        }
        if self.zoom.fallback_fps == 0 {
            return Err(RhythmError::config("zoom.fallback_fps must be > 0"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("rhythmcam").join("config.json")
}
