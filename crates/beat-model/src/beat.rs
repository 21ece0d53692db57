//! Beat events and the `beats.json` interchange document.
//!
//! The JSON shape is stable and shared with external tools:
//!
//! ```json
//! {"bpm": 120.0, "duration": 30.5, "fps": 30,
//!  "beats": [{"time": 0.5, "strength": 0.82, "frame": 15}]}
//! ```

use std::path::{Path, PathBuf};

use rhythmcam_common::timebase::secs_to_video_frame;
use serde::{Deserialize, Serialize};

/// Strength above which a beat counts as strong (accented).
pub const STRONG_BEAT_THRESHOLD: f64 = 0.6;

/// A detected rhythmic pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Seconds from media start.
    pub time: f64,

    /// Normalized salience in `[0.0, 1.0]`.
    pub strength: f64,

    /// Video frame index containing `time`.
    #[serde(rename = "frame")]
    pub frame_index: u64,
}

impl BeatEvent {
    pub fn new(time: f64, strength: f64, frame_index: u64) -> Self {
        Self {
            time,
            strength,
            frame_index,
        }
    }

    /// Build an event whose frame index is derived from `fps`.
    pub fn at(time: f64, strength: f64, fps: u32) -> Self {
        Self::new(time, strength, secs_to_video_frame(time, fps))
    }

    /// Accented beats get the full zoom amplitude.
    pub fn is_strong(&self) -> bool {
        self.strength > STRONG_BEAT_THRESHOLD
    }
}

/// Beat analysis of one media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatsData {
    /// Tempo estimate; `0.0` when no tempo was found.
    pub bpm: f64,

    /// Media duration in seconds.
    pub duration: f64,

    /// Frame rate the `frame` indices refer to.
    pub fps: u32,

    /// Time-ordered beat events.
    pub beats: Vec<BeatEvent>,
}

impl BeatsData {
    /// A document with no beats (silent or beatless input).
    pub fn empty(duration: f64, fps: u32) -> Self {
        Self {
            bpm: 0.0,
            duration,
            fps,
            beats: vec![],
        }
    }

    /// Number of strong beats.
    pub fn strong_count(&self) -> usize {
        self.beats.iter().filter(|b| b.is_strong()).count()
    }

    /// Parse from JSON text.
    pub fn from_json(json: &str) -> Result<Self, BeatModelError> {
        let data: Self = serde_json::from_str(json).map_err(|e| BeatModelError::ParseError {
            path: PathBuf::from("<inline>"),
            source: e,
        })?;
        data.validate()?;
        Ok(data)
    }

    /// Load a `beats.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BeatModelError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| BeatModelError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let data: Self =
            serde_json::from_str(&json).map_err(|e| BeatModelError::ParseError {
                path: path.clone(),
                source: e,
            })?;
        data.validate()?;
        Ok(data)
    }

    /// Write a pretty-printed `beats.json`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BeatModelError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BeatModelError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| BeatModelError::ParseError {
                path: path.clone(),
                source: e,
            })?;
        std::fs::write(&path, json).map_err(|e| BeatModelError::IoError { path, source: e })
    }

    /// Check the documented value ranges.
    pub fn validate(&self) -> Result<(), BeatModelError> {
        if !(self.bpm >= 0.0) || !(self.duration >= 0.0) {
            return Err(BeatModelError::ValidationError {
                message: "bpm and duration must be non-negative".to_string(),
            });
        }
        for (i, beat) in self.beats.iter().enumerate() {
            if !(beat.time >= 0.0) {
                return Err(BeatModelError::ValidationError {
                    message: format!("beat {i} has negative time {}", beat.time),
                });
            }
            if !(0.0..=1.0).contains(&beat.strength) {
                return Err(BeatModelError::ValidationError {
                    message: format!("beat {i} strength {} outside [0, 1]", beat.strength),
                });
            }
        }
        Ok(())
    }
}

/// Errors that can occur when reading or writing beat data.
#[derive(Debug, thiserror::Error)]
pub enum BeatModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid beat data: {message}")]
    ValidationError { message: String },
}
