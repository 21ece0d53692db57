//! Error types shared across RhythmCam crates.

use std::path::PathBuf;

/// Top-level error type for RhythmCam operations.
#[derive(Debug, thiserror::Error)]
pub enum RhythmError {
    #[error("No audio track in {path}")]
    MissingAudioTrack { path: PathBuf },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Onset envelope is empty: {message}")]
    EmptySignal { message: String },

    #[error("Offset computation failed: {message}")]
    OffsetComputation { message: String },

    #[error("Offset clamped from {requested_samples} to {applied_samples} samples")]
    ClampedOffset {
        requested_samples: i64,
        applied_samples: i64,
    },

    #[error("No beats detected: {message}")]
    NoBeatsDetected { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RhythmError.
pub type RhythmResult<T> = Result<T, RhythmError>;

/// Whether an error aborts the operation or only degrades it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation cannot continue.
    Fatal,
    /// The operation continues with a safe fallback.
    Degraded,
    /// Informational; the result is still fully valid.
    Warning,
}

impl RhythmError {
    pub fn missing_audio(path: impl Into<PathBuf>) -> Self {
        Self::MissingAudioTrack { path: path.into() }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn empty_signal(msg: impl Into<String>) -> Self {
        Self::EmptySignal {
            message: msg.into(),
        }
    }

    pub fn offset_computation(msg: impl Into<String>) -> Self {
        Self::OffsetComputation {
            message: msg.into(),
        }
    }

    pub fn no_beats(msg: impl Into<String>) -> Self {
        Self::NoBeatsDetected {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// How the pipeline treats this error.
    pub fn severity(&self) -> Severity {
        match self {
            Self::EmptySignal { .. } | Self::OffsetComputation { .. } => Severity::Degraded,
            Self::ClampedOffset { .. } => Severity::Warning,
            _ => Severity::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimation_errors_degrade() {
        assert_eq!(
            RhythmError::empty_signal("reference").severity(),
            Severity::Degraded
        );
        assert_eq!(
            RhythmError::offset_computation("nan").severity(),
            Severity::Degraded
        );
    }

    #[test]
    fn test_clamp_is_warning_and_extraction_is_fatal() {
        let clamp = RhythmError::ClampedOffset {
            requested_samples: -1000,
            applied_samples: -800,
        };
        assert_eq!(clamp.severity(), Severity::Warning);
        assert_eq!(
            RhythmError::missing_audio("/tmp/dance.mp4").severity(),
            Severity::Fatal
        );
    }

    #[test]
    fn test_missing_audio_message_names_path() {
        let err = RhythmError::missing_audio("/videos/dance.mp4");
        assert_eq!(err.to_string(), "No audio track in /videos/dance.mp4");
    }
}
