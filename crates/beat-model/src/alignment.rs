//! Structured outcomes of the three top-level operations.
//!
//! These never carry a Rust error value: every failure is flattened into a
//! human-readable `error` string so callers (CLI, bindings) can serialize the
//! result as-is.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::beat::BeatsData;

/// Stages of an alignment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Extract,
    Estimate,
    Apply,
    Reconcile,
    Mux,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The state that follows a successful stage.
    pub fn next(&self) -> Option<PipelineState> {
        match self {
            Self::Init => Some(Self::Extract),
            Self::Extract => Some(Self::Estimate),
            Self::Estimate => Some(Self::Apply),
            Self::Apply => Some(Self::Reconcile),
            Self::Reconcile => Some(Self::Mux),
            Self::Mux => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Extract => "extract",
            Self::Estimate => "estimate",
            Self::Apply => "apply",
            Self::Reconcile => "reconcile",
            Self::Mux => "mux",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of `align`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub success: bool,

    /// Offset applied to the reference audio (seconds).
    pub offset: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Stage that was running when the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<PipelineState>,

    /// Non-fatal warnings: degraded estimates, clamped offsets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl AlignmentResult {
    pub fn succeeded(offset: f64, output_path: PathBuf, diagnostics: Vec<String>) -> Self {
        Self {
            success: true,
            offset,
            output_path: Some(output_path),
            error: None,
            failed_stage: None,
            diagnostics,
        }
    }

    pub fn failed(
        stage: PipelineState,
        error: impl Into<String>,
        offset: f64,
        diagnostics: Vec<String>,
    ) -> Self {
        Self {
            success: false,
            offset,
            output_path: None,
            error: Some(error.into()),
            failed_stage: Some(stage),
            diagnostics,
        }
    }
}

/// Outcome of `detect_beats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatDetection {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BeatsData>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BeatDetection {
    pub fn found(data: BeatsData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed detection that still reports what was measured
    /// (e.g. duration of a silent file).
    pub fn not_found(data: Option<BeatsData>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }

    /// Beat list, empty on failure.
    pub fn beats(&self) -> &[crate::beat::BeatEvent] {
        self.data.as_ref().map(|d| d.beats.as_slice()).unwrap_or(&[])
    }

    pub fn bpm(&self) -> f64 {
        self.data.as_ref().map(|d| d.bpm).unwrap_or(0.0)
    }
}

/// Outcome of `render_zoom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomRenderResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ZoomRenderResult {
    pub fn rendered(output_path: PathBuf) -> Self {
        Self {
            success: true,
            output_path: Some(output_path),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output_path: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_order() {
        let mut state = PipelineState::Init;
        let mut trace = vec![state];
        while let Some(next) = state.next() {
            trace.push(next);
            state = next;
        }
        assert_eq!(
            trace,
            vec![
                PipelineState::Init,
                PipelineState::Extract,
                PipelineState::Estimate,
                PipelineState::Apply,
                PipelineState::Reconcile,
                PipelineState::Mux,
                PipelineState::Done,
            ]
        );
        assert!(PipelineState::Failed.is_terminal());
        assert_eq!(PipelineState::Failed.next(), None);
    }

    #[test]
    fn test_failed_alignment_serialization() {
        let result = AlignmentResult::failed(
            PipelineState::Extract,
            "No audio track in dance.mp4",
            0.0,
            vec![],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["failed_stage"], "extract");
        assert!(json.get("output_path").is_none());
        assert!(json.get("diagnostics").is_none());
    }

    #[test]
    fn test_detection_accessors() {
        let empty = BeatDetection::not_found(Some(BeatsData::empty(2.0, 30)), "no beats");
        assert!(!empty.success);
        assert!(empty.beats().is_empty());
        assert_eq!(empty.bpm(), 0.0);

        let none = BeatDetection::not_found(None, "decode failed");
        assert!(none.beats().is_empty());
    }

    #[test]
    fn test_zoom_result_shape() {
        let ok = ZoomRenderResult::rendered(PathBuf::from("out/clip_rhythm.mp4"));
        assert!(ok.success);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["output_path"], "out/clip_rhythm.mp4");
        assert!(json.get("error").is_none());
    }
}
