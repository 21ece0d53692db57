//! RhythmCam Processing Core
//!
//! The synchronization and rhythm math:
//! - **Offset Estimation:** Bounded cross-correlation of onset envelopes
//! - **Offset Application:** Pad or trim a waveform by a signed offset
//! - **Beat Selection:** Strength normalization and sensitivity filtering
//! - **Zoom Profiles:** Beat events to a per-time scale factor
//!
//! This crate is pure computation: no I/O, no subprocesses.
//! All inputs are data; all outputs are data.

pub mod beat_select;
pub mod offset_apply;
pub mod offset_estimate;
pub mod zoom_profile;

pub use beat_select::{BeatSelector, BeatSelectorConfig};
pub use offset_apply::{apply_offset, apply_offset_detailed, OffsetApplication};
pub use offset_estimate::{estimate_offset, OffsetEstimate, OffsetEstimator};
pub use zoom_profile::ZoomProfile;
