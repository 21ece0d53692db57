//! RhythmCam Beat Model
//!
//! Defines the data contracts shared by every RhythmCam stage:
//! - **Beats:** Timestamped, strength-weighted beat events and the
//!   `beats.json` interchange document
//! - **Signals:** Onset envelopes, waveforms, and signed time offsets
//! - **Zoom:** Validated zoom parameters and crop rectangles
//! - **Results:** Structured outcomes of `align`, `detect_beats`, and `render_zoom`
//!
//! All times are seconds from the start of the media.

pub mod alignment;
pub mod beat;
pub mod signal;
pub mod zoom;

pub use alignment::*;
pub use beat::*;
pub use signal::*;
pub use zoom::*;
