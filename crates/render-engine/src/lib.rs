//! RhythmCam Render Engine
//!
//! Offline rendering of beat-driven zoom effects.
//!
//! # Pipeline Architecture
//!
//! ```text
//! source.mp4 ──► ffmpeg decode (rgb24) ──┐
//!                                        ├── Crop/Scale (zoom profile)
//! beats ──► ZoomProfile ──► compositions ┘         │
//!                                                  ▼
//!                            source audio ──► Encode (H.264 + AAC)
//!                                                  │
//!                                                  ▼
//!                                           <stem>_rhythm.mp4
//! ```

pub mod compositor;
pub mod export;

pub use compositor::{apply_composition, apply_zoom, compute_compositions, FrameComposition};
pub use export::*;
