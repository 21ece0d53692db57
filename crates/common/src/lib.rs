//! RhythmCam Common Utilities
//!
//! Shared infrastructure for all RhythmCam crates:
//! - Error types and result aliases
//! - Sample/frame/second conversions for the analysis timebase
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod timebase;

pub use config::*;
pub use error::*;
pub use timebase::*;
