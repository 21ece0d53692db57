//! RhythmCam Audio Analysis
//!
//! Turns raw mono audio into rhythm features:
//! - **Onsets:** Spectral-flux onset-strength envelope
//! - **Tempo:** Autocorrelation tempo estimate
//! - **Beats:** Dynamic-programming beat tracker
//!
//! The [`FeatureExtractor`] trait is the seam the pipeline consumes;
//! [`OnsetFeatureExtractor`] is the default implementation.

pub mod extractor;
pub mod onset;
pub mod tempo;

pub use extractor::{FeatureExtractor, OnsetFeatureExtractor};
