//! Feature extraction port and the default onset-based extractor.

use rhythmcam_beat_model::{AudioFeatures, OnsetEnvelope};
use rhythmcam_common::config::AnalysisConfig;
use rhythmcam_common::error::{RhythmError, RhythmResult};

use crate::onset::{spectral_flux, OnsetConfig};
use crate::tempo::{estimate_tempo, track_beats, DEFAULT_TIGHTNESS};

/// Peak amplitude below which audio is treated as silence (about -80 dBFS).
pub const SILENCE_PEAK: f32 = 1e-4;

/// Raw audio to rhythm features.
pub trait FeatureExtractor {
    /// Analyze mono `samples` at `sample_rate`.
    fn analyze(&self, samples: &[f32], sample_rate: u32) -> RhythmResult<AudioFeatures>;

    /// Samples between envelope frames.
    fn hop_size(&self) -> usize;

    /// Extractor name (for logging).
    fn name(&self) -> &str;
}

/// Spectral-flux onsets, autocorrelation tempo, and DP beat tracking.
#[derive(Debug, Clone)]
pub struct OnsetFeatureExtractor {
    config: OnsetConfig,
    tightness: f64,
}

impl OnsetFeatureExtractor {
    pub fn new(config: OnsetConfig) -> Self {
        Self {
            config,
            tightness: DEFAULT_TIGHTNESS,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(OnsetConfig::default())
    }

    pub fn from_analysis_config(config: &AnalysisConfig) -> Self {
        Self::new(OnsetConfig {
            fft_size: config.fft_size,
            hop_size: config.hop_length,
        })
    }

    pub fn with_tightness(mut self, tightness: f64) -> Self {
        self.tightness = tightness;
        self
    }
}

impl FeatureExtractor for OnsetFeatureExtractor {
    fn analyze(&self, samples: &[f32], sample_rate: u32) -> RhythmResult<AudioFeatures> {
        if sample_rate == 0 {
            return Err(RhythmError::decode("sample rate must be positive"));
        }
        if self.config.hop_size == 0 || self.config.fft_size < self.config.hop_size {
            return Err(RhythmError::config(format!(
                "invalid STFT parameters: fft {} hop {}",
                self.config.fft_size, self.config.hop_size
            )));
        }

        let hop = self.config.hop_size;
        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        if samples.is_empty() || !(peak >= SILENCE_PEAK) {
            tracing::debug!(samples = samples.len(), peak, "input is silent");
            let frames = crate::onset::frame_count(samples.len(), hop);
            return Ok(AudioFeatures::silent(frames, hop, sample_rate));
        }

        let values = spectral_flux(samples, &self.config);
        let frame_rate = sample_rate as f64 / hop as f64;

        let (tempo, beat_frames) = match estimate_tempo(&values, frame_rate) {
            Some(tempo) => {
                let beats = track_beats(&values, tempo.period_frames, self.tightness);
                (tempo.bpm, beats)
            }
            None => (0.0, vec![]),
        };

        tracing::debug!(
            frames = values.len(),
            tempo,
            beats = beat_frames.len(),
            "audio analyzed"
        );

        Ok(AudioFeatures {
            envelope: OnsetEnvelope::new(values, hop, sample_rate),
            beat_frames,
            tempo,
        })
    }

    fn hop_size(&self) -> usize {
        self.config.hop_size
    }

    fn name(&self) -> &str {
        "spectral-flux"
    }
}
