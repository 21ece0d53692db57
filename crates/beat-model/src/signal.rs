//! Audio signals: decoded waveforms, onset envelopes, and time offsets.

use rhythmcam_common::timebase::{samples_to_secs, secs_to_samples, HopTimebase};
use serde::{Deserialize, Serialize};

/// Mono PCM audio with its sample rate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        samples_to_secs(self.samples.len(), self.sample_rate)
    }

    /// Peak absolute amplitude.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// Rhythmic-energy curve: one value per analysis hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnsetEnvelope {
    pub values: Vec<f32>,

    /// Samples between consecutive values.
    pub hop_size: usize,

    pub sample_rate: u32,
}

impl OnsetEnvelope {
    pub fn new(values: Vec<f32>, hop_size: usize, sample_rate: u32) -> Self {
        Self {
            values,
            hop_size,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timebase(&self) -> HopTimebase {
        HopTimebase::new(self.hop_size, self.sample_rate)
    }

    /// Time of envelope frame `frame`.
    pub fn frame_time(&self, frame: usize) -> f64 {
        self.timebase().frame_to_secs(frame)
    }

    /// Value at `frame`, if in range.
    pub fn value_at(&self, frame: usize) -> Option<f32> {
        self.values.get(frame).copied()
    }

    /// Two envelopes share a clock when hop size and sample rate match.
    pub fn same_timebase(&self, other: &OnsetEnvelope) -> bool {
        self.timebase() == other.timebase()
    }
}

/// Signed time offset in seconds.
///
/// Positive: the signal must be delayed (silence prepended).
/// Negative: the signal must be advanced (leading samples dropped).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeOffset(pub f64);

impl TimeOffset {
    pub const ZERO: TimeOffset = TimeOffset(0.0);

    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn secs(&self) -> f64 {
        self.0
    }

    /// Offset in whole samples at `sample_rate`, rounded to nearest.
    pub fn to_samples(&self, sample_rate: u32) -> i64 {
        secs_to_samples(self.0, sample_rate)
    }

    pub fn is_delay(&self) -> bool {
        self.0 > 0.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl std::fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+.3}s", self.0)
    }
}

/// Output of a feature extractor for one waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFeatures {
    pub envelope: OnsetEnvelope,

    /// Envelope frame indices of detected beats, ascending.
    pub beat_frames: Vec<usize>,

    /// Tempo estimate in BPM; `0.0` when none was found.
    pub tempo: f64,
}

impl AudioFeatures {
    /// Features of a signal with no rhythmic content.
    pub fn silent(frames: usize, hop_size: usize, sample_rate: u32) -> Self {
        Self {
            envelope: OnsetEnvelope::new(vec![0.0; frames], hop_size, sample_rate),
            beat_frames: vec![],
            tempo: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_duration() {
        let wave = Waveform::new(vec![0.0; 44100], 22050);
        assert!((wave.duration_secs() - 2.0).abs() < 1e-12);
        assert_eq!(Waveform::new(vec![0.0; 10], 0).duration_secs(), 0.0);
    }

    #[test]
    fn test_envelope_frame_time() {
        let env = OnsetEnvelope::new(vec![0.0; 100], 512, 22050);
        assert!((env.frame_time(43) - 43.0 * 512.0 / 22050.0).abs() < 1e-12);
        assert_eq!(env.value_at(100), None);
    }

    #[test]
    fn test_timebase_mismatch() {
        let a = OnsetEnvelope::new(vec![1.0], 512, 22050);
        let b = OnsetEnvelope::new(vec![1.0], 256, 22050);
        assert!(!a.same_timebase(&b));
        assert!(a.same_timebase(&a.clone()));
        assert_eq!(a.timebase(), HopTimebase::new(512, 22050));
    }

    #[test]
    fn test_offset_to_samples_rounds() {
        assert_eq!(TimeOffset(2.0).to_samples(22050), 44100);
        assert_eq!(TimeOffset(-0.5).to_samples(22050), -11025);
        assert!(TimeOffset(0.1).is_delay());
        assert!(!TimeOffset(-0.1).is_delay());
        assert!(TimeOffset::ZERO.is_zero());
    }

    #[test]
    fn test_offset_serializes_as_number() {
        assert_eq!(serde_json::to_string(&TimeOffset(1.5)).unwrap(), "1.5");
        assert_eq!(TimeOffset(1.5).to_string(), "+1.500s");
    }
}
