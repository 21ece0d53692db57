//! Beat selection: turns raw beat frames into strength-weighted events.
//!
//! # Algorithm
//!
//! 1. **Strength** of each beat is the onset envelope value at its frame.
//! 2. **Normalize** strengths to `[0, 1]` with min-max scaling.
//! 3. **Filter** by sensitivity: below `1.0`, only beats at or above the
//!    `(1 - sensitivity) * 100`-th percentile survive.
//! 4. **Time** each survivor from its envelope frame and map it to a video frame.

use rhythmcam_beat_model::{BeatEvent, OnsetEnvelope};

/// Guards the min-max divide.
pub const STRENGTH_EPSILON: f64 = 1e-8;

/// Configuration for the beat selector.
#[derive(Debug, Clone)]
pub struct BeatSelectorConfig {
    /// `0.0` keeps only the strongest beats, `1.0` keeps all of them.
    pub sensitivity: f64,

    /// Video frame rate used for `frame_index`.
    pub fps: u32,
}

impl Default for BeatSelectorConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.5,
            fps: 30,
        }
    }
}

/// Selects beats from an extractor's raw output.
pub struct BeatSelector {
    config: BeatSelectorConfig,
}

impl BeatSelector {
    pub fn new(config: BeatSelectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(BeatSelectorConfig::default())
    }

    /// Sensitivity after clamping to `[0, 1]`; NaN counts as `1.0`.
    pub fn sensitivity(&self) -> f64 {
        let s = self.config.sensitivity;
        if s.is_nan() {
            1.0
        } else {
            s.clamp(0.0, 1.0)
        }
    }

    /// Build time-ordered beat events from `beat_frames` (envelope frame indices).
    pub fn select(&self, envelope: &OnsetEnvelope, beat_frames: &[usize]) -> Vec<BeatEvent> {
        let mut frames: Vec<usize> = beat_frames
            .iter()
            .copied()
            .filter(|&f| f < envelope.len())
            .collect();
        let dropped = beat_frames.len() - frames.len();
        if dropped > 0 {
            tracing::warn!(dropped, "beat frames beyond the onset envelope were skipped");
        }
        if frames.is_empty() {
            return vec![];
        }
        frames.sort_unstable();

        let raw: Vec<f64> = frames
            .iter()
            .map(|&f| {
                let v = envelope.values[f] as f64;
                if v.is_finite() {
                    v
                } else {
                    0.0
                }
            })
            .collect();
        let strengths = normalize_strengths(&raw);

        let sensitivity = self.sensitivity();
        let threshold = if sensitivity < 1.0 {
            percentile(&strengths, (1.0 - sensitivity) * 100.0)
        } else {
            f64::NEG_INFINITY
        };

        let beats: Vec<BeatEvent> = frames
            .iter()
            .zip(&strengths)
            .filter(|(_, &s)| s >= threshold)
            .map(|(&frame, &strength)| {
                BeatEvent::at(envelope.frame_time(frame), strength, self.config.fps)
            })
            .collect();

        tracing::debug!(
            candidates = frames.len(),
            kept = beats.len(),
            sensitivity,
            threshold,
            "beats selected"
        );
        beats
    }
}

/// Min-max scale to `[0, 1]`: `(s - min) / (max - min + eps)`.
pub fn normalize_strengths(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values
        .iter()
        .map(|v| ((v - min) / (max - min + STRENGTH_EPSILON)).clamp(0.0, 1.0))
        .collect()
}

/// `q`-th percentile (0-100) with linear interpolation between ranks.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> OnsetEnvelope {
        let mut values = vec![0.0f32; 200];
        values[10] = 1.0;
        values[50] = 4.0;
        values[90] = 2.0;
        values[130] = 5.0;
        values[170] = 3.0;
        OnsetEnvelope::new(values, 512, 22050)
    }

    fn selector(sensitivity: f64) -> BeatSelector {
        BeatSelector::new(BeatSelectorConfig {
            sensitivity,
            fps: 30,
        })
    }

    #[test]
    fn test_full_sensitivity_keeps_all() {
        let beats = selector(1.0).select(&envelope(), &[10, 50, 90, 130, 170]);
        assert_eq!(beats.len(), 5);
        assert_eq!(beats[0].strength, 0.0);
        assert!(beats[3].strength > 0.999 && beats[3].strength <= 1.0);
    }

    #[test]
    fn test_half_sensitivity_keeps_upper_half() {
        // median of normalized strengths is the 3.0 beat
        let beats = selector(0.5).select(&envelope(), &[10, 50, 90, 130, 170]);
        let frames: Vec<u64> = beats.iter().map(|b| b.frame_index).collect();
        assert_eq!(beats.len(), 3);
        assert!(beats.windows(2).all(|w| w[0].time <= w[1].time));
        assert_eq!(
            frames,
            vec![
                (50.0 * 512.0 / 22050.0 * 30.0) as u64,
                (130.0 * 512.0 / 22050.0 * 30.0) as u64,
                (170.0 * 512.0 / 22050.0 * 30.0) as u64,
            ]
        );
    }

    #[test]
    fn test_zero_sensitivity_keeps_strongest() {
        let beats = selector(0.0).select(&envelope(), &[10, 50, 90, 130, 170]);
        assert_eq!(beats.len(), 1);
        assert!((beats[0].time - 130.0 * 512.0 / 22050.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_frames_are_dropped() {
        let beats = selector(1.0).select(&envelope(), &[10, 50, 500]);
        assert_eq!(beats.len(), 2);
    }

    #[test]
    fn test_no_frames_no_beats() {
        assert!(selector(0.5).select(&envelope(), &[]).is_empty());
    }

    #[test]
    fn test_sensitivity_is_clamped() {
        assert_eq!(selector(3.0).sensitivity(), 1.0);
        assert_eq!(selector(-1.0).sensitivity(), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(percentile(&values, 0.0), 0.0);
        assert_eq!(percentile(&values, 100.0), 3.0);
        assert!((percentile(&values, 50.0) - 1.5).abs() < 1e-12);
    }
}
