//! Applying a time offset to a waveform.
//!
//! Positive offsets prepend silence; negative offsets drop leading samples.
//! At most 80% of the input is ever dropped.

use rhythmcam_beat_model::TimeOffset;
use rhythmcam_common::error::RhythmError;
use rhythmcam_common::timebase::secs_to_samples;

/// Fraction of the input a negative offset may discard.
pub const MAX_TRIM_FRACTION: f64 = 0.8;

/// Result of [`apply_offset_detailed`].
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetApplication {
    pub samples: Vec<f32>,

    /// `round(offset * sample_rate)`.
    pub requested_samples: i64,

    /// Shift actually applied after clamping.
    pub applied_samples: i64,

    pub clamped: bool,
}

impl OffsetApplication {
    /// The clamp as a non-fatal warning, if one happened.
    pub fn warning(&self) -> Option<RhythmError> {
        self.clamped.then_some(RhythmError::ClampedOffset {
            requested_samples: self.requested_samples,
            applied_samples: self.applied_samples,
        })
    }
}

/// Shift `samples` by `offset`. A zero offset returns the input buffer itself.
pub fn apply_offset(samples: Vec<f32>, sample_rate: u32, offset: TimeOffset) -> Vec<f32> {
    apply_offset_detailed(samples, sample_rate, offset).samples
}

pub fn apply_offset_detailed(
    mut samples: Vec<f32>,
    sample_rate: u32,
    offset: TimeOffset,
) -> OffsetApplication {
    let requested = if offset.secs().is_finite() {
        secs_to_samples(offset.secs(), sample_rate)
    } else {
        0
    };

    let floor = -((samples.len() as f64 * MAX_TRIM_FRACTION) as i64);
    let (applied, clamped) = if requested < floor {
        (floor, true)
    } else {
        (requested, false)
    };

    if clamped {
        tracing::warn!(
            requested_samples = requested,
            applied_samples = applied,
            input_samples = samples.len(),
            "offset clamped to keep 20% of the input"
        );
    }

    if applied > 0 {
        let pad = applied as usize;
        let mut shifted = Vec::with_capacity(pad + samples.len());
        shifted.resize(pad, 0.0);
        shifted.extend_from_slice(&samples);
        samples = shifted;
    } else if applied < 0 {
        samples.drain(..applied.unsigned_abs() as usize);
    }

    OffsetApplication {
        samples,
        requested_samples: requested,
        applied_samples: applied,
        clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_offset_returns_same_buffer() {
        let samples = vec![0.1, 0.2, 0.3];
        let ptr = samples.as_ptr();
        let out = apply_offset(samples, 22050, TimeOffset::ZERO);
        assert_eq!(out.as_ptr(), ptr);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_sub_sample_offset_is_identity() {
        let out = apply_offset_detailed(vec![1.0; 4], 100, TimeOffset(0.004));
        assert_eq!(out.applied_samples, 0);
        assert_eq!(out.samples, vec![1.0; 4]);
    }

    #[test]
    fn test_positive_offset_pads_with_silence() {
        let out = apply_offset(vec![1.0; 10], 10, TimeOffset(0.5));
        assert_eq!(out.len(), 15);
        assert!(out[..5].iter().all(|&s| s == 0.0));
        assert!(out[5..].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_negative_offset_drops_leading_samples() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let out = apply_offset_detailed(samples, 10, TimeOffset(-0.3));
        assert!(!out.clamped);
        assert_eq!(out.samples, vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_large_negative_offset_is_clamped() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32).collect();
        let out = apply_offset_detailed(samples, 100, TimeOffset(-50.0));
        assert!(out.clamped);
        assert_eq!(out.requested_samples, -5000);
        assert_eq!(out.applied_samples, -800);
        assert_eq!(out.samples.len(), 200);
        assert_eq!(out.samples[0], 800.0);
        assert!(matches!(
            out.warning(),
            Some(RhythmError::ClampedOffset {
                requested_samples: -5000,
                applied_samples: -800
            })
        ));
    }

    #[test]
    fn test_clamp_truncates_toward_zero() {
        // 0.8 * 7 = 5.6 -> 5 samples dropped at most
        let out = apply_offset_detailed(vec![1.0; 7], 10, TimeOffset(-10.0));
        assert_eq!(out.applied_samples, -5);
        assert_eq!(out.samples.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let out = apply_offset_detailed(vec![], 10, TimeOffset(-1.0));
        assert!(out.samples.is_empty());
        assert_eq!(out.applied_samples, 0);

        let out = apply_offset(vec![], 10, TimeOffset(0.2));
        assert_eq!(out, vec![0.0, 0.0]);
    }
}
