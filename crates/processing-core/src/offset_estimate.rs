//! Offset estimation: bounded cross-correlation of two onset envelopes.
//!
//! # Algorithm
//!
//! 1. **Normalize** each envelope to zero mean, unit variance.
//! 2. **Bound** the search to `M = floor(max_offset * sample_rate / hop)`
//!    frames, capped at the longer envelope's length.
//! 3. **Extend** the reference with `M` frames of silence (the normalized
//!    image of a raw `0.0`) so a target that starts late still has
//!    something to line up against.
//! 4. **Smooth** both sequences with a 5-tap triangular kernel (edges
//!    repeat), so a sub-hop shift does not split one onset across two
//!    frames.
//! 5. **Window** the head of the target, at most `2M` frames long, and score
//!    it against every extended-reference segment with a lag in `[-M, +M]`
//!    by Pearson coefficient. The first frames the kernel reaches past the
//!    target's start are left out of the score. The first (largest lag)
//!    maximum wins.
//! 6. **Convert** the winning lag to seconds.
//!
//! A positive result means the target lags the reference, so the reference
//! must be delayed by that amount to line up.
//!
//! The estimator is total: empty input, mismatched timebases, non-finite
//! values, and search windows with no valid lag all yield `0.0` together
//! with a non-fatal diagnostic.

use rhythmcam_beat_model::{OnsetEnvelope, TimeOffset};
use rhythmcam_common::error::RhythmError;
use rhythmcam_common::timebase::HopTimebase;

/// Guards the normalization divide.
pub const NORMALIZE_EPSILON: f64 = 1e-8;

/// Below this sum of squares a segment is treated as flat.
const FLAT_ENERGY: f64 = 1e-12;

/// Triangular smoothing kernel, centered.
const SMOOTHING_KERNEL: [f64; 5] = [1.0, 2.0, 3.0, 2.0, 1.0];

/// Full outcome of one estimate.
#[derive(Debug)]
pub struct OffsetEstimate {
    pub offset: TimeOffset,

    /// Winning lag in envelope frames; positive when the target is late.
    pub best_lag_frames: i64,

    /// Pearson score of the winning lag; `0.0` when degraded.
    pub peak_score: f64,

    /// Why the estimate fell back to zero, if it did.
    pub diagnostic: Option<RhythmError>,
}

impl OffsetEstimate {
    fn degraded(diagnostic: RhythmError) -> Self {
        tracing::warn!(error = %diagnostic, "offset estimate degraded to 0.0");
        Self {
            offset: TimeOffset::ZERO,
            best_lag_frames: 0,
            peak_score: 0.0,
            diagnostic: Some(diagnostic),
        }
    }

    /// A zero that was computed rather than fallen back to.
    pub fn is_degraded(&self) -> bool {
        self.diagnostic.is_some()
    }
}

/// Estimates the time offset between two onset envelopes.
#[derive(Debug, Clone, Default)]
pub struct OffsetEstimator;

impl OffsetEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate the offset of `target` relative to `reference`.
    pub fn estimate(
        &self,
        reference: &OnsetEnvelope,
        target: &OnsetEnvelope,
        max_offset_secs: f64,
    ) -> TimeOffset {
        self.estimate_detailed(reference, target, max_offset_secs)
            .offset
    }

    /// Like [`estimate`](Self::estimate) but also reports the lag, score,
    /// and any degradation.
    pub fn estimate_detailed(
        &self,
        reference: &OnsetEnvelope,
        target: &OnsetEnvelope,
        max_offset_secs: f64,
    ) -> OffsetEstimate {
        if !reference.same_timebase(target) {
            return OffsetEstimate::degraded(RhythmError::offset_computation(format!(
                "envelope timebases differ: reference {}@{}Hz, target {}@{}Hz",
                reference.hop_size, reference.sample_rate, target.hop_size, target.sample_rate
            )));
        }
        estimate_offset_detailed(
            &reference.values,
            &target.values,
            reference.hop_size,
            reference.sample_rate,
            max_offset_secs,
        )
    }
}

/// Estimate the offset between two raw envelopes sharing `hop_size` and
/// `sample_rate`.
pub fn estimate_offset(
    reference: &[f32],
    target: &[f32],
    hop_size: usize,
    sample_rate: u32,
    max_offset_secs: f64,
) -> TimeOffset {
    estimate_offset_detailed(reference, target, hop_size, sample_rate, max_offset_secs).offset
}

pub fn estimate_offset_detailed(
    reference: &[f32],
    target: &[f32],
    hop_size: usize,
    sample_rate: u32,
    max_offset_secs: f64,
) -> OffsetEstimate {
    if reference.is_empty() || target.is_empty() {
        let which = if reference.is_empty() {
            "reference"
        } else {
            "target"
        };
        return OffsetEstimate::degraded(RhythmError::empty_signal(format!(
            "{which} envelope has no frames"
        )));
    }
    if hop_size == 0 || sample_rate == 0 {
        return OffsetEstimate::degraded(RhythmError::offset_computation(
            "hop size and sample rate must be positive",
        ));
    }
    if !(max_offset_secs > 0.0) || !max_offset_secs.is_finite() {
        return OffsetEstimate::degraded(RhythmError::offset_computation(format!(
            "max offset must be positive and finite, got {max_offset_secs}"
        )));
    }

    let timebase = HopTimebase::new(hop_size, sample_rate);
    let (reference_silence, reference) = match normalize_with_silence(reference) {
        Some(values) => values,
        None => {
            return OffsetEstimate::degraded(RhythmError::offset_computation(
                "reference envelope contains non-finite values",
            ))
        }
    };
    let target = match normalize(target) {
        Some(values) => values,
        None => {
            return OffsetEstimate::degraded(RhythmError::offset_computation(
                "target envelope contains non-finite values",
            ))
        }
    };

    // Lags past either envelope's length can never overlap anything.
    let max_frames = timebase
        .secs_to_whole_frames(max_offset_secs)
        .min(reference.len().max(target.len()));
    if max_frames == 0 {
        return OffsetEstimate::degraded(RhythmError::offset_computation(format!(
            "max offset {max_offset_secs}s is shorter than one hop"
        )));
    }

    let window_len = max_frames.saturating_mul(2).min(target.len());
    if sum_sq_dev(&target[..window_len]) < FLAT_ENERGY {
        return OffsetEstimate::degraded(RhythmError::offset_computation(
            "target window has no rhythmic variation",
        ));
    }

    let skip = SMOOTHING_KERNEL.len() / 2;
    if window_len <= skip + 1 {
        return OffsetEstimate::degraded(RhythmError::offset_computation(format!(
            "target of {} frames is too short to correlate",
            target.len()
        )));
    }

    let extended_len = max_frames + reference.len();
    if window_len > extended_len {
        return OffsetEstimate::degraded(RhythmError::offset_computation(format!(
            "no full-overlap lag: window of {window_len} frames vs reference of {} frames",
            reference.len()
        )));
    }
    let last = (extended_len - window_len).min(2 * max_frames);
    let covered = (last + window_len).saturating_sub(max_frames).min(reference.len());
    if covered == 0 || sum_sq_dev(&reference[..covered]) < FLAT_ENERGY {
        return OffsetEstimate::degraded(RhythmError::offset_computation(
            "reference envelope has no rhythmic variation",
        ));
    }

    let mut extended = vec![reference_silence; max_frames];
    extended.extend_from_slice(&reference);
    let extended = smooth(&extended);
    let target = smooth(&target);
    let window = &target[skip..window_len];

    let mut best_index = 0;
    let mut best_score = f64::NEG_INFINITY;
    for index in 0..=last {
        let score = pearson(window, &extended[index + skip..index + window_len]);
        if score > best_score {
            best_score = score;
            best_index = index;
        }
    }
    if !best_score.is_finite() {
        return OffsetEstimate::degraded(RhythmError::offset_computation(
            "correlation produced a non-finite score",
        ));
    }

    let lag = max_frames as i64 - best_index as i64;
    let secs = timebase.frames_to_secs(lag);
    tracing::debug!(
        lag_frames = lag,
        offset_secs = secs,
        score = best_score,
        candidates = last + 1,
        "offset estimated"
    );

    OffsetEstimate {
        offset: TimeOffset(secs),
        best_lag_frames: lag,
        peak_score: best_score,
        diagnostic: None,
    }
}

/// Z-score an envelope (population std). `None` if any value is not finite.
pub fn normalize(values: &[f32]) -> Option<Vec<f64>> {
    normalize_with_silence(values).map(|(_, normalized)| normalized)
}

/// Like [`normalize`], also returning where a raw `0.0` lands.
fn normalize_with_silence(values: &[f32]) -> Option<(f64, Vec<f64>)> {
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let scale = var.sqrt() + NORMALIZE_EPSILON;
    let normalized = values.iter().map(|&v| (v as f64 - mean) / scale).collect();
    Some((-mean / scale, normalized))
}

/// Weighted moving average with [`SMOOTHING_KERNEL`], repeating edge values.
fn smooth(values: &[f64]) -> Vec<f64> {
    let radius = (SMOOTHING_KERNEL.len() / 2) as isize;
    let total: f64 = SMOOTHING_KERNEL.iter().sum();
    let last = values.len() as isize - 1;
    (0..values.len() as isize)
        .map(|i| {
            SMOOTHING_KERNEL
                .iter()
                .zip(-radius..=radius)
                .map(|(weight, d)| weight * values[(i + d).clamp(0, last) as usize])
                .sum::<f64>()
                / total
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sum_sq_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum()
}

/// Pearson coefficient of two equal-length slices; `0.0` if either is flat.
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let ma = mean(a);
    let mb = mean(b);
    let mut num = 0.0;
    let mut da = 0.0;
    let mut db = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        num += dx * dy;
        da += dx * dx;
        db += dy * dy;
    }
    if da < FLAT_ENERGY || db < FLAT_ENERGY {
        return 0.0;
    }
    num / (da.sqrt() * db.sqrt())
}
