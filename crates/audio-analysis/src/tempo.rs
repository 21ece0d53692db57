//! Tempo estimation and beat tracking over an onset envelope.
//!
//! # Algorithm
//!
//! 1. **Tempo:** autocorrelate the mean-removed envelope over lags covering
//!    60-180 BPM, weight each lag by a log-normal prior centered on 120 BPM,
//!    and keep the strongest lag.
//! 2. **Beats:** dynamic programming over the envelope. Each frame's score is
//!    its onset strength plus the best predecessor score, penalized by how far
//!    the gap strays from the tempo period. The path is traced back from the
//!    best-scoring frame in the final period.
//! 3. **Trim:** weak beats at either end of the path are dropped.

/// Slowest tempo considered.
pub const MIN_BPM: f64 = 60.0;

/// Fastest tempo considered.
pub const MAX_BPM: f64 = 180.0;

/// Center of the tempo prior.
const PRIOR_BPM: f64 = 120.0;

/// Width of the tempo prior in octaves.
const PRIOR_OCTAVES: f64 = 1.0;

/// How strongly the tracker sticks to the tempo period.
pub const DEFAULT_TIGHTNESS: f64 = 100.0;

/// A tempo estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub bpm: f64,

    /// Beat period in envelope frames.
    pub period_frames: usize,
}

/// Estimate tempo from an onset envelope sampled at `frame_rate` frames/second.
///
/// Returns `None` when the envelope is too short or has no periodic energy.
pub fn estimate_tempo(envelope: &[f32], frame_rate: f64) -> Option<Tempo> {
    if !(frame_rate > 0.0) {
        return None;
    }
    let min_lag = ((60.0 / MAX_BPM) * frame_rate).floor().max(1.0) as usize;
    let max_lag = ((60.0 / MIN_BPM) * frame_rate).ceil() as usize;
    if envelope.len() <= max_lag * 2 {
        return None;
    }

    let mean = envelope.iter().map(|&v| v as f64).sum::<f64>() / envelope.len() as f64;
    let centered: Vec<f64> = envelope.iter().map(|&v| v as f64 - mean).collect();

    let mut best: Option<(usize, f64)> = None;
    for lag in min_lag..=max_lag {
        let overlap = centered.len() - lag;
        let sum: f64 = (0..overlap).map(|i| centered[i] * centered[i + lag]).sum();
        let corr = sum / overlap as f64;

        let bpm = 60.0 * frame_rate / lag as f64;
        let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES;
        let score = corr * (-0.5 * octaves * octaves).exp();

        if score > best.map(|(_, s)| s).unwrap_or(0.0) {
            best = Some((lag, score));
        }
    }

    let (lag, score) = best?;
    if score <= 1e-12 {
        return None;
    }
    Some(Tempo {
        bpm: 60.0 * frame_rate / lag as f64,
        period_frames: lag,
    })
}

/// Track beats through `envelope` with the given beat period.
///
/// Returns ascending envelope frame indices.
pub fn track_beats(envelope: &[f32], period_frames: usize, tightness: f64) -> Vec<usize> {
    let n = envelope.len();
    if n == 0 || period_frames == 0 {
        return vec![];
    }

    let onset = normalize_by_std(envelope);
    let period = period_frames as f64;

    let mut cumulative = vec![0.0f64; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];

    for i in 0..n {
        let lo = i.saturating_sub(2 * period_frames);
        let hi = i.saturating_sub((period_frames / 2).max(1));
        let mut best: Option<(usize, f64)> = None;
        if i >= (period_frames / 2).max(1) {
            for prev in lo..=hi {
                let gap = (i - prev) as f64;
                let penalty = tightness * (gap / period).ln().powi(2);
                let score = cumulative[prev] - penalty;
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((prev, score));
                }
            }
        }
        match best {
            Some((prev, score)) if score > 0.0 => {
                cumulative[i] = onset[i] + score;
                backlink[i] = Some(prev);
            }
            _ => cumulative[i] = onset[i],
        }
    }

    // Best endpoint within the final period.
    let tail_start = n.saturating_sub(period_frames);
    let Some(mut frame) = (tail_start..n).max_by(|&a, &b| cumulative[a].total_cmp(&cumulative[b]))
    else {
        return vec![];
    };

    let mut beats = vec![frame];
    while let Some(prev) = backlink[frame] {
        beats.push(prev);
        frame = prev;
    }
    beats.reverse();

    trim_weak_ends(&beats, &onset)
}

fn normalize_by_std(envelope: &[f32]) -> Vec<f64> {
    let n = envelope.len() as f64;
    let mean = envelope.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = envelope
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = var.sqrt();
    let scale = if std > 0.0 { std } else { 1.0 };
    envelope.iter().map(|&v| v as f64 / scale).collect()
}

/// Drop leading and trailing beats whose onset is below half the RMS.
fn trim_weak_ends(beats: &[usize], onset: &[f64]) -> Vec<usize> {
    if beats.is_empty() {
        return vec![];
    }
    let rms = (beats.iter().map(|&b| onset[b].powi(2)).sum::<f64>() / beats.len() as f64).sqrt();
    let threshold = 0.5 * rms;

    let first = beats.iter().position(|&b| onset[b] >= threshold);
    let last = beats.iter().rposition(|&b| onset[b] >= threshold);
    match (first, last) {
        (Some(first), Some(last)) => beats[first..=last].to_vec(),
        _ => vec![],
    }
}
