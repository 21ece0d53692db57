//! Spectral-flux onset envelope.
//!
//! Frames are centered: frame `i` covers samples around `i * hop`, with the
//! signal zero-padded by `fft_size / 2` on both sides, so a signal of `n`
//! samples yields `1 + n / hop` frames.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// STFT parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnsetConfig {
    pub fft_size: usize,
    pub hop_size: usize,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
        }
    }
}

/// Number of envelope frames for `samples` input samples.
pub fn frame_count(samples: usize, hop_size: usize) -> usize {
    if hop_size == 0 {
        return 0;
    }
    1 + samples / hop_size
}

fn hann(size: usize) -> Vec<f32> {
    // periodic Hann, as used for STFT analysis
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            0.5 - 0.5 * phase.cos()
        })
        .collect()
}

/// Log-compressed magnitude spectrogram, one row of `fft_size / 2 + 1` bins per frame.
pub fn log_spectrogram(samples: &[f32], config: &OnsetConfig) -> Vec<Vec<f32>> {
    let OnsetConfig { fft_size, hop_size } = *config;
    if samples.is_empty() || fft_size == 0 || hop_size == 0 {
        return vec![];
    }

    let pad = fft_size / 2;
    let mut padded = vec![0.0f32; pad];
    padded.extend_from_slice(samples);
    padded.resize(padded.len() + pad, 0.0);

    let window = hann(fft_size);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];
    let bins = fft_size / 2 + 1;

    let frames = frame_count(samples.len(), hop_size);
    let mut spectrogram = Vec::with_capacity(frames);
    for frame in 0..frames {
        let start = frame * hop_size;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = padded.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process(&mut buffer);
        spectrogram.push(buffer[..bins].iter().map(|c| c.norm().ln_1p()).collect());
    }
    spectrogram
}

/// Onset strength per frame: mean positive first difference across bins.
///
/// Frame 0 is measured against silence, so a sound starting on the very
/// first sample still registers as an onset.
pub fn spectral_flux(samples: &[f32], config: &OnsetConfig) -> Vec<f32> {
    let spectrogram = log_spectrogram(samples, config);
    let mut envelope = Vec::with_capacity(spectrogram.len());
    for (i, row) in spectrogram.iter().enumerate() {
        if i == 0 {
            envelope.push(row.iter().sum::<f32>() / row.len() as f32);
            continue;
        }
        let prev = &spectrogram[i - 1];
        let rise: f32 = row
            .iter()
            .zip(prev)
            .map(|(cur, old)| (cur - old).max(0.0))
            .sum();
        envelope.push(rise / row.len() as f32);
    }
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_track(sample_rate: u32, secs: f64, every: f64) -> Vec<f32> {
        let n = (secs * sample_rate as f64) as usize;
        let mut out = vec![0.0f32; n];
        let period = (every * sample_rate as f64) as usize;
        let burst = (0.02 * sample_rate as f64) as usize;
        let mut start = period / 2;
        while start + burst < n {
            for j in 0..burst {
                let t = j as f32 / sample_rate as f32;
                let decay = (-(j as f32) / (burst as f32 / 4.0)).exp();
                out[start + j] = decay * (2.0 * std::f32::consts::PI * 1500.0 * t).sin();
            }
            start += period;
        }
        out
    }

    #[test]
    fn test_frame_count_is_centered() {
        assert_eq!(frame_count(22050, 512), 44);
        assert_eq!(frame_count(0, 512), 1);
        let env = spectral_flux(&vec![0.0; 22050], &OnsetConfig::default());
        assert_eq!(env.len(), 44);
    }

    #[test]
    fn test_silence_has_flat_envelope() {
        let env = spectral_flux(&vec![0.0; 44100], &OnsetConfig::default());
        assert!(env.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_clicks_produce_peaks_near_onsets() {
        let sr = 22050;
        let samples = click_track(sr, 4.0, 1.0);
        let env = spectral_flux(&samples, &OnsetConfig::default());

        let hop_secs = 512.0 / sr as f64;
        let peak = env
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i as f64 * hop_secs)
            .unwrap();
        let nearest_click = (peak - 0.5).rem_euclid(1.0);
        let distance = nearest_click.min(1.0 - nearest_click);
        assert!(distance < 0.1, "peak at {peak}s is not near a click");
    }

    #[test]
    fn test_onset_on_first_sample_registers() {
        let sr = 22050;
        let mut samples = click_track(sr, 2.0, 0.5);
        for (j, slot) in samples.iter_mut().take(441).enumerate() {
            let t = j as f32 / sr as f32;
            *slot = (2.0 * std::f32::consts::PI * 1500.0 * t).sin();
        }
        let env = spectral_flux(&samples, &OnsetConfig::default());
        let peak = env.iter().copied().fold(0.0f32, f32::max);
        assert!(env[0] > 0.0);
        assert!(env[0] > 0.1 * peak, "frame 0 = {}, peak = {peak}", env[0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(spectral_flux(&[], &OnsetConfig::default()).is_empty());
    }
}
