//! Timebase conversions between seconds, audio samples, analysis hops,
//! and video frames.
//!
//! Every stream in a pipeline run shares the same zero point (start of the
//! media), so these are plain scale conversions.

/// The analysis clock of an onset envelope: one frame per `hop_size` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopTimebase {
    pub hop_size: usize,
    pub sample_rate: u32,
}

impl HopTimebase {
    pub fn new(hop_size: usize, sample_rate: u32) -> Self {
        Self {
            hop_size,
            sample_rate,
        }
    }

    /// Duration of one hop in seconds.
    pub fn hop_secs(&self) -> f64 {
        self.hop_size as f64 / self.sample_rate as f64
    }

    /// Time of the start of envelope frame `frame`.
    pub fn frame_to_secs(&self, frame: usize) -> f64 {
        frame as f64 * self.hop_secs()
    }

    /// Signed frame count to seconds.
    pub fn frames_to_secs(&self, frames: i64) -> f64 {
        frames as f64 * self.hop_secs()
    }

    /// Whole hops that fit inside `secs` (rounded down).
    pub fn secs_to_whole_frames(&self, secs: f64) -> usize {
        if secs <= 0.0 || !secs.is_finite() {
            return 0;
        }
        (secs * self.sample_rate as f64 / self.hop_size as f64).floor() as usize
    }
}

/// Convert a sample count to seconds; `0.0` at a zero sample rate.
pub fn samples_to_secs(samples: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    samples as f64 / sample_rate as f64
}

/// Convert seconds to a signed sample count, rounding to nearest.
pub fn secs_to_samples(secs: f64, sample_rate: u32) -> i64 {
    (secs * sample_rate as f64).round() as i64
}

/// Video frame index containing time `secs` (truncating).
pub fn secs_to_video_frame(secs: f64, fps: u32) -> u64 {
    if secs <= 0.0 {
        return 0;
    }
    (secs * fps as f64) as u64
}

/// Number of output frames needed to cover `duration_secs`.
pub fn frame_count(duration_secs: f64, fps: u32) -> u64 {
    if duration_secs <= 0.0 || fps == 0 {
        return 0;
    }
    (duration_secs * fps as f64).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_timebase_round_trip() {
        let tb = HopTimebase::new(512, 22050);
        assert!((tb.hop_secs() - 512.0 / 22050.0).abs() < 1e-12);
        assert_eq!(tb.secs_to_whole_frames(5.0), 215);
        assert!((tb.frames_to_secs(-43) + 43.0 * 512.0 / 22050.0).abs() < 1e-12);
    }

    #[test]
    fn test_secs_to_whole_frames_rejects_non_positive() {
        let tb = HopTimebase::new(512, 22050);
        assert_eq!(tb.secs_to_whole_frames(0.0), 0);
        assert_eq!(tb.secs_to_whole_frames(-1.0), 0);
        assert_eq!(tb.secs_to_whole_frames(f64::NAN), 0);
    }

    #[test]
    fn test_samples_to_secs_guards_zero_rate() {
        assert_eq!(samples_to_secs(44100, 22050), 2.0);
        assert_eq!(samples_to_secs(44100, 0), 0.0);
    }

    #[test]
    fn test_secs_to_samples_rounds() {
        assert_eq!(secs_to_samples(0.5, 22050), 11025);
        assert_eq!(secs_to_samples(-0.00003, 22050), -1);
        assert_eq!(secs_to_samples(0.00002, 22050), 0);
    }

    #[test]
    fn test_video_frame_helpers() {
        assert_eq!(secs_to_video_frame(1.999, 30), 59);
        assert_eq!(secs_to_video_frame(2.0, 30), 60);
        assert_eq!(frame_count(2.01, 30), 61);
        assert_eq!(frame_count(0.0, 30), 0);
    }
}
