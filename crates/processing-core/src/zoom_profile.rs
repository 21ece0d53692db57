//! Beat-driven zoom profile.
//!
//! Maps playback time to a scale factor. Each beat opens a window of
//! `window_half_width` seconds on either side; inside it the zoom decays
//! linearly from a ceiling at the beat down to `zoom_min` at the window edge.
//! Strong beats peak at `zoom_max`, weak ones at 60% of the span.

use rhythmcam_beat_model::{BeatEvent, ZoomParameters};

/// Fraction of the zoom span a weak beat reaches.
pub const WEAK_BEAT_CEILING_RATIO: f64 = 0.6;

/// Times within this distance of a window edge count as outside it.
pub const EDGE_TOLERANCE_SECS: f64 = 1e-9;

/// An immutable zoom curve over a time-sorted copy of the beats.
#[derive(Debug, Clone)]
pub struct ZoomProfile {
    beats: Vec<BeatEvent>,
    params: ZoomParameters,
}

impl ZoomProfile {
    pub fn new(beats: &[BeatEvent], params: ZoomParameters) -> Self {
        let mut beats = beats.to_vec();
        beats.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { beats, params }
    }

    pub fn params(&self) -> &ZoomParameters {
        &self.params
    }

    /// Beats in time order.
    pub fn beats(&self) -> &[BeatEvent] {
        &self.beats
    }

    /// The beat closest to `t`. On a tie the earlier beat wins.
    pub fn nearest_beat(&self, t: f64) -> Option<&BeatEvent> {
        if self.beats.is_empty() || !t.is_finite() {
            return None;
        }
        let idx = self.beats.partition_point(|b| b.time < t);
        let before = idx.checked_sub(1).map(|i| &self.beats[i]);
        let after = self.beats.get(idx);

        let nearest_time = match (before, after) {
            (Some(b), Some(a)) => {
                if (a.time - t) < (t - b.time) {
                    a.time
                } else {
                    b.time
                }
            }
            (Some(b), None) => b.time,
            (None, Some(a)) => a.time,
            (None, None) => return None,
        };

        // First of any duplicates at that time.
        let first = self.beats.partition_point(|b| b.time < nearest_time);
        self.beats.get(first)
    }

    /// Peak zoom a beat reaches at its own timestamp.
    pub fn ceiling_for(&self, beat: &BeatEvent) -> f64 {
        if beat.is_strong() {
            self.params.zoom_max
        } else {
            self.params.zoom_min + WEAK_BEAT_CEILING_RATIO * self.params.span()
        }
    }

    /// Scale factor at playback time `t` (seconds). Always `>= zoom_min`.
    pub fn zoom_factor_at(&self, t: f64) -> f64 {
        let zoom_min = self.params.zoom_min;
        let Some(beat) = self.nearest_beat(t) else {
            return zoom_min;
        };

        let distance = (t - beat.time).abs();
        let window = self.params.window_half_width;
        if distance + EDGE_TOLERANCE_SECS >= window {
            return zoom_min;
        }

        let ceiling = self.ceiling_for(beat);
        let progress = distance / window;
        (ceiling - (ceiling - zoom_min) * progress).max(zoom_min)
    }

    /// Zoom factor for every frame of a `duration`-second clip at `fps`.
    pub fn sample(&self, fps: u32, duration: f64) -> Vec<f64> {
        let frames = rhythmcam_common::timebase::frame_count(duration, fps);
        (0..frames)
            .map(|i| self.zoom_factor_at(i as f64 / fps as f64))
            .collect()
    }
}
