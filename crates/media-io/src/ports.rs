//! Media ports consumed by the pipeline.

use std::path::Path;

use image::RgbImage;
use rhythmcam_beat_model::Waveform;
use rhythmcam_common::error::RhythmResult;
use serde::{Deserialize, Serialize};

/// Stream summary of a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds.
    pub duration_secs: f64,

    /// Video frame rate, if the file has a video stream that reports one.
    pub fps: Option<f64>,

    pub width: u32,
    pub height: u32,
    pub has_video: bool,
    pub has_audio: bool,
}

impl MediaInfo {
    /// Frame rate rounded to a whole number, or `fallback`.
    pub fn fps_or(&self, fallback: u32) -> u32 {
        match self.fps {
            Some(fps) if fps.is_finite() && fps >= 1.0 => fps.round() as u32,
            _ => fallback,
        }
    }
}

/// Audio decode and encode.
pub trait AudioCodec {
    /// Decode the first audio stream of `path` to mono PCM at `sample_rate`.
    ///
    /// A file without an audio stream is `RhythmError::MissingAudioTrack`.
    fn decode(&self, path: &Path, sample_rate: u32) -> RhythmResult<Waveform>;

    /// Write `waveform` as a WAV file at `path`.
    fn encode(&self, waveform: &Waveform, path: &Path) -> RhythmResult<()>;
}

/// Video inspection.
pub trait VideoCodec {
    fn probe(&self, path: &Path) -> RhythmResult<MediaInfo>;

    /// Decode the frame displayed at `time_secs`.
    fn read_frame(&self, path: &Path, time_secs: f64) -> RhythmResult<RgbImage>;

    fn frame_rate(&self, path: &Path) -> RhythmResult<Option<f64>> {
        Ok(self.probe(path)?.fps)
    }

    fn duration(&self, path: &Path) -> RhythmResult<f64> {
        Ok(self.probe(path)?.duration_secs)
    }
}

/// Inputs to one mux operation.
#[derive(Debug, Clone, Copy)]
pub struct MuxRequest<'a> {
    /// File whose first video stream is kept.
    pub video_source: &'a Path,

    /// Replacement audio track.
    pub audio: &'a Waveform,

    pub output_path: &'a Path,

    /// Stop writing after this many seconds.
    pub max_duration_secs: Option<f64>,

    /// Where intermediate files may be written.
    pub scratch_dir: &'a Path,
}

/// Combines a video stream with an audio track.
pub trait Muxer {
    fn combine(&self, request: &MuxRequest<'_>) -> RhythmResult<()>;
}
