//! RhythmCam Media I/O
//!
//! Narrow ports for everything that touches encoded media:
//! - [`AudioCodec`]: decode to mono PCM, encode PCM to WAV
//! - [`VideoCodec`]: probe streams, read single frames
//! - [`Muxer`]: combine a video stream with a new audio track
//!
//! The `ffmpeg` module implements all three by driving the `ffmpeg` and
//! `ffprobe` binaries as subprocesses.

pub mod ffmpeg;
pub mod ports;
pub mod process;

pub use ffmpeg::{EncoderSettings, FfmpegAudioCodec, FfmpegMuxer, FfmpegVideoCodec};
pub use ports::*;
