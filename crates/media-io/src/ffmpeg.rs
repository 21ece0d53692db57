//! ffmpeg/ffprobe subprocess adapters.

use std::path::Path;

use image::RgbImage;
use rhythmcam_beat_model::Waveform;
use rhythmcam_common::config::RenderDefaults;
use rhythmcam_common::error::{RhythmError, RhythmResult};
use serde::Deserialize;

use crate::ports::{AudioCodec, MediaInfo, MuxRequest, Muxer, VideoCodec};
use crate::process::{command_exists, run_tool};

/// Scratch file the muxer writes the new audio track to.
pub const MUX_AUDIO_FILE: &str = "mux_audio.wav";

/// Encoder settings for muxed and rendered output.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate_kbps: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self::from(&RenderDefaults::default())
    }
}

impl From<&RenderDefaults> for EncoderSettings {
    fn from(config: &RenderDefaults) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            preset: config.preset.clone(),
            crf: config.crf,
            audio_codec: config.audio_codec.clone(),
            audio_bitrate_kbps: config.audio_bitrate_kbps,
        }
    }
}

impl EncoderSettings {
    /// Video encoder arguments.
    pub fn video_args(&self) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.video_codec.clone()];
        if self.video_codec.starts_with("libx26") {
            args.extend([
                "-preset".to_string(),
                self.preset.clone(),
                "-crf".to_string(),
                self.crf.to_string(),
            ]);
        }
        args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);
        args
    }

    /// Audio encoder arguments.
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            format!("{}k", self.audio_bitrate_kbps.max(64)),
        ]
    }
}

/// Whether both `ffmpeg` and `ffprobe` are on `PATH`.
pub fn ffmpeg_available() -> bool {
    command_exists("ffmpeg") && command_exists("ffprobe")
}

fn ensure_exists(path: &Path) -> RhythmResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(RhythmError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse an ffprobe rational such as `30000/1001`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = match raw.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (raw.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

fn parse_probe(json: &str) -> RhythmResult<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| RhythmError::decode(format!("unreadable ffprobe output: {e}")))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let fps = video.and_then(|v| {
        v.avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| v.r_frame_rate.as_deref().and_then(parse_frame_rate))
    });

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| video.and_then(|v| v.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration_secs,
        fps,
        width: video.and_then(|v| v.width).unwrap_or(0),
        height: video.and_then(|v| v.height).unwrap_or(0),
        has_video: video.is_some(),
        has_audio,
    })
}

/// Stream probing and single-frame reads via ffprobe/ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegVideoCodec;

impl FfmpegVideoCodec {
    pub fn new() -> Self {
        Self
    }
}

impl VideoCodec for FfmpegVideoCodec {
    fn probe(&self, path: &Path) -> RhythmResult<MediaInfo> {
        ensure_exists(path)?;
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration:stream=codec_type,width,height,avg_frame_rate,r_frame_rate,duration"
                .to_string(),
            "-of".to_string(),
            "json".to_string(),
            path_arg(path),
        ];
        let output = run_tool("ffprobe", &args, None)
            .map_err(|e| RhythmError::decode(format!("failed to start ffprobe: {e}")))?;
        if !output.success() {
            return Err(RhythmError::decode(format!(
                "ffprobe failed on {}: {}",
                path.display(),
                output.stderr_tail()
            )));
        }
        let info = parse_probe(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(
            path = %path.display(),
            duration = info.duration_secs,
            fps = ?info.fps,
            has_audio = info.has_audio,
            "probed media"
        );
        Ok(info)
    }

    fn read_frame(&self, path: &Path, time_secs: f64) -> RhythmResult<RgbImage> {
        let info = self.probe(path)?;
        if !info.has_video || info.width == 0 || info.height == 0 {
            return Err(RhythmError::decode(format!(
                "{} has no decodable video stream",
                path.display()
            )));
        }
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            format!("{:.6}", time_secs.max(0.0)),
            "-i".to_string(),
            path_arg(path),
            "-frames:v".to_string(),
            "1".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "pipe:1".to_string(),
        ];
        let output = run_tool("ffmpeg", &args, None)
            .map_err(|e| RhythmError::decode(format!("failed to start ffmpeg: {e}")))?;
        if !output.success() {
            return Err(RhythmError::decode(format!(
                "frame read at {time_secs:.3}s failed: {}",
                output.stderr_tail()
            )));
        }
        RgbImage::from_raw(info.width, info.height, output.stdout).ok_or_else(|| {
            RhythmError::decode(format!("no frame at {time_secs:.3}s in {}", path.display()))
        })
    }
}

/// Mono PCM decode and WAV encode via ffmpeg pipes.
#[derive(Debug, Clone, Default)]
pub struct FfmpegAudioCodec {
    probe: FfmpegVideoCodec,
}

impl FfmpegAudioCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioCodec for FfmpegAudioCodec {
    fn decode(&self, path: &Path, sample_rate: u32) -> RhythmResult<Waveform> {
        let info = self.probe.probe(path)?;
        if !info.has_audio {
            return Err(RhythmError::missing_audio(path));
        }

        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            path_arg(path),
            "-map".to_string(),
            "0:a:0".to_string(),
            "-vn".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-f".to_string(),
            "f32le".to_string(),
            "pipe:1".to_string(),
        ];
        let output = run_tool("ffmpeg", &args, None)
            .map_err(|e| RhythmError::decode(format!("failed to start ffmpeg: {e}")))?;
        if !output.success() {
            return Err(RhythmError::decode(format!(
                "audio decode of {} failed: {}",
                path.display(),
                output.stderr_tail()
            )));
        }

        let samples: Vec<f32> = output
            .stdout
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        tracing::debug!(
            path = %path.display(),
            samples = samples.len(),
            sample_rate,
            "audio decoded"
        );
        Ok(Waveform::new(samples, sample_rate))
    }

    fn encode(&self, waveform: &Waveform, path: &Path) -> RhythmResult<()> {
        if waveform.sample_rate == 0 {
            return Err(RhythmError::encode("sample rate must be positive"));
        }
        let bytes: Vec<u8> = waveform
            .samples
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            "f32le".to_string(),
            "-ar".to_string(),
            waveform.sample_rate.to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-c:a".to_string(),
            "pcm_s16le".to_string(),
            path_arg(path),
        ];
        let output = run_tool("ffmpeg", &args, Some(&bytes))
            .map_err(|e| RhythmError::encode(format!("ffmpeg audio encode failed: {e}")))?;
        if !output.success() {
            return Err(RhythmError::encode(format!(
                "audio encode to {} failed: {}",
                path.display(),
                output.stderr_tail()
            )));
        }
        Ok(())
    }
}

/// Re-encodes the source video with a replacement audio track.
#[derive(Debug, Clone, Default)]
pub struct FfmpegMuxer {
    audio: FfmpegAudioCodec,
    settings: EncoderSettings,
}

impl FfmpegMuxer {
    pub fn new(settings: EncoderSettings) -> Self {
        Self {
            audio: FfmpegAudioCodec::new(),
            settings,
        }
    }

    fn build_args(&self, request: &MuxRequest<'_>, audio_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            path_arg(request.video_source),
            "-i".to_string(),
            path_arg(audio_path),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
        ];
        args.extend(self.settings.video_args());
        args.extend(self.settings.audio_args());
        if let Some(limit) = request.max_duration_secs {
            args.extend(["-t".to_string(), format!("{limit:.6}")]);
        }
        args.extend([
            "-movflags".to_string(),
            "+faststart".to_string(),
            path_arg(request.output_path),
        ]);
        args
    }
}

impl Muxer for FfmpegMuxer {
    fn combine(&self, request: &MuxRequest<'_>) -> RhythmResult<()> {
        ensure_exists(request.video_source)?;
        let audio_path = request.scratch_dir.join(MUX_AUDIO_FILE);
        self.audio.encode(request.audio, &audio_path)?;

        let args = self.build_args(request, &audio_path);
        tracing::info!(
            video = %request.video_source.display(),
            output = %request.output_path.display(),
            max_duration = ?request.max_duration_secs,
            "muxing"
        );
        let output = run_tool("ffmpeg", &args, None)
            .map_err(|e| RhythmError::encode(format!("failed to start ffmpeg: {e}")))?;
        if !output.success() {
            return Err(RhythmError::encode(format!(
                "mux failed (status {}): {}",
                output.status,
                output.stderr_tail()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe_with_audio_and_video() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "width": 1280, "height": 720,
                 "avg_frame_rate": "30/1", "r_frame_rate": "30/1"},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "12.480000"}
        }"#;
        let info = parse_probe(json).unwrap();
        assert!(info.has_audio && info.has_video);
        assert_eq!((info.width, info.height), (1280, 720));
        assert_eq!(info.fps_or(24), 30);
        assert!((info.duration_secs - 12.48).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_video_only_falls_back_to_r_frame_rate() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 360,
            "avg_frame_rate": "0/0", "r_frame_rate": "25/1", "duration": "3.0"}]}"#;
        let info = parse_probe(json).unwrap();
        assert!(!info.has_audio);
        assert_eq!(info.fps, Some(25.0));
        assert!((info.duration_secs - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_rejects_garbage() {
        assert!(matches!(
            parse_probe("not json"),
            Err(RhythmError::Decode { .. })
        ));
    }

    #[test]
    fn test_encoder_args() {
        let settings = EncoderSettings::default();
        let video = settings.video_args();
        assert_eq!(&video[..2], &["-c:v", "libx264"]);
        assert!(video.contains(&"-crf".to_string()));
        assert_eq!(settings.audio_args(), vec!["-c:a", "aac", "-b:a", "192k"]);
    }

    #[test]
    fn test_mux_args_cap_duration() {
        let muxer = FfmpegMuxer::new(EncoderSettings::default());
        let audio = Waveform::new(vec![0.0; 10], 22050);
        let request = MuxRequest {
            video_source: Path::new("dance.mp4"),
            audio: &audio,
            output_path: Path::new("out.mp4"),
            max_duration_secs: Some(12.5),
            scratch_dir: Path::new("/tmp"),
        };
        let args = muxer.build_args(&request, &PathBuf::from("/tmp/mux_audio.wav"));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "12.500000");
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a:0"));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mp4");
        assert!(matches!(
            FfmpegVideoCodec::new().probe(&missing),
            Err(RhythmError::FileNotFound { .. })
        ));
    }
}
