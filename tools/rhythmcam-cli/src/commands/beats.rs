//! Detect beats and write beats.json.

use std::path::PathBuf;

use rhythmcam_common::config::AppConfig;
use rhythmcam_pipeline::RhythmEngine;

pub fn run(
    config: &AppConfig,
    media: PathBuf,
    sensitivity: Option<f64>,
    fps: Option<u32>,
    output: Option<PathBuf>,
    save: bool,
) -> anyhow::Result<()> {
    let engine = RhythmEngine::with_ffmpeg(config);
    let detection = engine.detect_beats(&media, sensitivity, fps);

    if !detection.success {
        super::print_json(&detection)?;
        anyhow::bail!(
            "{}",
            detection
                .error
                .as_deref()
                .unwrap_or("beat detection failed")
        );
    }

    if save {
        if let Some(data) = &detection.data {
            let path = engine.save_beats(data, &media, output.as_deref())?;
            eprintln!(
                "{} beats ({} strong) at {:.1} BPM -> {}",
                data.beats.len(),
                data.strong_count(),
                data.bpm,
                path.display()
            );
        }
    }
    super::print_json(&detection)
}
