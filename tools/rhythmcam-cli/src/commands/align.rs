//! Align a reference track to a dance video.

use std::path::PathBuf;

use rhythmcam_common::config::AppConfig;
use rhythmcam_pipeline::RhythmEngine;

pub fn run(
    config: &AppConfig,
    dance: PathBuf,
    reference: PathBuf,
    max_offset: Option<f64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let engine = RhythmEngine::with_ffmpeg(config);
    let max_offset = max_offset.unwrap_or(config.align.max_offset_secs);

    let mut pipeline = engine.pipeline();
    if let Some(output) = output {
        pipeline = pipeline.with_output_path(output);
    }
    let result = pipeline.run(&dance, &reference, max_offset);

    for diagnostic in &result.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    super::print_json(&result)?;

    if !result.success {
        anyhow::bail!(
            "alignment failed during {}",
            result
                .failed_stage
                .map(|s| s.name())
                .unwrap_or("unknown stage")
        );
    }
    Ok(())
}
