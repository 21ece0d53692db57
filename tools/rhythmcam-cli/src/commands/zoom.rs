//! Render a beat-driven zoom.

use std::path::{Path, PathBuf};

use rhythmcam_beat_model::ZoomRenderResult;
use rhythmcam_common::config::AppConfig;
use rhythmcam_pipeline::{Collaborators, EngineConfig, RhythmEngine, ZoomRequest};
use rhythmcam_render_engine::{FfmpegFrameRenderer, ProgressCallback, RenderProgress};
use serde::Serialize;

/// Command-line values that override the configured zoom defaults.
pub struct ZoomOverrides {
    pub zoom_min: Option<f64>,
    pub zoom_max: Option<f64>,
    pub window: Option<f64>,
    pub sensitivity: Option<f64>,
}

impl ZoomOverrides {
    fn apply(&self, defaults: ZoomRequest) -> ZoomRequest {
        ZoomRequest {
            zoom_min: self.zoom_min.unwrap_or(defaults.zoom_min),
            zoom_max: self.zoom_max.unwrap_or(defaults.zoom_max),
            window_half_width: self.window.unwrap_or(defaults.window_half_width),
            sensitivity: self.sensitivity.unwrap_or(defaults.sensitivity),
        }
    }
}

fn engine_with_progress(config: &AppConfig) -> RhythmEngine {
    let progress: ProgressCallback = Box::new(|p: RenderProgress| {
        eprint!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
    });
    let mut parts = Collaborators::ffmpeg(config);
    parts.renderer = Box::new(FfmpegFrameRenderer::new().with_progress(progress));
    RhythmEngine::new(EngineConfig::from(config), parts)
}

pub fn run(
    config: &AppConfig,
    media: PathBuf,
    overrides: ZoomOverrides,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let engine = engine_with_progress(config);
    let request = overrides.apply(ZoomRequest::from_config(engine.config()));

    eprintln!("Rendering beat zoom for: {}", media.display());
    let result = engine.render_zoom_to(&media, &request, output.as_deref());
    eprintln!();
    super::print_json(&result)?;

    if !result.success {
        anyhow::bail!(
            "{}",
            result.error.as_deref().unwrap_or("zoom render failed")
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct BatchEntry<'a> {
    input: &'a Path,
    #[serde(flatten)]
    result: &'a ZoomRenderResult,
}

pub fn run_batch(
    config: &AppConfig,
    input_dir: PathBuf,
    overrides: ZoomOverrides,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let engine = engine_with_progress(config);
    let request = overrides.apply(ZoomRequest::from_config(engine.config()));
    let output_dir = output_dir.unwrap_or_else(|| input_dir.clone());

    eprintln!("Batch directory: {}", input_dir.display());
    eprintln!("Output directory: {}", output_dir.display());
    let report = engine.render_zoom_batch(&input_dir, &request, Some(output_dir.as_path()))?;
    eprintln!();

    let entries: Vec<BatchEntry<'_>> = report
        .results
        .iter()
        .map(|(input, result)| BatchEntry { input, result })
        .collect();
    super::print_json(&entries)?;

    eprintln!(
        "Batch finished: {}/{} succeeded",
        report.succeeded(),
        report.results.len()
    );
    let failed = report.failed();
    if !failed.is_empty() {
        for path in &failed {
            eprintln!("  failed: {}", path.display());
        }
        anyhow::bail!("{} of {} videos failed", failed.len(), report.results.len());
    }
    Ok(())
}
