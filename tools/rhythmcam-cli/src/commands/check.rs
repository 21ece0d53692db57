//! Check system capabilities.

use std::path::Path;

use rhythmcam_common::config::{config_file_path, AppConfig};
use rhythmcam_media_io::process::command_exists;
use rhythmcam_render_engine::{FfmpegFrameRenderer, Renderer};

pub fn run(config: &AppConfig, explicit_config: Option<&Path>) -> anyhow::Result<()> {
    println!("RhythmCam System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for tool in ["ffmpeg", "ffprobe"] {
        if command_exists(tool) {
            println!("[OK] {tool} found");
        } else {
            println!("[FAIL] {tool} not found on PATH");
            ready = false;
        }
    }

    let renderer = FfmpegFrameRenderer::new();
    if renderer.is_available() {
        println!("[OK] Render backend: {}", renderer.name());
    } else {
        println!("[WARN] Render backend {} unavailable", renderer.name());
    }

    let config_path = explicit_config
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not found)", config_path.display());
    }
    match config.validate() {
        Ok(()) => println!(
            "     {} Hz, hop {}, max offset {:.1}s, zoom {:.2}-{:.2}",
            config.analysis.sample_rate,
            config.analysis.hop_length,
            config.align.max_offset_secs,
            config.zoom.zoom_min,
            config.zoom.zoom_max
        ),
        Err(e) => {
            println!("[FAIL] {e}");
            ready = false;
        }
    }

    println!();
    if ready {
        println!("All requirements are met. RhythmCam is ready.");
        Ok(())
    } else {
        anyhow::bail!("Some requirements are missing. See above for fixes.")
    }
}
