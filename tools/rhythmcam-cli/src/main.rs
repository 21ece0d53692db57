//! RhythmCam CLI: audio sync, beat detection, and beat-zoom rendering.
//!
//! Usage:
//!   rhythmcam align <DANCE> <REFERENCE>   Sync reference audio onto a dance video
//!   rhythmcam beats <MEDIA>               Detect beats and write beats.json
//!   rhythmcam zoom <MEDIA>                Render a zoom pulse on every beat
//!   rhythmcam zoom --batch <DIR>          Same, for every video in a directory
//!   rhythmcam check                       Check ffmpeg and configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rhythmcam_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "rhythmcam",
    about = "Rhythm-aware audio sync and beat effects for dance videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/rhythmcam/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align a reference track to a dance video and mux it in
    Align {
        /// Video whose own audio is the timing guide
        dance: PathBuf,

        /// Clean audio track to sync onto the video
        reference: PathBuf,

        /// Largest offset searched in either direction (seconds)
        #[arg(long)]
        max_offset: Option<f64>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Detect beats in an audio or video file
    Beats {
        /// Media file to analyze
        media: PathBuf,

        /// Fraction of beats to keep, 0.0 (strongest only) to 1.0 (all)
        #[arg(long)]
        sensitivity: Option<f64>,

        /// Frame rate for beat frame indices (defaults to the media's)
        #[arg(long)]
        fps: Option<u32>,

        /// Where to write beats.json
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the result without writing beats.json
        #[arg(long)]
        no_save: bool,
    },

    /// Render a beat-driven zoom effect onto a video
    Zoom {
        /// Video to render
        #[arg(required_unless_present = "batch", conflicts_with = "batch")]
        media: Option<PathBuf>,

        /// Render every video in this directory instead of a single file
        #[arg(long, value_name = "DIR", conflicts_with = "output")]
        batch: Option<PathBuf>,

        /// Where batch outputs go (defaults to the batch directory)
        #[arg(long, value_name = "DIR", requires = "batch")]
        output_dir: Option<PathBuf>,

        /// Zoom factor between beats
        #[arg(long)]
        zoom_min: Option<f64>,

        /// Zoom factor at strong beats
        #[arg(long)]
        zoom_max: Option<f64>,

        /// Half-width of each beat's zoom window (seconds)
        #[arg(long)]
        window: Option<f64>,

        /// Fraction of beats to keep, 0.0 to 1.0
        #[arg(long)]
        sensitivity: Option<f64>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check ffmpeg availability and configuration
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    rhythmcam_common::logging::init_logging(&config.logging);
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.command {
        Commands::Align {
            dance,
            reference,
            max_offset,
            output,
        } => commands::align::run(&config, dance, reference, max_offset, output),
        Commands::Beats {
            media,
            sensitivity,
            fps,
            output,
            no_save,
        } => commands::beats::run(&config, media, sensitivity, fps, output, !no_save),
        Commands::Zoom {
            media,
            batch,
            output_dir,
            zoom_min,
            zoom_max,
            window,
            sensitivity,
            output,
        } => {
            let overrides = commands::zoom::ZoomOverrides {
                zoom_min,
                zoom_max,
                window,
                sensitivity,
            };
            match (batch, media) {
                (Some(dir), _) => commands::zoom::run_batch(&config, dir, overrides, output_dir),
                (None, Some(media)) => commands::zoom::run(&config, media, overrides, output),
                (None, None) => anyhow::bail!("specify a video file or use --batch DIR"),
            }
        }
        Commands::Check => commands::check::run(&config, cli.config.as_deref()),
    }
}
