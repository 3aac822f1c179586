//! Replay recorded face sessions through the emotion and eye-state pipeline.

use anyhow::{Context, Result};
use clap::Parser;
use face_emotion_pipeline::app::{AppConfig, ReplayApp};
use face_emotion_pipeline::config::{Config, EXAMPLE_CONFIG};
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded session to replay (YAML)
    #[arg(short, long, required_unless_present = "print_config")]
    recording: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Overlay surface width in pixels
    #[arg(long)]
    target_width: Option<f32>,

    /// Overlay surface height in pixels
    #[arg(long)]
    target_height: Option<f32>,

    /// Process one out of every N frames
    #[arg(short, long)]
    every: Option<u64>,

    /// Do not mirror the overlay horizontally
    #[arg(long)]
    no_mirror: bool,

    /// Ignore recorded faces and report placeholder detections
    #[arg(long)]
    demo: bool,

    /// Only print the summary, not every published frame
    #[arg(short, long)]
    quiet: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Face Emotion Pipeline");

    let mut settings = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path}");
            Config::from_file(path).with_context(|| format!("Failed to load config file {path}"))?
        }
        None => Config::default(),
    };

    // Command line overrides
    if let Some(width) = args.target_width {
        settings.overlay.target_width = width;
    }
    if let Some(height) = args.target_height {
        settings.overlay.target_height = height;
    }
    if let Some(every) = args.every {
        settings.sampling.process_every_nth_frame = every;
    }
    if args.no_mirror {
        settings.overlay.mirror = false;
    }

    let recording = args.recording.context("No recording given")?;
    let config = AppConfig {
        settings,
        demo_mode: args.demo,
        print_frames: !args.quiet,
        ..AppConfig::new(recording)
    };

    let mut app = ReplayApp::new(config)?;
    let summary = app.run()?;
    app.shutdown();

    println!(
        "{} frames, {} processed, {} faces, {} without face",
        summary.frames, summary.published, summary.detections, summary.no_face
    );

    Ok(())
}
