//! Frame Grabber
//!
//! Plays a video frame by frame and saves the displayed frame as a resized
//! screenshot whenever the capture key is pressed.

mod app;
mod config;
mod display;
mod error;
mod input;
mod utils;
mod video;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use app::session::{self, SessionSettings};
use config::{CaptureConfig, CaptureKey};
use error::SessionError;

/// Play a video and save screenshots on a key press
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the video file (prompted for when omitted)
    video: Option<PathBuf>,

    /// Key that takes a screenshot, either case (prompted for when omitted)
    #[arg(short, long, value_parser = parse_key_arg)]
    key: Option<CaptureKey>,

    /// Milliseconds each frame waits for a key press (prompted for when omitted)
    #[arg(short = 'D', long, value_parser = clap::value_parser!(u64).range(1..))]
    delay: Option<u64>,

    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder to save screenshots in
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn parse_key_arg(s: &str) -> Result<CaptureKey, String> {
    CaptureKey::parse(s).ok_or_else(|| format!("expected a single character, got {:?}", s))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from: {:?}", path);
            CaptureConfig::load_from_file(path)?
        }
        None => CaptureConfig::default(),
    };
    if let Some(dir) = args.output_dir {
        config.output_dir = Some(dir);
    }

    let stdin = std::io::stdin();
    let mut stdin = stdin.lock();
    let mut stdout = std::io::stdout();

    let video_path = match args.video {
        Some(path) => path,
        None => input::prompt_video_path(&mut stdin, &mut stdout)?,
    };
    let capture_key = match args.key {
        Some(key) => key,
        None => input::prompt_capture_key(&mut stdin, &mut stdout)?,
    };
    let delay_ms = match args.delay {
        Some(ms) => ms,
        None => input::prompt_delay(&mut stdin, &mut stdout)?,
    };
    drop(stdin);

    let settings = SessionSettings {
        output_dir: config.resolve_output_dir(),
        capture_key,
        quit_key: config.quit_key,
        resolution: config.resolution,
        frame_delay: Duration::from_millis(delay_ms),
    };
    info!(
        "Video: {:?}, output: {:?}, resolution: {}",
        video_path, settings.output_dir, settings.resolution
    );

    let hint = format!(
        "'{}' screenshot, '{}' quit",
        settings.capture_key.upper(),
        settings.quit_key
    );
    let result = session::run(
        &video_path,
        &settings,
        &mut stdout,
        session::open_video,
        |source: video::VideoDecoder| {
            info!("Source frame rate: {:.1}fps", source.fps());
            let frame_size = [source.width(), source.height()];
            let job_settings = settings.clone();
            display::launch(&config.window_title, frame_size, hint, move |display| {
                session::play(source, display, &job_settings, &mut std::io::stdout())
            })
        },
    );

    match result {
        Ok(summary) => {
            info!(
                "Done ({:?}): {} frames, {} screenshots",
                summary.exit,
                summary.frames_shown,
                summary.saved.len()
            );
            Ok(())
        }
        Err(SessionError::SourceOpen { path, reason }) => {
            error!("Failed to open {:?}: {}", path, reason);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}
