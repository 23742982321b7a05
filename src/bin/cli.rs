//! xm-cli - load an XM module and play it or render it to WAV.
//!
//! # Usage
//!
//! ```bash
//! xm-cli song.xm                      # play on the default device
//! xm-cli song.xm --wav out.wav        # render offline
//! xm-cli song.xm --wav out.wav --loop --seconds 60
//! RUST_LOG=debug xm-cli song.xm --wav out.wav
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xm_master::{Controller, LoadOptions, Module, PlayerOptions, RenderConfig};

#[derive(Parser)]
#[command(name = "xm-cli")]
#[command(author, version, about = "Extended Module (XM) player")]
struct Args {
    /// Module file to load
    path: PathBuf,

    /// Render to this WAV file instead of playing
    #[arg(long, value_name = "FILE")]
    wav: Option<PathBuf>,

    /// Output sample rate for WAV rendering
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Stop after this many seconds
    #[arg(long, default_value = "300")]
    seconds: u32,

    /// Reject modules whose version is not 0x0104
    #[arg(long)]
    strict: bool,

    /// Jump to the restart position at the end of the song
    #[arg(long = "loop")]
    looped: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let options = LoadOptions {
        strict_version: args.strict,
    };
    let controller = Controller::load(&args.path, &options)
        .with_context(|| format!("failed to load {}", args.path.display()))?;
    print_summary(controller.module());

    let config = RenderConfig {
        sample_rate: args.sample_rate,
        max_seconds: args.seconds,
        player: PlayerOptions {
            restart_at_end: args.looped,
        },
    };

    match &args.wav {
        Some(out) => render(&controller, &config, out),
        None => play(controller, &config),
    }
}

fn print_summary(module: &Module) {
    println!("Name:        {}", module.name);
    println!("Channels:    {}", module.channel_count);
    println!("Patterns:    {}", module.patterns.len());
    println!("Instruments: {}", module.instruments.len());
    println!("Song length: {} (restart at {})", module.song_length, module.restart_position);
    println!("Tempo/BPM:   {}/{}", module.default_tempo, module.default_bpm);
}

fn render(controller: &Controller, config: &RenderConfig, out: &Path) -> Result<()> {
    let wav = controller.render_to_wav(config);
    std::fs::write(out, &wav).with_context(|| format!("failed to write {}", out.display()))?;
    info!(path = %out.display(), bytes = wav.len(), "wrote WAV");
    Ok(())
}

#[cfg(feature = "cpal")]
fn play(mut controller: Controller, config: &RenderConfig) -> Result<()> {
    use std::time::{Duration, Instant};

    controller
        .play(config.player)
        .context("failed to start audio output")?;

    let deadline = Instant::now() + Duration::from_secs(config.max_seconds as u64);
    while controller.is_playing() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    controller.stop();
    Ok(())
}

#[cfg(not(feature = "cpal"))]
fn play(_controller: Controller, _config: &RenderConfig) -> Result<()> {
    anyhow::bail!("built without audio output (enable the `cpal` feature) - use --wav to render")
}
