#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::path::PathBuf;

use clap::Parser;

use tracing::info;

use tracing_subscriber::filter::LevelFilter;

use vibe_layer::config::{AppConfig, Overrides};
use vibe_layer::{ColorScheme, VibeMode};

mod app;

use app::{App, Input};

#[derive(Parser, Debug)]
#[command(name = "vibe-layer", version, about = "Audio-reactive visual overlay")]
struct Args {
  /// Analyse a WAV file instead of the microphone.
  #[arg(long, conflicts_with = "mic")]
  wav: Option<PathBuf>,

  /// Capture from an input device (substring of its name, or "default").
  #[arg(long)]
  mic: Option<String>,

  #[arg(long)]
  scheme: Option<ColorScheme>,

  #[arg(long)]
  mode: Option<VibeMode>,

  #[arg(long)]
  intensity: Option<f32>,

  #[arg(long)]
  base_frequency: Option<f32>,

  /// Telemetry endpoint receiving vibe events.
  #[arg(long)]
  api_url: Option<String>,

  #[arg(long)]
  fps: Option<usize>,

  #[arg(long, short, default_value_t = false)]
  verbose: bool,
}

impl Args {
  fn overrides(&self) -> Overrides {
    Overrides {
      color_scheme: self.scheme,
      mode: self.mode,
      intensity: self.intensity,
      api_url: self.api_url.clone(),
      base_frequency: self.base_frequency,
      microphone_device: self
        .mic
        .clone()
        .filter(|device| !device.eq_ignore_ascii_case("default")),
      wav: self.wav.clone(),
      target_fps: self.fps,
    }
  }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
  let args = Args::parse();

  tracing_subscriber::fmt()
    .with_max_level(if args.verbose {
      LevelFilter::DEBUG
    } else {
      LevelFilter::INFO
    })
    .with_target(false)
    .init();

  let config = AppConfig::load(args.overrides())?;
  // --mic wins over a wav named in the config file
  let input = match (&args.mic, &config.wav) {
    (Some(_), _) | (None, None) => Input::Microphone,
    (None, Some(path)) => Input::Wav(path.clone()),
  };

  info!("vibe layer spinning up...");

  let mut app = App::new(config)?;
  app.connect(input).await?;
  app.run().await?;

  info!("vibe layer spinning down...");
  Ok(())
}
