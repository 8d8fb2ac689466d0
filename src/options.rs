use std::sync::Arc;

use crate::graphics::{Container, SharedCanvas};
use crate::telemetry::Transport;
use crate::visualisation::{ColorScheme, SACRED_FREQUENCIES, VibeMode};

pub const DEFAULT_WIDTH: usize = 1400;
pub const DEFAULT_HEIGHT: usize = 600;
pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;
pub const DEFAULT_INTENSITY: f32 = 0.5;
pub const DEFAULT_BASE_FREQUENCY: f32 = 528.0;

/// Construction options for a [`VibeLayer`](crate::VibeLayer). Every field
/// has a default, so callers usually write
/// `VibeOptions { api_url: Some(url), ..Default::default() }`.
#[derive(Clone)]
pub struct VibeOptions {
  /// Mount point; a fresh default-sized container when unset.
  pub container: Option<Arc<Container>>,
  /// Existing canvas to draw into instead of creating one.
  pub canvas: Option<SharedCanvas>,
  /// Named frequencies; the nearest one to the dominant bin tints the glow.
  pub frequencies: Vec<f32>,
  pub color_scheme: ColorScheme,
  pub intensity: f32,
  /// Initialise and start rendering straight away.
  pub enabled: bool,
  pub api_url: Option<String>,
  pub mode: VibeMode,
  pub base_frequency: f32,
  pub sample_rate: f32,
  /// Case-insensitive substring of the input device name.
  pub microphone_device: Option<String>,
  /// Telemetry transport; plain HTTP when unset.
  pub transport: Option<Arc<dyn Transport>>,
}

impl Default for VibeOptions {
  fn default() -> Self {
    Self {
      container: None,
      canvas: None,
      frequencies: SACRED_FREQUENCIES.to_vec(),
      color_scheme: ColorScheme::default(),
      intensity: DEFAULT_INTENSITY,
      enabled: true,
      api_url: None,
      mode: VibeMode::default(),
      base_frequency: DEFAULT_BASE_FREQUENCY,
      sample_rate: DEFAULT_SAMPLE_RATE,
      microphone_device: None,
      transport: None,
    }
  }
}
