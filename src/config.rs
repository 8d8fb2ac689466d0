use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs};

use anyhow::{Context, Result};

use serde::Deserialize;

use tracing::debug;

use crate::graphics::Container;
use crate::options::{
  DEFAULT_BASE_FREQUENCY, DEFAULT_HEIGHT, DEFAULT_INTENSITY, DEFAULT_SAMPLE_RATE, DEFAULT_WIDTH,
  VibeOptions,
};
use crate::visualisation::{ColorScheme, SACRED_FREQUENCIES, VibeMode};

const CONFIG_ENV: &str = "VIBE_LAYER_CONFIG";
const CONFIG_FILE: &str = "vibe-layer.toml";

/// Settings of the window host, layered defaults, file, env, then flags.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub width: usize,
  pub height: usize,
  pub target_fps: usize,
  pub color_scheme: ColorScheme,
  pub mode: VibeMode,
  pub intensity: f32,
  pub enabled: bool,
  pub api_url: Option<String>,
  pub frequencies: Vec<f32>,
  pub base_frequency: f32,
  pub sample_rate: f32,
  pub microphone_device: Option<String>,
  pub wav: Option<PathBuf>,
  pub looping: bool,
}

/// Command-line values; `None` keeps whatever the earlier layers decided.
#[derive(Debug, Default)]
pub struct Overrides {
  pub color_scheme: Option<ColorScheme>,
  pub mode: Option<VibeMode>,
  pub intensity: Option<f32>,
  pub api_url: Option<String>,
  pub base_frequency: Option<f32>,
  pub microphone_device: Option<String>,
  pub wav: Option<PathBuf>,
  pub target_fps: Option<usize>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
      target_fps: 60,
      color_scheme: ColorScheme::default(),
      mode: VibeMode::default(),
      intensity: DEFAULT_INTENSITY,
      enabled: true,
      api_url: None,
      frequencies: SACRED_FREQUENCIES.to_vec(),
      base_frequency: DEFAULT_BASE_FREQUENCY,
      sample_rate: DEFAULT_SAMPLE_RATE,
      microphone_device: None,
      wav: None,
      looping: true,
    }
  }
}

impl AppConfig {
  pub fn load(overrides: Overrides) -> Result<Self> {
    let mut cfg = Self::default();

    if let Some(file_cfg) = load_file_config()? {
      cfg.apply_file(file_cfg);
    }
    cfg.apply_env_with(|name| env::var(name).ok());
    cfg.apply_overrides(overrides);
    cfg.sanitize();

    Ok(cfg)
  }

  /// Defaults overlaid with a single TOML document, sanitised.
  pub fn from_toml_str(s: &str) -> Result<Self> {
    let file_cfg = toml::from_str::<FileConfig>(s).context("invalid config TOML")?;
    let mut cfg = Self::default();
    cfg.apply_file(file_cfg);
    cfg.sanitize();
    Ok(cfg)
  }

  pub fn from_path(path: &Path) -> Result<Self> {
    let mut cfg = Self::default();
    cfg.apply_file(read_toml(path)?);
    cfg.sanitize();
    Ok(cfg)
  }

  fn apply_file(&mut self, fc: FileConfig) {
    if let Some(v) = fc.width {
      self.width = v;
    }
    if let Some(v) = fc.height {
      self.height = v;
    }
    if let Some(v) = fc.target_fps {
      self.target_fps = v;
    }
    if let Some(v) = fc.color_scheme {
      self.color_scheme = v;
    }
    if let Some(v) = fc.mode {
      self.mode = v;
    }
    if let Some(v) = fc.intensity {
      self.intensity = v;
    }
    if let Some(v) = fc.enabled {
      self.enabled = v;
    }
    if fc.api_url.is_some() {
      self.api_url = fc.api_url;
    }
    if let Some(v) = fc.frequencies {
      self.frequencies = v;
    }
    if let Some(v) = fc.base_frequency {
      self.base_frequency = v;
    }
    if let Some(v) = fc.sample_rate {
      self.sample_rate = v;
    }
    if fc.microphone_device.is_some() {
      self.microphone_device = fc.microphone_device;
    }
    if fc.wav.is_some() {
      self.wav = fc.wav;
    }
    if let Some(v) = fc.looping {
      self.looping = v;
    }
  }

  fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    let parse = |name: &str| lookup(name).map(|v| v.trim().to_string());

    if let Some(v) = parse("VIBE_LAYER_SCHEME").and_then(|v| v.parse().ok()) {
      self.color_scheme = v;
    }
    if let Some(v) = parse("VIBE_LAYER_MODE").and_then(|v| v.parse().ok()) {
      self.mode = v;
    }
    if let Some(v) = parse("VIBE_LAYER_INTENSITY").and_then(|v| v.parse().ok()) {
      self.intensity = v;
    }
    if let Some(v) = parse("VIBE_LAYER_ENABLED").and_then(|v| v.parse().ok()) {
      self.enabled = v;
    }
    if let Some(v) = parse("VIBE_LAYER_API_URL") {
      self.api_url = Some(v);
    }
    if let Some(v) = parse("VIBE_LAYER_BASE_FREQUENCY").and_then(|v| v.parse().ok()) {
      self.base_frequency = v;
    }
    if let Some(v) = parse("VIBE_LAYER_SAMPLE_RATE").and_then(|v| v.parse().ok()) {
      self.sample_rate = v;
    }
    if let Some(v) = parse("VIBE_LAYER_MIC") {
      self.microphone_device = Some(v);
    }
    if let Some(v) = parse("VIBE_LAYER_TARGET_FPS").and_then(|v| v.parse().ok()) {
      self.target_fps = v;
    }
  }

  pub fn apply_overrides(&mut self, o: Overrides) {
    if let Some(v) = o.color_scheme {
      self.color_scheme = v;
    }
    if let Some(v) = o.mode {
      self.mode = v;
    }
    if let Some(v) = o.intensity {
      self.intensity = v;
    }
    if o.api_url.is_some() {
      self.api_url = o.api_url;
    }
    if let Some(v) = o.base_frequency {
      self.base_frequency = v;
    }
    if o.microphone_device.is_some() {
      self.microphone_device = o.microphone_device;
    }
    if o.wav.is_some() {
      self.wav = o.wav;
    }
    if let Some(v) = o.target_fps {
      self.target_fps = v;
    }
  }

  pub fn sanitize(&mut self) {
    // clamp instead of failing
    self.width = self.width.clamp(64, 7680);
    self.height = self.height.clamp(64, 4320);
    self.target_fps = self.target_fps.clamp(10, 240);

    self.intensity = if self.intensity.is_nan() {
      DEFAULT_INTENSITY
    } else {
      self.intensity.clamp(0.0, 1.0)
    };

    if !self.base_frequency.is_finite() || self.base_frequency <= 0.0 {
      self.base_frequency = DEFAULT_BASE_FREQUENCY;
    }

    self.frequencies.retain(|f| f.is_finite() && *f > 0.0);
    if self.frequencies.is_empty() {
      self.frequencies = SACRED_FREQUENCIES.to_vec();
    }

    self.api_url = self.api_url.take().filter(|url| !url.trim().is_empty());
  }

  /// Layer options mounted on `container`.
  pub fn to_options(&self, container: Arc<Container>) -> VibeOptions {
    VibeOptions {
      container: Some(container),
      canvas: None,
      frequencies: self.frequencies.clone(),
      color_scheme: self.color_scheme,
      intensity: self.intensity,
      enabled: self.enabled,
      api_url: self.api_url.clone(),
      mode: self.mode,
      base_frequency: self.base_frequency,
      sample_rate: self.sample_rate,
      microphone_device: self.microphone_device.clone(),
      transport: None,
    }
  }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
  width: Option<usize>,
  height: Option<usize>,
  target_fps: Option<usize>,
  color_scheme: Option<ColorScheme>,
  mode: Option<VibeMode>,
  intensity: Option<f32>,
  enabled: Option<bool>,
  api_url: Option<String>,
  frequencies: Option<Vec<f32>>,
  base_frequency: Option<f32>,
  sample_rate: Option<f32>,
  microphone_device: Option<String>,
  wav: Option<PathBuf>,
  looping: Option<bool>,
}

fn load_file_config() -> Result<Option<FileConfig>> {
  if let Ok(p) = env::var(CONFIG_ENV) {
    let path = PathBuf::from(p);
    if !path.exists() {
      anyhow::bail!("{} points to a missing file: {}", CONFIG_ENV, path.display());
    }
    return Ok(Some(read_toml(&path)?));
  }

  let Some(dir) = dirs::config_dir() else {
    debug!("no config directory, using defaults");
    return Ok(None);
  };
  let path = dir.join(CONFIG_FILE);
  if path.exists() {
    return Ok(Some(read_toml(&path)?));
  }
  Ok(None)
}

fn read_toml(path: &Path) -> Result<FileConfig> {
  let s = fs::read_to_string(path)
    .with_context(|| format!("failed to read config: {}", path.display()))?;
  debug!("loading config from {}", path.display());
  toml::from_str::<FileConfig>(&s).with_context(|| format!("invalid TOML in {}", path.display()))
}
