use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use minifb::{Key, KeyRepeat, Scale, ScaleMode, Window, WindowOptions};

use tokio::task;

use tracing::{info, warn};

use vibe_layer::audio::MediaElement;
use vibe_layer::config::AppConfig;
use vibe_layer::graphics::Container;
use vibe_layer::{ColorScheme, LayerState, VibeLayer};

// host page behind the overlay
const BACKGROUND: u32 = 0x001A1A1A;
const INTENSITY_STEP: f32 = 0.1;

pub enum Input {
  Microphone,
  Wav(PathBuf),
}

pub struct App {
  window: Window,
  container: Arc<Container>,
  layer: VibeLayer,
  element: Option<MediaElement>,
  frame: Vec<u32>,
  size: (usize, usize),
  target_fps: usize,
  looping: bool,
}

impl App {
  pub fn new(config: AppConfig) -> Result<Self, anyhow::Error> {
    // create window
    let window_options = WindowOptions {
      resize: true,
      scale: Scale::X1,
      scale_mode: ScaleMode::Stretch,
      ..Default::default()
    };
    let window = Window::new("vibe layer", config.width, config.height, window_options)?;

    let container = Container::new(config.width, config.height);
    let layer = VibeLayer::new(config.to_options(Arc::clone(&container)));
    if layer.state() == LayerState::Failed {
      anyhow::bail!("vibe layer failed to initialise, see log for details");
    }

    Ok(Self {
      window,
      container,
      layer,
      element: None,
      frame: vec![BACKGROUND; config.width * config.height],
      size: (config.width, config.height),
      target_fps: config.target_fps,
      looping: config.looping,
    })
  }

  /// Wires the chosen input into the layer. A missing microphone is not
  /// fatal; the overlay just idles.
  pub async fn connect(&mut self, input: Input) -> Result<(), anyhow::Error> {
    match input {
      Input::Wav(path) => {
        let element = MediaElement::from_wav(&path)
          .with_context(|| format!("failed to open {}", path.display()))?;
        element.set_looping(self.looping);
        element.play();
        self.layer.connect_audio_source(element.clone())?;
        info!("playing {} ({:.1}s)", path.display(), element.duration());
        self.element = Some(element);
      }
      Input::Microphone => {
        if let Err(e) = self.layer.connect_microphone().await {
          warn!("running without audio - {}", e);
        }
      }
    }
    Ok(())
  }

  pub async fn run(&mut self) -> Result<(), anyhow::Error> {
    self.window.set_target_fps(self.target_fps);

    while self.window.is_open() && !self.window.is_key_down(Key::Escape) {
      // observe current window size...
      let (width, height) = self.window.get_size();
      // process user inputs...
      self.handle_input();
      // live resize if the dimensions changed
      self.resize(width, height);
      // let the layer paint if it has a frame pending...
      self.layer.tick();
      // composite the overlay over the host background
      self.frame.fill(BACKGROUND);
      self.container.composite(&mut self.frame, width, height);
      self
        .window
        .update_with_buffer(&self.frame, width, height)?;
      // yield to other tasks
      task::yield_now().await;
    }

    Ok(())
  }

  fn resize(&mut self, width: usize, height: usize) {
    if self.size == (width, height) {
      return;
    }
    self.size = (width, height);
    self.frame.resize(width * height, BACKGROUND);
    self.container.resize(width, height);
    self.layer.resize(width, height);
  }

  fn handle_input(&mut self) {
    for key in self.window.get_keys_pressed(KeyRepeat::No) {
      match key {
        Key::Key1 | Key::Key2 | Key::Key3 | Key::Key4 | Key::Key5 => {
          if let Some(scheme) = scheme_for(key) {
            self.layer.use_color_scheme(scheme);
          }
        }
        Key::Up => self.layer.set_intensity(self.layer.intensity() + INTENSITY_STEP),
        Key::Down => self.layer.set_intensity(self.layer.intensity() - INTENSITY_STEP),
        Key::M => self.layer.use_mode(self.layer.mode().next()),
        Key::Space => {
          if self.layer.is_enabled() {
            self.layer.disable();
          } else if let Err(e) = self.layer.enable() {
            warn!("cannot resume - {}", e);
          }
        }
        Key::P => {
          if let Some(element) = &self.element {
            if element.is_paused() {
              element.play();
            } else {
              element.pause();
            }
          }
        }
        _ => {}
      }
    }
  }
}

fn scheme_for(key: Key) -> Option<ColorScheme> {
  let index = match key {
    Key::Key1 => 0,
    Key::Key2 => 1,
    Key::Key3 => 2,
    Key::Key4 => 3,
    Key::Key5 => 4,
    _ => return None,
  };
  ColorScheme::ALL.get(index).copied()
}

impl Drop for App {
  fn drop(&mut self) {
    if let Some(element) = &self.element {
      element.pause();
    }
    self.layer.destroy();
  }
}
