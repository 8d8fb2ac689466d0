use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use serde::{Deserialize, Serialize};

use crate::error::VibeLayerError;
use crate::graphics::Canvas;
use crate::visualisation::bars;
use crate::visualisation::frequency::{self, FrequencyVisual};
use crate::visualisation::geometry;
use crate::visualisation::palette::ColorScheme;
use crate::visualisation::particles::{self, ParticleField};
use crate::visualisation::wave;

const FADE_COLOUR: u32 = 0x00000000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VibeMode {
  /// Bars, circular wave and particle burst, in that order.
  #[default]
  Layered,
  Spectrum,
  Waveform,
  SacredGeometry,
  ParticleField,
}

impl VibeMode {
  pub const ALL: [VibeMode; 5] = [
    VibeMode::Layered,
    VibeMode::Spectrum,
    VibeMode::Waveform,
    VibeMode::SacredGeometry,
    VibeMode::ParticleField,
  ];

  pub fn name(self) -> &'static str {
    match self {
      VibeMode::Layered => "layered",
      VibeMode::Spectrum => "spectrum",
      VibeMode::Waveform => "waveform",
      VibeMode::SacredGeometry => "sacred_geometry",
      VibeMode::ParticleField => "particle_field",
    }
  }

  pub fn next(self) -> Self {
    let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }

  /// Opacity of the black wash laid over the previous frame.
  fn fade_alpha(self) -> f32 {
    match self {
      VibeMode::Layered => 0.1,
      _ => 0.8,
    }
  }
}

impl FromStr for VibeMode {
  type Err = VibeLayerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|mode| mode.name().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| VibeLayerError::UnknownMode(s.to_string()))
  }
}

impl fmt::Display for VibeMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Per-frame audio snapshot handed to the visualiser.
pub struct FrameInput<'a> {
  pub data: &'a [u8],
  /// Centre frequency of the loudest bin, if anything is audible.
  pub dominant_hz: Option<f32>,
}

pub struct Visualiser {
  pub scheme: ColorScheme,
  pub mode: VibeMode,
  pub base_frequency: f32,
  frequencies: Vec<f32>,
  field: ParticleField,
  rng: SmallRng,
  epoch: Instant,
}

impl Visualiser {
  pub fn new(
    scheme: ColorScheme,
    mode: VibeMode,
    base_frequency: f32,
    frequencies: Vec<f32>,
    (width, height): (usize, usize),
  ) -> Self {
    let mut rng = SmallRng::from_rng(&mut rand::rng());
    let field = ParticleField::new(ParticleField::DEFAULT_COUNT, width, height, &mut rng);
    Self {
      scheme,
      mode,
      base_frequency,
      frequencies,
      field,
      rng,
      epoch: Instant::now(),
    }
  }

  pub fn frequencies(&self) -> &[f32] {
    &self.frequencies
  }

  /// Re-seeds the particle field over a new surface size.
  pub fn resize(&mut self, width: usize, height: usize) {
    self.field = ParticleField::new(ParticleField::DEFAULT_COUNT, width, height, &mut self.rng);
  }

  /// Decoration of the configured frequency nearest the dominant bin.
  pub fn glow_visual(&self, dominant_hz: Option<f32>) -> FrequencyVisual {
    dominant_hz
      .and_then(|hz| frequency::nearest(&self.frequencies, hz))
      .map(frequency::generate_frequency_visual)
      .unwrap_or(FrequencyVisual::UNKNOWN)
  }

  /// Fades the previous frame then paints the active mode.
  pub fn render(&mut self, canvas: &mut Canvas, input: &FrameInput<'_>) {
    canvas.fade(FADE_COLOUR, self.mode.fade_alpha());

    let level = particles::mean_amplitude(input.data) / 255.0;
    let time = self.epoch.elapsed().as_secs_f32();

    match self.mode {
      VibeMode::Layered => {
        bars::draw_frequency_bars(canvas, input.data, self.scheme);
        let glow = self.glow_visual(input.dominant_hz).colour();
        wave::draw_circular_wave(canvas, input.data, self.scheme, glow);
        particles::draw_particle_burst(canvas, input.data, self.scheme, &mut self.rng);
      }
      VibeMode::Spectrum => bars::draw_mirrored_spectrum(canvas, input.data, self.scheme),
      VibeMode::Waveform => wave::draw_waveform(canvas, input.data, self.scheme),
      VibeMode::SacredGeometry => {
        geometry::draw_sacred_geometry(canvas, level, time, self.base_frequency, self.scheme)
      }
      VibeMode::ParticleField => {
        let (width, height) = canvas.dimensions();
        self.field.step(width, height, level);
        self.field.draw(canvas, level, time, self.scheme);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::visualisation::frequency::SACRED_FREQUENCIES;

  fn visualiser(mode: VibeMode) -> Visualiser {
    Visualiser::new(ColorScheme::Sacred, mode, 528.0, SACRED_FREQUENCIES.to_vec(), (320, 240))
  }

  #[test]
  fn modes_parse_by_name() {
    assert_eq!("sacred_geometry".parse::<VibeMode>().ok(), Some(VibeMode::SacredGeometry));
    assert!(matches!("strobe".parse::<VibeMode>(), Err(VibeLayerError::UnknownMode(_))));
    assert_eq!(VibeMode::ParticleField.next(), VibeMode::Layered);
  }

  #[test]
  fn glow_follows_the_nearest_named_frequency() {
    let vis = visualiser(VibeMode::Layered);
    assert_eq!(vis.glow_visual(Some(540.0)).name, "DNA Healing");
    assert_eq!(vis.glow_visual(None), FrequencyVisual::UNKNOWN);
  }

  #[test]
  fn every_mode_paints_something_for_loud_input() {
    let data = vec![200u8; 128];
    for mode in VibeMode::ALL {
      let mut vis = visualiser(mode);
      let mut canvas = Canvas::new(320, 240);
      vis.render(&mut canvas, &FrameInput { data: &data, dominant_hz: Some(528.0) });
      assert!(canvas.lit_pixels() > 0, "{mode} drew nothing");
    }
  }

  #[test]
  fn layered_mode_leaves_trails() {
    let mut vis = visualiser(VibeMode::Layered);
    let mut canvas = Canvas::new(320, 240);
    vis.render(&mut canvas, &FrameInput { data: &[255; 128], dominant_hz: None });
    let before = canvas.pixel(0, 239);
    vis.render(&mut canvas, &FrameInput { data: &[0; 128], dominant_hz: None });
    let after = canvas.pixel(0, 239);
    // a silent frame only fades the first bar, it does not wipe it
    assert_ne!(after, Some(0));
    assert_ne!(after, before);
  }
}
