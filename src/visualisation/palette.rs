use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VibeLayerError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
  #[default]
  Sacred,
  Cosmic,
  Earth,
  Fire,
  Water,
}

// primary first; the rest are drawn at random or cycled
const SACRED: &[u32] = &[0x00FFD700, 0x00FF6B00, 0x0000FF88, 0x009B59B6, 0x00FFF8DC];
const COSMIC: &[u32] = &[0x008A2BE2, 0x004B0082, 0x0000BFFF, 0x00FF00FF, 0x00E0E0FF];
const EARTH: &[u32] = &[0x0022B14C, 0x008B4513, 0x00DAA520, 0x00556B2F, 0x00D2B48C];
const FIRE: &[u32] = &[0x00FF4500, 0x00FF8C00, 0x00FFD700, 0x00DC143C, 0x00FFA07A];
const WATER: &[u32] = &[0x0000CED1, 0x001E90FF, 0x004682B4, 0x00E0FFFF, 0x0020B2AA];

impl ColorScheme {
  pub const ALL: [ColorScheme; 5] = [
    ColorScheme::Sacred,
    ColorScheme::Cosmic,
    ColorScheme::Earth,
    ColorScheme::Fire,
    ColorScheme::Water,
  ];

  pub fn name(self) -> &'static str {
    match self {
      ColorScheme::Sacred => "sacred",
      ColorScheme::Cosmic => "cosmic",
      ColorScheme::Earth => "earth",
      ColorScheme::Fire => "fire",
      ColorScheme::Water => "water",
    }
  }

  pub fn colours(self) -> &'static [u32] {
    match self {
      ColorScheme::Sacred => SACRED,
      ColorScheme::Cosmic => COSMIC,
      ColorScheme::Earth => EARTH,
      ColorScheme::Fire => FIRE,
      ColorScheme::Water => WATER,
    }
  }

  pub fn primary(self) -> u32 {
    self.colours()[0]
  }

  pub fn secondary(self) -> u32 {
    self.colours()[1]
  }

  pub fn accent(self) -> u32 {
    self.colours()[2]
  }

  /// Colour `i`, wrapping around the palette.
  pub fn cycle(self, i: usize) -> u32 {
    let colours = self.colours();
    colours[i % colours.len()]
  }

  pub fn next(self) -> Self {
    let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

impl FromStr for ColorScheme {
  type Err = VibeLayerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|scheme| scheme.name().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| VibeLayerError::UnknownColorScheme(s.to_string()))
  }
}

impl fmt::Display for ColorScheme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_known_names_only() {
    assert_eq!("fire".parse::<ColorScheme>().ok(), Some(ColorScheme::Fire));
    assert_eq!(" Water ".parse::<ColorScheme>().ok(), Some(ColorScheme::Water));
    assert!(matches!(
      "neon".parse::<ColorScheme>(),
      Err(VibeLayerError::UnknownColorScheme(name)) if name == "neon"
    ));
  }

  #[test]
  fn cycle_wraps() {
    let scheme = ColorScheme::Cosmic;
    assert_eq!(scheme.cycle(0), scheme.primary());
    assert_eq!(scheme.cycle(scheme.colours().len()), scheme.primary());
  }

  #[test]
  fn next_walks_every_scheme() {
    let mut scheme = ColorScheme::Sacred;
    for _ in 0..ColorScheme::ALL.len() {
      scheme = scheme.next();
    }
    assert_eq!(scheme, ColorScheme::Sacred);
  }
}
