use serde::Serialize;

use crate::graphics::primitives;

/// Named frequencies a layer starts with.
pub const SACRED_FREQUENCIES: [f32; 5] = [396.0, 432.0, 528.0, 639.0, 963.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrequencyVisual {
  pub color: &'static str,
  pub name: &'static str,
  pub pattern: &'static str,
}

impl FrequencyVisual {
  pub const UNKNOWN: FrequencyVisual = FrequencyVisual {
    color: "#FFFFFF",
    name: "Unknown Frequency",
    pattern: "circle",
  };

  /// The colour as a 0RGB pixel.
  pub fn colour(&self) -> u32 {
    primitives::parse_hex(self.color).unwrap_or(0x00FFFFFF)
  }
}

const VISUALS: [(f32, FrequencyVisual); 5] = [
  (
    396.0,
    FrequencyVisual {
      color: "#FF0000",
      name: "Liberation",
      pattern: "grid",
    },
  ),
  (
    432.0,
    FrequencyVisual {
      color: "#FFD700",
      name: "Universal Harmony",
      pattern: "flower",
    },
  ),
  (
    528.0,
    FrequencyVisual {
      color: "#00FF00",
      name: "DNA Healing",
      pattern: "spiral",
    },
  ),
  (
    639.0,
    FrequencyVisual {
      color: "#FF69B4",
      name: "Heart Connection",
      pattern: "vesica",
    },
  ),
  (
    963.0,
    FrequencyVisual {
      color: "#9400D3",
      name: "Pineal Activation",
      pattern: "merkaba",
    },
  ),
];

/// Looks up the decoration for a named frequency, within half a hertz.
pub fn generate_frequency_visual(frequency: f32) -> FrequencyVisual {
  VISUALS
    .iter()
    .find(|(hz, _)| (frequency - hz).abs() < 0.5)
    .map(|(_, visual)| *visual)
    .unwrap_or(FrequencyVisual::UNKNOWN)
}

/// The configured frequency closest to `hz`.
pub fn nearest(frequencies: &[f32], hz: f32) -> Option<f32> {
  frequencies
    .iter()
    .copied()
    .filter(|f| f.is_finite())
    .min_by(|a, b| (a - hz).abs().total_cmp(&(b - hz).abs()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dna_healing_has_fixed_visual() {
    assert_eq!(
      generate_frequency_visual(528.0),
      FrequencyVisual {
        color: "#00FF00",
        name: "DNA Healing",
        pattern: "spiral"
      }
    );
    assert_eq!(generate_frequency_visual(528.0).colour(), 0x0000FF00);
  }

  #[test]
  fn unknown_frequency_falls_back() {
    assert_eq!(generate_frequency_visual(1234.0), FrequencyVisual::UNKNOWN);
    assert_eq!(generate_frequency_visual(f32::NAN), FrequencyVisual::UNKNOWN);
  }

  #[test]
  fn every_default_frequency_is_named() {
    for hz in SACRED_FREQUENCIES {
      assert_ne!(generate_frequency_visual(hz), FrequencyVisual::UNKNOWN);
    }
  }

  #[test]
  fn nearest_picks_closest() {
    assert_eq!(nearest(&SACRED_FREQUENCIES, 600.0), Some(639.0));
    assert_eq!(nearest(&SACRED_FREQUENCIES, 10.0), Some(396.0));
    assert_eq!(nearest(&[], 10.0), None);
  }
}
