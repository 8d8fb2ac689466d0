//! Audio-reactive visual overlay.
//!
//! A [`VibeLayer`] owns a canvas mounted on a [`graphics::Container`], an
//! [`audio::AudioContext`] with one analyser, and a host-driven frame loop.
//! Each frame pulls the latest spectrum and paints it in the active
//! [`VibeMode`].

pub mod audio;
pub mod config;
pub mod error;
pub mod frame;
pub mod graphics;
pub mod layer;
pub mod lifetime;
pub mod options;
pub mod telemetry;
pub mod visualisation;

pub use error::{Result, VibeLayerError};
pub use layer::{LayerState, VibeLayer};
pub use options::VibeOptions;
pub use visualisation::{
  ColorScheme, FrequencyVisual, SACRED_FREQUENCIES, VibeMode, generate_frequency_visual,
};
