pub mod bars;
pub mod frequency;
pub mod geometry;
pub mod palette;
pub mod particles;
pub mod visualiser;
pub mod wave;

pub use frequency::{FrequencyVisual, SACRED_FREQUENCIES, generate_frequency_visual};
pub use palette::ColorScheme;
pub use visualiser::{FrameInput, VibeMode, Visualiser};
