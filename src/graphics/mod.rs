pub mod canvas;
pub mod container;
pub mod primitives;

pub use canvas::{Canvas, SharedCanvas};
pub use container::Container;
