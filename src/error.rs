use thiserror::Error;

pub type Result<T> = std::result::Result<T, VibeLayerError>;

#[derive(Error, Debug)]
pub enum VibeLayerError {
  #[error("vibe layer is already initialized")]
  AlreadyInitialized,
  /// Initialization failed earlier; the layer never retries.
  #[error("vibe layer failed to initialize and is inert")]
  Inert,
  #[error("vibe layer has been destroyed")]
  Destroyed,
  #[error("audio context unavailable: {0}")]
  AudioContext(String),
  #[error("audio context is closed")]
  ContextClosed,
  #[error("invalid fft size {0}, expected a power of two in 32..=32768")]
  InvalidFftSize(usize),
  #[error("microphone unavailable: {0}")]
  Microphone(String),
  #[error("unknown color scheme `{0}`")]
  UnknownColorScheme(String),
  #[error("unknown visualisation mode `{0}`")]
  UnknownMode(String),
  #[error("media decode error: {0}")]
  Decode(#[from] hound::Error),
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),
}
