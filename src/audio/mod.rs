pub mod analyser;
pub mod backend;
pub mod context;
pub mod microphone;
pub mod source;

pub use analyser::AnalyserNode;
pub use backend::{AudioBackend, AudioPacket};
pub use context::{AudioContext, ContextState};
pub use microphone::{MicrophoneBackend, MicrophoneInfo};
pub use source::{AudioSource, MediaElement, MediaStream, SourceId, StreamWriter};

/// Analyser transform size used by every layer.
pub const FFT_SIZE: usize = 256;
