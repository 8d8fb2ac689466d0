use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::audio::analyser::AnalyserNode;
use crate::audio::source::{AudioSource, SourceId};
use crate::error::{Result, VibeLayerError};

pub const MIN_SAMPLE_RATE: f32 = 3_000.0;
pub const MAX_SAMPLE_RATE: f32 = 768_000.0;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
  Running,
  Closed,
}

/// Audio graph owning one analyser and the sources feeding it.
///
/// Sources are keyed by [`SourceId`]: connecting an id that is already
/// attached replaces the old node instead of stacking a second edge. Distinct
/// sources are summed.
pub struct AudioContext {
  id: u64,
  sample_rate: f32,
  state: ContextState,
  analyser: AnalyserNode,
  sources: BTreeMap<SourceId, AudioSource>,
}

impl AudioContext {
  pub fn new(sample_rate: f32, fft_size: usize) -> Result<Self> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
      return Err(VibeLayerError::AudioContext(format!(
        "sample rate {sample_rate} outside {MIN_SAMPLE_RATE}..={MAX_SAMPLE_RATE}"
      )));
    }
    let analyser = AnalyserNode::new(fft_size)?;
    let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
    info!("audio context {} opened at {} Hz", id, sample_rate);

    Ok(Self {
      id,
      sample_rate,
      state: ContextState::Running,
      analyser,
      sources: BTreeMap::new(),
    })
  }

  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn sample_rate(&self) -> f32 {
    self.sample_rate
  }

  pub fn state(&self) -> ContextState {
    self.state
  }

  pub fn analyser(&self) -> &AnalyserNode {
    &self.analyser
  }

  pub fn analyser_mut(&mut self) -> &mut AnalyserNode {
    &mut self.analyser
  }

  pub fn connect(&mut self, source: AudioSource) -> Result<SourceId> {
    if self.state == ContextState::Closed {
      return Err(VibeLayerError::ContextClosed);
    }
    let id = source.id();
    if self.sources.insert(id, source).is_some() {
      // same element again: the old node is dropped, one edge remains
      debug!("source {} reconnected", id.get());
    } else {
      debug!("source {} connected ({} attached)", id.get(), self.sources.len());
    }
    Ok(id)
  }

  pub fn disconnect(&mut self, id: SourceId) -> bool {
    match self.sources.remove(&id) {
      Some(mut source) => {
        source.release();
        debug!("source {} disconnected", id.get());
        true
      }
      None => false,
    }
  }

  pub fn sources(&self) -> Vec<SourceId> {
    self.sources.keys().copied().collect()
  }

  /// Mixes the latest window of every source into the analyser input.
  pub fn pump(&mut self) {
    let rate = self.sample_rate;
    let input = self.analyser.input_mut();
    input.fill(0.0);
    if self.state == ContextState::Closed {
      return;
    }
    for source in self.sources.values_mut() {
      source.mix_latest(input, rate);
    }
  }

  /// Releases every source; the context cannot be reused.
  pub fn close(&mut self) {
    if self.state == ContextState::Closed {
      return;
    }
    for (_, mut source) in std::mem::take(&mut self.sources) {
      source.release();
    }
    self.state = ContextState::Closed;
    info!("audio context {} closed", self.id);
  }
}

impl Drop for AudioContext {
  fn drop(&mut self) {
    self.close();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::audio::source::{MediaElement, MediaStream};

  #[test]
  fn rejects_out_of_range_sample_rates() {
    assert!(matches!(AudioContext::new(0.0, 256), Err(VibeLayerError::AudioContext(_))));
    assert!(AudioContext::new(1_000_000.0, 256).is_err());
    assert!(AudioContext::new(44_100.0, 256).is_ok());
  }

  #[test]
  fn reconnecting_the_same_element_keeps_one_edge() {
    let mut ctx = AudioContext::new(48_000.0, 256).expect("context");
    let element = MediaElement::from_samples(vec![0.0; 10], 48_000.0);
    let a = ctx.connect(element.clone().into()).expect("connect");
    let b = ctx.connect(element.into()).expect("connect");
    assert_eq!(a, b);
    assert_eq!(ctx.sources().len(), 1);
  }

  #[test]
  fn distinct_sources_are_mixed() {
    let mut ctx = AudioContext::new(48_000.0, 256).expect("context");
    for _ in 0..2 {
      let element = MediaElement::from_samples(vec![0.25; 48_000], 48_000.0);
      element.seek(0.5);
      element.play();
      ctx.connect(element.into()).expect("connect");
    }
    ctx.pump();
    assert!(ctx.analyser_mut().input_mut().iter().all(|&s| s == 0.5));
  }

  #[test]
  fn close_stops_streams_and_refuses_new_sources() {
    let mut ctx = AudioContext::new(48_000.0, 256).expect("context");
    let (writer, stream) = MediaStream::channel("mic");
    ctx.connect(stream.into()).expect("connect");
    ctx.close();
    assert!(writer.is_stopped());
    assert_eq!(ctx.state(), ContextState::Closed);
    let element = MediaElement::from_samples(Vec::new(), 48_000.0);
    assert!(matches!(ctx.connect(element.into()), Err(VibeLayerError::ContextClosed)));
  }

  #[test]
  fn disconnect_releases_stream() {
    let mut ctx = AudioContext::new(48_000.0, 256).expect("context");
    let (writer, stream) = MediaStream::channel("mic");
    let id = ctx.connect(stream.into()).expect("connect");
    assert!(ctx.disconnect(id));
    assert!(writer.is_stopped());
    assert!(!ctx.disconnect(id));
  }
}
