use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use triple_buffer::{Input, Output};

use tracing::debug;

use crate::audio::backend::AudioPacket;
use crate::error::Result;

// longest analysis window an analyser can ask for
const HISTORY_LEN: usize = 32_768;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an audio source, stable across clones of the same element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
  fn next() -> Self {
    Self(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
  }

  pub fn get(self) -> u64 {
    self.0
  }
}

struct ElementState {
  samples: Vec<f32>,
  sample_rate: f32,
  // seconds
  position: f64,
  playing: bool,
  looping: bool,
  last_tick: Option<Instant>,
}

impl ElementState {
  fn duration(&self) -> f64 {
    if self.sample_rate <= 0.0 {
      return 0.0;
    }
    self.samples.len() as f64 / self.sample_rate as f64
  }

  fn advance(&mut self) {
    if !self.playing {
      return;
    }
    let now = Instant::now();
    if let Some(last) = self.last_tick.replace(now) {
      self.position += now.duration_since(last).as_secs_f64();
    }
    let duration = self.duration();
    if self.position >= duration {
      if self.looping && duration > 0.0 {
        self.position %= duration;
      } else {
        self.position = duration;
        self.playing = false;
        self.last_tick = None;
      }
    }
  }
}

/// A decoded clip with a playback clock, the analogue of an `<audio>` element.
///
/// Clones share playback state, so the host can keep a handle for transport
/// control while a layer analyses the same element.
#[derive(Clone)]
pub struct MediaElement {
  id: SourceId,
  state: Arc<Mutex<ElementState>>,
}

impl MediaElement {
  pub fn from_samples(samples: Vec<f32>, sample_rate: f32) -> Self {
    Self {
      id: SourceId::next(),
      state: Arc::new(Mutex::new(ElementState {
        samples,
        sample_rate,
        position: 0.0,
        playing: false,
        looping: false,
        last_tick: None,
      })),
    }
  }

  /// Decodes a WAV file, mixing all channels down to mono.
  pub fn from_wav(path: impl AsRef<Path>) -> Result<Self> {
    let mut reader = hound::WavReader::open(path.as_ref())?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
      hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
      hound::SampleFormat::Int => {
        let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
        reader
          .samples::<i32>()
          .map(|s| s.map(|v| v as f32 / scale))
          .collect::<std::result::Result<_, _>>()?
      }
    };

    let mono = interleaved
      .chunks_exact(channels)
      .map(|frame| frame.iter().sum::<f32>() / channels as f32)
      .collect::<Vec<_>>();

    debug!(
      "decoded {} ({} frames @ {} Hz)",
      path.as_ref().display(),
      mono.len(),
      spec.sample_rate
    );
    Ok(Self::from_samples(mono, spec.sample_rate as f32))
  }

  pub fn id(&self) -> SourceId {
    self.id
  }

  pub fn play(&self) {
    let mut state = self.state.lock();
    if state.position >= state.duration() {
      state.position = 0.0;
    }
    state.playing = true;
    state.last_tick = Some(Instant::now());
  }

  pub fn pause(&self) {
    let mut state = self.state.lock();
    state.advance();
    state.playing = false;
    state.last_tick = None;
  }

  pub fn is_paused(&self) -> bool {
    !self.state.lock().playing
  }

  pub fn seek(&self, seconds: f64) {
    let mut state = self.state.lock();
    let duration = state.duration();
    state.position = seconds.clamp(0.0, duration);
    if state.playing {
      state.last_tick = Some(Instant::now());
    }
  }

  pub fn set_looping(&self, looping: bool) {
    self.state.lock().looping = looping;
  }

  pub fn current_time(&self) -> f64 {
    let mut state = self.state.lock();
    state.advance();
    state.position
  }

  pub fn duration(&self) -> f64 {
    self.state.lock().duration()
  }

  /// Adds the `out.len()` samples ending at the playback position, resampled
  /// to `sample_rate`. A paused element contributes silence.
  pub(crate) fn mix_latest(&self, out: &mut [f32], sample_rate: f32) {
    let mut state = self.state.lock();
    state.advance();
    if !state.playing || state.samples.is_empty() || sample_rate <= 0.0 {
      return;
    }

    let len = out.len();
    let clip_rate = state.sample_rate as f64;
    for (i, o) in out.iter_mut().enumerate() {
      let t = state.position - (len - 1 - i) as f64 / sample_rate as f64;
      if t < 0.0 {
        continue;
      }
      let idx = (t * clip_rate) as usize;
      if let Some(s) = state.samples.get(idx) {
        *o += *s;
      }
    }
  }
}

/// Producer half of a [`MediaStream`].
pub struct StreamWriter {
  tx: Input<AudioPacket>,
  stop: Arc<AtomicBool>,
}

impl StreamWriter {
  pub fn write(&mut self, packet: AudioPacket) {
    self.tx.write(packet);
  }

  /// Set once the consuming stream has been stopped or dropped from its context.
  pub fn is_stopped(&self) -> bool {
    self.stop.load(Ordering::Relaxed)
  }

  pub(crate) fn stop_flag(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.stop)
  }
}

/// A live packet stream, e.g. microphone capture.
pub struct MediaStream {
  id: SourceId,
  label: String,
  rx: Output<AudioPacket>,
  history: Vec<f32>,
  stop: Arc<AtomicBool>,
}

impl MediaStream {
  pub fn channel(label: impl Into<String>) -> (StreamWriter, MediaStream) {
    let (tx, rx) = triple_buffer::triple_buffer(&AudioPacket::default());
    let stop = Arc::new(AtomicBool::new(false));
    let writer = StreamWriter {
      tx,
      stop: Arc::clone(&stop),
    };
    let stream = MediaStream {
      id: SourceId::next(),
      label: label.into(),
      rx,
      history: Vec::with_capacity(HISTORY_LEN),
      stop,
    };
    (writer, stream)
  }

  pub fn id(&self) -> SourceId {
    self.id
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn stop(&self) {
    self.stop.store(true, Ordering::Relaxed);
  }

  pub fn is_stopped(&self) -> bool {
    self.stop.load(Ordering::Relaxed)
  }

  /// Pulls the newest packet (if any) into the history and adds its tail to `out`.
  pub(crate) fn mix_latest(&mut self, out: &mut [f32], sample_rate: f32) {
    if self.rx.updated() {
      let (mono, packet_rate) = {
        let packet = self.rx.read();
        (packet.mix_to_mono(), packet.sample_rate)
      };
      let block = resample(&mono, packet_rate, sample_rate);
      self.history.extend_from_slice(&block);
      if self.history.len() > HISTORY_LEN {
        let excess = self.history.len() - HISTORY_LEN;
        self.history.drain(..excess);
      }
    }

    let take = out.len().min(self.history.len());
    let offset = out.len() - take;
    let tail = &self.history[self.history.len() - take..];
    for (o, s) in out[offset..].iter_mut().zip(tail) {
      *o += *s;
    }
  }
}

impl Drop for MediaStream {
  fn drop(&mut self) {
    // nobody left to read; let the producer wind down
    self.stop();
  }
}

/// Anything a layer can analyse.
pub enum AudioSource {
  Element(MediaElement),
  Stream(MediaStream),
}

impl AudioSource {
  pub fn id(&self) -> SourceId {
    match self {
      AudioSource::Element(element) => element.id(),
      AudioSource::Stream(stream) => stream.id(),
    }
  }

  pub(crate) fn mix_latest(&mut self, out: &mut [f32], sample_rate: f32) {
    match self {
      AudioSource::Element(element) => element.mix_latest(out, sample_rate),
      AudioSource::Stream(stream) => stream.mix_latest(out, sample_rate),
    }
  }

  /// Called when the source leaves its context; live streams are told to stop.
  pub(crate) fn release(&mut self) {
    if let AudioSource::Stream(stream) = self {
      stream.stop();
    }
  }
}

impl From<MediaElement> for AudioSource {
  fn from(element: MediaElement) -> Self {
    AudioSource::Element(element)
  }
}

impl From<MediaStream> for AudioSource {
  fn from(stream: MediaStream) -> Self {
    AudioSource::Stream(stream)
  }
}

/// Linear-interpolation rate conversion.
pub(crate) fn resample(input: &[f32], from: f32, to: f32) -> Vec<f32> {
  if input.is_empty() || from <= 0.0 || to <= 0.0 || (from - to).abs() < f32::EPSILON {
    return input.to_vec();
  }
  let ratio = from as f64 / to as f64;
  let out_len = ((input.len() as f64) / ratio).floor() as usize;
  (0..out_len)
    .map(|i| {
      let pos = i as f64 * ratio;
      let idx = pos.floor() as usize;
      let frac = (pos - idx as f64) as f32;
      let a = input[idx.min(input.len() - 1)];
      let b = input[(idx + 1).min(input.len() - 1)];
      a + (b - a) * frac
    })
    .collect()
}
