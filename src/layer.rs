use std::sync::Arc;

use serde_json::Value;

use tracing::{debug, error, info, warn};

use crate::audio::microphone::ReadyReceiver;
use crate::audio::{AudioBackend, AudioContext, AudioSource, FFT_SIZE, MediaStream, MicrophoneBackend, SourceId};
use crate::error::{Result, VibeLayerError};
use crate::frame::{FrameHandle, FrameScheduler};
use crate::graphics::{Canvas, Container, SharedCanvas};
use crate::lifetime::Lifetime;
use crate::options::{DEFAULT_HEIGHT, DEFAULT_INTENSITY, DEFAULT_WIDTH, VibeOptions};
use crate::telemetry::{HttpTransport, Telemetry};
use crate::visualisation::{ColorScheme, FrameInput, FrequencyVisual, VibeMode, Visualiser};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerState {
  Uninitialized,
  /// Canvas, audio context and analyser all exist.
  Ready,
  /// Init failed; the layer stays inert for good.
  Failed,
  Destroyed,
}

/// Audio-reactive overlay drawn into a canvas mounted on a [`Container`].
///
/// The host drives frames by calling [`VibeLayer::tick`] once per display
/// refresh. A frame renders only while one is requested, and every rendered
/// frame requests the next one while the layer is enabled.
pub struct VibeLayer {
  state: LayerState,
  container: Arc<Container>,
  canvas: Option<SharedCanvas>,
  context: Option<AudioContext>,
  frequency_data: Vec<u8>,
  frames: FrameScheduler,
  pending: Option<FrameHandle>,
  rendered: u64,
  visualiser: Visualiser,
  telemetry: Telemetry,
  lifetime: Lifetime,
  intensity: f32,
  enabled: bool,
  sample_rate: f32,
  microphone_device: Option<String>,
}

impl VibeLayer {
  /// Builds a layer and, when `options.enabled`, initialises it straight away.
  /// An init failure is logged and leaves the layer [`LayerState::Failed`].
  pub fn new(options: VibeOptions) -> Self {
    let lifetime = Lifetime::new();
    let telemetry = telemetry_for(&options, lifetime.clone());
    let container = options
      .container
      .unwrap_or_else(|| Container::new(DEFAULT_WIDTH, DEFAULT_HEIGHT));
    let visualiser = Visualiser::new(
      options.color_scheme,
      options.mode,
      options.base_frequency,
      options.frequencies,
      container.size(),
    );

    let mut layer = Self {
      state: LayerState::Uninitialized,
      container,
      canvas: options.canvas,
      context: None,
      frequency_data: Vec::new(),
      frames: FrameScheduler::new(),
      pending: None,
      rendered: 0,
      visualiser,
      telemetry,
      lifetime,
      intensity: sanitise_intensity(options.intensity).unwrap_or(DEFAULT_INTENSITY),
      enabled: options.enabled,
      sample_rate: options.sample_rate,
      microphone_device: options.microphone_device,
    };

    if layer.enabled {
      if let Err(e) = layer.init() {
        warn!("vibe layer stays inert - {}", e);
      }
    }
    layer
  }

  /// Mounts the canvas, opens the audio context and requests the first frame.
  ///
  /// Only valid from [`LayerState::Uninitialized`]; a failure is final.
  pub fn init(&mut self) -> Result<()> {
    match self.state {
      LayerState::Uninitialized => {}
      LayerState::Ready => return Err(VibeLayerError::AlreadyInitialized),
      LayerState::Failed => return Err(VibeLayerError::Inert),
      LayerState::Destroyed => return Err(VibeLayerError::Destroyed),
    }

    if let Err(e) = self.open() {
      self.state = LayerState::Failed;
      error!("vibe layer init failed - {}", e);
      return Err(e);
    }

    self.state = LayerState::Ready;
    info!(
      "vibe layer ready ({} bins, {} scheme, {} mode)",
      self.frequency_data.len(),
      self.visualiser.scheme,
      self.visualiser.mode
    );
    if self.enabled {
      self.request_frame();
    }
    Ok(())
  }

  // the context is the only fallible step, so nothing is mounted if it fails
  fn open(&mut self) -> Result<()> {
    let context = AudioContext::new(self.sample_rate, FFT_SIZE)?;
    let (width, height) = self.container.size();

    let canvas = Arc::clone(
      self
        .canvas
        .get_or_insert_with(|| Canvas::shared(width, height)),
    );
    {
      let mut canvas = canvas.lock();
      canvas.resize(width, height);
      canvas.set_opacity(self.intensity);
      canvas.set_visible(self.enabled);
    }
    if !self.container.contains(&canvas) {
      self.container.append_child(&canvas);
    }

    self.frequency_data = vec![0; context.analyser().frequency_bin_count()];
    self.visualiser.resize(width, height);
    self.context = Some(context);
    Ok(())
  }

  pub fn state(&self) -> LayerState {
    self.state
  }

  pub fn is_initialized(&self) -> bool {
    self.state == LayerState::Ready
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  /// Attaches a media element or stream, initialising first if needed.
  ///
  /// Connecting a source that is already attached replaces it, so repeated
  /// calls with the same element leave a single edge. Distinct sources mix.
  pub fn connect_audio_source(&mut self, source: impl Into<AudioSource>) -> Result<SourceId> {
    self.ensure_ready()?;
    let context = self.context.as_mut().ok_or(VibeLayerError::Inert)?;
    let id = context.connect(source.into())?;
    info!("audio source {} attached", id.get());
    Ok(id)
  }

  pub fn disconnect_audio_source(&mut self, id: SourceId) -> bool {
    self
      .context
      .as_mut()
      .is_some_and(|context| context.disconnect(id))
  }

  pub fn attached_sources(&self) -> Vec<SourceId> {
    self
      .context
      .as_ref()
      .map(AudioContext::sources)
      .unwrap_or_default()
  }

  /// Opens the configured (or default) input device and connects it.
  ///
  /// A missing device or a refused stream yields [`VibeLayerError::Microphone`];
  /// the caller may simply try again. Dropping the returned future while the
  /// device is still negotiating drops the pending stream, which stops the
  /// capture thread.
  pub async fn connect_microphone(&mut self) -> Result<SourceId> {
    self.ensure_ready()?;

    let (writer, stream) = MediaStream::channel("microphone");
    let (backend, ready) = MicrophoneBackend::new(self.microphone_device.clone());
    tokio::spawn(async move {
      if let Err(e) = backend.run(writer).await {
        error!("microphone capture error - {:#}", e);
      }
    });

    let stream = await_microphone(ready, stream).await?;
    self.connect_audio_source(stream)
  }

  fn ensure_ready(&mut self) -> Result<()> {
    match self.state {
      LayerState::Ready => Ok(()),
      LayerState::Uninitialized => self.init(),
      LayerState::Failed => Err(VibeLayerError::Inert),
      LayerState::Destroyed => Err(VibeLayerError::Destroyed),
    }
  }

  /// Host-side frame dispatch. Returns whether a frame was painted.
  pub fn tick(&mut self) -> bool {
    if self.frames.take_pending().is_none() {
      return false;
    }
    self.pending = None;
    self.animate()
  }

  /// One frame: pump sources, refresh the spectrum, fade and redraw, then ask
  /// for the next frame while enabled.
  pub fn animate(&mut self) -> bool {
    if self.state != LayerState::Ready {
      return false;
    }
    let (Some(context), Some(canvas)) = (self.context.as_mut(), self.canvas.as_ref()) else {
      return false;
    };

    context.pump();
    let sample_rate = context.sample_rate();
    let analyser = context.analyser_mut();
    analyser.get_byte_frequency_data(&mut self.frequency_data);
    let dominant_hz = analyser
      .dominant_bin()
      .map(|bin| analyser.bin_frequency(bin, sample_rate));

    self.visualiser.render(
      &mut canvas.lock(),
      &FrameInput {
        data: &self.frequency_data,
        dominant_hz,
      },
    );
    self.rendered += 1;

    if self.enabled {
      self.request_frame();
    }
    true
  }

  fn request_frame(&mut self) {
    if let Some(handle) = self.pending.take() {
      self.frames.cancel(handle);
    }
    self.pending = Some(self.frames.request());
  }

  fn cancel_frame(&mut self) {
    if let Some(handle) = self.pending.take() {
      self.frames.cancel(handle);
    }
  }

  /// Clamped to [0,1] and applied as canvas opacity; NaN is ignored.
  pub fn set_intensity(&mut self, value: f32) {
    let Some(intensity) = sanitise_intensity(value) else {
      debug!("ignoring NaN intensity");
      return;
    };
    self.intensity = intensity;
    if let Some(canvas) = &self.canvas {
      canvas.lock().set_opacity(intensity);
    }
  }

  pub fn intensity(&self) -> f32 {
    self.intensity
  }

  /// Unknown names leave the active scheme untouched.
  pub fn set_color_scheme(&mut self, name: &str) -> Result<()> {
    match name.parse::<ColorScheme>() {
      Ok(scheme) => {
        self.use_color_scheme(scheme);
        Ok(())
      }
      Err(e) => {
        warn!("{}", e);
        Err(e)
      }
    }
  }

  pub fn use_color_scheme(&mut self, scheme: ColorScheme) {
    self.visualiser.scheme = scheme;
    debug!("colour scheme set to {}", scheme);
  }

  pub fn color_scheme(&self) -> ColorScheme {
    self.visualiser.scheme
  }

  /// Unknown names leave the active mode untouched.
  pub fn set_mode(&mut self, name: &str) -> Result<()> {
    match name.parse::<VibeMode>() {
      Ok(mode) => {
        self.use_mode(mode);
        Ok(())
      }
      Err(e) => {
        warn!("{}", e);
        Err(e)
      }
    }
  }

  pub fn use_mode(&mut self, mode: VibeMode) {
    self.visualiser.mode = mode;
    debug!("visual mode set to {}", mode);
  }

  pub fn mode(&self) -> VibeMode {
    self.visualiser.mode
  }

  /// Non-finite or non-positive frequencies are ignored.
  pub fn set_base_frequency(&mut self, hz: f32) {
    if hz.is_finite() && hz > 0.0 {
      self.visualiser.base_frequency = hz;
    }
  }

  pub fn base_frequency(&self) -> f32 {
    self.visualiser.base_frequency
  }

  pub fn frequencies(&self) -> &[f32] {
    self.visualiser.frequencies()
  }

  /// Shows the canvas and resumes the frame loop; the audio graph is kept.
  /// An uninitialised layer is initialised here.
  pub fn enable(&mut self) -> Result<()> {
    match self.state {
      LayerState::Failed => return Err(VibeLayerError::Inert),
      LayerState::Destroyed => return Err(VibeLayerError::Destroyed),
      LayerState::Uninitialized => {
        self.enabled = true;
        return self.init();
      }
      LayerState::Ready => {}
    }
    self.enabled = true;
    if let Some(canvas) = &self.canvas {
      canvas.lock().set_visible(true);
    }
    if self.pending.is_none() {
      self.request_frame();
    }
    Ok(())
  }

  /// Hides the canvas and cancels the pending frame; the audio graph is kept.
  pub fn disable(&mut self) {
    self.enabled = false;
    self.cancel_frame();
    if let Some(canvas) = &self.canvas {
      canvas.lock().set_visible(false);
    }
  }

  /// Tears everything down. Safe to call twice; the layer cannot be reused.
  pub fn destroy(&mut self) {
    if self.state == LayerState::Destroyed {
      return;
    }
    self.disable();
    if let Some(mut context) = self.context.take() {
      context.close();
    }
    if let Some(canvas) = &self.canvas {
      self.container.remove_child(canvas);
    }
    self.lifetime.end();
    self.state = LayerState::Destroyed;
    info!("vibe layer destroyed after {} frames", self.rendered);
  }

  /// Resizes the canvas and re-seeds the particle field.
  pub fn resize(&mut self, width: usize, height: usize) {
    if let Some(canvas) = &self.canvas {
      canvas.lock().resize(width, height);
    }
    self.visualiser.resize(width, height);
  }

  /// Latest byte spectrum, `fft_size / 2` long once initialised.
  pub fn frequency_data(&self) -> &[u8] {
    &self.frequency_data
  }

  pub fn audio_context(&self) -> Option<&AudioContext> {
    self.context.as_ref()
  }

  pub fn canvas(&self) -> Option<&SharedCanvas> {
    self.canvas.as_ref()
  }

  pub fn container(&self) -> &Arc<Container> {
    &self.container
  }

  pub fn frames_rendered(&self) -> u64 {
    self.rendered
  }

  pub fn has_pending_frame(&self) -> bool {
    self.frames.is_pending()
  }

  pub fn generate_frequency_visual(&self, hz: f32) -> FrequencyVisual {
    crate::visualisation::generate_frequency_visual(hz)
  }

  /// Posts `event` to the configured endpoint; `Ok(None)` when none is set.
  pub async fn sync_with_api(&self, event: Value) -> Result<Option<Value>> {
    self.telemetry.sync(event).await
  }

  /// Detached telemetry handle; its requests are cancelled by [`VibeLayer::destroy`].
  pub fn telemetry(&self) -> Telemetry {
    self.telemetry.clone()
  }
}

impl Drop for VibeLayer {
  fn drop(&mut self) {
    self.destroy();
  }
}

fn sanitise_intensity(value: f32) -> Option<f32> {
  (!value.is_nan()).then(|| value.clamp(0.0, 1.0))
}

async fn await_microphone(ready: ReadyReceiver, stream: MediaStream) -> Result<MediaStream> {
  match ready.await {
    Ok(Ok(mic)) => {
      info!("microphone {} streaming at {} Hz", mic.device, mic.sample_rate);
      Ok(stream)
    }
    Ok(Err(reason)) => {
      warn!("microphone unavailable - {}", reason);
      Err(VibeLayerError::Microphone(reason))
    }
    Err(_) => Err(VibeLayerError::Microphone(
      "capture task exited before the device opened".into(),
    )),
  }
}

fn telemetry_for(options: &VibeOptions, lifetime: Lifetime) -> Telemetry {
  let endpoint = options.api_url.clone();
  if let Some(transport) = &options.transport {
    return Telemetry::new(endpoint, Arc::clone(transport), lifetime);
  }
  if endpoint.as_deref().is_none_or(|url| url.trim().is_empty()) {
    return Telemetry::disabled(lifetime);
  }
  match HttpTransport::new() {
    Ok(transport) => Telemetry::new(endpoint, Arc::new(transport), lifetime),
    Err(e) => {
      warn!("telemetry disabled, http client unavailable - {}", e);
      Telemetry::disabled(lifetime)
    }
  }
}
