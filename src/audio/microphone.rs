use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, anyhow};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};

use tokio::sync::oneshot;
use tokio::task;

use tracing::{error, info};

use crate::audio::backend::{AudioBackend, AudioPacket};
use crate::audio::source::StreamWriter;

// how often the capture thread checks its stop flag
const STOP_POLL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug)]
pub struct MicrophoneInfo {
  pub device: String,
  pub sample_rate: u32,
  pub channels: u16,
}

pub type ReadyReceiver = oneshot::Receiver<Result<MicrophoneInfo, String>>;

/// Captures the default (or named) input device into a media stream.
///
/// The cpal stream lives on a blocking thread for its whole life; the thread
/// exits once the consuming stream is stopped.
pub struct MicrophoneBackend {
  device_query: Option<String>,
  ready: oneshot::Sender<Result<MicrophoneInfo, String>>,
}

impl MicrophoneBackend {
  pub fn new(device_query: Option<String>) -> (Self, ReadyReceiver) {
    let (ready, ready_rx) = oneshot::channel();
    (Self { device_query, ready }, ready_rx)
  }
}

impl AudioBackend for MicrophoneBackend {
  type Error = anyhow::Error;

  async fn run(self, tx: StreamWriter) -> Result<(), Self::Error> {
    task::spawn_blocking(move || capture_loop(self.device_query, self.ready, tx)).await??;
    Ok(())
  }
}

fn capture_loop(
  device_query: Option<String>,
  ready: oneshot::Sender<Result<MicrophoneInfo, String>>,
  tx: StreamWriter,
) -> Result<(), anyhow::Error> {
  let stop = tx.stop_flag();

  let (stream, info) = match open_stream(device_query.as_deref(), tx) {
    Ok(opened) => opened,
    Err(e) => {
      let _ = ready.send(Err(format!("{e:#}")));
      return Err(e);
    }
  };

  if let Err(e) = stream.play() {
    let _ = ready.send(Err(e.to_string()));
    return Err(anyhow!("start input stream - {e}"));
  }

  info!(
    "microphone capture started on {} ({} Hz, {} ch)...",
    info.device, info.sample_rate, info.channels
  );
  // receiver gone means the caller gave up waiting
  if ready.send(Ok(info)).is_err() {
    return Ok(());
  }

  while !stop.load(Ordering::Relaxed) {
    std::thread::sleep(STOP_POLL);
  }

  drop(stream);
  info!("microphone capture stopped...");
  Ok(())
}

fn open_stream(
  device_query: Option<&str>,
  mut tx: StreamWriter,
) -> Result<(cpal::Stream, MicrophoneInfo), anyhow::Error> {
  let host = cpal::default_host();
  let device = select_input_device(&host, device_query)?;
  let name = device.name().unwrap_or_else(|_| "unknown input".to_string());
  let supported = device
    .default_input_config()
    .context("get default input config")?;
  let sample_rate = supported.sample_rate().0;
  let channels = supported.channels();
  let config: cpal::StreamConfig = supported.clone().into();

  let err_fn = |err| error!("microphone stream error - {}", err);

  let stream = match supported.sample_format() {
    SampleFormat::F32 => device.build_input_stream(
      &config,
      move |data: &[f32], _: &cpal::InputCallbackInfo| {
        push_packet(data, sample_rate, channels, &mut tx)
      },
      err_fn,
      None,
    )?,
    SampleFormat::I16 => device.build_input_stream(
      &config,
      move |data: &[i16], _: &cpal::InputCallbackInfo| {
        push_packet(data, sample_rate, channels, &mut tx)
      },
      err_fn,
      None,
    )?,
    SampleFormat::U16 => device.build_input_stream(
      &config,
      move |data: &[u16], _: &cpal::InputCallbackInfo| {
        push_packet(data, sample_rate, channels, &mut tx)
      },
      err_fn,
      None,
    )?,
    fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
  };

  Ok((
    stream,
    MicrophoneInfo {
      device: name,
      sample_rate,
      channels,
    },
  ))
}

fn select_input_device(
  host: &cpal::Host,
  device_query: Option<&str>,
) -> Result<cpal::Device, anyhow::Error> {
  if let Some(want) = device_query.map(str::to_lowercase) {
    let devices = host
      .input_devices()
      .context("enumerate input devices")?
      .collect::<Vec<_>>();
    return devices
      .into_iter()
      .find(|d| {
        d.name()
          .map(|n| n.to_lowercase().contains(&want))
          .unwrap_or(false)
      })
      .ok_or_else(|| anyhow!("no input device matching: {want}"));
  }

  host
    .default_input_device()
    .ok_or_else(|| anyhow!("no default input device found"))
}

fn push_packet<T: Sample<Float = f32> + Copy>(
  data: &[T],
  sample_rate: u32,
  channels: u16,
  tx: &mut StreamWriter,
) {
  if tx.is_stopped() {
    return;
  }
  let samples = data.iter().map(|s| s.to_float_sample()).collect::<Vec<_>>();
  let is_silent = samples.iter().all(|&s| s == 0.0);
  tx.write(AudioPacket {
    samples,
    sample_rate: sample_rate as f32,
    channels,
    is_silent,
  });
}
