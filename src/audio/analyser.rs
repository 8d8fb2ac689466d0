use std::sync::Arc;

use apodize::blackman_iter;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use tracing::warn;

use crate::error::{Result, VibeLayerError};

pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32_768;

/// Frequency-domain analyser with Web Audio `AnalyserNode` semantics.
///
/// The input is a window of the `fft_size` most recent time-domain samples.
/// Each read windows it (Blackman), transforms it, folds the normalised
/// magnitudes into an exponential average, then maps decibels onto bytes.
pub struct AnalyserNode {
  fft_size: usize,
  fft: Arc<dyn RealToComplex<f32>>,
  window_function: Vec<f32>,
  // latest time-domain window, written by the context
  input: Vec<f32>,
  fft_real_input: Vec<f32>,
  fft_complex: Vec<Complex<f32>>,
  fft_scratch: Vec<Complex<f32>>,
  // smoothed linear magnitudes (length = fft_size/2)
  smoothed: Vec<f32>,
  smoothing_time_constant: f32,
  min_decibels: f32,
  max_decibels: f32,
}

impl AnalyserNode {
  pub const DEFAULT_SMOOTHING: f32 = 0.8;
  pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
  pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

  pub fn new(fft_size: usize) -> Result<Self> {
    if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
      return Err(VibeLayerError::InvalidFftSize(fft_size));
    }

    let mut planner = RealFftPlanner::<f32>::new();
    let r2c = planner.plan_fft_forward(fft_size);

    let window_function: Vec<f32> = blackman_iter(fft_size).map(|v| v as f32).collect();

    // allocate fft buffers once
    let fft_real_input = r2c.make_input_vec();
    let fft_complex = r2c.make_output_vec();
    let fft_scratch = r2c.make_scratch_vec();

    Ok(Self {
      fft_size,
      fft: r2c,
      window_function,
      input: vec![0.0; fft_size],
      fft_real_input,
      fft_complex,
      fft_scratch,
      smoothed: vec![0.0; fft_size / 2],
      smoothing_time_constant: Self::DEFAULT_SMOOTHING,
      min_decibels: Self::DEFAULT_MIN_DECIBELS,
      max_decibels: Self::DEFAULT_MAX_DECIBELS,
    })
  }

  pub fn fft_size(&self) -> usize {
    self.fft_size
  }

  pub fn frequency_bin_count(&self) -> usize {
    self.fft_size / 2
  }

  pub fn set_smoothing_time_constant(&mut self, value: f32) {
    self.smoothing_time_constant = value.clamp(0.0, 1.0);
  }

  /// Ignored unless `min < max`.
  pub fn set_decibel_range(&mut self, min: f32, max: f32) {
    if min < max {
      self.min_decibels = min;
      self.max_decibels = max;
    }
  }

  pub(crate) fn input_mut(&mut self) -> &mut [f32] {
    &mut self.input
  }

  /// Centre frequency of bin `index` at the given sample rate.
  pub fn bin_frequency(&self, index: usize, sample_rate: f32) -> f32 {
    index as f32 * sample_rate / self.fft_size as f32
  }

  /// Refreshes the smoothed spectrum and writes one byte per bin into `out`.
  pub fn get_byte_frequency_data(&mut self, out: &mut [u8]) {
    self.analyse();
    let range = self.max_decibels - self.min_decibels;
    for (o, &mag) in out.iter_mut().zip(&self.smoothed) {
      let db = linear_to_db(mag);
      let scaled = (255.0 / range) * (db - self.min_decibels);
      *o = scaled.clamp(0.0, 255.0) as u8;
    }
  }

  /// Refreshes the smoothed spectrum and writes decibels into `out`.
  pub fn get_float_frequency_data(&mut self, out: &mut [f32]) {
    self.analyse();
    for (o, &mag) in out.iter_mut().zip(&self.smoothed) {
      *o = linear_to_db(mag);
    }
  }

  /// Index of the loudest smoothed bin, skipping DC.
  pub fn dominant_bin(&self) -> Option<usize> {
    self
      .smoothed
      .iter()
      .enumerate()
      .skip(1)
      .filter(|(_, m)| **m > 0.0)
      .max_by(|a, b| a.1.total_cmp(b.1))
      .map(|(i, _)| i)
  }

  fn analyse(&mut self) {
    self
      .fft_real_input
      .iter_mut()
      .zip(self.window_function.iter())
      .zip(self.input.iter())
      .for_each(|((out, w), s)| {
        *out = s * w;
      });

    if let Err(e) = self.fft.process_with_scratch(
      &mut self.fft_real_input,
      &mut self.fft_complex,
      &mut self.fft_scratch,
    ) {
      warn!("fft forward failed - {}", e);
      return;
    }

    let norm = 1.0 / self.fft_size as f32;
    let tau = self.smoothing_time_constant;
    for (smoothed, c) in self.smoothed.iter_mut().zip(self.fft_complex.iter()) {
      let magnitude = c.norm() * norm;
      let next = tau * *smoothed + (1.0 - tau) * magnitude;
      *smoothed = if next.is_finite() { next } else { 0.0 };
    }
  }
}

#[inline]
fn linear_to_db(mag: f32) -> f32 {
  if mag <= 0.0 {
    f32::NEG_INFINITY
  } else {
    20.0 * mag.log10()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::f32::consts::PI;

  fn sine(freq: f32, rate: f32, len: usize) -> Vec<f32> {
    (0..len).map(|i| (2.0 * PI * freq * i as f32 / rate).sin()).collect()
  }

  #[test]
  fn rejects_invalid_sizes() {
    assert!(matches!(AnalyserNode::new(100), Err(VibeLayerError::InvalidFftSize(100))));
    assert!(AnalyserNode::new(16).is_err());
    assert!(AnalyserNode::new(65_536).is_err());
    assert_eq!(AnalyserNode::new(256).map(|a| a.frequency_bin_count()).ok(), Some(128));
  }

  #[test]
  fn silence_reads_as_zero_bytes() {
    let mut analyser = AnalyserNode::new(256).expect("analyser");
    let mut out = vec![7u8; 128];
    analyser.get_byte_frequency_data(&mut out);
    assert!(out.iter().all(|&b| b == 0));
    assert_eq!(analyser.dominant_bin(), None);
  }

  #[test]
  fn sine_peaks_at_its_bin() {
    let rate = 48_000.0;
    let mut analyser = AnalyserNode::new(256).expect("analyser");
    // bin 8 sits at 1500 Hz
    analyser.input_mut().copy_from_slice(&sine(1_500.0, rate, 256));
    let mut out = vec![0u8; 128];
    analyser.get_byte_frequency_data(&mut out);
    assert_eq!(analyser.dominant_bin(), Some(8));
    assert!(out[8] > 200);
    assert!(out[8] > out[100]);
    assert_eq!(analyser.bin_frequency(8, rate), 1_500.0);
  }

  #[test]
  fn smoothing_carries_energy_between_reads() {
    let mut analyser = AnalyserNode::new(256).expect("analyser");
    analyser.input_mut().copy_from_slice(&sine(1_500.0, 48_000.0, 256));
    let mut first = vec![0.0f32; 128];
    analyser.get_float_frequency_data(&mut first);

    analyser.input_mut().fill(0.0);
    let mut second = vec![0.0f32; 128];
    analyser.get_float_frequency_data(&mut second);
    // decays by 20*log10(0.8) ~ -1.94 dB
    assert!((first[8] - second[8] - 1.938).abs() < 0.01);
  }

  #[test]
  fn smoothing_constant_is_clamped() {
    let mut frozen = AnalyserNode::new(256).expect("analyser");
    frozen.set_smoothing_time_constant(5.0);
    frozen.input_mut().copy_from_slice(&sine(1_500.0, 48_000.0, 256));
    let mut out = vec![0u8; 128];
    frozen.get_byte_frequency_data(&mut out);
    // tau of 1 never lets new energy in
    assert!(out.iter().all(|&b| b == 0));
    assert_eq!(frozen.dominant_bin(), None);

    let mut raw = AnalyserNode::new(256).expect("analyser");
    raw.set_smoothing_time_constant(-3.0);
    raw.input_mut().copy_from_slice(&sine(1_500.0, 48_000.0, 256));
    raw.get_byte_frequency_data(&mut out);
    assert!(out[8] > 200);
    raw.input_mut().fill(0.0);
    raw.get_byte_frequency_data(&mut out);
    assert!(out.iter().all(|&b| b == 0));
  }

  #[test]
  fn inverted_decibel_range_is_ignored() {
    let input = sine(1_500.0, 48_000.0, 256);
    let read = |analyser: &mut AnalyserNode| {
      analyser.input_mut().copy_from_slice(&input);
      let mut out = vec![0u8; 128];
      analyser.get_byte_frequency_data(&mut out);
      out
    };
    let stock = read(&mut AnalyserNode::new(256).expect("analyser"));

    let mut ignored = AnalyserNode::new(256).expect("analyser");
    ignored.set_decibel_range(-30.0, -100.0);
    ignored.set_decibel_range(-50.0, -50.0);
    assert_eq!(read(&mut ignored), stock);

    let mut widened = AnalyserNode::new(256).expect("analyser");
    widened.set_decibel_range(-200.0, 0.0);
    let tuned = read(&mut widened);
    assert_eq!(stock[8], 255);
    assert!(tuned[8] < stock[8]);
  }
}
