use std::f32::consts::TAU;

use crate::graphics::Canvas;
use crate::visualisation::palette::ColorScheme;

pub const BASE_RADIUS: f32 = 100.0;
pub const AMPLITUDE_RADIUS: f32 = 150.0;
const GLOW_ALPHA: f32 = 0.5;

/// Polar plot of every bin around `centre` at `100 + amplitude * 150`.
pub fn wave_points(data: &[u8], centre: (f32, f32)) -> Vec<(f32, f32)> {
  let count = data.len().max(1) as f32;
  data
    .iter()
    .enumerate()
    .map(|(i, &value)| {
      let angle = i as f32 / count * TAU;
      let radius = BASE_RADIUS + value as f32 / 255.0 * AMPLITUDE_RADIUS;
      (centre.0 + angle.cos() * radius, centre.1 + angle.sin() * radius)
    })
    .collect()
}

/// Closed circular waveform over a radial glow in `glow` colour.
pub fn draw_circular_wave(canvas: &mut Canvas, data: &[u8], scheme: ColorScheme, glow: u32) {
  if data.is_empty() {
    return;
  }
  let centre = canvas.centre();
  let mean = data.iter().map(|&v| v as f32).sum::<f32>() / data.len() as f32;

  // glow first so the stroke sits on top
  let previous = canvas.global_alpha();
  canvas.set_global_alpha(previous * GLOW_ALPHA * (mean / 255.0));
  canvas.fill_radial_gradient(centre, BASE_RADIUS + mean / 255.0 * AMPLITUDE_RADIUS, glow);
  canvas.set_global_alpha(previous);

  let points = wave_points(data, centre);
  canvas.stroke_path(&points, true, scheme.primary(), 2);
}

/// Frequency bytes traced left to right around the vertical centre.
pub fn draw_waveform(canvas: &mut Canvas, data: &[u8], scheme: ColorScheme) {
  if data.is_empty() {
    return;
  }
  let (width, height) = canvas.dimensions();
  let slice = width as f32 / data.len() as f32;
  let centre_y = height as f32 / 2.0;

  let points = data
    .iter()
    .enumerate()
    .map(|(i, &value)| {
      let v = value as f32 / 128.0;
      (i as f32 * slice, centre_y + (v - 1.0) * centre_y * 0.8)
    })
    .collect::<Vec<_>>();
  canvas.stroke_path(&points, false, scheme.primary(), 2);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn silent_wave_is_the_base_circle() {
    let points = wave_points(&[0; 4], (0.0, 0.0));
    assert_eq!(points.len(), 4);
    assert!((points[0].0 - BASE_RADIUS).abs() < 1e-3);
    assert!((points[1].1 - BASE_RADIUS).abs() < 1e-3);
  }

  #[test]
  fn loud_bins_push_outwards() {
    let points = wave_points(&[255], (10.0, 10.0));
    assert!((points[0].0 - (10.0 + BASE_RADIUS + AMPLITUDE_RADIUS)).abs() < 1e-3);
  }

  #[test]
  fn circular_wave_strokes_in_primary() {
    let mut canvas = Canvas::new(400, 400);
    draw_circular_wave(&mut canvas, &[0; 128], ColorScheme::Earth, 0x00FFFFFF);
    // rightmost point of the base circle
    assert_eq!(canvas.pixel(300, 200), Some(ColorScheme::Earth.primary()));
    // no glow without amplitude
    assert_eq!(canvas.pixel(200, 200), Some(0));
  }
}
