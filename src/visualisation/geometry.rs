use std::f32::consts::TAU;

use crate::graphics::Canvas;
use crate::visualisation::palette::ColorScheme;

const RAYS: usize = 12;
const HEXAGON: usize = 6;
// rotation is normalised to this frequency
const REFERENCE_HZ: f32 = 528.0;

/// Twelve rotating rays, a counter-rotating hexagon and a pulsing core.
///
/// `level` is the mean amplitude in [0,1]; rotation speed scales with
/// `base_frequency / 528`.
pub fn draw_sacred_geometry(
  canvas: &mut Canvas,
  level: f32,
  time: f32,
  base_frequency: f32,
  scheme: ColorScheme,
) {
  let (cx, cy) = canvas.centre();
  let base_radius = cx.min(cy) * 0.6;
  let rotation = 0.2 * (base_frequency / REFERENCE_HZ);
  let previous = canvas.global_alpha();

  // outer rays
  let r = base_radius * (1.0 + level * 0.3);
  let line_width = (1.0 + level * 2.0).round().max(1.0) as usize;
  canvas.set_global_alpha(0.5 + level * 0.5);
  for i in 0..RAYS {
    let angle = i as f32 / RAYS as f32 * TAU + time * rotation;
    let (sin, cos) = angle.sin_cos();
    canvas.stroke_line(
      (cx + cos * r * 0.5, cy + sin * r * 0.5),
      (cx + cos * r, cy + sin * r),
      scheme.primary(),
      line_width,
    );
  }

  // inner hexagon
  canvas.set_global_alpha(0.7);
  let hex_r = base_radius * 0.3 * (1.0 + level * 0.2);
  let hexagon = (0..HEXAGON)
    .map(|i| {
      let angle = i as f32 / HEXAGON as f32 * TAU - time * rotation * 0.5;
      (cx + angle.cos() * hex_r, cy + angle.sin() * hex_r)
    })
    .collect::<Vec<_>>();
  canvas.stroke_path(&hexagon, true, scheme.accent(), 2);

  // pulsing core
  let pulse = 20.0 + (time * 3.0).sin() * 10.0 + level * 30.0;
  canvas.set_global_alpha(0.8);
  canvas.fill_radial_gradient((cx, cy), pulse, scheme.primary());

  canvas.set_global_alpha(previous);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn core_is_lit_even_in_silence() {
    let mut canvas = Canvas::new(300, 300);
    draw_sacred_geometry(&mut canvas, 0.0, 0.0, 528.0, ColorScheme::Sacred);
    assert_ne!(canvas.pixel(150, 150), Some(0));
    assert_eq!(canvas.global_alpha(), 1.0);
  }

  #[test]
  fn rays_stay_inside_the_scaled_radius() {
    let mut canvas = Canvas::new(300, 300);
    draw_sacred_geometry(&mut canvas, 1.0, 0.0, 528.0, ColorScheme::Sacred);
    // base radius 90 grows to 117 at full level
    assert_eq!(canvas.pixel(299, 150), Some(0));
    assert_ne!(canvas.pixel(150 + 100, 150), Some(0));
  }
}
