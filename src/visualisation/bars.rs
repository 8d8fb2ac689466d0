use crate::graphics::Canvas;
use crate::visualisation::palette::ColorScheme;

// bars are wider than their slot, so neighbours overlap
const BAR_STRETCH: f32 = 2.5;
const BAR_GAP: f32 = 1.0;

/// Spectrum bars rising from the bottom edge.
///
/// Width is `canvas width / bins * 2.5`, height is the raw byte scaled by
/// `canvas height / 512`, colours cycle through the palette.
pub fn draw_frequency_bars(canvas: &mut Canvas, data: &[u8], scheme: ColorScheme) {
  if data.is_empty() {
    return;
  }
  let (width, height) = canvas.dimensions();
  let (width, height) = (width as f32, height as f32);
  let bar_width = width / data.len() as f32 * BAR_STRETCH;
  let scale = height / 512.0;

  let mut x = 0.0;
  for (i, &value) in data.iter().enumerate() {
    if x >= width {
      break;
    }
    let bar_height = value as f32 * scale;
    canvas.fill_rect(x, height - bar_height, bar_width, bar_height, scheme.cycle(i));
    x += bar_width + BAR_GAP;
  }
}

/// Bars mirrored around the vertical centre with a primary/secondary gradient.
pub fn draw_mirrored_spectrum(canvas: &mut Canvas, data: &[u8], scheme: ColorScheme) {
  if data.is_empty() {
    return;
  }
  let (width, height) = canvas.dimensions();
  let bar_width = width as f32 / data.len() as f32;
  let centre_y = height as f32 / 2.0;
  let stops = [scheme.primary(), scheme.secondary(), scheme.primary()];

  for (i, &value) in data.iter().enumerate() {
    let bar_height = value as f32 / 255.0 * centre_y;
    if bar_height <= 0.0 {
      continue;
    }
    canvas.fill_rect_gradient(
      i as f32 * bar_width,
      centre_y - bar_height,
      (bar_width - 1.0).max(1.0),
      bar_height * 2.0,
      &stops,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_scale_bar_reaches_half_height() {
    let mut canvas = Canvas::new(128, 100);
    let mut data = vec![0u8; 128];
    data[0] = 255;
    draw_frequency_bars(&mut canvas, &data, ColorScheme::Fire);
    // 255 * 100 / 512 ~ 49.8 rows from the bottom
    assert_eq!(canvas.pixel(0, 99), Some(ColorScheme::Fire.primary()));
    assert_eq!(canvas.pixel(0, 51), Some(ColorScheme::Fire.primary()));
    assert_eq!(canvas.pixel(0, 40), Some(0));
  }

  #[test]
  fn silent_data_draws_nothing() {
    let mut canvas = Canvas::new(64, 64);
    draw_frequency_bars(&mut canvas, &[0; 128], ColorScheme::Sacred);
    draw_mirrored_spectrum(&mut canvas, &[0; 128], ColorScheme::Sacred);
    assert_eq!(canvas.lit_pixels(), 0);
  }

  #[test]
  fn mirrored_bar_spans_the_centre() {
    let mut canvas = Canvas::new(4, 40);
    draw_mirrored_spectrum(&mut canvas, &[255, 0, 0, 0], ColorScheme::Water);
    assert_ne!(canvas.pixel(0, 19), Some(0));
    assert_ne!(canvas.pixel(0, 21), Some(0));
    assert_eq!(canvas.pixel(3, 20), Some(0));
  }
}
