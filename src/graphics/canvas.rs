use std::sync::Arc;

use parking_lot::Mutex;

use crate::graphics::primitives;

/// Canvas shared between the layer that paints it and the container that
/// composites it.
pub type SharedCanvas = Arc<Mutex<Canvas>>;

/// An in-memory 0RGB drawing surface.
///
/// Every draw call is modulated by `global_alpha`; `opacity` and `visible`
/// only matter when a [`Container`](crate::graphics::Container) composites
/// the canvas.
pub struct Canvas {
  width: usize,
  height: usize,
  buffer: Vec<u32>,
  opacity: f32,
  visible: bool,
  global_alpha: f32,
}

impl Canvas {
  pub fn new(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      buffer: vec![0; width * height],
      opacity: 1.0,
      visible: true,
      global_alpha: 1.0,
    }
  }

  pub fn shared(width: usize, height: usize) -> SharedCanvas {
    Arc::new(Mutex::new(Self::new(width, height)))
  }

  pub fn resize(&mut self, width: usize, height: usize) {
    if self.width != width || self.height != height {
      self.width = width;
      self.height = height;
      self.buffer.clear();
      self.buffer.resize(width * height, 0);
    }
  }

  /// Translucent fill over the whole surface, leaving trails of previous frames.
  pub fn clear(&mut self) {
    self.buffer.fill(0);
  }

  pub fn fade(&mut self, colour: u32, alpha: f32) {
    for px in &mut self.buffer {
      *px = primitives::blend(*px, colour, alpha);
    }
  }

  pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, colour: u32) {
    if w <= 0.0 || h <= 0.0 {
      return;
    }
    primitives::fill_rect(
      &mut self.buffer,
      self.width,
      self.height,
      (x.floor() as isize, y.floor() as isize),
      w.ceil() as usize,
      h.ceil() as usize,
      colour,
      self.global_alpha,
    );
  }

  /// Vertical gradient through evenly spaced colour stops.
  pub fn fill_rect_gradient(&mut self, x: f32, y: f32, w: f32, h: f32, stops: &[u32]) {
    if stops.is_empty() || w <= 0.0 || h <= 0.0 {
      return;
    }
    let rows = h.ceil() as usize;
    let segments = stops.len().saturating_sub(1).max(1) as f32;
    for row in 0..rows {
      let t = if rows > 1 { row as f32 / (rows - 1) as f32 } else { 0.0 };
      let pos = t * segments;
      let idx = (pos.floor() as usize).min(stops.len() - 1);
      let next = (idx + 1).min(stops.len() - 1);
      let colour = primitives::lerp(stops[idx], stops[next], pos - idx as f32);
      self.fill_rect(x, y + row as f32, w, 1.0, colour);
    }
  }

  pub fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), colour: u32, width: usize) {
    primitives::draw_line(
      &mut self.buffer,
      self.width,
      self.height,
      (from.0.round() as isize, from.1.round() as isize),
      (to.0.round() as isize, to.1.round() as isize),
      colour,
      self.global_alpha,
      width,
    );
  }

  /// Strokes consecutive points, joining the last back to the first when `closed`.
  pub fn stroke_path(&mut self, points: &[(f32, f32)], closed: bool, colour: u32, width: usize) {
    for pair in points.windows(2) {
      self.stroke_line(pair[0], pair[1], colour, width);
    }
    if closed && points.len() > 2 {
      self.stroke_line(points[points.len() - 1], points[0], colour, width);
    }
  }

  pub fn fill_circle(&mut self, centre: (f32, f32), radius: f32, colour: u32) {
    primitives::fill_circle(
      &mut self.buffer,
      self.width,
      self.height,
      centre,
      radius,
      colour,
      self.global_alpha,
    );
  }

  /// Radial glow: full `colour` at the centre fading to nothing at `radius`.
  pub fn fill_radial_gradient(&mut self, centre: (f32, f32), radius: f32, colour: u32) {
    if radius <= 0.0 {
      return;
    }
    let (cx, cy) = centre;
    let y0 = (cy - radius).floor().max(0.0) as usize;
    let y1 = ((cy + radius).ceil().max(0.0) as usize).min(self.height);
    let x0 = (cx - radius).floor().max(0.0) as usize;
    let x1 = ((cx + radius).ceil().max(0.0) as usize).min(self.width);

    for y in y0..y1 {
      for x in x0..x1 {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let d = (dx * dx + dy * dy).sqrt();
        if d < radius {
          let alpha = (1.0 - d / radius) * self.global_alpha;
          let idx = y * self.width + x;
          self.buffer[idx] = primitives::blend(self.buffer[idx], colour, alpha);
        }
      }
    }
  }

  pub fn set_global_alpha(&mut self, alpha: f32) {
    self.global_alpha = alpha.clamp(0.0, 1.0);
  }

  pub fn global_alpha(&self) -> f32 {
    self.global_alpha
  }

  pub fn set_opacity(&mut self, opacity: f32) {
    self.opacity = opacity.clamp(0.0, 1.0);
  }

  pub fn opacity(&self) -> f32 {
    self.opacity
  }

  pub fn set_visible(&mut self, visible: bool) {
    self.visible = visible;
  }

  pub fn is_visible(&self) -> bool {
    self.visible
  }

  pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
    (x < self.width && y < self.height).then(|| self.buffer[y * self.width + x])
  }

  /// Number of non-black pixels.
  pub fn lit_pixels(&self) -> usize {
    self.buffer.iter().filter(|&&px| px != 0).count()
  }

  pub fn buffer(&self) -> &[u32] {
    &self.buffer
  }

  pub fn dimensions(&self) -> (usize, usize) {
    (self.width, self.height)
  }

  pub fn centre(&self) -> (f32, f32) {
    (self.width as f32 / 2.0, self.height as f32 / 2.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn off_canvas_and_unbounded_rects_are_clipped() {
    let mut canvas = Canvas::new(100, 50);
    canvas.fill_rect(200.0, 10.0, 5.0, 5.0, 0xFFFFFF);
    canvas.fill_rect(10.0, 80.0, 5.0, 5.0, 0xFFFFFF);
    canvas.fill_rect(-30.0, 10.0, 5.0, 5.0, 0xFFFFFF);
    assert_eq!(canvas.lit_pixels(), 0);

    canvas.fill_rect(5.0, 10.0, f32::INFINITY, 5.0, 0xFFFFFF);
    assert_eq!(canvas.lit_pixels(), 95 * 5);
    canvas.fill_rect(0.0, 0.0, f32::NAN, 5.0, 0x00FF00);
    assert_eq!(canvas.pixel(0, 0), Some(0));

    canvas.clear();
    assert_eq!(canvas.lit_pixels(), 0);
    assert_eq!(canvas.dimensions(), (100, 50));
  }

  #[test]
  fn fade_darkens_towards_black() {
    let mut canvas = Canvas::new(2, 2);
    canvas.fill_rect(0.0, 0.0, 2.0, 2.0, 0xFFFFFF);
    canvas.fade(0x000000, 0.5);
    assert_eq!(canvas.pixel(0, 0), Some(0x7F7F7F));
  }

  #[test]
  fn global_alpha_modulates_fills() {
    let mut canvas = Canvas::new(1, 1);
    canvas.set_global_alpha(0.0);
    canvas.fill_rect(0.0, 0.0, 1.0, 1.0, 0xFFFFFF);
    assert_eq!(canvas.lit_pixels(), 0);
  }

  #[test]
  fn closed_path_returns_to_start() {
    let mut canvas = Canvas::new(10, 10);
    canvas.stroke_path(&[(1.0, 1.0), (8.0, 1.0), (8.0, 8.0)], true, 0xFFFFFF, 1);
    // closing diagonal passes through (4, 4)
    assert_eq!(canvas.pixel(4, 4), Some(0xFFFFFF));
  }

  #[test]
  fn resize_reallocates_blank() {
    let mut canvas = Canvas::new(4, 4);
    canvas.fill_rect(0.0, 0.0, 4.0, 4.0, 0xFFFFFF);
    canvas.resize(8, 2);
    assert_eq!(canvas.dimensions(), (8, 2));
    assert_eq!(canvas.buffer().len(), 16);
    assert_eq!(canvas.lit_pixels(), 0);
  }

  #[test]
  fn radial_gradient_is_brightest_at_centre() {
    let mut canvas = Canvas::new(21, 21);
    canvas.fill_radial_gradient((10.5, 10.5), 10.0, 0xFFFFFF);
    let centre = canvas.pixel(10, 10).unwrap_or(0);
    let edge = canvas.pixel(10, 1).unwrap_or(0);
    assert!(centre > edge);
    assert_eq!(canvas.pixel(0, 0), Some(0));
  }
}
