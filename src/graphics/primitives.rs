/// Splits a 0RGB pixel into its channels.
#[inline]
pub fn channels(colour: u32) -> (u32, u32, u32) {
  ((colour >> 16) & 0xFF, (colour >> 8) & 0xFF, colour & 0xFF)
}

#[inline]
pub fn rgb(r: u32, g: u32, b: u32) -> u32 {
  (r.min(255) << 16) | (g.min(255) << 8) | b.min(255)
}

/// Source-over blend of `src` onto `dst` at the given coverage.
#[inline]
pub fn blend(dst: u32, src: u32, alpha: f32) -> u32 {
  if alpha <= 0.0 {
    return dst;
  }
  if alpha >= 1.0 {
    return src;
  }
  let (dr, dg, db) = channels(dst);
  let (sr, sg, sb) = channels(src);
  // truncate so repeated fades reach black
  let mix = |d: u32, s: u32| (d as f32 + (s as f32 - d as f32) * alpha) as u32;
  rgb(mix(dr, sr), mix(dg, sg), mix(db, sb))
}

/// Saturating per-channel add of `src` scaled by `weight`.
#[inline]
pub fn add(dst: u32, src: u32, weight: f32) -> u32 {
  let (dr, dg, db) = channels(dst);
  let (sr, sg, sb) = channels(src);
  let w = weight.clamp(0.0, 1.0);
  rgb(
    dr + (sr as f32 * w) as u32,
    dg + (sg as f32 * w) as u32,
    db + (sb as f32 * w) as u32,
  )
}

/// Linear interpolation between two colours, `t` in [0,1].
pub fn lerp(a: u32, b: u32, t: f32) -> u32 {
  blend(a, b, t.clamp(0.0, 1.0))
}

/// Parses `#RRGGBB` (leading `#` optional).
pub fn parse_hex(text: &str) -> Option<u32> {
  let hex = text.strip_prefix('#').unwrap_or(text);
  if hex.len() != 6 {
    return None;
  }
  u32::from_str_radix(hex, 16).ok()
}

#[inline]
fn plot(buffer: &mut [u32], width: usize, height: usize, x: isize, y: isize, colour: u32, alpha: f32) {
  if x >= 0 && x < width as isize && y >= 0 && y < height as isize {
    let idx = y as usize * width + x as usize;
    buffer[idx] = blend(buffer[idx], colour, alpha);
  }
}

/// Bresenham line; `thickness` > 1 stamps a square brush at every step.
#[allow(clippy::too_many_arguments)]
pub fn draw_line(
  buffer: &mut [u32],
  width: usize,
  height: usize,
  (x1, y1): (isize, isize),
  (x2, y2): (isize, isize),
  colour: u32,
  alpha: f32,
  thickness: usize,
) {
  let dx = (x2 - x1).abs();
  let dy = (y2 - y1).abs();
  let sx = if x1 < x2 { 1isize } else { -1isize };
  let sy = if y1 < y2 { 1isize } else { -1isize };
  let mut err = dx - dy;

  let mut x = x1;
  let mut y = y1;
  let half = thickness.max(1) as isize / 2;
  let extent = thickness.max(1) as isize;

  loop {
    for oy in 0..extent {
      for ox in 0..extent {
        plot(buffer, width, height, x + ox - half, y + oy - half, colour, alpha);
      }
    }

    if x == x2 && y == y2 {
      break;
    }

    let e2 = 2 * err;
    if e2 > -dy {
      err -= dy;
      x += sx;
    }
    if e2 < dx {
      err += dx;
      y += sy;
    }
  }
}

#[allow(clippy::too_many_arguments)]
pub fn fill_rect(
  buffer: &mut [u32],
  width: usize,
  height: usize,
  (x, y): (isize, isize),
  w: usize,
  h: usize,
  colour: u32,
  alpha: f32,
) {
  let extent = |v: usize| v.min(isize::MAX as usize) as isize;
  let x0 = x.clamp(0, width as isize) as usize;
  let y0 = y.clamp(0, height as isize) as usize;
  let x1 = x.saturating_add(extent(w)).clamp(0, width as isize) as usize;
  let y1 = y.saturating_add(extent(h)).clamp(0, height as isize) as usize;
  if x0 >= x1 || y0 >= y1 {
    return;
  }

  for py in y0..y1 {
    let row = &mut buffer[py * width..(py + 1) * width];
    for px in &mut row[x0..x1] {
      *px = blend(*px, colour, alpha);
    }
  }
}

/// Filled disc centred on (cx, cy).
pub fn fill_circle(
  buffer: &mut [u32],
  width: usize,
  height: usize,
  (cx, cy): (f32, f32),
  radius: f32,
  colour: u32,
  alpha: f32,
) {
  if radius <= 0.0 {
    return;
  }
  let r2 = radius * radius;
  let y0 = (cy - radius).floor() as isize;
  let y1 = (cy + radius).ceil() as isize;
  let x0 = (cx - radius).floor() as isize;
  let x1 = (cx + radius).ceil() as isize;

  for y in y0..=y1 {
    for x in x0..=x1 {
      let fx = x as f32 + 0.5 - cx;
      let fy = y as f32 + 0.5 - cy;
      if fx * fx + fy * fy <= r2 {
        plot(buffer, width, height, x, y, colour, alpha);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_rect_clips_to_the_buffer() {
    let mut buffer = vec![0u32; 10 * 4];
    // entirely right of and below the surface
    fill_rect(&mut buffer, 10, 4, (20, 1), 3, 2, 0xFFFFFF, 1.0);
    fill_rect(&mut buffer, 10, 4, (1, 9), 3, 2, 0xFFFFFF, 1.0);
    fill_rect(&mut buffer, 10, 4, (-8, -8), 3, 3, 0xFFFFFF, 1.0);
    assert!(buffer.iter().all(|&p| p == 0));

    fill_rect(&mut buffer, 10, 4, (8, 3), usize::MAX, usize::MAX, 0xFFFFFF, 1.0);
    assert_eq!(buffer.iter().filter(|&&p| p != 0).count(), 2);
  }

  #[test]
  fn blend_extremes_return_endpoints() {
    assert_eq!(blend(0x000000, 0xFFFFFF, 0.0), 0x000000);
    assert_eq!(blend(0x000000, 0xFFFFFF, 1.0), 0xFFFFFF);
    assert_eq!(blend(0x000000, 0xFF0000, 0.5), 0x7F0000);
  }

  #[test]
  fn repeated_fades_reach_black() {
    let mut px = 0x00050505;
    for _ in 0..64 {
      px = blend(px, 0, 0.1);
    }
    assert_eq!(px, 0);
  }

  #[test]
  fn add_saturates() {
    assert_eq!(add(0xF0F0F0, 0xFFFFFF, 1.0), 0xFFFFFF);
    assert_eq!(add(0x000000, 0x0000FF, 0.0), 0x000000);
  }

  #[test]
  fn parse_hex_accepts_hash_prefix() {
    assert_eq!(parse_hex("#00FF00"), Some(0x00FF00));
    assert_eq!(parse_hex("ffd700"), Some(0xFFD700));
    assert_eq!(parse_hex("#fff"), None);
  }

  #[test]
  fn line_clips_outside_buffer() {
    let mut buf = vec![0u32; 16];
    draw_line(&mut buf, 4, 4, (-5, 0), (10, 0), 0xFFFFFF, 1.0, 1);
    assert_eq!(&buf[..4], &[0xFFFFFF; 4]);
    assert!(buf[4..].iter().all(|&p| p == 0));
  }

  #[test]
  fn circle_covers_centre_only_when_small() {
    let mut buf = vec![0u32; 100];
    fill_circle(&mut buf, 10, 10, (5.0, 5.0), 1.0, 0x123456, 1.0);
    assert_eq!(buf[5 * 10 + 5], 0x123456);
    assert_eq!(buf[0], 0);
  }
}
