use std::f32::consts::TAU;

use rand::Rng;

use crate::graphics::Canvas;
use crate::visualisation::palette::ColorScheme;

/// Mean byte across all bins.
pub fn mean_amplitude(data: &[u8]) -> f32 {
  if data.is_empty() {
    return 0.0;
  }
  data.iter().map(|&v| v as f32).sum::<f32>() / data.len() as f32
}

/// Stateless burst around the centre: `mean / 10` dots, each at a random
/// angle within `mean * 2` of the centre, 1-4 px, random palette colour.
/// Returns how many were drawn.
pub fn draw_particle_burst<R: Rng + ?Sized>(
  canvas: &mut Canvas,
  data: &[u8],
  scheme: ColorScheme,
  rng: &mut R,
) -> usize {
  let mean = mean_amplitude(data);
  let count = (mean / 10.0) as usize;
  let (cx, cy) = canvas.centre();
  let colours = scheme.colours();

  for _ in 0..count {
    let angle = rng.random::<f32>() * TAU;
    let distance = rng.random::<f32>() * mean * 2.0;
    let size = rng.random_range(1.0..4.0);
    let colour = colours[rng.random_range(0..colours.len())];
    canvas.fill_circle(
      (cx + angle.cos() * distance, cy + angle.sin() * distance),
      size,
      colour,
    );
  }
  count
}

struct Particle {
  x: f32,
  y: f32,
  vx: f32,
  vy: f32,
  size: f32,
  frequency: f32,
  phase: f32,
}

/// Drifting particles that persist across frames, wrap at the edges and
/// speed up and swell with the audio level.
pub struct ParticleField {
  particles: Vec<Particle>,
}

impl ParticleField {
  pub const DEFAULT_COUNT: usize = 100;

  pub fn new<R: Rng + ?Sized>(count: usize, width: usize, height: usize, rng: &mut R) -> Self {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let particles = (0..count)
      .map(|_| Particle {
        x: rng.random::<f32>() * w,
        y: rng.random::<f32>() * h,
        vx: (rng.random::<f32>() - 0.5) * 2.0,
        vy: (rng.random::<f32>() - 0.5) * 2.0,
        size: rng.random::<f32>() * 4.0 + 1.0,
        frequency: rng.random::<f32>() * 0.02 + 0.01,
        phase: rng.random::<f32>() * TAU,
      })
      .collect();
    Self { particles }
  }

  pub fn len(&self) -> usize {
    self.particles.len()
  }

  pub fn is_empty(&self) -> bool {
    self.particles.is_empty()
  }

  /// Advances one frame; `level` is the mean amplitude in [0,1].
  pub fn step(&mut self, width: usize, height: usize, level: f32) {
    let (w, h) = (width as f32, height as f32);
    let speed = 1.0 + level * 2.0;
    for p in &mut self.particles {
      p.x += p.vx * speed;
      p.y += p.vy * speed;

      if p.x < 0.0 {
        p.x = w;
      } else if p.x > w {
        p.x = 0.0;
      }
      if p.y < 0.0 {
        p.y = h;
      } else if p.y > h {
        p.y = 0.0;
      }
    }
  }

  pub fn draw(&self, canvas: &mut Canvas, level: f32, time: f32, scheme: ColorScheme) {
    let previous = canvas.global_alpha();
    canvas.set_global_alpha(0.6 + level * 0.4);
    for p in &self.particles {
      let size = p.size * (1.0 + (time * p.frequency + p.phase).sin() * 0.5 + level * 2.0);
      canvas.fill_circle((p.x, p.y), size, scheme.primary());
    }
    canvas.set_global_alpha(previous);
  }

  pub fn positions(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
    self.particles.iter().map(|p| (p.x, p.y))
  }
}
