use std::sync::Arc;

use parking_lot::Mutex;

use crate::graphics::canvas::SharedCanvas;
use crate::graphics::primitives;

struct ContainerInner {
  width: usize,
  height: usize,
  children: Vec<SharedCanvas>,
}

/// Host mount point for overlay canvases, sized like the hosting window.
pub struct Container {
  inner: Mutex<ContainerInner>,
}

impl Container {
  pub fn new(width: usize, height: usize) -> Arc<Self> {
    Arc::new(Self {
      inner: Mutex::new(ContainerInner {
        width,
        height,
        children: Vec::new(),
      }),
    })
  }

  pub fn size(&self) -> (usize, usize) {
    let inner = self.inner.lock();
    (inner.width, inner.height)
  }

  pub fn resize(&self, width: usize, height: usize) {
    let mut inner = self.inner.lock();
    inner.width = width;
    inner.height = height;
  }

  /// Appends `canvas` as the top-most child; a canvas already mounted is moved to the top.
  pub fn append_child(&self, canvas: &SharedCanvas) {
    let mut inner = self.inner.lock();
    inner.children.retain(|c| !Arc::ptr_eq(c, canvas));
    inner.children.push(Arc::clone(canvas));
  }

  /// Returns whether the canvas was a child.
  pub fn remove_child(&self, canvas: &SharedCanvas) -> bool {
    let mut inner = self.inner.lock();
    let before = inner.children.len();
    inner.children.retain(|c| !Arc::ptr_eq(c, canvas));
    inner.children.len() != before
  }

  pub fn contains(&self, canvas: &SharedCanvas) -> bool {
    self.inner.lock().children.iter().any(|c| Arc::ptr_eq(c, canvas))
  }

  pub fn child_count(&self) -> usize {
    self.inner.lock().children.len()
  }

  /// Adds every visible child onto `dest` weighted by its opacity. Black
  /// canvas pixels contribute nothing, so an overlay reads as transparent
  /// wherever it has not been painted.
  pub fn composite(&self, dest: &mut [u32], width: usize, height: usize) {
    let inner = self.inner.lock();
    for child in &inner.children {
      let canvas = child.lock();
      if !canvas.is_visible() || canvas.opacity() <= 0.0 {
        continue;
      }
      let (cw, ch) = canvas.dimensions();
      let opacity = canvas.opacity();
      let src = canvas.buffer();
      for y in 0..ch.min(height) {
        let src_row = &src[y * cw..y * cw + cw.min(width)];
        let dst_row = &mut dest[y * width..y * width + cw.min(width)];
        for (d, &s) in dst_row.iter_mut().zip(src_row) {
          if s != 0 {
            *d = primitives::add(*d, s, opacity);
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graphics::Canvas;

  #[test]
  fn append_and_remove_track_membership() {
    let container = Container::new(4, 4);
    let canvas = Canvas::shared(4, 4);
    container.append_child(&canvas);
    container.append_child(&canvas);
    assert_eq!(container.child_count(), 1);
    assert!(container.contains(&canvas));
    assert!(container.remove_child(&canvas));
    assert!(!container.contains(&canvas));
    assert!(!container.remove_child(&canvas));
  }

  #[test]
  fn composite_skips_hidden_children_and_weights_by_opacity() {
    let container = Container::new(2, 1);
    let canvas = Canvas::shared(2, 1);
    {
      let mut c = canvas.lock();
      c.fill_rect(0.0, 0.0, 1.0, 1.0, 0x0000FF);
      c.set_opacity(0.5);
    }
    container.append_child(&canvas);

    let mut dest = vec![0u32; 2];
    container.composite(&mut dest, 2, 1);
    assert_eq!(dest, vec![0x00007F, 0]);

    canvas.lock().set_visible(false);
    let mut dest = vec![0u32; 2];
    container.composite(&mut dest, 2, 1);
    assert_eq!(dest, vec![0, 0]);
  }
}
