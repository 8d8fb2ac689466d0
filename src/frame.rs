/// Handle of a requested frame, only good for cancelling it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHandle(u64);

/// Host-driven stand-in for `requestAnimationFrame`.
///
/// At most one frame is pending; requesting again replaces it. The host calls
/// [`FrameScheduler::take_pending`] once per display refresh and renders only
/// when it gets a handle back.
#[derive(Default)]
pub struct FrameScheduler {
  next_id: u64,
  pending: Option<FrameHandle>,
  fired: u64,
}

impl FrameScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn request(&mut self) -> FrameHandle {
    self.next_id += 1;
    let handle = FrameHandle(self.next_id);
    self.pending = Some(handle);
    handle
  }

  /// Cancels `handle` if it is still the pending frame.
  pub fn cancel(&mut self, handle: FrameHandle) -> bool {
    if self.pending == Some(handle) {
      self.pending = None;
      true
    } else {
      false
    }
  }

  pub fn take_pending(&mut self) -> Option<FrameHandle> {
    let handle = self.pending.take();
    if handle.is_some() {
      self.fired += 1;
    }
    handle
  }

  pub fn is_pending(&self) -> bool {
    self.pending.is_some()
  }

  pub fn frames_fired(&self) -> u64 {
    self.fired
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stale_handles_do_not_cancel() {
    let mut frames = FrameScheduler::new();
    let first = frames.request();
    let second = frames.request();
    assert!(!frames.cancel(first));
    assert!(frames.is_pending());
    assert!(frames.cancel(second));
    assert_eq!(frames.take_pending(), None);
    assert_eq!(frames.frames_fired(), 0);
  }

  #[test]
  fn pending_frame_fires_once() {
    let mut frames = FrameScheduler::new();
    let handle = frames.request();
    assert_eq!(frames.take_pending(), Some(handle));
    assert_eq!(frames.take_pending(), None);
    assert_eq!(frames.frames_fired(), 1);
  }
}
