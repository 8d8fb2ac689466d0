use std::sync::Arc;

use tokio::sync::watch;

/// Cancellation flag tied to a layer instance.
///
/// Telemetry started by the layer races against [`Lifetime::ended`], so a
/// destroyed layer never sees late results land.
#[derive(Clone)]
pub struct Lifetime {
  tx: Arc<watch::Sender<bool>>,
}

impl Default for Lifetime {
  fn default() -> Self {
    Self::new()
  }
}

impl Lifetime {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(false);
    Self { tx: Arc::new(tx) }
  }

  pub fn end(&self) {
    self.tx.send_replace(true);
  }

  pub fn is_ended(&self) -> bool {
    *self.tx.borrow()
  }

  /// Resolves once [`Lifetime::end`] has been called.
  pub async fn ended(&self) {
    let mut rx = self.tx.subscribe();
    let _ = rx.wait_for(|ended| *ended).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn ended_resolves_after_end() {
    let lifetime = Lifetime::new();
    let waiter = lifetime.clone();
    let task = tokio::spawn(async move { waiter.ended().await });
    tokio::task::yield_now().await;
    assert!(!lifetime.is_ended());
    lifetime.end();
    tokio::time::timeout(Duration::from_secs(1), task)
      .await
      .expect("ended() should resolve")
      .expect("task");
    assert!(lifetime.is_ended());
  }

  #[tokio::test]
  async fn ended_is_immediate_when_already_over() {
    let lifetime = Lifetime::new();
    lifetime.end();
    tokio::time::timeout(Duration::from_millis(100), lifetime.ended())
      .await
      .expect("already ended");
  }
}
