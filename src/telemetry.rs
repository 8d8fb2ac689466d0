use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use serde_json::{Map, Value};

use tracing::{debug, warn};

use crate::error::{Result, VibeLayerError};
use crate::lifetime::Lifetime;

pub const EVENT_TYPE: &str = "vibe_event";

/// Delivery of one JSON document to an endpoint, returning the JSON reply.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn post_json(&self, url: &str, body: &Value) -> Result<Value>;
}

/// Plain `reqwest` POST with `Content-Type: application/json`, no auth.
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder().build()?;
    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
    let resp = self
      .client
      .post(url)
      .json(body)
      .send()
      .await?
      .error_for_status()?;
    Ok(resp.json::<Value>().await?)
  }
}

/// Fire-and-forget event sync for one layer. Cheap to clone; every clone
/// shares the request counter and the owning layer's lifetime.
#[derive(Clone)]
pub struct Telemetry {
  endpoint: Option<String>,
  transport: Option<Arc<dyn Transport>>,
  sent: Arc<AtomicU64>,
  lifetime: Lifetime,
}

impl Telemetry {
  pub fn new(endpoint: Option<String>, transport: Arc<dyn Transport>, lifetime: Lifetime) -> Self {
    Self {
      endpoint: endpoint.filter(|url| !url.trim().is_empty()),
      transport: Some(transport),
      sent: Arc::new(AtomicU64::new(0)),
      lifetime,
    }
  }

  /// A handle that never sends anything.
  pub fn disabled(lifetime: Lifetime) -> Self {
    Self {
      endpoint: None,
      transport: None,
      sent: Arc::new(AtomicU64::new(0)),
      lifetime,
    }
  }

  pub fn endpoint(&self) -> Option<&str> {
    self.endpoint.as_deref()
  }

  /// Requests handed to the transport so far.
  pub fn requests_sent(&self) -> u64 {
    self.sent.load(Ordering::Relaxed)
  }

  /// Posts `event` stamped with type and epoch-millisecond timestamp.
  ///
  /// Returns `Ok(None)` without touching the transport when no endpoint is
  /// configured. Failures are logged and returned; nothing is retried.
  pub async fn sync(&self, event: Value) -> Result<Option<Value>> {
    let (Some(url), Some(transport)) = (self.endpoint.as_deref(), self.transport.as_ref()) else {
      return Ok(None);
    };
    if self.lifetime.is_ended() {
      return Err(VibeLayerError::Destroyed);
    }

    let body = event_body(event, chrono::Utc::now().timestamp_millis());
    self.sent.fetch_add(1, Ordering::Relaxed);
    debug!("syncing vibe event to {}", url);

    let result = tokio::select! {
      r = transport.post_json(url, &body) => r,
      _ = self.lifetime.ended() => Err(VibeLayerError::Destroyed),
    };

    match result {
      Ok(reply) => Ok(Some(reply)),
      Err(e) => {
        warn!("vibe event sync failed - {}", e);
        Err(e)
      }
    }
  }
}

/// `{ "type": "vibe_event", "timestamp": ms, ...event }`; event fields win on
/// collision, non-object payloads land under `"data"`.
pub fn event_body(event: Value, timestamp_ms: i64) -> Value {
  let mut body = Map::new();
  body.insert("type".into(), Value::from(EVENT_TYPE));
  body.insert("timestamp".into(), Value::from(timestamp_ms));
  match event {
    Value::Object(fields) => body.extend(fields),
    Value::Null => {}
    other => {
      body.insert("data".into(), other);
    }
  }
  Value::Object(body)
}

#[cfg(test)]
mod tests {
  use super::*;
  use parking_lot::Mutex;
  use serde_json::json;

  #[derive(Default)]
  struct Recording {
    bodies: Mutex<Vec<(String, Value)>>,
  }

  #[async_trait]
  impl Transport for Recording {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
      self.bodies.lock().push((url.to_string(), body.clone()));
      Ok(json!({ "ok": true }))
    }
  }

  struct Hanging;

  #[async_trait]
  impl Transport for Hanging {
    async fn post_json(&self, _url: &str, _body: &Value) -> Result<Value> {
      std::future::pending().await
    }
  }

  #[test]
  fn body_spreads_object_fields() {
    let body = event_body(json!({ "scene": "intro", "level": 3 }), 1_700_000_000_000);
    assert_eq!(
      body,
      json!({ "type": "vibe_event", "timestamp": 1_700_000_000_000i64, "scene": "intro", "level": 3 })
    );
  }

  #[test]
  fn body_nests_scalars_and_lets_events_override() {
    assert_eq!(event_body(json!(5), 1)["data"], json!(5));
    assert_eq!(event_body(json!({ "type": "custom" }), 1)["type"], json!("custom"));
    assert_eq!(event_body(Value::Null, 1).as_object().map(|o| o.len()), Some(2));
  }

  #[tokio::test]
  async fn no_endpoint_never_reaches_transport() {
    let transport = Arc::new(Recording::default());
    let telemetry = Telemetry::new(None, transport.clone(), Lifetime::new());
    let reply = telemetry.sync(json!({ "a": 1 })).await.expect("sync");
    assert!(reply.is_none());
    assert_eq!(telemetry.requests_sent(), 0);
    assert!(transport.bodies.lock().is_empty());
  }

  #[tokio::test]
  async fn configured_endpoint_posts_stamped_body() {
    let transport = Arc::new(Recording::default());
    let telemetry = Telemetry::new(
      Some("http://localhost:9/vibes".into()),
      transport.clone(),
      Lifetime::new(),
    );
    let reply = telemetry.sync(json!({ "a": 1 })).await.expect("sync");
    assert_eq!(reply, Some(json!({ "ok": true })));

    let bodies = transport.bodies.lock();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].0, "http://localhost:9/vibes");
    assert_eq!(bodies[0].1["type"], json!("vibe_event"));
    assert_eq!(bodies[0].1["a"], json!(1));
    assert!(bodies[0].1["timestamp"].as_i64().is_some());
  }

  #[tokio::test]
  async fn ending_the_lifetime_cancels_in_flight_requests() {
    let lifetime = Lifetime::new();
    let telemetry = Telemetry::new(Some("http://localhost:9".into()), Arc::new(Hanging), lifetime.clone());
    let pending = tokio::spawn({
      let telemetry = telemetry.clone();
      async move { telemetry.sync(json!({})).await }
    });
    tokio::task::yield_now().await;
    lifetime.end();
    let result = pending.await.expect("task");
    assert!(matches!(result, Err(VibeLayerError::Destroyed)));
    assert!(matches!(telemetry.sync(json!({})).await, Err(VibeLayerError::Destroyed)));
  }

  #[tokio::test]
  async fn disabled_handle_resolves_to_none() {
    let telemetry = Telemetry::disabled(Lifetime::new());
    assert!(telemetry.sync(json!({ "a": 1 })).await.expect("sync").is_none());
    assert_eq!(telemetry.requests_sent(), 0);
  }

  #[tokio::test]
  async fn blank_endpoint_counts_as_unset() {
    let telemetry = Telemetry::new(Some("  ".into()), Arc::new(Hanging), Lifetime::new());
    assert!(telemetry.endpoint().is_none());
    assert!(telemetry.sync(json!({})).await.expect("sync").is_none());
  }
}
