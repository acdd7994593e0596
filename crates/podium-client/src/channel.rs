//! Shared push-event subscription over server-sent events.
//!
//! One channel per client session, constructed explicitly and handed to
//! whichever widgets need it; there is no process-wide singleton. Widgets
//! subscribe additively by event name and may rely on in-order delivery
//! per name: a single dispatch loop forwards events in arrival order.
//!
//! The subscription is kept alive by an explicit state machine
//! (`Connected ⇄ Reconnecting`) with bounded exponential backoff, and a
//! liveness watchdog reports `Degraded` when the wire has been silent for
//! longer than the configured keep-alive threshold.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::ClientConfig;
use crate::sse::{SseEvent, SseParser};

/// Health of the push channel as observed by widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Subscription is open and events are flowing.
    Connected,
    /// Subscription dropped; reconnecting with backoff.
    Reconnecting,
    /// Nothing (keep-alives included) within the liveness threshold.
    Degraded,
}

type Subscribers = Vec<(u64, mpsc::UnboundedSender<serde_json::Value>)>;
type Registry = Arc<Mutex<HashMap<String, Subscribers>>>;

/// A single long-lived subscription to the backend's `events` stream.
pub struct EventChannel {
    registry: Registry,
    status_rx: watch::Receiver<ChannelStatus>,
    next_id: AtomicU64,
    task: JoinHandle<()>,
}

impl EventChannel {
    /// Open the push subscription described by the configuration.
    ///
    /// The connection is maintained by a background task for the lifetime
    /// of the channel; dropping the channel tears it down.
    pub fn connect(config: &ClientConfig) -> Self {
        let registry: Registry = Arc::default();
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Reconnecting);
        let task = tokio::spawn(run_channel(config.clone(), Arc::clone(&registry), status_tx));
        Self { registry, status_rx, next_id: AtomicU64::new(0), task }
    }

    /// Subscribe to one named event type.
    ///
    /// Any number of widgets may subscribe to the same name. Dropping the
    /// returned handle unsubscribes.
    pub fn subscribe(&self, event: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_owned())
            .or_default()
            .push((id, tx));
        Subscription {
            event: event.to_owned(),
            id,
            rx,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Watch the channel health.
    pub fn status(&self) -> watch::Receiver<ChannelStatus> {
        self.status_rx.clone()
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.task.abort();
        // Dropping the senders ends every pending `recv()` with `None`;
        // widgets must never block on a channel that no longer exists.
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Handle for one named-event subscription.
pub struct Subscription {
    event: String,
    id: u64,
    rx: mpsc::UnboundedReceiver<serde_json::Value>,
    registry: Registry,
}

impl Subscription {
    /// Next payload for this event name; `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<serde_json::Value> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<serde_json::Value> {
        self.rx.try_recv().ok()
    }

    /// Event name this subscription listens to.
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(subs) = registry.get_mut(&self.event) {
            subs.retain(|(id, _)| *id != self.id);
        }
    }
}

async fn run_channel(
    config: ClientConfig,
    registry: Registry,
    status: watch::Sender<ChannelStatus>,
) {
    let endpoint = match config.base_url.join("events") {
        Ok(endpoint) => endpoint,
        Err(err) => {
            tracing::error!(base = %config.base_url, %err, "cannot form events endpoint");
            return;
        }
    };
    // The stream client carries no request timeout; the subscription is
    // meant to stay open indefinitely.
    let http = match reqwest::Client::builder().build() {
        Ok(http) => http,
        Err(err) => {
            tracing::error!(%err, "cannot build event stream client");
            return;
        }
    };
    let mut backoff = config.reconnect_initial;

    loop {
        let request = http
            .get(endpoint.clone())
            .header("Accept", "text/event-stream");
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(endpoint = %endpoint, "event subscription open");
                let _ = status.send(ChannelStatus::Connected);
                backoff = config.reconnect_initial;
                read_stream(response, &registry, &status, &config).await;
                tracing::debug!("event subscription lost");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "event subscription refused");
            }
            Err(err) => {
                tracing::warn!(%err, "event subscription failed");
            }
        }
        let _ = status.send(ChannelStatus::Reconnecting);
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(config.reconnect_max);
    }
}

/// Pump one open subscription until it ends, dispatching decoded events
/// and arming the liveness watchdog on every received chunk.
async fn read_stream(
    response: reqwest::Response,
    registry: &Registry,
    status: &watch::Sender<ChannelStatus>,
    config: &ClientConfig,
) {
    let mut stream = Box::pin(response.bytes_stream());
    let mut parser = SseParser::new();
    let mut deadline = Instant::now() + config.keepalive_timeout;

    loop {
        tokio::select! {
            chunk = stream.next() => {
                let bytes = match chunk {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(err)) => {
                        tracing::warn!(%err, "event stream error");
                        return;
                    }
                    None => return,
                };
                deadline = Instant::now() + config.keepalive_timeout;
                if *status.borrow() == ChannelStatus::Degraded {
                    let _ = status.send(ChannelStatus::Connected);
                }
                for event in parser.push(&bytes) {
                    if event.name == config.keepalive_event {
                        tracing::trace!("keep-alive");
                    }
                    dispatch(registry, &event);
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                tracing::warn!(
                    threshold = ?config.keepalive_timeout,
                    "no keep-alive within liveness threshold"
                );
                let _ = status.send(ChannelStatus::Degraded);
                deadline = Instant::now() + config.keepalive_timeout;
            }
        }
    }
}

fn dispatch(registry: &Registry, event: &SseEvent) {
    let payload: serde_json::Value = if event.data.is_empty() {
        serde_json::Value::Null
    } else {
        match serde_json::from_str(&event.data) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(event = %event.name, %err, "undecodable event payload");
                return;
            }
        }
    };
    let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(subs) = registry.get_mut(&event.name) {
        // Receivers that went away are pruned as a side effect.
        subs.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
    }
}
