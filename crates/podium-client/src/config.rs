//! Client session configuration.

use std::time::Duration;

use reqwest::Url;

/// Configuration for one Podium client session.
///
/// All options are explicit and carry documented defaults; widgets never
/// assemble ad hoc option bags.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base endpoint every relative path resolves against.
    pub base_url: Url,
    /// Bound on every individual HTTP request.
    pub request_timeout: Duration,
    /// Silence threshold on the push channel before it is reported degraded.
    pub keepalive_timeout: Duration,
    /// Initial backoff after the push channel drops.
    pub reconnect_initial: Duration,
    /// Upper bound on the reconnect backoff.
    pub reconnect_max: Duration,
    /// Name of the keep-alive event emitted by the backend.
    pub keepalive_event: String,
}

impl ClientConfig {
    /// Create a configuration for the given base endpoint.
    ///
    /// The base path is normalized to end in `/` so that relative
    /// endpoint names join onto it instead of replacing its last segment.
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            request_timeout: Duration::from_secs(10),
            keepalive_timeout: Duration::from_secs(30),
            reconnect_initial: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(10),
            keepalive_event: "KEEPALIVE".to_owned(),
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the push-channel liveness threshold.
    #[must_use]
    pub fn with_keepalive_timeout(mut self, timeout: Duration) -> Self {
        self.keepalive_timeout = timeout;
        self
    }

    /// Set the reconnect backoff bounds.
    #[must_use]
    pub fn with_reconnect_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_initial = initial;
        self.reconnect_max = max;
        self
    }

    /// Set the keep-alive event name.
    #[must_use]
    pub fn with_keepalive_event(mut self, name: impl Into<String>) -> Self {
        self.keepalive_event = name.into();
        self
    }
}
