//! Podium Client
//!
//! Client-side real-time interaction layer for live-talk audience
//! sessions: anonymous per-device identity, nickname claims from a fixed
//! icon catalog, and shared state (roster, answer boards, tallies) kept
//! current over a server-sent-event push channel.
//!
//! # Architecture
//!
//! - **IdentityStore**: persistent anonymous UUID v4 + cached nickname
//! - **Transport**: one JSON call contract over HTTP with a bounded timeout
//! - **EventChannel**: the single shared push subscription per session
//! - **NicknameRegistry**: claim lifecycle + roster reconciliation
//!
//! All cross-device coordination is mediated by the backend; every local
//! write is provisional until acknowledged or reconciled via push.
//!
//! # Usage
//!
//! ```ignore
//! let config = ClientConfig::new("http://localhost:3000/".parse()?);
//! let client = Client::connect(config)?;
//!
//! let store = IdentityStore::open("podium.json");
//! let mut registry = client.registry(store, DEFAULT_CATALOG);
//! registry.load().await?;
//! registry.claim("Fisch").await?;
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod identity;
pub mod registry;
pub mod sse;
pub mod transport;
pub mod wire;

pub use channel::{ChannelStatus, EventChannel, Subscription};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use identity::{IdentityStore, UNCLAIMED};
pub use registry::{IconState, NicknameRegistry, SessionState, DEFAULT_CATALOG};
pub use reqwest::Url;
pub use transport::Transport;

use std::sync::Arc;

/// Explicitly constructed client context: owns the shared transport and
/// the one push subscription for a session.
///
/// Tests and embedders instantiate as many isolated contexts as they
/// want; nothing here is process-global.
pub struct Client {
    transport: Arc<Transport>,
    channel: EventChannel,
}

impl Client {
    /// Build the transport and open the push subscription.
    ///
    /// Must be called within a tokio runtime; the channel spawns its
    /// reader task immediately.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(Transport::new(&config)?);
        let channel = EventChannel::connect(&config);
        Ok(Self { transport, channel })
    }

    /// Shared transport handle.
    pub fn transport(&self) -> Arc<Transport> {
        Arc::clone(&self.transport)
    }

    /// The shared push channel.
    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    /// Construct a nickname registry bound to this context.
    pub fn registry(&self, store: IdentityStore, catalog: &[&str]) -> NicknameRegistry {
        NicknameRegistry::new(self.transport(), store, catalog)
    }
}
