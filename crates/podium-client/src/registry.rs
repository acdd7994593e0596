//! Nickname registration and roster reconciliation.
//!
//! Session lifecycle per device:
//!
//! ```text
//! Unidentified → Identified → Unclaimed → Claimed
//! ```
//!
//! The transition into `Claimed` is terminal for the session; there is no
//! unclaim operation. The roster (set of taken names across all devices)
//! is fetched in full once on load and kept current by `NICKNAME` push
//! events; it only ever grows, so applying a snapshot twice is a no-op.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identity::IdentityStore;
use crate::transport::Transport;
use crate::wire::{ClaimRequest, ClaimResponse, NicknameLookup, Roster};

/// Default icon catalog rendered by the slide deck.
pub const DEFAULT_CATALOG: &[&str] = &[
    "Ameise",
    "Biene",
    "Eule",
    "Fisch",
    "Frosch",
    "Fuchs",
    "Hase",
    "Igel",
    "Katze",
    "Kranich",
    "Pinguin",
    "Schildkroete",
];

/// Where this device stands in the registration lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No identity loaded yet.
    Unidentified,
    /// Identity loaded, server not consulted.
    Identified(Uuid),
    /// Server has no nickname on record for this identity.
    Unclaimed(Uuid),
    /// Nickname bound to this identity; terminal for the session.
    Claimed {
        identity: Uuid,
        nickname: String,
    },
}

impl SessionState {
    /// The claimed nickname, if any.
    pub fn nickname(&self) -> Option<&str> {
        match self {
            SessionState::Claimed { nickname, .. } => Some(nickname),
            _ => None,
        }
    }

    /// The loaded identity, if any.
    pub fn identity(&self) -> Option<Uuid> {
        match self {
            SessionState::Unidentified => None,
            SessionState::Identified(id) | SessionState::Unclaimed(id) => Some(*id),
            SessionState::Claimed { identity, .. } => Some(*identity),
        }
    }
}

/// Render model for one catalog icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconState {
    /// Display name of the icon.
    pub name: String,
    /// Taken icons render dimmed and non-interactive, regardless of
    /// whether this session owns the claim.
    pub available: bool,
}

/// Client-side view of the nickname registry.
pub struct NicknameRegistry {
    transport: Arc<Transport>,
    store: IdentityStore,
    catalog: Vec<String>,
    roster: HashSet<String>,
    state: SessionState,
}

impl NicknameRegistry {
    /// Build a registry over the given transport, identity store and
    /// fixed icon catalog.
    pub fn new(transport: Arc<Transport>, store: IdentityStore, catalog: &[&str]) -> Self {
        Self {
            transport,
            store,
            catalog: catalog.iter().map(|name| (*name).to_owned()).collect(),
            roster: HashSet::new(),
            state: SessionState::Unidentified,
        }
    }

    /// Load the identity, reconcile the nickname with the server, and
    /// fetch the full roster once.
    ///
    /// The server is authoritative for the nickname: a server-side claim
    /// overwrites the local cache, and a missing server record clears a
    /// stale cached name. A lookup response without the expected field is
    /// logged and treated as unclaimed. After `load`, push events keep
    /// the roster current; no re-polling happens.
    pub async fn load(&mut self) -> Result<()> {
        let identity = self.store.get_or_create_identity()?;
        self.state = SessionState::Identified(identity);

        let path = format!("nickname/{identity}");
        let lookup: NicknameLookup = match self.transport.get_json(&path).await {
            Ok(lookup) => lookup,
            Err(Error::MalformedResponse(reason)) => {
                tracing::warn!(%reason, "nickname lookup undecodable, treating as unclaimed");
                NicknameLookup { nickname: None }
            }
            Err(err) => return Err(err),
        };

        match lookup.nickname {
            Some(nickname) => {
                self.store.set_nickname(&nickname)?;
                self.roster.insert(nickname.clone());
                self.state = SessionState::Claimed { identity, nickname };
            }
            None => {
                if self.store.local_nickname().is_some() {
                    tracing::debug!("clearing stale cached nickname");
                    self.store.clear_nickname()?;
                }
                self.state = SessionState::Unclaimed(identity);
            }
        }

        let roster: Roster = self.transport.get_json("nicknames").await?;
        self.apply_roster(&roster.nicknames);
        Ok(())
    }

    /// Claim one catalog icon for this identity.
    ///
    /// Preconditions are checked before any network traffic: the session
    /// must be loaded and unclaimed, and the icon must exist in the
    /// catalog and not already be on the roster (a taken icon is
    /// non-interactive; re-clicking it must not issue a request).
    ///
    /// A backend rejection surfaces as [`Error::RemoteRejected`] and
    /// leaves the session unclaimed. Nothing retries automatically; the
    /// user picks again.
    pub async fn claim(&mut self, name: &str) -> Result<()> {
        let identity = match &self.state {
            SessionState::Unclaimed(identity) => *identity,
            SessionState::Claimed { .. } => {
                return Err(Error::LocalPreconditionFailed(
                    "nickname already claimed for this session".to_owned(),
                ))
            }
            _ => {
                return Err(Error::LocalPreconditionFailed(
                    "registry not loaded".to_owned(),
                ))
            }
        };
        if !self.catalog.iter().any(|icon| icon == name) {
            return Err(Error::LocalPreconditionFailed(format!(
                "{name} is not in the icon catalog"
            )));
        }
        if self.roster.contains(name) {
            return Err(Error::LocalPreconditionFailed(format!(
                "{name} is already taken"
            )));
        }

        let uuid = identity.to_string();
        let request = ClaimRequest { user: name, uuid: &uuid };
        let response: ClaimResponse = self.transport.post_json("nickname", &request).await?;
        if !response.is_success() {
            tracing::info!(icon = name, status = %response.status, "claim rejected");
            return Err(Error::RemoteRejected {
                status: 200,
                message: format!("claim rejected: {}", response.status),
            });
        }

        self.store.set_nickname(name)?;
        self.roster.insert(name.to_owned());
        self.state = SessionState::Claimed { identity, nickname: name.to_owned() };
        tracing::info!(icon = name, "nickname claimed");
        Ok(())
    }

    /// Merge a roster snapshot (initial fetch or push event). Names are
    /// never removed; re-announcing a taken name is a no-op.
    pub fn apply_roster(&mut self, names: &[String]) {
        for name in names {
            self.roster.insert(name.clone());
        }
    }

    /// Apply the payload of a `NICKNAME` push event.
    pub fn apply_roster_event(&mut self, payload: &serde_json::Value) {
        match serde_json::from_value::<Roster>(payload.clone()) {
            Ok(roster) => self.apply_roster(&roster.nicknames),
            Err(err) => tracing::warn!(%err, "undecodable roster event"),
        }
    }

    /// Render model for the icon picker.
    pub fn icons(&self) -> Vec<IconState> {
        self.catalog
            .iter()
            .map(|name| IconState {
                name: name.clone(),
                available: !self.roster.contains(name),
            })
            .collect()
    }

    /// Current session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The claimed nickname, if any.
    pub fn nickname(&self) -> Option<&str> {
        self.state.nickname()
    }

    /// Set of currently taken names.
    pub fn roster(&self) -> &HashSet<String> {
        &self.roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::json;

    fn registry() -> NicknameRegistry {
        let config = ClientConfig::new("http://127.0.0.1:1/".parse().unwrap());
        let transport = Arc::new(Transport::new(&config).unwrap());
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::open(dir.path().join("podium.json"));
        NicknameRegistry::new(transport, store, DEFAULT_CATALOG)
    }

    #[test]
    fn roster_application_is_idempotent() {
        let mut registry = registry();
        registry.apply_roster(&["Fisch".to_owned(), "Ameise".to_owned()]);
        registry.apply_roster(&["Fisch".to_owned()]);
        assert_eq!(registry.roster().len(), 2);
    }

    #[test]
    fn roster_event_payload_is_decoded() {
        let mut registry = registry();
        registry.apply_roster_event(&json!({ "nicknames": ["Eule"] }));
        assert!(registry.roster().contains("Eule"));

        // Garbage payloads are logged, not applied.
        registry.apply_roster_event(&json!({ "nicknames": 42 }));
        assert_eq!(registry.roster().len(), 1);
    }

    #[test]
    fn taken_icons_are_unavailable() {
        let mut registry = registry();
        registry.apply_roster(&["Fisch".to_owned()]);

        let icons = registry.icons();
        let fisch = icons.iter().find(|icon| icon.name == "Fisch").unwrap();
        assert!(!fisch.available);
        let ameise = icons.iter().find(|icon| icon.name == "Ameise").unwrap();
        assert!(ameise.available);
    }

    #[tokio::test]
    async fn claim_requires_a_loaded_session() {
        let mut registry = registry();
        let err = registry.claim("Fisch").await.unwrap_err();
        assert!(matches!(err, Error::LocalPreconditionFailed(_)));
        // Precondition failures never touch the network.
        assert_eq!(registry.transport.requests_sent(), 0);
    }

    #[tokio::test]
    async fn taken_icon_is_rejected_without_network() {
        let mut registry = registry();
        registry.state = SessionState::Unclaimed(Uuid::new_v4());
        registry.apply_roster(&["Fisch".to_owned()]);

        let err = registry.claim("Fisch").await.unwrap_err();
        assert!(matches!(err, Error::LocalPreconditionFailed(_)));
        assert_eq!(registry.transport.requests_sent(), 0);
        assert!(matches!(registry.state(), SessionState::Unclaimed(_)));
    }

    #[tokio::test]
    async fn unknown_icon_is_rejected_without_network() {
        let mut registry = registry();
        registry.state = SessionState::Unclaimed(Uuid::new_v4());

        let err = registry.claim("Drache").await.unwrap_err();
        assert!(matches!(err, Error::LocalPreconditionFailed(_)));
        assert_eq!(registry.transport.requests_sent(), 0);
    }

    #[test]
    fn session_state_accessors() {
        let id = Uuid::new_v4();
        assert_eq!(SessionState::Unidentified.identity(), None);
        assert_eq!(SessionState::Unclaimed(id).identity(), Some(id));
        let claimed = SessionState::Claimed { identity: id, nickname: "Igel".to_owned() };
        assert_eq!(claimed.nickname(), Some("Igel"));
        assert_eq!(claimed.identity(), Some(id));
    }
}
