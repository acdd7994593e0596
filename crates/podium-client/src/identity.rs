//! Per-device identity and nickname persistence.
//!
//! One small JSON document owned by the embedding application: the
//! anonymous identity (a UUID v4 minted on first use) and the last
//! successfully claimed nickname. The identity is never regenerated once
//! a valid value has been stored, and it is never sent anywhere except as
//! a field value to the backend.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::{Uuid, Variant};

use crate::error::Result;

/// Sentinel stored while no nickname is claimed.
pub const UNCLAIMED: &str = "-";

#[derive(Debug, Serialize, Deserialize)]
struct Persisted {
    identity: String,
    nickname: String,
}

impl Default for Persisted {
    fn default() -> Self {
        Self { identity: String::new(), nickname: UNCLAIMED.to_owned() }
    }
}

/// File-backed store for the anonymous identity and the claimed nickname.
///
/// No network access happens here; reconciliation with the server is the
/// registry's job.
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    /// Use (or later create) the store file at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Return the persisted identity, minting and persisting a fresh one
    /// if none exists or the stored value does not validate as UUID v4.
    pub fn get_or_create_identity(&self) -> Result<Uuid> {
        let mut doc = self.read();
        if let Some(id) = parse_v4(&doc.identity) {
            return Ok(id);
        }
        if !doc.identity.is_empty() {
            tracing::warn!(stored = %doc.identity, "discarding malformed identity");
        }
        // new_v4 draws from the OS RNG and has no weak fallback.
        let id = Uuid::new_v4();
        doc.identity = id.to_string();
        self.write(&doc)?;
        tracing::debug!(identity = %id, "minted new identity");
        Ok(id)
    }

    /// Last nickname this device successfully claimed, if any.
    ///
    /// May be stale relative to the server; the registry reconciles it
    /// on load.
    pub fn local_nickname(&self) -> Option<String> {
        let doc = self.read();
        if doc.nickname == UNCLAIMED || doc.nickname.is_empty() {
            None
        } else {
            Some(doc.nickname)
        }
    }

    /// Persist a successfully claimed nickname.
    pub fn set_nickname(&self, name: &str) -> Result<()> {
        let mut doc = self.read();
        doc.nickname = name.to_owned();
        self.write(&doc)
    }

    /// Reset the cached nickname to the unclaimed sentinel.
    pub fn clear_nickname(&self) -> Result<()> {
        let mut doc = self.read();
        doc.nickname = UNCLAIMED.to_owned();
        self.write(&doc)
    }

    fn read(&self) -> Persisted {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => Persisted::default(),
        }
    }

    fn write(&self, doc: &Persisted) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(doc).map_err(std::io::Error::from)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

/// Validate a stored identity: parseable, version 4, RFC 4122 variant.
fn parse_v4(value: &str) -> Option<Uuid> {
    let id = Uuid::try_parse(value).ok()?;
    (id.get_version_num() == 4 && id.get_variant() == Variant::RFC4122).then_some(id)
}
