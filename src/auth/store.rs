//! Auth state store
//!
//! Remembers the logged-in profile across restarts for up to 30 days.
//! The in-memory session slot takes precedence over the persisted slot
//! within one process; on restart the persisted record is the sole source
//! of truth. Storage failures degrade to "not logged in" — they never
//! interrupt the chat flow.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::Result;

/// How long a committed login remains valid, in days.
const RETENTION_DAYS: i64 = 30;

/// User profile obtained from the identity provider at login.
///
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable subject identifier assigned by the provider.
    pub id: String,

    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub given_name: String,

    #[serde(default)]
    pub family_name: String,

    /// Avatar URL.
    #[serde(default)]
    pub picture: String,
}

/// A profile plus its logical expiry, as persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRecord {
    pub profile: Profile,
    pub expiry: DateTime<Utc>,
}

impl AuthRecord {
    /// Create a record expiring after the retention window.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            expiry: Utc::now() + Duration::days(RETENTION_DAYS),
        }
    }

    /// A record past its expiry is treated as absent.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expiry
    }
}

/// Persistent slot backing the auth store.
pub trait AuthSlot: Send + Sync {
    fn read(&self) -> Result<Option<AuthRecord>>;
    fn write(&self, record: &AuthRecord) -> Result<()>;
    fn delete(&self) -> Result<()>;
}

/// File-backed slot under `~/.amity/auth.json`.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new() -> Self {
        Self {
            path: crate::config::config_dir().join("auth.json"),
        }
    }

    /// Slot at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for FileSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSlot for FileSlot {
    fn read(&self) -> Result<Option<AuthRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let record: AuthRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    fn write(&self, record: &AuthRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, content)?;

        // Restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    fn delete(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Auth state store: in-memory session slot plus a persistent slot.
pub struct AuthStore {
    session: Option<AuthRecord>,
    slot: Box<dyn AuthSlot>,
}

impl AuthStore {
    /// Create a store over the given persistent slot.
    pub fn new(slot: Box<dyn AuthSlot>) -> Self {
        Self {
            session: None,
            slot,
        }
    }

    /// Create a store over the default file slot.
    pub fn open() -> Self {
        Self::new(Box::new(FileSlot::new()))
    }

    /// Return the logged-in profile, if any.
    ///
    /// Checks the in-memory slot first, then the persisted record, which
    /// is promoted into memory when valid. Expired records are treated as
    /// absent in both slots. No side effects when absent.
    pub fn resolve(&mut self) -> Option<Profile> {
        if let Some(record) = &self.session {
            if !record.is_expired() {
                return Some(record.profile.clone());
            }
            self.session = None;
        }

        match self.slot.read() {
            Ok(Some(record)) if !record.is_expired() => {
                debug!("Promoting persisted auth record for {}", record.profile.email);
                let profile = record.profile.clone();
                self.session = Some(record);
                Some(profile)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Auth slot read failed, treating as logged out: {e}");
                None
            }
        }
    }

    /// Remember a profile for the retention window.
    ///
    /// Must be called only after a successful provider round trip. A slot
    /// write failure is non-fatal: the session stays logged in, it just
    /// won't survive a restart.
    pub fn commit(&mut self, profile: Profile) {
        let record = AuthRecord::new(profile);

        if let Err(e) = self.slot.write(&record) {
            warn!("Auth slot write failed, login will not persist: {e}");
        }
        self.session = Some(record);
    }

    /// Forget the login in both slots. Idempotent.
    pub fn clear(&mut self) {
        self.session = None;
        if let Err(e) = self.slot.delete() {
            warn!("Auth slot delete failed: {e}");
        }
    }
}
