//! Authenticated session persistence.
//!
//! A [`SessionStore`] keeps at most one session. [`CachedSessionStore`] puts an
//! explicit in-memory cache in front of another store; the cache is dropped on
//! `save`, `clear`, `invalidate`, and when the cached token has expired.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FrotaError, Result};

/// Token and identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub company_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        token: impl Into<String>,
        user_id: impl Into<String>,
        company_id: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            company_id: company_id.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sessions without an expiry never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Storage for the current session.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

fn poisoned() -> FrotaError {
    FrotaError::Session("session lock poisoned".to_string())
}

/// Session held in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> {
        let guard = self.session.lock().map_err(|_| poisoned())?;
        Ok(guard.clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        let mut guard = self.session.lock().map_err(|_| poisoned())?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.session.lock().map_err(|_| poisoned())?;
        *guard = None;
        Ok(())
    }
}

/// Session stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let session = serde_json::from_str(&content).map_err(|e| {
            FrotaError::Session(format!("invalid session file {}: {}", self.path.display(), e))
        })?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-memory cache in front of another store.
#[derive(Debug)]
pub struct CachedSessionStore<S> {
    inner: S,
    cache: Mutex<Option<Session>>,
}

impl<S: SessionStore> CachedSessionStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop the cached session; the next `load` reads the inner store.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cache.lock() {
            *guard = None;
        }
    }
}

impl<S: SessionStore> SessionStore for CachedSessionStore<S> {
    /// Cached session if still valid, else the inner store's. Expired
    /// sessions load as `None`.
    fn load(&self) -> Result<Option<Session>> {
        let now = Utc::now();
        let mut guard = self.cache.lock().map_err(|_| poisoned())?;

        if let Some(session) = guard.as_ref() {
            if !session.is_expired(now) {
                return Ok(Some(session.clone()));
            }
            debug!("Cached session expired");
            *guard = None;
        }

        let loaded = self.inner.load()?.filter(|s| !s.is_expired(now));
        *guard = loaded.clone();
        Ok(loaded)
    }

    fn save(&self, session: &Session) -> Result<()> {
        self.invalidate();
        self.inner.save(session)?;

        let mut guard = self.cache.lock().map_err(|_| poisoned())?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.invalidate();
        self.inner.clear()
    }
}
