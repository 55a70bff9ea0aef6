//! Session state shared by the API client
//!
//! Holds the login credentials the interceptors read on every call and
//! persists them as a small JSON document keyed the same way the portal's
//! browser session storage was (`token`, `userid`, `roleid`, `incuserid`).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "token";
/// Storage key for the user id
pub const USER_ID_KEY: &str = "userid";
/// Storage key for the role id
pub const ROLE_ID_KEY: &str = "roleid";
/// Storage key for the incubatee user id
pub const INCUBATEE_USER_ID_KEY: &str = "incuserid";

/// All keys removed when a session is cleared
pub const SESSION_KEYS: [&str; 4] = [TOKEN_KEY, USER_ID_KEY, ROLE_ID_KEY, INCUBATEE_USER_ID_KEY];

/// Login credentials for the current user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "token", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(rename = "userid", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(rename = "roleid", default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,

    #[serde(rename = "incuserid", default, skip_serializing_if = "Option::is_none")]
    pub incubatee_user_id: Option<String>,
}

impl Session {
    pub fn new(token: &str, user_id: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role_id: &str) -> Self {
        self.role_id = Some(role_id.to_string());
        self
    }

    pub fn with_incubatee_user(mut self, incubatee_user_id: &str) -> Self {
        self.incubatee_user_id = Some(incubatee_user_id.to_string());
        self
    }

    /// Look up a value by its storage key
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            TOKEN_KEY => &self.token,
            USER_ID_KEY => &self.user_id,
            ROLE_ID_KEY => &self.role_id,
            INCUBATEE_USER_ID_KEY => &self.incubatee_user_id,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    /// Whether no key holds a value
    pub fn is_empty(&self) -> bool {
        SESSION_KEYS.iter().all(|key| self.get(key).is_none())
    }
}

/// Shared, optionally persisted session handle
///
/// Clones share the same state. Every write goes through the lock, so
/// concurrent logout paths cannot interleave a partial clear.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Session>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// In-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by a JSON file; a missing file means no session
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let session = if path.exists() {
            Self::load(&path)?
        } else {
            Session::default()
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(session)),
            path: Some(path),
        })
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start a session (login)
    pub fn init(&self, session: Session) -> Result<(), SessionError> {
        *self.inner.write() = session;
        self.persist()?;
        tracing::info!("Session initialised");
        Ok(())
    }

    /// Snapshot of the current session
    pub fn read(&self) -> Session {
        self.inner.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().get(TOKEN_KEY).map(str::to_string)
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.read().get(USER_ID_KEY).map(str::to_string)
    }

    pub fn is_active(&self) -> bool {
        self.inner.read().get(TOKEN_KEY).is_some()
    }

    /// Remove every session key. Clearing an empty session is a no-op.
    pub fn clear(&self) -> Result<(), SessionError> {
        {
            let mut session = self.inner.write();
            if session.is_empty() {
                return Ok(());
            }
            *session = Session::default();
        }
        self.persist()?;
        tracing::info!("Session cleared");
        Ok(())
    }

    fn persist(&self) -> Result<(), SessionError> {
        match &self.path {
            Some(path) => Self::save(path, &self.inner.read()),
            None => Ok(()),
        }
    }

    fn load(path: &Path) -> Result<Session, SessionError> {
        let err = |reason: String| SessionError::Load {
            path: path.display().to_string(),
            reason,
        };
        let file = File::open(path).map_err(|e| err(e.to_string()))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| err(e.to_string()))
    }

    fn save(path: &Path, session: &Session) -> Result<(), SessionError> {
        let err = |reason: String| SessionError::Save {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| err(e.to_string()))?;
        }

        let file = File::create(path).map_err(|e| err(e.to_string()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), session).map_err(|e| err(e.to_string()))
    }
}
