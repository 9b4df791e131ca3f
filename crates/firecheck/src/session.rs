//! Session presence checks and page gating.
//!
//! A session is a JSON object under [`SESSION_KEY`] carrying an `expiresAt`
//! timestamp in epoch milliseconds plus whatever else the login step chose
//! to store. There is no access-control model: a present, unexpired session
//! opens every protected page.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::LocalStorage;

/// Storage key holding the current session.
pub const SESSION_KEY: &str = "user_session";

/// Tab storage key holding the location to return to after login.
pub const REDIRECT_KEY: &str = "redirect_after_login";

/// Pages that need an active session.
pub const PROTECTED_PAGES: &[&str] = &["dashboard", "inspection", "history", "report"];

/// Page users are sent to when the gate closes.
pub const LOGIN_PAGE: &str = "login";

/// A logged-in session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Expiry in epoch milliseconds.
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
    /// Everything else stored alongside the expiry.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Create a session for `user` valid for `ttl` from `now`.
    #[must_use]
    pub fn for_user(user: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        let mut extra = Map::new();
        extra.insert("user".to_string(), Value::String(user.to_string()));
        extra.insert("loginAt".to_string(), Value::from(now.timestamp_millis()));
        Self {
            expires_at: (now + ttl).timestamp_millis(),
            extra,
        }
    }

    /// Whether the session is still valid at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() < self.expires_at
    }

    /// The user name stored at login, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.extra.get("user").and_then(Value::as_str)
    }
}

/// Read the active session.
///
/// Missing, malformed and expired sessions all come back as `None`; an
/// expired one is also removed.
///
/// # Errors
///
/// Returns an error only if the storage itself fails.
pub fn current(storage: &LocalStorage, now: DateTime<Utc>) -> Result<Option<Session>> {
    let Some(raw) = storage.get_item(SESSION_KEY)? else {
        return Ok(None);
    };

    let session: Session = match serde_json::from_str(&raw) {
        Ok(session) => session,
        Err(e) => {
            warn!("Ignoring malformed session: {}", e);
            return Ok(None);
        }
    };

    if session.is_active_at(now) {
        Ok(Some(session))
    } else {
        debug!("Session expired at {}", session.expires_at);
        storage.remove_item(SESSION_KEY)?;
        Ok(None)
    }
}

/// Store a new session for `user`.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub fn login(
    storage: &LocalStorage,
    user: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<Session> {
    let session = Session::for_user(user, now, ttl);
    storage.set_item(SESSION_KEY, &serde_json::to_string(&session)?)?;
    info!("Logged in as {}", user);
    Ok(session)
}

/// Drop the current session. Returns `true` if there was one.
///
/// # Errors
///
/// Returns an error if the storage fails.
pub fn logout(storage: &LocalStorage) -> Result<bool> {
    storage.remove_item(SESSION_KEY)
}

/// Per-tab scratch storage that does not outlive the tab.
pub trait TabStorage {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value.
    fn set(&mut self, key: &str, value: String);
    /// Remove and return a value.
    fn take(&mut self, key: &str) -> Option<String>;
}

/// In-memory [`TabStorage`].
#[derive(Debug, Default)]
pub struct MemoryTabStorage {
    values: HashMap<String, String>,
}

impl MemoryTabStorage {
    /// Create empty tab storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TabStorage for MemoryTabStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn take(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

/// Outcome of checking a page against the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// The page may be shown.
    Allow {
        /// The active session, if the page needed one.
        session: Option<Session>,
    },
    /// The user must log in first.
    Redirect {
        /// Where to send the user.
        to: &'static str,
    },
}

impl GateDecision {
    /// Whether the page may be shown.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}

/// Whether `page` requires a session.
#[must_use]
pub fn is_protected(page: &str) -> bool {
    PROTECTED_PAGES.contains(&page)
}

/// Check whether `page` can be shown.
///
/// On refusal the current location is stashed in `tab` under
/// [`REDIRECT_KEY`] so the login step can send the user back.
///
/// # Errors
///
/// Returns an error only if the storage itself fails.
pub fn guard(
    storage: &LocalStorage,
    tab: &mut dyn TabStorage,
    page: &str,
    location: &str,
    now: DateTime<Utc>,
) -> Result<GateDecision> {
    if !is_protected(page) {
        return Ok(GateDecision::Allow { session: None });
    }

    match current(storage, now)? {
        Some(session) => Ok(GateDecision::Allow {
            session: Some(session),
        }),
        None => {
            debug!("No active session for '{}', redirecting", page);
            tab.set(REDIRECT_KEY, location.to_string());
            Ok(GateDecision::Redirect { to: LOGIN_PAGE })
        }
    }
}

/// Location stashed by the last refused [`guard`] call, consumed on read.
pub fn take_redirect(tab: &mut dyn TabStorage) -> Option<String> {
    tab.take(REDIRECT_KEY)
}
