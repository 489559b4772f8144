// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Session record and the expiry decision.
//!
//! ## Storage Schema
//!
//! | key          | value                         |
//! |--------------|-------------------------------|
//! | `isLoggedIn` | `"true"`                      |
//! | `loginTime`  | epoch milliseconds as decimal |
//! | `userRole`   | role name                     |
//! | `userData`   | JSON text                     |
//!
//! All four keys must be present for a session to exist. The decision is
//! [`evaluate`], a pure function of the stored snapshot, the current time and
//! the timeout. Writing the renewal or clearing the keys is left to the
//! caller.

pub mod events;

pub use events::SessionEvent;

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

use crate::store::KeyValueStore;

pub const IS_LOGGED_IN_KEY: &str = "isLoggedIn";
pub const LOGIN_TIME_KEY: &str = "loginTime";
pub const USER_ROLE_KEY: &str = "userRole";
pub const USER_DATA_KEY: &str = "userData";

/// Every key belonging to the session record, in write order.
pub const SESSION_KEYS: [&str; 4] = [IS_LOGGED_IN_KEY, LOGIN_TIME_KEY, USER_ROLE_KEY, USER_DATA_KEY];

/// Transient-store key holding the post-login redirect target.
pub const REDIRECT_TARGET_KEY: &str = "redirectAfterLogin";

/// Raw values of the session keys as found in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub is_logged_in: Option<String>,
    pub login_time: Option<String>,
    pub user_role: Option<String>,
    pub user_data: Option<String>,
}

impl SessionSnapshot {
    /// Read all four keys.
    pub fn read<S: KeyValueStore>(store: &S) -> Result<Self> {
        let get = |key: &str| {
            store
                .get(key)
                .with_context(|| format!("Failed to read session key {}", key))
        };
        Ok(Self {
            is_logged_in: get(IS_LOGGED_IN_KEY)?,
            login_time: get(LOGIN_TIME_KEY)?,
            user_role: get(USER_ROLE_KEY)?,
            user_data: get(USER_DATA_KEY)?,
        })
    }

    /// First key that is missing, empty, or (for the flag) not `"true"`.
    pub fn missing_key(&self) -> Option<&'static str> {
        if self.is_logged_in.as_deref() != Some("true") {
            return Some(IS_LOGGED_IN_KEY);
        }
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !present(&self.login_time) {
            return Some(LOGIN_TIME_KEY);
        }
        if !present(&self.user_role) {
            return Some(USER_ROLE_KEY);
        }
        if !present(&self.user_data) {
            return Some(USER_DATA_KEY);
        }
        None
    }

    /// Role to show in the UI. Presence only, no expiry check.
    pub fn display_role(&self) -> Option<&str> {
        if self.is_logged_in.as_deref() != Some("true") {
            return None;
        }
        self.user_role.as_deref().filter(|r| !r.is_empty())
    }
}

/// Outcome of checking a snapshot against the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionVerdict {
    /// A key is missing; nothing to clear.
    Absent { missing: &'static str },
    /// `loginTime` is not an integer; treated as expired.
    Malformed { login_time: String },
    /// Older than the timeout.
    Expired { age_ms: i64 },
    /// Within the timeout; should be renewed.
    Valid { age_ms: i64 },
}

/// Decide whether `snapshot` is a live session at `now_ms`.
///
/// A session exactly `timeout` old is still valid; expiry needs
/// `age > timeout`. A `loginTime` in the future yields a negative age and
/// counts as valid.
pub fn evaluate(snapshot: &SessionSnapshot, now_ms: i64, timeout: Duration) -> SessionVerdict {
    if let Some(missing) = snapshot.missing_key() {
        return SessionVerdict::Absent { missing };
    }

    let raw = snapshot.login_time.as_deref().unwrap_or_default();
    let login_time = match raw.trim().parse::<i64>() {
        Ok(t) => t,
        Err(_) => {
            return SessionVerdict::Malformed {
                login_time: raw.to_string(),
            }
        }
    };

    let age_ms = now_ms.saturating_sub(login_time);
    let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);

    if age_ms > timeout_ms {
        SessionVerdict::Expired { age_ms }
    } else {
        SessionVerdict::Valid { age_ms }
    }
}

/// A session about to be written by a login.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub role: String,
    pub user_data: Value,
    pub login_time_ms: i64,
}

impl SessionRecord {
    /// Non-object user data is replaced by an empty object.
    pub fn new(role: impl Into<String>, user_data: Value, login_time_ms: i64) -> Self {
        let user_data = if user_data.is_object() {
            user_data
        } else {
            Value::Object(Default::default())
        };
        Self {
            role: role.into(),
            user_data,
            login_time_ms,
        }
    }

    /// Write all four keys.
    pub fn write_to<S: KeyValueStore>(&self, store: &S) -> Result<()> {
        let user_data = serde_json::to_string(&self.user_data)
            .context("Failed to serialize user data")?;
        store.set(IS_LOGGED_IN_KEY, "true")?;
        store.set(LOGIN_TIME_KEY, &self.login_time_ms.to_string())?;
        store.set(USER_ROLE_KEY, &self.role)?;
        store.set(USER_DATA_KEY, &user_data)?;
        Ok(())
    }
}
