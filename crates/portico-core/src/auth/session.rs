use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use super::storage::{KeyValueStore, StoreError};

/// Storage key holding the serialized user record
pub const SESSION_KEY: &str = "user";

/// The authenticated user record cached client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    /// Backends disagree on whether ids are strings or numbers; both are accepted.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            role: role.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Holds at most one serialized `Session` in a key-value store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the stored session. A record that no longer parses is dropped.
    pub fn load(&self) -> Result<Option<Session>, StoreError> {
        let Some(contents) = self.store.get(SESSION_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Session>(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored session");
                self.store.remove(SESSION_KEY)?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        let contents = serde_json::to_string(session)?;
        self.store.set(SESSION_KEY, &contents)?;
        debug!(user_id = %session.id, "Session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(SESSION_KEY)?;
        debug!("Session cleared");
        Ok(())
    }

    /// Storage-only presence check; never parses the record.
    pub fn has_session(&self) -> bool {
        matches!(self.store.get(SESSION_KEY), Ok(Some(_)))
    }
}
