//! Page navigation seam.
//!
//! Login hands the page over to the identity provider with `assign`; logout
//! forces a full reload of the root path with `replace`.

use std::sync::{Mutex, PoisonError};

use tracing::info;

use crate::api::AuthError;

pub trait Navigator: Send + Sync {
    /// Navigate to `url`, keeping the current page in history.
    fn assign(&self, url: &str) -> Result<(), AuthError>;

    /// Navigate to `url`, replacing the current page.
    fn replace(&self, url: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Assign,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub kind: NavigationKind,
    pub url: String,
}

/// Records navigations in memory instead of performing them.
#[derive(Debug, Default)]
pub struct NavigationLog {
    history: Mutex<Vec<Navigation>>,
}

impl NavigationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Navigation> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    fn record(&self, kind: NavigationKind, url: &str) -> Result<(), AuthError> {
        if url.trim().is_empty() {
            return Err(AuthError::Navigation("empty navigation target".to_string()));
        }
        info!(?kind, url, "Navigating");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Navigation {
                kind,
                url: url.to_string(),
            });
        Ok(())
    }
}

impl Navigator for NavigationLog {
    fn assign(&self, url: &str) -> Result<(), AuthError> {
        self.record(NavigationKind::Assign, url)
    }

    fn replace(&self, url: &str) -> Result<(), AuthError> {
        self.record(NavigationKind::Replace, url)
    }
}
