//! Auth state provider.
//!
//! Owns the reactive `AuthState` for one page lifetime. Views and the route
//! guard read snapshots or subscribe to changes; only the provider's actions
//! write. Actions are serialized in arrival order, so the store and the
//! published state always come from the same, latest check.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::api::{AuthError, LoginOutcome, SessionClient};
use crate::auth::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub user: Option<Session>,
    pub error: Option<AuthError>,
    /// When the last auth check resolved
    pub checked_at: Option<DateTime<Utc>>,
}

impl AuthState {
    /// State before the first check has resolved.
    pub fn initial() -> Self {
        Self {
            is_loading: true,
            is_authenticated: false,
            user: None,
            error: None,
            checked_at: None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    fn sign_in(&mut self, user: Session) {
        self.is_authenticated = true;
        self.user = Some(user);
    }

    fn sign_out(&mut self) {
        self.is_authenticated = false;
        self.user = None;
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::initial()
    }
}

/// A `check_auth` call that has announced itself but not yet published.
/// Dropping it unsettled (the caller's future was cancelled) hands the
/// loading flag back.
struct PendingCheck<'a> {
    provider: &'a AuthProvider,
    settled: bool,
}

impl Drop for PendingCheck<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.provider.abandon_check();
        }
    }
}

pub struct AuthProvider {
    client: SessionClient,
    root_path: String,
    state: watch::Sender<AuthState>,
    actions: Mutex<()>,
    /// Checks announced but not yet settled
    pending: AtomicUsize,
}

impl AuthProvider {
    pub fn new(client: SessionClient, root_path: impl Into<String>) -> Self {
        let (state, _) = watch::channel(AuthState::initial());
        Self {
            client,
            root_path: root_path.into(),
            state,
            actions: Mutex::new(()),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Current snapshot.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Wait for any in-flight check to finish and return the settled state.
    pub async fn wait_until_resolved(&self) -> AuthState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Initial check, run once when the page mounts.
    pub async fn mount(&self) {
        debug!("Auth provider mounted");
        self.check_auth().await;
    }

    /// Re-check the session with the backend. Never fails: errors land in
    /// `AuthState::error` and imply signed out.
    ///
    /// Concurrent calls queue and run one at a time; each publishes its own
    /// result, and `is_loading` stays set until the last queued one is done.
    pub async fn check_auth(&self) {
        // Counted under the state lock so `is_loading` and `pending` agree
        self.state.send_modify(|state| {
            self.pending.fetch_add(1, Ordering::SeqCst);
            state.is_loading = true;
            state.error = None;
        });
        let mut check = PendingCheck {
            provider: self,
            settled: false,
        };

        let _guard = self.actions.lock().await;
        let outcome = self.resolve_user().await;

        check.settled = true;
        let checked_at = Utc::now();
        self.state.send_modify(|state| {
            let outstanding = self.pending.fetch_sub(1, Ordering::SeqCst) - 1;
            match outcome {
                Ok(Some(user)) => {
                    info!(user_id = %user.id, "Authenticated");
                    state.sign_in(user);
                    state.error = None;
                }
                Ok(None) => {
                    info!("Not authenticated");
                    state.sign_out();
                    state.error = None;
                }
                Err(e) => {
                    error!(error = %e, "Auth check failed");
                    state.sign_out();
                    state.error = Some(e);
                }
            }
            state.is_loading = outstanding > 0;
            state.checked_at = Some(checked_at);
        });
    }

    /// A check was cancelled before publishing. If it was the last one
    /// outstanding, settle on whatever the store holds now, since the
    /// cancelled call may have written it.
    fn abandon_check(&self) {
        self.state.send_modify(|state| {
            let outstanding = self.pending.fetch_sub(1, Ordering::SeqCst) - 1;
            if outstanding > 0 {
                debug!(outstanding, "Auth check cancelled, later checks pending");
                return;
            }
            warn!("Auth check cancelled, settling on the stored session");
            match self.client.sessions().load() {
                Ok(Some(user)) => state.sign_in(user),
                Ok(None) => state.sign_out(),
                Err(e) => {
                    state.sign_out();
                    state.error = Some(e.into());
                }
            }
            state.is_loading = false;
        });
    }

    async fn resolve_user(&self) -> Result<Option<Session>, AuthError> {
        if !self.client.check_auth().await? {
            return Ok(None);
        }
        self.client.get_identity().await.map(Some)
    }

    /// Start a login. A redirect leaves local state alone since the page is
    /// about to be replaced; a direct sign-in publishes the user.
    pub async fn login(&self) -> Result<LoginOutcome, AuthError> {
        let _guard = self.actions.lock().await;
        let outcome = self
            .client
            .login()
            .await
            .inspect_err(|e| error!(error = %e, "Login failed"))?;

        if let LoginOutcome::SignedIn(ref user) = outcome {
            let user = user.clone();
            self.state.send_modify(|state| {
                state.sign_in(user);
                state.error = None;
                state.is_loading = self.pending.load(Ordering::SeqCst) > 0;
                state.checked_at = Some(Utc::now());
            });
        }
        Ok(outcome)
    }

    /// Log out, then force a full navigation to the root path. On failure the
    /// error is surfaced and in-memory state is kept.
    pub async fn logout(&self) {
        let _guard = self.actions.lock().await;
        match self.client.logout().await {
            Ok(()) => {
                self.state.send_modify(|state| {
                    state.sign_out();
                    state.is_loading = self.pending.load(Ordering::SeqCst) > 0;
                });
                if let Err(e) = self.client.navigator().replace(&self.root_path) {
                    error!(error = %e, "Failed to navigate after logout");
                    self.state.send_modify(|state| state.error = Some(e));
                }
            }
            Err(e) => {
                error!(error = %e, "Logout error");
                self.state.send_modify(|state| state.error = Some(e));
            }
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }
}

// ============================================================================
// Tests
// ============================================================================
