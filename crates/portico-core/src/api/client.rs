//! Session client for the auth backend.
//!
//! Issues the login, logout and principal calls and keeps the persisted
//! session in step with what the backend reports.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::transport::{AuthTransport, Method, TransportRequest, TransportResponse};
use super::{AuthError, TransportError};
use crate::auth::{Session, SessionStore};
use crate::config::{Config, Endpoints, LoginFlow};
use crate::navigation::Navigator;

/// Status the principal endpoint uses for "nobody is signed in"
const UNAUTHORIZED: u16 = 401;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The page was handed over to the identity provider
    Redirected { url: String },
    /// The backend signed the user in directly
    SignedIn(Session),
}

#[derive(Clone)]
pub struct SessionClient {
    transport: Arc<dyn AuthTransport>,
    sessions: SessionStore,
    navigator: Arc<dyn Navigator>,
    endpoints: Endpoints,
    login_flow: LoginFlow,
    timeout: Duration,
}

impl SessionClient {
    pub fn new(
        transport: Arc<dyn AuthTransport>,
        sessions: SessionStore,
        navigator: Arc<dyn Navigator>,
        config: &Config,
    ) -> Self {
        Self {
            transport,
            sessions,
            navigator,
            endpoints: config.endpoints.clone(),
            login_flow: config.login_flow,
            timeout: config.timeout(),
        }
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Send through the transport, bounded by the configured timeout.
    async fn send(&self, method: Method, path: &str) -> Result<TransportResponse, TransportError> {
        let request = TransportRequest::new(method, path);
        match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(path, timeout_secs = self.timeout.as_secs(), "Auth request timed out");
                Err(TransportError::Timeout)
            }
        }
    }

    /// Ask the backend who is signed in and sync the persisted session.
    ///
    /// Returns `Ok(false)` when nobody is (401, or an empty / `{}` / `null` body),
    /// after clearing the store. Any other non-2xx is `AuthCheckFailed`;
    /// connectivity failures are `NetworkUnavailable`. A failed check clears
    /// the store as well.
    pub async fn check_auth(&self) -> Result<bool, AuthError> {
        let result = self.query_principal().await;
        if result.is_err() {
            if let Err(e) = self.sessions.clear() {
                warn!(error = %e, "Failed to clear session after failed auth check");
            }
        }
        result
    }

    async fn query_principal(&self) -> Result<bool, AuthError> {
        let response = self
            .send(Method::Get, &self.endpoints.principal)
            .await
            .map_err(|e| AuthError::from_transport(e, AuthError::check_failed))?;

        if response.status == UNAUTHORIZED {
            debug!("Principal endpoint reports no session");
            self.sessions.clear()?;
            return Ok(false);
        }

        if !response.is_success() {
            warn!(status = response.status, "Auth check failed");
            return Err(AuthError::check_failed(response.status));
        }

        match parse_user(&response.body)? {
            Some(user) => {
                self.sessions.save(&user)?;
                debug!(user_id = %user.id, "Principal confirmed");
                Ok(true)
            }
            None => {
                self.sessions.clear()?;
                Ok(false)
            }
        }
    }

    /// Start a login. In the redirect flow this hands the page to the login
    /// endpoint and returns immediately; nothing is awaited from the backend.
    pub async fn login(&self) -> Result<LoginOutcome, AuthError> {
        match self.login_flow {
            LoginFlow::Redirect => {
                let url = self.transport.url_for(&self.endpoints.login);
                self.navigator.assign(&url)?;
                info!(url = %url, "Redirected to login");
                Ok(LoginOutcome::Redirected { url })
            }
            LoginFlow::Direct => {
                let response = self
                    .send(Method::Post, &self.endpoints.login)
                    .await
                    .map_err(|e| AuthError::from_transport(e, AuthError::login_failed))?;

                if !response.is_success() {
                    warn!(status = response.status, "Login failed");
                    return Err(AuthError::login_failed(response.status));
                }

                let user = parse_user(&response.body)?.ok_or_else(|| {
                    AuthError::invalid_response("login response carried no user", &response.body)
                })?;
                self.sessions.save(&user)?;
                info!(user_id = %user.id, "Signed in");
                Ok(LoginOutcome::SignedIn(user))
            }
        }
    }

    /// End the session. The local session is cleared before the backend is
    /// called, so it is gone even when the call fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.sessions.clear()?;

        let response = self
            .send(self.endpoints.logout_method, &self.endpoints.logout)
            .await
            .map_err(|e| AuthError::from_transport(e, AuthError::logout_failed))?;

        if !response.is_success() {
            warn!(status = response.status, "Logout rejected by backend");
            return Err(AuthError::logout_failed(response.status));
        }

        info!("User has been logged out");
        Ok(())
    }

    /// The cached session, or the one a fresh principal check persists.
    pub async fn get_identity(&self) -> Result<Session, AuthError> {
        if let Some(session) = self.sessions.load()? {
            return Ok(session);
        }

        let result = match self.check_auth().await {
            Ok(true) => self.sessions.load().map_err(AuthError::from).and_then(|session| {
                session.ok_or(AuthError::NotAuthenticated)
            }),
            Ok(false) => Err(AuthError::NotAuthenticated),
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            error!(error = %e, "Error getting identity");
        }
        result
    }

    /// Storage-only presence check. Never touches the network.
    pub fn has_identity(&self) -> bool {
        self.sessions.has_session()
    }
}

/// Parse a user body. Empty, `null` and `{}` all mean "no user".
fn parse_user(body: &str) -> Result<Option<Session>, AuthError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AuthError::invalid_response(format!("malformed JSON ({})", e), body))?;

    let no_user = match &value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if no_user {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| AuthError::invalid_response(format!("unexpected user shape ({})", e), body))
}

// ============================================================================
// Tests
// ============================================================================
