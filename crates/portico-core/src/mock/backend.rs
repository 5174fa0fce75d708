use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::users::{find_user, mock_users, ADMIN_USER_EMAIL, TEST_USER_EMAIL};
use crate::api::{AuthTransport, Method, TransportError, TransportRequest, TransportResponse};
use crate::auth::{KeyValueStore, Session};

/// Key under which the mock remembers who is signed in
pub const MOCK_USER_KEY: &str = "mockAuthUser";

const LOGIN_PATHS: [&str; 2] = ["/auth/login", "/auth/login/google"];
const LOGOUT_PATH: &str = "/auth/logout";
const PRINCIPAL_PATH: &str = "/auth/principal";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    #[error("No mock user with email: {0}")]
    UnknownUser(String),
}

/// In-memory stand-in for the auth backend, serving fixture responses for
/// the login, logout and principal endpoints.
#[derive(Default)]
pub struct MockBackend {
    current: Mutex<Option<Session>>,
    persisted: Option<Arc<dyn KeyValueStore>>,
    offline: AtomicBool,
    principal_failure: Mutex<Option<u16>>,
    requests: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the signed-in user in `store` so it outlives this instance.
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            persisted: Some(store),
            ..Self::default()
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_current_user(&self, user: Option<Session>) {
        if let Some(store) = &self.persisted {
            let result = match &user {
                Some(user) => serde_json::to_string(user)
                    .map_err(Into::into)
                    .and_then(|json| store.set(MOCK_USER_KEY, &json)),
                None => store.remove(MOCK_USER_KEY),
            };
            if let Err(e) = result {
                warn!(error = %e, "Failed to persist mock user");
            }
        }
        *self.current() = user;
    }

    pub fn current_user(&self) -> Option<Session> {
        let mut current = self.current();
        if current.is_none() {
            *current = self.load_persisted();
        }
        current.clone()
    }

    fn load_persisted(&self) -> Option<Session> {
        let store = self.persisted.as_ref()?;
        let json = store.get(MOCK_USER_KEY).ok()??;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, "Ignoring unreadable mock user"))
            .ok()
    }

    // ===== Test helpers =====

    pub fn login_as(&self, email: &str) -> Result<Session, MockError> {
        let user = find_user(email).ok_or_else(|| MockError::UnknownUser(email.to_string()))?;
        self.set_current_user(Some(user.clone()));
        info!(email = %user.email, "Mock backend signed in");
        Ok(user)
    }

    pub fn login(&self) -> Result<Session, MockError> {
        self.login_as(TEST_USER_EMAIL)
    }

    pub fn login_as_admin(&self) -> Result<Session, MockError> {
        self.login_as(ADMIN_USER_EMAIL)
    }

    pub fn logout(&self) {
        self.set_current_user(None);
    }

    pub fn all_users(&self) -> Vec<Session> {
        mock_users()
    }

    // ===== Fault injection =====

    /// While offline every request fails as a connectivity error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the principal endpoint answer with `status` and an empty body.
    pub fn fail_principal_with(&self, status: Option<u16>) {
        *self
            .principal_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Number of requests that reached the backend.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn user_response(user: &Session) -> TransportResponse {
        match serde_json::to_string(user) {
            Ok(json) => TransportResponse::new(200, json),
            Err(e) => {
                warn!(error = %e, "Failed to encode mock user");
                TransportResponse::empty(500)
            }
        }
    }

    fn handle(&self, request: &TransportRequest) -> TransportResponse {
        let path = request.path.as_str();

        if LOGIN_PATHS.contains(&path) {
            // Always signs in as the first canned user
            let user = mock_users().remove(0);
            self.set_current_user(Some(user.clone()));
            return Self::user_response(&user);
        }

        if path == LOGOUT_PATH {
            self.logout();
            return TransportResponse::empty(200);
        }

        if path == PRINCIPAL_PATH {
            if request.method != Method::Get {
                return TransportResponse::empty(405);
            }
            let failure = *self
                .principal_failure
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(status) = failure {
                return TransportResponse::empty(status);
            }
            return match self.current_user() {
                Some(user) => Self::user_response(&user),
                None => TransportResponse::empty(401),
            };
        }

        TransportResponse::empty(404)
    }
}

#[async_trait]
impl AuthTransport for MockBackend {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Offline("mock backend is offline".to_string()));
        }
        self.requests.fetch_add(1, Ordering::SeqCst);

        let response = self.handle(&request);
        debug!(
            method = request.method.as_str(),
            path = %request.path,
            status = response.status,
            "Mock backend handled request"
        );
        Ok(response)
    }
}
