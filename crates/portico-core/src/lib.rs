//! Client-side session management for portico.
//!
//! Layers, leaves first:
//! - `auth`: the persisted session store over an injected key-value store
//! - `api`: the session client and the transport seam it talks through
//! - `provider`: the reactive auth state and its actions
//! - `guard`: the route guard decision for private views
//! - `mock`: the fixture backend used in development
//!
//! `connect` wires them together from a `Config`.

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;
pub mod mock;
pub mod navigation;
pub mod provider;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

pub use api::{AuthError, AuthErrorKind, LoginOutcome, SessionClient};
pub use auth::{FileStore, KeyValueStore, MemoryStore, Session, SessionStore};
pub use config::{BackendMode, Config, LoginFlow};
pub use guard::{GuardDecision, RouteGuard};
pub use mock::MockBackend;
pub use navigation::{NavigationLog, Navigator};
pub use provider::{AuthProvider, AuthState};

/// The backend selected by configuration.
#[derive(Clone)]
pub enum Backend {
    Mock(Arc<MockBackend>),
    Http(Arc<api::HttpTransport>),
}

impl Backend {
    /// The mock keeps its signed-in user in `store`, next to the session.
    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        if config.use_mock() {
            info!("Using mock authentication service");
            Ok(Backend::Mock(Arc::new(MockBackend::with_store(store))))
        } else {
            let transport = api::HttpTransport::new(&config.api_url, config.timeout())?;
            Ok(Backend::Http(Arc::new(transport)))
        }
    }

    pub fn transport(&self) -> Arc<dyn api::AuthTransport> {
        match self {
            Backend::Mock(mock) => mock.clone() as Arc<dyn api::AuthTransport>,
            Backend::Http(http) => http.clone() as Arc<dyn api::AuthTransport>,
        }
    }

    pub fn mock(&self) -> Option<&Arc<MockBackend>> {
        match self {
            Backend::Mock(mock) => Some(mock),
            Backend::Http(_) => None,
        }
    }
}

/// Build a provider over `store` and `navigator` for the configured backend.
pub fn connect(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
) -> Result<(Arc<AuthProvider>, Backend)> {
    let backend = Backend::from_config(config, store.clone())?;
    let client = SessionClient::new(backend.transport(), SessionStore::new(store), navigator, config);
    let provider = Arc::new(AuthProvider::new(client, config.root_path.clone()));
    Ok((provider, backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_mock_end_to_end() {
        let mut config = Config::default();
        config.backend = BackendMode::Mock;
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let navigation = Arc::new(NavigationLog::new());

        let (provider, backend) = connect(&config, store.clone(), navigation).unwrap();
        let mock = backend.mock().expect("mock backend selected").clone();

        provider.mount().await;
        assert!(!provider.state().is_authenticated);

        mock.login_as("test@example.com").unwrap();
        provider.check_auth().await;
        assert_eq!(
            provider.client().get_identity().await.unwrap(),
            Session::new("1", "test@example.com", "Test User", "user")
        );
        assert!(store.get(auth::SESSION_KEY).unwrap().is_some());
    }

    #[test]
    fn test_connect_http_backend() {
        let config = Config::default();
        let (_, backend) = connect(
            &config,
            Arc::new(MemoryStore::new()),
            Arc::new(NavigationLog::new()),
        )
        .unwrap();
        assert!(backend.mock().is_none());
    }
}
