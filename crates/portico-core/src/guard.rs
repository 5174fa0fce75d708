//! Route guard for private views.

use crate::provider::{AuthProvider, AuthState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Authorization not resolved yet; show a placeholder
    Loading,
    /// Signed in; render the guarded view
    Render,
    /// Signed out; send the visitor elsewhere
    Redirect { to: String },
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    redirect_to: String,
}

impl RouteGuard {
    pub fn new(redirect_to: impl Into<String>) -> Self {
        Self {
            redirect_to: redirect_to.into(),
        }
    }

    /// Guard that bounces signed-out visitors to the provider's root path.
    pub fn for_provider(provider: &AuthProvider) -> Self {
        Self::new(provider.root_path())
    }

    pub fn decide(&self, state: &AuthState) -> GuardDecision {
        if state.is_loading {
            GuardDecision::Loading
        } else if state.is_authenticated {
            GuardDecision::Render
        } else {
            GuardDecision::Redirect {
                to: self.redirect_to.clone(),
            }
        }
    }

    /// Wait for the provider to settle, then decide.
    pub async fn resolve(&self, provider: &AuthProvider) -> GuardDecision {
        let state = provider.wait_until_resolved().await;
        self.decide(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthError, SessionClient};
    use crate::auth::{MemoryStore, SessionStore};
    use crate::config::Config;
    use crate::mock::MockBackend;
    use crate::navigation::NavigationLog;
    use std::sync::Arc;

    fn resolved(is_authenticated: bool) -> AuthState {
        AuthState {
            is_loading: false,
            is_authenticated,
            ..AuthState::initial()
        }
    }

    #[test]
    fn test_decide() {
        let guard = RouteGuard::new("/");
        assert_eq!(guard.decide(&AuthState::initial()), GuardDecision::Loading);
        assert_eq!(guard.decide(&resolved(true)), GuardDecision::Render);
        assert_eq!(
            guard.decide(&resolved(false)),
            GuardDecision::Redirect { to: "/".to_string() }
        );
    }

    #[test]
    fn test_errors_redirect() {
        let guard = RouteGuard::new("/home");
        let state = AuthState {
            error: Some(AuthError::NetworkUnavailable),
            ..resolved(false)
        };
        assert_eq!(
            guard.decide(&state),
            GuardDecision::Redirect { to: "/home".to_string() }
        );
    }

    #[tokio::test]
    async fn test_resolve_against_provider() {
        let backend = Arc::new(MockBackend::new());
        let client = SessionClient::new(
            backend.clone(),
            SessionStore::new(Arc::new(MemoryStore::new())),
            Arc::new(NavigationLog::new()),
            &Config::default(),
        );
        let provider = AuthProvider::new(client, "/");
        let guard = RouteGuard::for_provider(&provider);

        provider.mount().await;
        assert_eq!(
            guard.resolve(&provider).await,
            GuardDecision::Redirect { to: "/".to_string() }
        );

        backend.login_as_admin().unwrap();
        provider.check_auth().await;
        assert_eq!(guard.resolve(&provider).await, GuardDecision::Render);
        assert_eq!(
            provider.state().user.map(|u| u.role),
            Some("admin".to_string())
        );
    }
}
