use thiserror::Error;
use tracing::warn;

use crate::auth::StoreError;

/// Status reported when a request failed without any HTTP response to go by
pub const FALLBACK_SERVER_STATUS: u16 = 500;

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Failure raised by a transport before an HTTP status is available.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network unreachable: {0}")]
    Offline(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Other(String),
}

/// Authentication failures. Cloneable so the provider can keep the latest one in its state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Auth check failed (status {status})")]
    AuthCheckFailed { status: u16 },

    #[error("Network connection lost")]
    NetworkUnavailable,

    #[error("No user is currently logged in")]
    NotAuthenticated,

    #[error("Login failed (status {status})")]
    LoginFailed { status: u16 },

    #[error("Logout failed (status {status})")]
    LogoutFailed { status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    AuthCheckFailed,
    NetworkUnavailable,
    NotAuthenticated,
    LoginFailed,
    LogoutFailed,
    InvalidResponse,
    Storage,
    Navigation,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::AuthCheckFailed { .. } => AuthErrorKind::AuthCheckFailed,
            AuthError::NetworkUnavailable => AuthErrorKind::NetworkUnavailable,
            AuthError::NotAuthenticated => AuthErrorKind::NotAuthenticated,
            AuthError::LoginFailed { .. } => AuthErrorKind::LoginFailed,
            AuthError::LogoutFailed { .. } => AuthErrorKind::LogoutFailed,
            AuthError::InvalidResponse(_) => AuthErrorKind::InvalidResponse,
            AuthError::Storage(_) => AuthErrorKind::Storage,
            AuthError::Navigation(_) => AuthErrorKind::Navigation,
        }
    }

    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::AuthCheckFailed { status }
            | AuthError::LoginFailed { status }
            | AuthError::LogoutFailed { status } => Some(*status),
            AuthError::NotAuthenticated => Some(401),
            _ => None,
        }
    }

    /// Only connectivity failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::NetworkUnavailable)
    }

    /// Map a transport failure: connectivity problems become `NetworkUnavailable`,
    /// anything else is reported through `failed` as a server-side error.
    pub fn from_transport(err: TransportError, failed: fn(u16) -> AuthError) -> Self {
        match err {
            TransportError::Offline(_) | TransportError::Timeout => {
                warn!(error = %err, "Auth backend unreachable");
                AuthError::NetworkUnavailable
            }
            TransportError::Other(_) => {
                warn!(error = %err, "Auth request failed");
                failed(FALLBACK_SERVER_STATUS)
            }
        }
    }

    pub fn check_failed(status: u16) -> Self {
        AuthError::AuthCheckFailed { status }
    }

    pub fn login_failed(status: u16) -> Self {
        AuthError::LoginFailed { status }
    }

    pub fn logout_failed(status: u16) -> Self {
        AuthError::LogoutFailed { status }
    }

    /// Build an `InvalidResponse`, quoting at most a prefix of the body.
    pub fn invalid_response(reason: impl std::fmt::Display, body: &str) -> Self {
        AuthError::InvalidResponse(format!("{}: {}", reason, truncate_body(body)))
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Storage(err.to_string())
    }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        None => body.to_string(),
        Some((cut, _)) => format!("{}... (truncated, {} total bytes)", &body[..cut], body.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_status() {
        let err = AuthError::check_failed(503);
        assert_eq!(err.kind(), AuthErrorKind::AuthCheckFailed);
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_retryable());

        assert_eq!(AuthError::NotAuthenticated.status(), Some(401));
        assert_eq!(AuthError::NetworkUnavailable.status(), None);
        assert!(AuthError::NetworkUnavailable.is_retryable());
    }

    #[test]
    fn test_from_transport_distinguishes_connectivity() {
        let offline = AuthError::from_transport(
            TransportError::Offline("dns".to_string()),
            AuthError::check_failed,
        );
        assert_eq!(offline, AuthError::NetworkUnavailable);

        let timeout = AuthError::from_transport(TransportError::Timeout, AuthError::logout_failed);
        assert_eq!(timeout, AuthError::NetworkUnavailable);

        let other = AuthError::from_transport(
            TransportError::Other("bad tls".to_string()),
            AuthError::logout_failed,
        );
        assert_eq!(other, AuthError::LogoutFailed { status: 500 });
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");

        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 50);
        let truncated = truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated, 250 total bytes"));

        // Multi-byte characters are never split
        let wide = "é".repeat(MAX_ERROR_BODY_LENGTH + 1);
        assert!(truncate_body(&wide).contains("truncated"));
    }

    #[test]
    fn test_store_error_converts_to_storage() {
        let err: AuthError = StoreError::InvalidKey("../x".to_string()).into();
        assert_eq!(err.kind(), AuthErrorKind::Storage);
    }
}
