//! Client side of the auth backend.
//!
//! This module provides the `SessionClient`, which calls the login, logout and
//! principal endpoints through an `AuthTransport` and keeps the persisted
//! session in sync. `HttpTransport` talks to a real server; the mock backend
//! implements the same trait.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{LoginOutcome, SessionClient};
pub use error::{AuthError, AuthErrorKind, TransportError};
pub use transport::{AuthTransport, HttpTransport, Method, TransportRequest, TransportResponse};
