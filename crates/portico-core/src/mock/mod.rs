//! Development backend.
//!
//! `MockBackend` answers the three auth endpoints from fixtures, so the
//! session client runs unmodified with or without a real server.

pub mod backend;
pub mod users;

pub use backend::{MockBackend, MockError, MOCK_USER_KEY};
pub use users::{find_user, mock_users, ADMIN_USER_EMAIL, TEST_USER_EMAIL};
