use crate::auth::Session;

pub const TEST_USER_EMAIL: &str = "test@example.com";
pub const ADMIN_USER_EMAIL: &str = "admin@example.com";

/// Canned users served by the mock backend. The first one is the default login.
pub fn mock_users() -> Vec<Session> {
    vec![
        Session::new("1", TEST_USER_EMAIL, "Test User", "user"),
        Session::new("2", ADMIN_USER_EMAIL, "Admin User", "admin"),
    ]
}

pub fn find_user(email: &str) -> Option<Session> {
    mock_users()
        .into_iter()
        .find(|user| user.email.eq_ignore_ascii_case(email.trim()))
}
