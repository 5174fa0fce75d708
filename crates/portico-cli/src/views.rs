//! Text renditions of the site's views. Presentation only.

use portico_core::{AuthState, GuardDecision, Session};

pub fn loading() -> String {
    "Loading...".to_string()
}

/// The public landing page. Shows a sign-in hint or the signed-in user.
pub fn landing(state: &AuthState) -> String {
    let mut out = String::new();
    out.push_str("=== Portico ===\n");
    out.push_str("Welcome! Explore the blog or sign in to reach your dashboard.\n\n");

    match &state.user {
        Some(user) if state.is_authenticated => {
            out.push_str(&format!("Signed in as {} <{}>\n", user.name, user.email));
            out.push_str("Run `portico dashboard` to open your dashboard.\n");
        }
        _ => out.push_str("Not signed in. Run `portico login` to sign in.\n"),
    }

    if let Some(message) = state.error_message() {
        out.push_str(&format!("\nError: {}\n", message));
    }
    out
}

/// The private dashboard. Only reached through the route guard.
pub fn dashboard(user: &Session) -> String {
    let mut out = String::new();
    out.push_str("=== Dashboard ===\n");
    out.push_str(&format!("Name:  {}\n", user.name));
    out.push_str(&format!("Email: {}\n", user.email));
    out.push_str(&format!("Role:  {}\n", user.role));
    if user.is_admin() {
        out.push_str("\nAdministrator tools are available.\n");
    }
    out
}

pub fn guarded(decision: &GuardDecision, state: &AuthState) -> String {
    match (decision, &state.user) {
        (GuardDecision::Loading, _) => loading(),
        (GuardDecision::Render, Some(user)) => dashboard(user),
        (GuardDecision::Render, None) => loading(),
        (GuardDecision::Redirect { to }, _) => {
            format!("Access denied, redirecting to {}\n\n{}", to, landing(state))
        }
    }
}

pub fn users(users: &[Session]) -> String {
    users
        .iter()
        .map(|u| format!("{:<4} {:<22} {:<12} {}", u.id, u.email, u.name, u.role))
        .collect::<Vec<_>>()
        .join("\n")
}
