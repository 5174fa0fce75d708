//! Portico - terminal front end for the landing page and dashboard.
//!
//! Each invocation is one "page load": the auth provider mounts, checks the
//! session, and the requested view is rendered. Browser local storage is a
//! directory under the platform data dir.

mod views;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use portico_core::{
    connect, AuthProvider, Backend, Config, FileStore, KeyValueStore, LoginOutcome, NavigationLog,
    RouteGuard,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: portico [COMMAND]

Commands:
  status              Show the landing page and session state (default)
  login               Sign in
  login-as <email>    Sign in as a canned user (mock backend only)
  logout              Sign out
  whoami              Print the current identity
  dashboard           Open the session-gated dashboard
  users               List canned users (mock backend only)
  help                Show this message";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Status,
    Login,
    LoginAs(String),
    Logout,
    WhoAmI,
    Dashboard,
    Users,
    Help,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        match args.first().map(String::as_str) {
            None | Some("status") => Ok(Command::Status),
            Some("login") => Ok(Command::Login),
            Some("login-as") => {
                let email = args
                    .get(1)
                    .ok_or_else(|| anyhow::anyhow!("login-as needs an email address"))?;
                Ok(Command::LoginAs(email.clone()))
            }
            Some("logout") => Ok(Command::Logout),
            Some("whoami") => Ok(Command::WhoAmI),
            Some("dashboard") => Ok(Command::Dashboard),
            Some("users") => Ok(Command::Users),
            Some("help") | Some("--help") | Some("-h") => Ok(Command::Help),
            Some(other) => Err(anyhow::anyhow!("Unknown command: {}\n\n{}", other, USAGE)),
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load().context("Failed to load configuration")?;
    let storage_dir = config.storage_dir().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to local storage directory");
        PathBuf::from("./.portico")
    });
    info!(backend = ?config.backend, storage = %storage_dir.display(), "Portico starting");

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(storage_dir));
    let navigation = Arc::new(NavigationLog::new());
    let (provider, backend) = connect(&config, store, navigation.clone())?;

    provider.mount().await;
    run(command, &provider, &backend, &navigation).await
}

async fn run(
    command: Command,
    provider: &AuthProvider,
    backend: &Backend,
    navigation: &NavigationLog,
) -> Result<()> {
    match command {
        Command::Status | Command::Help => {
            println!("{}", views::landing(&provider.state()));
        }
        Command::Login => {
            match provider.login().await? {
                LoginOutcome::Redirected { url } => {
                    println!("Continue signing in at {}", url);
                    if let Some(mock) = backend.mock() {
                        // The mock identity provider signs in the default user straight away
                        mock.login()?;
                        provider.check_auth().await;
                    }
                }
                LoginOutcome::SignedIn(_) => {}
            }
            println!("{}", views::landing(&provider.state()));
        }
        Command::LoginAs(email) => {
            let mock = backend
                .mock()
                .ok_or_else(|| anyhow::anyhow!("login-as is only available with the mock backend"))?;
            mock.login_as(&email)?;
            provider.check_auth().await;
            println!("{}", views::landing(&provider.state()));
        }
        Command::Logout => {
            provider.logout().await;
            let state = provider.state();
            match state.error_message() {
                Some(message) => println!("Logout failed: {}", message),
                None => {
                    let target = navigation
                        .last()
                        .map(|n| n.url)
                        .unwrap_or_else(|| provider.root_path().to_string());
                    println!("Logged out, returning to {}", target);
                }
            }
        }
        Command::WhoAmI => {
            let user = provider.client().get_identity().await?;
            println!("{} <{}> ({})", user.name, user.email, user.role);
        }
        Command::Dashboard => {
            let guard = RouteGuard::for_provider(provider);
            let decision = guard.resolve(provider).await;
            println!("{}", views::guarded(&decision, &provider.state()));
        }
        Command::Users => {
            let mock = backend
                .mock()
                .ok_or_else(|| anyhow::anyhow!("users is only available with the mock backend"))?;
            println!("{}", views::users(&mock.all_users()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::Status);
        assert_eq!(Command::parse(&args(&["dashboard"])).unwrap(), Command::Dashboard);
        assert_eq!(
            Command::parse(&args(&["login-as", "admin@example.com"])).unwrap(),
            Command::LoginAs("admin@example.com".to_string())
        );
        assert_eq!(Command::parse(&args(&["-h"])).unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse(&args(&["login-as"])).is_err());
        assert!(Command::parse(&args(&["frobnicate"])).is_err());
    }

    #[tokio::test]
    async fn test_mock_login_then_dashboard() {
        let mut config = Config::default();
        config.backend = portico_core::BackendMode::Mock;
        let store: Arc<dyn KeyValueStore> = Arc::new(portico_core::MemoryStore::new());
        let navigation = Arc::new(NavigationLog::new());
        let (provider, backend) = connect(&config, store, navigation.clone()).unwrap();
        provider.mount().await;

        run(Command::Login, &provider, &backend, &navigation).await.unwrap();
        assert!(provider.state().is_authenticated);

        let decision = RouteGuard::for_provider(&provider).resolve(&provider).await;
        assert_eq!(decision, portico_core::GuardDecision::Render);

        run(Command::Logout, &provider, &backend, &navigation).await.unwrap();
        assert!(!provider.state().is_authenticated);
    }
}
