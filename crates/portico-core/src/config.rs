//! Application configuration management.
//!
//! Configuration is stored at `~/.config/portico/config.json` and can be
//! overridden from the environment (a `.env` file is honored by the binary).
//! The one switch that matters most is the backend mode: the in-memory mock
//! for development, or a real HTTP backend.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::Method;

/// Application name used for config/storage directory paths
const APP_NAME: &str = "portico";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Request timeout in seconds. No call to the auth backend should hang the page.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_API_URL: &str = "http://localhost:8080";

pub const ENV_USE_MOCK_AUTH: &str = "PORTICO_USE_MOCK_AUTH";
pub const ENV_API_URL: &str = "PORTICO_API_URL";
pub const ENV_LOGIN_PATH: &str = "PORTICO_LOGIN_PATH";
pub const ENV_LOGIN_FLOW: &str = "PORTICO_LOGIN_FLOW";
pub const ENV_TIMEOUT_SECS: &str = "PORTICO_TIMEOUT_SECS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Mock,
    #[default]
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoginFlow {
    /// Send the page to the identity provider's login endpoint
    #[default]
    Redirect,
    /// Call the login endpoint and take the user from its JSON response
    Direct,
}

impl std::str::FromStr for LoginFlow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(LoginFlow::Redirect),
            "direct" => Ok(LoginFlow::Direct),
            other => Err(anyhow::anyhow!("Unknown login flow: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub logout: String,
    pub logout_method: Method,
    pub principal: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            logout: "/auth/logout".to_string(),
            logout_method: Method::Post,
            principal: "/auth/principal".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendMode,
    pub api_url: String,
    pub endpoints: Endpoints,
    pub login_flow: LoginFlow,
    pub root_path: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendMode::default(),
            api_url: DEFAULT_API_URL.to_string(),
            endpoints: Endpoints::default(),
            login_flow: LoginFlow::default(),
            root_path: "/".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load the config file (defaults when absent), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Unset variables leave fields untouched.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = lookup(ENV_USE_MOCK_AUTH) {
            self.backend = if is_truthy(&flag) {
                BackendMode::Mock
            } else {
                BackendMode::Http
            };
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(path) = lookup(ENV_LOGIN_PATH) {
            self.endpoints.login = path;
        }
        if let Some(flow) = lookup(ENV_LOGIN_FLOW) {
            self.login_flow = flow.parse()?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))?;
        }
        Ok(())
    }

    pub fn use_mock(&self) -> bool {
        self.backend == BackendMode::Mock
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory standing in for browser local storage.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join("storage"))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, BackendMode::Http);
        assert_eq!(config.endpoints.login, "/auth/login");
        assert_eq!(config.endpoints.principal, "/auth/principal");
        assert_eq!(config.endpoints.logout_method, Method::Post);
        assert_eq!(config.root_path, "/");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_mock_flag_selects_backend() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[(ENV_USE_MOCK_AUTH, "true")])).unwrap();
        assert!(config.use_mock());

        config.apply_env(lookup_from(&[(ENV_USE_MOCK_AUTH, "false")])).unwrap();
        assert!(!config.use_mock());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(lookup_from(&[
                (ENV_API_URL, "https://example.com"),
                (ENV_LOGIN_PATH, "/auth/login/google"),
                (ENV_LOGIN_FLOW, "Direct"),
                (ENV_TIMEOUT_SECS, " 5 "),
            ]))
            .unwrap();
        assert_eq!(config.api_url, "https://example.com");
        assert_eq!(config.endpoints.login, "/auth/login/google");
        assert_eq!(config.login_flow, LoginFlow::Direct);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_bad_env_values_are_errors() {
        let mut config = Config::default();
        assert!(config.apply_env(lookup_from(&[(ENV_TIMEOUT_SECS, "soon")])).is_err());
        assert!(config.apply_env(lookup_from(&[(ENV_LOGIN_FLOW, "popup")])).is_err());
    }

    #[test]
    fn test_partial_config_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"backend": "mock", "endpoints": {"logout_method": "GET"}}"#)
                .unwrap();
        assert!(config.use_mock());
        assert_eq!(config.endpoints.logout_method, Method::Get);
        assert_eq!(config.endpoints.logout, "/auth/logout");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
