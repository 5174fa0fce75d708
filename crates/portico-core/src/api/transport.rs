//! The backend seam: the session client speaks to an `AuthTransport` and does
//! not know whether a real HTTP server or the in-memory mock answers.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
}

impl TransportRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self::new(status, String::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait AuthTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// Absolute location for a path, used when the browser is sent there directly.
    fn url_for(&self, path: &str) -> String {
        path.to_string()
    }
}

/// Transport against a real backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Offline(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl AuthTransport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.url_for(&request.path);
        debug!(method = request.method.as_str(), url = %url, "Sending auth request");

        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        let response = builder
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(Self::classify)?;
        debug!(status, bytes = body.len(), "Auth response received");

        Ok(TransportResponse { status, body })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_base_and_path() {
        let transport = HttpTransport::new("http://localhost:8080/", Duration::from_secs(5))
            .expect("client should build");
        assert_eq!(transport.base_url(), "http://localhost:8080");
        assert_eq!(transport.url_for("/auth/principal"), "http://localhost:8080/auth/principal");
        assert_eq!(transport.url_for("auth/logout"), "http://localhost:8080/auth/logout");
    }

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::empty(200).is_success());
        assert!(TransportResponse::empty(204).is_success());
        assert!(!TransportResponse::empty(301).is_success());
        assert!(!TransportResponse::empty(401).is_success());
        assert!(!TransportResponse::empty(500).is_success());
    }

    #[test]
    fn test_method_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Method::Post).unwrap(), "\"POST\"");
        let parsed: Method = serde_json::from_str("\"GET\"").unwrap();
        assert_eq!(parsed, Method::Get);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_offline_or_timeout() {
        // Port 9 on loopback is reserved for discard and is not expected to listen.
        let transport = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2))
            .expect("client should build");
        let result = transport
            .send(TransportRequest::new(Method::Get, "/auth/principal"))
            .await;
        assert!(matches!(
            result,
            Err(TransportError::Offline(_)) | Err(TransportError::Timeout)
        ));
    }
}
