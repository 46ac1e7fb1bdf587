//! HTTP transport seam.
//!
//! The fetcher talks to a `Transport` so tests can script responses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, CACHE_CONTROL, CONTENT_TYPE};

use crate::error::{LogoError, Result};

/// Raw outcome of one GET. Status is checked by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

impl TransportResponse {
    /// A 200 response carrying `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            ..Default::default()
        }
    }

    /// A bodiless response with the given status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP GET.
///
/// Transport-level failures (DNS, connect, timeout, body read) are reported
/// as `LogoError::Network`; any received response is returned as-is.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}

// == Reqwest Transport ==
/// Production transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LogoError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LogoError::network(url, e.to_string()))?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let status = response.status().as_u16();
        let content_type = header(CONTENT_TYPE);
        let cache_control = header(CACHE_CONTROL);

        let body = response
            .bytes()
            .await
            .map_err(|e| LogoError::network(url, e.to_string()))?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
            content_type,
            cache_control,
        })
    }
}
