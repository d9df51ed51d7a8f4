//! The transport seam: one logical HTTP exchange per call.
//!
//! `Transport` is the only place the crate suspends; everything above it is
//! pure request building and response parsing. The REST implementation
//! carries the bearer header and the wire version on every request.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value as Json;
use tracing::{debug, error};

use crate::config::{ClientConfig, API_VERSION};
use crate::error::{ClientError, Result};

/// HTTP methods the gateway uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// One encoded request, ready for any `Transport`.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    /// Path relative to the base URL, including any query string.
    pub path: String,
    pub body: Option<Json>,
    /// Sent as an `Idempotency-Key` header when present, so a server-side
    /// dedupe can make caller-level retries of creates safe.
    pub idempotency_key: Option<String>,
}

impl WireRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            idempotency_key: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Json) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn patch(path: impl Into<String>, body: Json) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Parsed JSON response body.
pub type WireResponse = Json;

/// One logical remote exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse>;
}

/// reqwest-backed transport against the live REST API.
pub struct RestTransport {
    http: reqwest::Client,
    base_url: String,
    default_headers: HeaderMap,
}

impl RestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", config.token);
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&bearer).map_err(|_| ClientError::Config {
                message: "API token contains invalid header characters".to_string(),
            })?,
        );
        headers.insert("Folio-Version", HeaderValue::from_static(API_VERSION));

        // 30 second timeout, generous for slow networks.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_headers: headers,
        })
    }

    fn format_send_error(e: reqwest::Error, url: &str) -> ClientError {
        let message = if e.is_timeout() {
            "timeout - request took too long".to_string()
        } else if e.is_connect() {
            format!("connection error - check network and DNS: {}", e)
        } else if e.is_request() {
            format!("request error - malformed URL or parameters: {}", e)
        } else {
            e.to_string()
        };
        ClientError::Transport {
            url: url.to_string(),
            message,
        }
    }

    async fn handle_response(response: reqwest::Response, url: &str) -> Result<WireResponse> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport {
                url: url.to_string(),
                message: format!("failed to read response body: {}", e),
            })?;

        if status.as_u16() == 404 {
            return Err(ClientError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            let message = if body.len() > 500 {
                format!("{}... (truncated)", &body[..500])
            } else {
                body
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                url: url.to_string(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse> {
        let url = format!("{}/{}", self.base_url, request.path);
        debug!(
            "[RestTransport] {} {}",
            request.method.as_str(),
            request.path
        );

        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Patch => self.http.patch(&url),
            Method::Delete => self.http.delete(&url),
        };
        builder = builder.headers(self.default_headers.clone());
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let err = Self::format_send_error(e, &url);
            error!("[RestTransport] Send failed: {}", err);
            err
        })?;

        Self::handle_response(response, &url).await
    }
}
