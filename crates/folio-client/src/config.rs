use crate::error::{ClientError, Result};

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "FOLIO_API_TOKEN";

/// Default base URL of the remote store.
pub const DEFAULT_BASE_URL: &str = "https://api.folio.dev/v1";

/// Wire schema version sent with every request.
pub const API_VERSION: &str = "2024-05-01";

/// Connection configuration, resolved once at client construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub token: String,
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Read the bearer token from the process environment. A missing or
    /// empty token is a fatal configuration error, never retried.
    pub fn from_env() -> Result<Self> {
        match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token)),
            _ => Err(ClientError::Config {
                message: format!("{} is not set", TOKEN_ENV),
            }),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}
