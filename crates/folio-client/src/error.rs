pub type Result<T> = std::result::Result<T, ClientError>;

/// Transport and gateway errors.
///
/// `Config` is fatal and never retried. `NotFound` maps eventual
/// consistency with externally edited data to an empty result at the call
/// site. The remaining variants split into transient (retryable) and fatal
/// per [`ClientError::is_transient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("HTTP {status} from {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("Request for {target} failed after {attempts} attempts: {source}")]
    RequestFailed {
        target: String,
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Whether a retry could plausibly succeed: rate limiting, server-side
    /// failures, network trouble, and bodies that failed to decode.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Api { status, .. } => *status == 429 || *status >= 500,
            ClientError::Transport { .. } | ClientError::Malformed { .. } => true,
            ClientError::Config { .. }
            | ClientError::NotFound { .. }
            | ClientError::RequestFailed { .. } => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Map a missing remote entity to `Ok(None)` instead of an error.
pub fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let rate_limited = ClientError::Api {
            status: 429,
            url: "u".to_string(),
            message: String::new(),
        };
        assert!(rate_limited.is_transient());

        let server_error = ClientError::Api {
            status: 503,
            url: "u".to_string(),
            message: String::new(),
        };
        assert!(server_error.is_transient());

        let bad_request = ClientError::Api {
            status: 400,
            url: "u".to_string(),
            message: String::new(),
        };
        assert!(!bad_request.is_transient());

        let config = ClientError::Config {
            message: "no token".to_string(),
        };
        assert!(!config.is_transient());
    }

    #[test]
    fn test_optional_maps_not_found() {
        let missing: Result<u32> = Err(ClientError::NotFound {
            url: "pages/x".to_string(),
        });
        assert_eq!(optional(missing).unwrap(), None);

        let present: Result<u32> = Ok(7);
        assert_eq!(optional(present).unwrap(), Some(7));
    }
}
