//! The connection handle editors hold: a transport plus the retry policy
//! applied to idempotent operations.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::{optional, Result};
use crate::gateway::{CursorState, Gateway};
use crate::retry::RetryPolicy;
use crate::transport::{RestTransport, Transport, WireResponse};

#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Connect against the live REST API with the token from the
    /// environment. Fails fast when the token is absent.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        let transport = RestTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), RetryPolicy::default()))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute one gateway operation.
    pub async fn execute(&self, gateway: &Gateway) -> Result<WireResponse> {
        gateway.execute(self.transport.as_ref(), &self.policy).await
    }

    /// Execute a retrieve, mapping a missing entity to `Ok(None)`.
    pub async fn execute_optional(&self, gateway: &Gateway) -> Result<Option<WireResponse>> {
        optional(self.execute(gateway).await)
    }

    /// Run a paginated list/query operation to `limit` (or exhaustion).
    pub async fn paginate(
        &self,
        gateway: &Gateway,
        limit: Option<usize>,
        resume: Option<String>,
    ) -> Result<CursorState> {
        gateway
            .paginate(self.transport.as_ref(), &self.policy, limit, resume)
            .await
    }
}
