//! Gateway/transport layer for the folio document store.
//!
//! - `config` - bearer-token configuration, read once from the environment
//! - `transport` - the `Transport` seam plus the reqwest-backed REST
//!   implementation
//! - `retry` - exponential-backoff retry as a first-class policy object
//! - `gateway` - one descriptor per logical remote operation, with
//!   cursor-following pagination
//! - `fake` - in-memory transport with scripted replies for tests and
//!   offline use

pub mod client;
pub mod config;
pub mod error;
pub mod fake;
pub mod gateway;
pub mod retry;
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, TOKEN_ENV};
pub use error::{optional, ClientError, Result};
pub use fake::FakeTransport;
pub use gateway::{CursorState, Gateway, OpKind, MAX_PAGE_SIZE};
pub use retry::{with_retry, RetryPolicy};
pub use transport::{Method, RestTransport, Transport, WireRequest, WireResponse};
