use serde::{Deserialize, Serialize};

/// Structured error types for wire-level parsing and encoding.
///
/// Unknown property or block kinds are NOT errors - they parse to
/// `Unsupported` placeholders. These variants cover fragments that are
/// structurally broken, not merely unrecognized.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ApiError {
    #[error("Malformed property fragment for '{name}': {message}")]
    MalformedProperty { name: String, message: String },

    #[error("Malformed object: {message}")]
    MalformedObject { message: String },

    #[error("Value of kind {kind} cannot be written")]
    ReadOnlyValue { kind: String },
}
