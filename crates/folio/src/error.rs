pub type Result<T> = std::result::Result<T, EditorError>;

/// Editor-layer errors.
///
/// Transport and wire errors pass through from the lower crates;
/// `UnknownKey`/`DuplicateKey` are frame configuration mistakes and
/// `ParentUnresolved` means a child was saved before the entity owning it
/// ever received a remote id.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Unknown property key '{key}'")]
    UnknownKey { key: String },

    #[error("Duplicate property key '{key}'")]
    DuplicateKey { key: String },

    #[error("Property '{name}' is read-only ({kind})")]
    ReadOnlyProperty { name: String, kind: String },

    #[error("Entity has no remote id yet")]
    Uncreated,

    #[error("Parent id is not resolved yet; save the parent first")]
    ParentUnresolved,

    #[error("Malformed response: {message}")]
    BadResponse { message: String },

    #[error(transparent)]
    Client(#[from] folio_client::ClientError),

    #[error(transparent)]
    Api(#[from] folio_api::ApiError),
}

impl EditorError {
    /// Whether a bulk operation may log this error and continue with the
    /// next entity. Configuration mistakes always propagate.
    pub fn is_per_entity(&self) -> bool {
        matches!(
            self,
            EditorError::Client(_) | EditorError::BadResponse { .. }
        )
    }
}
