//! Shared remote-id cells.
//!
//! A child created under a not-yet-created parent cannot capture the
//! parent's id early; it holds a clone of the parent's cell instead and
//! reads it at save time, after the parent's own create has filled it.

use std::sync::{Arc, RwLock};

use crate::error::{EditorError, Result};

/// The remote id of one entity, shared between its editor and any children
/// waiting on it. Empty until the entity is created remotely.
#[derive(Debug, Clone, Default)]
pub struct IdCell(Arc<RwLock<Option<String>>>);

impl IdCell {
    /// An unset cell for an entity that does not exist remotely yet.
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn known(id: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(Some(id.into()))))
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().expect("id cell poisoned").clone()
    }

    pub fn is_unset(&self) -> bool {
        self.0.read().expect("id cell poisoned").is_none()
    }

    /// Fill the cell once the remote store has assigned an id.
    pub fn set(&self, id: impl Into<String>) {
        *self.0.write().expect("id cell poisoned") = Some(id.into());
    }

    /// The id, or `ParentUnresolved` when the owning entity was never
    /// saved.
    pub fn require(&self) -> Result<String> {
        self.get().ok_or(EditorError::ParentUnresolved)
    }
}
