//! Client-side editor layer over a remote, hierarchical document store.
//!
//! Application code treats remote pages, blocks and databases as a local
//! object graph and synchronizes only the changed parts back:
//!
//! - `frame` - schema registry mapping internal keys to remote names/kinds
//! - `page` / `block` - entity editors with read caches, pending-write
//!   stashes and lazy creation
//! - `pagelist` / `database` - collection editors that own entity editors
//!   and mediate queries and bulk flushes
//! - `policy` - the write-if-absent overwrite policy
//! - `context` - the per-run registry and progress sink
//!
//! Transport and retry live in `folio-client`; wire shapes in `folio-api`.

pub mod block;
pub mod context;
pub mod database;
pub mod error;
pub mod frame;
pub mod id;
pub mod page;
pub mod pagelist;
pub mod policy;

#[cfg(test)]
mod editor_tests;

pub use block::{BlockEditor, Children};
pub use context::{
    EntityRegistry, ProgressSink, SilentProgress, Stopwatch, SyncContext, TracingProgress,
};
pub use database::DatabaseEditor;
pub use error::{EditorError, Result};
pub use frame::{FrameUnit, PropertyFrame};
pub use id::IdCell;
pub use page::{CachedProperty, PageEditor, ParentLink, SharedFrame, WriteOutcome};
pub use pagelist::{run_raw_query, BatchOutcome, PageList, Query};
pub use policy::{EmptinessRule, WritePolicy};
