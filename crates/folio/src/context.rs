//! Per-run synchronization context.
//!
//! One `SyncContext` is constructed at the start of a synchronization pass
//! and dropped at its end; nothing in it is global. It carries the
//! id-to-title registry used to resolve relation targets and the progress
//! sink collaborating modules inject for timing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

/// Injectable timing sink. Collaborating modules receive one instead of
/// wiring their own logging.
pub trait ProgressSink: Send + Sync {
    fn finish(&self, label: &str, elapsed: Duration);
}

/// Default sink: structured log lines.
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn finish(&self, label: &str, elapsed: Duration) {
        info!("[Progress] {} took {:?}", label, elapsed);
    }
}

/// Discards all timings; used by tests.
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn finish(&self, _label: &str, _elapsed: Duration) {}
}

/// Running timer handed out by [`SyncContext::stopwatch`]; reports on drop.
pub struct Stopwatch {
    sink: Arc<dyn ProgressSink>,
    label: String,
    started: Instant,
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        self.sink.finish(&self.label, self.started.elapsed());
    }
}

/// Maps remote ids to display titles for cross-reference resolution.
///
/// Stale entries are removed before new ones are inserted so a changed id
/// can never shadow a live one.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    titles: HashMap<String, String>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or replace the title for `id`.
    pub fn bind(&mut self, id: impl Into<String>, title: impl Into<String>) {
        let id = id.into();
        self.titles.remove(&id);
        self.titles.insert(id, title.into());
    }

    /// Move an entry whose id changed.
    pub fn rebind(
        &mut self,
        old_id: &str,
        new_id: impl Into<String>,
        title: impl Into<String>,
    ) {
        self.titles.remove(old_id);
        self.bind(new_id, title);
    }

    pub fn unbind(&mut self, id: &str) {
        self.titles.remove(id);
    }

    /// Display title for `id`, if known this run.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.titles.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Everything one synchronization pass shares.
pub struct SyncContext {
    pub registry: EntityRegistry,
    progress: Arc<dyn ProgressSink>,
}

impl SyncContext {
    pub fn new() -> Self {
        Self::with_progress(Arc::new(TracingProgress))
    }

    pub fn with_progress(progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            registry: EntityRegistry::new(),
            progress,
        }
    }

    /// A context that logs nothing; test suites use this.
    pub fn silent() -> Self {
        Self::with_progress(Arc::new(SilentProgress))
    }

    /// Start a timer for `label`; it reports through the sink on drop.
    pub fn stopwatch(&self, label: impl Into<String>) -> Stopwatch {
        Stopwatch {
            sink: Arc::clone(&self.progress),
            label: label.into(),
            started: Instant::now(),
        }
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new()
    }
}
