//! The page-list collection editor: query-driven tracking of page editors
//! with lazy lookup indexes.
//!
//! The list owns every editor it hands out and never constructs two
//! editors for the same remote id. Indexes build on first access and drop
//! whenever new entities attach.

use std::collections::HashMap;

use serde_json::Value as Json;
use tracing::{debug, error, info};

use folio_api::{Filter, PageObject, QueryBody, Sort};
use folio_client::{Client, Gateway};

use crate::context::SyncContext;
use crate::error::{EditorError, Result};
use crate::id::IdCell;
use crate::page::{PageEditor, ParentLink, SharedFrame};
use crate::policy::WritePolicy;

/// A query under construction; run it through
/// [`PageList::run_query`].
#[derive(Debug, Clone, Default)]
pub struct Query {
    filter: Option<Filter>,
    sorts: Vec<Sort>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Cap the number of fetched results; the fetch stops at the cap and
    /// stays resumable server-side.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    fn body(&self) -> QueryBody {
        QueryBody {
            filter: self.filter.as_ref().map(Filter::encode),
            sorts: self.sorts.iter().map(Sort::encode).collect(),
            start_cursor: None,
            page_size: None,
        }
    }
}

/// Outcome of a bulk flush: how many entities saved, and which failed.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub saved: usize,
    pub failed: Vec<(String, EditorError)>,
}

impl BatchOutcome {
    pub fn all_saved(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct PageList {
    database: IdCell,
    frame: SharedFrame,
    policy: WritePolicy,
    entries: Vec<PageEditor>,
    by_id: Option<HashMap<String, usize>>,
    by_title: Option<HashMap<String, usize>>,
    by_value: Option<HashMap<(String, String), Vec<usize>>>,
}

impl PageList {
    pub fn new(database: IdCell, frame: SharedFrame, policy: WritePolicy) -> Self {
        Self {
            database,
            frame,
            policy,
            entries: Vec::new(),
            by_id: None,
            by_title: None,
            by_value: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageEditor> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PageEditor> {
        self.invalidate_indexes();
        self.entries.iter_mut()
    }

    /// Start building a query against this collection's database.
    pub fn open_query(&self) -> Query {
        Query::new()
    }

    /// Run a query and absorb the results: existing editors update in
    /// place (matched by id), unseen ids get new editors.
    pub async fn run_query(
        &mut self,
        client: &Client,
        ctx: &mut SyncContext,
        query: Query,
    ) -> Result<usize> {
        let database_id = self.database.require()?;
        let _timer = ctx.stopwatch("pages.query");

        let gateway = Gateway::query(&database_id, query.body());
        let state = client.paginate(&gateway, query.limit(), None).await?;
        let count = state.results.len();

        for fragment in state.results {
            let object: PageObject =
                serde_json::from_value(fragment).map_err(|e| EditorError::BadResponse {
                    message: format!("invalid page object in query results: {}", e),
                })?;
            self.attach(&object, ctx);
        }
        info!(
            "[PageList] Query on {} returned {} pages ({} tracked)",
            database_id,
            count,
            self.entries.len()
        );
        Ok(count)
    }

    /// Track a fetched page object, deduplicating by id.
    pub fn attach(&mut self, object: &PageObject, ctx: &mut SyncContext) -> &mut PageEditor {
        self.invalidate_indexes();
        let pos = self
            .entries
            .iter()
            .position(|e| e.id().as_deref() == Some(object.id.as_str()));
        let index = match pos {
            Some(index) => {
                self.entries[index].apply_object(object);
                index
            }
            None => {
                self.entries.push(PageEditor::from_object(
                    self.frame.clone(),
                    self.policy.clone(),
                    object,
                ));
                self.entries.len() - 1
            }
        };
        let editor = &mut self.entries[index];
        ctx.registry
            .bind(&object.id, editor.title().unwrap_or_default());
        editor
    }

    /// A new Uncreated page parented on this collection's database. The
    /// parent id resolves at save time through the shared cell, so this
    /// works even while the database itself is pending creation.
    pub fn create_new(&mut self) -> &mut PageEditor {
        self.invalidate_indexes();
        self.entries.push(PageEditor::create_under(
            self.frame.clone(),
            self.policy.clone(),
            ParentLink::Database(self.database.clone()),
        ));
        self.entries.last_mut().expect("just pushed")
    }

    fn invalidate_indexes(&mut self) {
        self.by_id = None;
        self.by_title = None;
        self.by_value = None;
    }

    fn ensure_id_index(&mut self) {
        if self.by_id.is_none() {
            self.by_id = Some(
                self.entries
                    .iter()
                    .enumerate()
                    .filter_map(|(i, e)| e.id().map(|id| (id, i)))
                    .collect(),
            );
        }
    }

    fn ensure_title_index(&mut self) {
        if self.by_title.is_none() {
            self.by_title = Some(
                self.entries
                    .iter()
                    .enumerate()
                    .filter_map(|(i, e)| e.title().map(|t| (t, i)))
                    .collect(),
            );
        }
    }

    fn ensure_value_index(&mut self) {
        if self.by_value.is_none() {
            let mut index: HashMap<(String, String), Vec<usize>> = HashMap::new();
            for (i, entry) in self.entries.iter().enumerate() {
                for key in entry.cached_names() {
                    if let Some(plain) = entry.plain_by_name(&key) {
                        index.entry((key, plain)).or_default().push(i);
                    }
                }
            }
            self.by_value = Some(index);
        }
    }

    pub fn page_by_id(&mut self, id: &str) -> Option<&mut PageEditor> {
        self.ensure_id_index();
        let index = self.by_id.as_ref().and_then(|m| m.get(id).copied())?;
        self.entries.get_mut(index)
    }

    pub fn page_by_title(&mut self, title: &str) -> Option<&mut PageEditor> {
        self.ensure_title_index();
        let index = self.by_title.as_ref().and_then(|m| m.get(title).copied())?;
        self.entries.get_mut(index)
    }

    /// All tracked pages whose property `name` flattens to `value`.
    pub fn find_by_value(&mut self, name: &str, value: &str) -> Vec<&PageEditor> {
        self.ensure_value_index();
        let indices = self
            .by_value
            .as_ref()
            .and_then(|m| m.get(&(name.to_string(), value.to_string())))
            .cloned()
            .unwrap_or_default();
        indices
            .into_iter()
            .filter_map(|i| self.entries.get(i))
            .collect()
    }

    /// Flush every entity with pending state. Per-entity transport errors
    /// are logged and collected so one bad page never aborts the batch;
    /// configuration mistakes propagate immediately.
    pub async fn execute(
        &mut self,
        client: &Client,
        ctx: &mut SyncContext,
    ) -> Result<BatchOutcome> {
        let _timer = ctx.stopwatch("pages.flush");
        let mut outcome = BatchOutcome::default();
        for entry in &mut self.entries {
            if !entry.yet_uncreated() && !entry.has_pending() {
                continue;
            }
            let label = entry
                .id()
                .or_else(|| entry.title())
                .unwrap_or_else(|| "<new page>".to_string());
            match entry.save(client, ctx).await {
                Ok(()) => outcome.saved += 1,
                Err(err) if err.is_per_entity() => {
                    error!("[PageList] Saving {} failed: {}", label, err);
                    outcome.failed.push((label, err));
                }
                Err(err) => return Err(err),
            }
        }
        self.invalidate_indexes();
        debug!(
            "[PageList] Flush complete: {} saved, {} failed",
            outcome.saved,
            outcome.failed.len()
        );
        Ok(outcome)
    }
}

/// Raw query escape hatch: run an arbitrary predicate body against a
/// database without going through the filter builders.
pub async fn run_raw_query(
    client: &Client,
    database_id: &str,
    raw_filter: Json,
    limit: Option<usize>,
) -> Result<Vec<Json>> {
    let body = QueryBody {
        filter: Some(raw_filter),
        sorts: Vec::new(),
        start_cursor: None,
        page_size: None,
    };
    let state = client
        .paginate(&Gateway::query(database_id, body), limit, None)
        .await?;
    Ok(state.results)
}
