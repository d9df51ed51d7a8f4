//! One gateway descriptor per logical remote operation.
//!
//! A `Gateway` is an immutable request description; retry state lives in
//! the `with_retry` loop that executes it. Read and list operations retry
//! under the caller's policy. Write operations are not idempotent on the
//! wire, so they execute exactly once and carry a uuid idempotency key
//! that lets a server-side dedupe make any caller-level retry safe.

use serde_json::{json, Value as Json};
use tracing::debug;
use uuid::Uuid;

use folio_api::{PagedBody, QueryBody};

use crate::error::{ClientError, Result};
use crate::retry::{with_retry, RetryPolicy};
use crate::transport::{Method, Transport, WireRequest, WireResponse};

/// Server-side ceiling on one page of list/query results.
pub const MAX_PAGE_SIZE: u32 = 100;

/// The logical operation a gateway performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Retrieve,
    Create,
    Update,
    Delete,
    ListChildren,
    AppendChildren,
    Query,
    RetrieveSchema,
}

impl OpKind {
    /// Idempotent operations may retry automatically.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            OpKind::Retrieve | OpKind::ListChildren | OpKind::Query | OpKind::RetrieveSchema
        )
    }

    fn is_paginated(&self) -> bool {
        matches!(self, OpKind::ListChildren | OpKind::Query)
    }
}

/// Immutable descriptor of one remote operation.
#[derive(Debug, Clone)]
pub struct Gateway {
    kind: OpKind,
    method: Method,
    path: String,
    body: Option<Json>,
    idempotency_key: Option<String>,
}

impl Gateway {
    pub fn retrieve_page(id: &str) -> Self {
        Self {
            kind: OpKind::Retrieve,
            method: Method::Get,
            path: format!("pages/{}", id),
            body: None,
            idempotency_key: None,
        }
    }

    pub fn retrieve_block(id: &str) -> Self {
        Self {
            kind: OpKind::Retrieve,
            method: Method::Get,
            path: format!("blocks/{}", id),
            body: None,
            idempotency_key: None,
        }
    }

    pub fn retrieve_database(id: &str) -> Self {
        Self {
            kind: OpKind::RetrieveSchema,
            method: Method::Get,
            path: format!("databases/{}", id),
            body: None,
            idempotency_key: None,
        }
    }

    pub fn create_page(body: Json) -> Self {
        Self {
            kind: OpKind::Create,
            method: Method::Post,
            path: "pages".to_string(),
            body: Some(body),
            idempotency_key: Some(Uuid::new_v4().to_string()),
        }
    }

    pub fn update_page(id: &str, body: Json) -> Self {
        Self {
            kind: OpKind::Update,
            method: Method::Patch,
            path: format!("pages/{}", id),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn update_block(id: &str, body: Json) -> Self {
        Self {
            kind: OpKind::Update,
            method: Method::Patch,
            path: format!("blocks/{}", id),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn delete_block(id: &str) -> Self {
        Self {
            kind: OpKind::Delete,
            method: Method::Delete,
            path: format!("blocks/{}", id),
            body: None,
            idempotency_key: None,
        }
    }

    pub fn list_children(parent_id: &str) -> Self {
        Self {
            kind: OpKind::ListChildren,
            method: Method::Get,
            path: format!("blocks/{}/children", parent_id),
            body: None,
            idempotency_key: None,
        }
    }

    pub fn append_children(parent_id: &str, children: Vec<Json>) -> Self {
        Self {
            kind: OpKind::AppendChildren,
            method: Method::Patch,
            path: format!("blocks/{}/children", parent_id),
            body: Some(json!({ "children": children })),
            idempotency_key: Some(Uuid::new_v4().to_string()),
        }
    }

    pub fn query(database_id: &str, body: QueryBody) -> Self {
        let body = serde_json::to_value(&body)
            .unwrap_or_else(|_| json!({}));
        Self {
            kind: OpKind::Query,
            method: Method::Post,
            path: format!("databases/{}/query", database_id),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// The request path; doubles as the diagnosis target in errors.
    pub fn target(&self) -> &str {
        &self.path
    }

    /// Encode into a wire request. Pagination parameters apply only to
    /// list/query operations; lists take them in the query string, queries
    /// in the body.
    pub fn encode(&self, cursor: Option<&str>, page_size: Option<u32>) -> WireRequest {
        let mut request = match self.kind {
            OpKind::ListChildren => {
                let mut path = format!(
                    "{}?page_size={}",
                    self.path,
                    page_size.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE)
                );
                if let Some(cursor) = cursor {
                    path.push_str(&format!("&start_cursor={}", cursor));
                }
                WireRequest::get(path)
            }
            OpKind::Query => {
                let mut body = self.body.clone().unwrap_or_else(|| json!({}));
                body["page_size"] =
                    json!(page_size.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE));
                if let Some(cursor) = cursor {
                    body["start_cursor"] = json!(cursor);
                }
                WireRequest::post(self.path.clone(), body)
            }
            _ => match self.method {
                Method::Get => WireRequest::get(self.path.clone()),
                Method::Delete => WireRequest::delete(self.path.clone()),
                Method::Post => WireRequest::post(
                    self.path.clone(),
                    self.body.clone().unwrap_or_else(|| json!({})),
                ),
                Method::Patch => WireRequest::patch(
                    self.path.clone(),
                    self.body.clone().unwrap_or_else(|| json!({})),
                ),
            },
        };
        if request.idempotency_key.is_none() {
            request.idempotency_key = self.idempotency_key.clone();
        }
        request
    }

    /// Execute once, retrying under `policy` when the operation is
    /// idempotent. Write failures surface immediately.
    pub async fn execute(
        &self,
        transport: &dyn Transport,
        policy: &RetryPolicy,
    ) -> Result<WireResponse> {
        let request = self.encode(None, None);
        if self.kind.is_idempotent() {
            with_retry(policy, &self.path, || transport.send(&request)).await
        } else {
            transport.send(&request).await
        }
    }

    /// Follow cursors until the server is exhausted or `limit` results are
    /// accumulated. A reached limit returns a resumable cursor; pass it
    /// back as `resume` to continue.
    pub async fn paginate(
        &self,
        transport: &dyn Transport,
        policy: &RetryPolicy,
        limit: Option<usize>,
        resume: Option<String>,
    ) -> Result<CursorState> {
        debug_assert!(self.kind.is_paginated(), "paginate on {:?}", self.kind);

        let mut state = CursorState::default();
        let mut cursor = resume;
        loop {
            let remaining = limit.map(|l| l.saturating_sub(state.results.len()));
            if remaining == Some(0) {
                state.has_more = true;
                state.next_cursor = cursor;
                break;
            }
            let size = remaining
                .map(|r| (r.min(MAX_PAGE_SIZE as usize)) as u32)
                .unwrap_or(MAX_PAGE_SIZE);

            let request = self.encode(cursor.as_deref(), Some(size));
            let response =
                with_retry(policy, &self.path, || transport.send(&request)).await?;
            let page: PagedBody<Json> =
                serde_json::from_value(response).map_err(|e| ClientError::Malformed {
                    url: self.path.clone(),
                    message: format!("invalid list envelope: {}", e),
                })?;

            state.results.extend(page.results);
            debug!(
                "[Gateway] {} accumulated {} results, has_more={}",
                self.path,
                state.results.len(),
                page.has_more
            );

            if !page.has_more || page.next_cursor.is_none() {
                state.has_more = false;
                state.next_cursor = None;
                break;
            }
            cursor = page.next_cursor;
            if let Some(l) = limit {
                if state.results.len() >= l {
                    state.has_more = true;
                    state.next_cursor = cursor;
                    break;
                }
            }
        }
        Ok(state)
    }
}

/// Progress of one paginated fetch. Lives only for the duration of the
/// fetch; a capped fetch hands back `next_cursor` for resumption.
#[derive(Debug, Clone, Default)]
pub struct CursorState {
    pub results: Vec<Json>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}
