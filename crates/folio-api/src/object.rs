//! Remote object shapes and list envelopes.
//!
//! These structs mirror what the store returns for pages, blocks and
//! databases, plus the `results`/`has_more`/`next_cursor` envelope every
//! list and query endpoint shares. Property payloads stay as raw fragments
//! here; typed parsing lives in [`crate::value`].

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Reference from an object to its parent container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParentRef {
    DatabaseId { database_id: String },
    PageId { page_id: String },
    BlockId { block_id: String },
    Workspace { workspace: bool },
}

impl ParentRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            ParentRef::DatabaseId { database_id } => Some(database_id),
            ParentRef::PageId { page_id } => Some(page_id),
            ParentRef::BlockId { block_id } => Some(block_id),
            ParentRef::Workspace { .. } => None,
        }
    }
}

/// A page object as returned by retrieve/create/update/query endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PageObject {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: serde_json::Map<String, Json>,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub last_edited_time: Option<String>,
}

/// A block object. The typed content payload sits under a key named after
/// `kind`; the remaining fields are kept raw for [`crate::content`] to
/// interpret.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockObject {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub has_children: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Json>,
}

impl BlockObject {
    /// The content payload fragment for this block's type.
    pub fn payload(&self) -> &Json {
        static NULL: Json = Json::Null;
        self.rest.get(&self.kind).unwrap_or(&NULL)
    }
}

/// A database object; `properties` maps field names to schema fragments
/// carrying at least a `type` field.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseObject {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub title: Json,
    #[serde(default)]
    pub properties: serde_json::Map<String, Json>,
}

/// The shared envelope of every list/query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PagedBody<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Request body for a database query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Json>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_ref_wire_shape() {
        let parent = ParentRef::DatabaseId {
            database_id: "db-1".to_string(),
        };
        let encoded = serde_json::to_value(&parent).unwrap();
        assert_eq!(
            encoded,
            serde_json::json!({ "type": "database_id", "database_id": "db-1" })
        );
        let decoded: ParentRef = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, parent);
        assert_eq!(decoded.id(), Some("db-1"));
    }

    #[test]
    fn test_page_object_defaults() {
        let page: PageObject =
            serde_json::from_value(serde_json::json!({ "id": "p-1" })).unwrap();
        assert_eq!(page.id, "p-1");
        assert!(!page.archived);
        assert!(page.properties.is_empty());
    }

    #[test]
    fn test_block_object_payload_lookup() {
        let block: BlockObject = serde_json::from_value(serde_json::json!({
            "id": "b-1",
            "type": "paragraph",
            "paragraph": { "rich_text": [] },
            "has_children": true
        }))
        .unwrap();
        assert_eq!(block.kind, "paragraph");
        assert!(block.has_children);
        assert!(block.payload().get("rich_text").is_some());
    }

    #[test]
    fn test_paged_body_defaults() {
        let body: PagedBody<Json> = serde_json::from_value(serde_json::json!({
            "results": [{ "id": "x" }]
        }))
        .unwrap();
        assert_eq!(body.results.len(), 1);
        assert!(!body.has_more);
        assert!(body.next_cursor.is_none());
    }

    #[test]
    fn test_query_body_omits_absent_fields() {
        let body = QueryBody {
            filter: None,
            sorts: vec![],
            start_cursor: None,
            page_size: Some(10),
        };
        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(encoded, serde_json::json!({ "page_size": 10 }));
    }
}
