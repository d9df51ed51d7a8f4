//! The page editor: last-known-read cache, pending-write stash, and the
//! create/update state machine.
//!
//! A page constructed without an id is Uncreated: reads are empty, writes
//! buffer, and the first `save()` issues a Create. Once created, `save()`
//! sends only the stash, never a full snapshot, and refreshes the read
//! cache from the response.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{json, Value as Json};
use tracing::{debug, info};

use folio_api::{parse_property, PageObject, PropertyKind, PropertyValue};
use folio_client::{Client, Gateway};

use crate::context::SyncContext;
use crate::error::{EditorError, Result};
use crate::frame::PropertyFrame;
use crate::id::IdCell;
use crate::policy::WritePolicy;

/// A frame shared by every editor of one database, so runtime type
/// learning benefits all of them.
pub type SharedFrame = Arc<RwLock<PropertyFrame>>;

/// Where a new page will be created.
#[derive(Debug, Clone)]
pub enum ParentLink {
    Database(IdCell),
    Page(IdCell),
    Block(IdCell),
}

impl ParentLink {
    /// Resolve to a wire parent reference. The id is read now, not at
    /// construction, so a parent created in the meantime resolves.
    fn encode(&self) -> Result<Json> {
        let body = match self {
            ParentLink::Database(cell) => {
                json!({ "type": "database_id", "database_id": cell.require()? })
            }
            ParentLink::Page(cell) => {
                json!({ "type": "page_id", "page_id": cell.require()? })
            }
            ParentLink::Block(cell) => {
                json!({ "type": "block_id", "block_id": cell.require()? })
            }
        };
        Ok(body)
    }
}

/// One cached remote property: typed value plus its flattened form.
#[derive(Debug, Clone)]
pub struct CachedProperty {
    pub kind: PropertyKind,
    pub value: PropertyValue,
    pub plain: String,
}

/// What `write_at` did with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value entered the stash and will be sent on the next save.
    Stashed,
    /// The cached remote value is non-empty and overwrite is off.
    Skipped,
}

impl WriteOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, WriteOutcome::Stashed)
    }
}

pub struct PageEditor {
    id: IdCell,
    parent: Option<ParentLink>,
    archived: bool,
    archived_dirty: bool,
    url: Option<String>,
    frame: SharedFrame,
    policy: WritePolicy,
    /// Last-known remote values, keyed by remote name.
    cache: HashMap<String, CachedProperty>,
    /// Pending writes in insertion order; one entry per name.
    stash: Vec<(String, PropertyValue)>,
}

impl PageEditor {
    /// An Uncreated page that will be created under `parent` on first save.
    pub fn create_under(frame: SharedFrame, policy: WritePolicy, parent: ParentLink) -> Self {
        Self {
            id: IdCell::unset(),
            parent: Some(parent),
            archived: false,
            archived_dirty: false,
            url: None,
            frame,
            policy,
            cache: HashMap::new(),
            stash: Vec::new(),
        }
    }

    /// An editor over an already-fetched page object.
    pub fn from_object(frame: SharedFrame, policy: WritePolicy, object: &PageObject) -> Self {
        let mut editor = Self {
            id: IdCell::known(&object.id),
            parent: None,
            archived: false,
            archived_dirty: false,
            url: None,
            frame,
            policy,
            cache: HashMap::new(),
            stash: Vec::new(),
        };
        editor.apply_object(object);
        editor
    }

    pub fn id(&self) -> Option<String> {
        self.id.get()
    }

    pub(crate) fn id_cell(&self) -> &IdCell {
        &self.id
    }

    pub fn yet_uncreated(&self) -> bool {
        self.id.is_unset()
    }

    pub fn archived(&self) -> bool {
        self.archived
    }

    /// Flip the archived flag; sent with the next save. Saving an archived
    /// page with `false` un-archives it.
    pub fn set_archived(&mut self, archived: bool) {
        if self.archived != archived {
            self.archived = archived;
            self.archived_dirty = true;
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn policy_mut(&mut self) -> &mut WritePolicy {
        &mut self.policy
    }

    /// Refresh id, flags and the read cache from a fetched object, and
    /// teach the frame any kinds it did not know.
    pub fn apply_object(&mut self, object: &PageObject) {
        self.id.set(&object.id);
        self.archived = object.archived;
        self.archived_dirty = false;
        self.url = object.url.clone();

        let mut frame = self.frame.write().expect("frame poisoned");
        self.cache.clear();
        for (name, fragment) in &object.properties {
            let parsed = parse_property(fragment);
            frame.learn(name, parsed.kind.clone());
            self.cache.insert(
                name.clone(),
                CachedProperty {
                    kind: parsed.kind,
                    value: parsed.value,
                    plain: parsed.plain,
                },
            );
        }
    }

    fn resolve_name(&self, key: &str) -> Option<String> {
        self.frame
            .read()
            .expect("frame poisoned")
            .key_to_name(key)
            .map(String::from)
    }

    /// Cached value under an internal key. Empty until the first fetch.
    pub fn read_at(&self, key: &str) -> Option<&PropertyValue> {
        let name = self.resolve_name(key)?;
        self.cache.get(&name).map(|c| &c.value)
    }

    /// Flattened cached value under an internal key.
    pub fn plain_at(&self, key: &str) -> Option<String> {
        let name = self.resolve_name(key)?;
        self.cache.get(&name).map(|c| c.plain.clone())
    }

    /// Remote names present in the read cache; the collection's value
    /// index walks these.
    pub(crate) fn cached_names(&self) -> Vec<String> {
        self.cache.keys().cloned().collect()
    }

    /// Flattened cached value under a remote name (not an internal key).
    pub(crate) fn plain_by_name(&self, name: &str) -> Option<String> {
        self.cache.get(name).map(|c| c.plain.clone())
    }

    /// The page's display title, from whichever property is the title.
    pub fn title(&self) -> Option<String> {
        self.cache
            .values()
            .find(|c| c.kind == PropertyKind::Title)
            .map(|c| c.plain.clone())
    }

    /// Buffer a write under an internal key.
    ///
    /// The write-if-absent policy applies here: with overwrite off and a
    /// non-empty cached value, the write is dropped and `Skipped` comes
    /// back. Within one flush the stash keeps one entry per name, last
    /// write wins.
    pub fn write_at(&mut self, key: &str, value: PropertyValue) -> Result<WriteOutcome> {
        let name = self
            .resolve_name(key)
            .ok_or_else(|| EditorError::UnknownKey {
                key: key.to_string(),
            })?;
        if !value.is_writable() {
            return Err(EditorError::ReadOnlyProperty {
                name,
                kind: value.kind().to_string(),
            });
        }
        let cached = self.cache.get(&name).map(|c| &c.value);
        if !self.policy.should_apply(&name, cached) {
            debug!(
                "[PageEditor] Skipping write to '{}': cached value present and overwrite off",
                name
            );
            return Ok(WriteOutcome::Skipped);
        }
        self.stash.retain(|(n, _)| n != &name);
        self.stash.push((name, value));
        Ok(WriteOutcome::Stashed)
    }

    pub fn has_pending(&self) -> bool {
        !self.stash.is_empty() || self.archived_dirty
    }

    /// Names with a pending write, in stash order.
    pub fn pending_properties(&self) -> Vec<&str> {
        self.stash.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn encode_stash(&self) -> Result<Json> {
        let mut properties = serde_json::Map::new();
        for (name, value) in &self.stash {
            properties.insert(name.clone(), value.encode()?);
        }
        Ok(Json::Object(properties))
    }

    /// Flush pending state: Create when Uncreated, otherwise an Update
    /// carrying only the stash. The cache refreshes from the response and
    /// the stash empties.
    pub async fn save(&mut self, client: &Client, ctx: &mut SyncContext) -> Result<()> {
        if !self.yet_uncreated() && !self.has_pending() {
            return Ok(());
        }
        let _timer = ctx.stopwatch("page.save");

        let response = if self.yet_uncreated() {
            let parent = self
                .parent
                .as_ref()
                .ok_or(EditorError::ParentUnresolved)?;
            let body = json!({
                "parent": parent.encode()?,
                "properties": self.encode_stash()?,
            });
            client.execute(&Gateway::create_page(body)).await?
        } else {
            let id = self.id.get().ok_or(EditorError::Uncreated)?;
            let mut body = json!({ "properties": self.encode_stash()? });
            if self.archived_dirty {
                body["archived"] = json!(self.archived);
            }
            client.execute(&Gateway::update_page(&id, body)).await?
        };

        let object: PageObject =
            serde_json::from_value(response).map_err(|e| EditorError::BadResponse {
                message: format!("invalid page object: {}", e),
            })?;
        let was_uncreated = self.yet_uncreated();
        self.stash.clear();
        self.apply_object(&object);

        let id = object.id.clone();
        ctx.registry.bind(&id, self.title().unwrap_or_default());
        if was_uncreated {
            info!("[PageEditor] Created page {}", id);
        } else {
            debug!("[PageEditor] Updated page {}", id);
        }
        Ok(())
    }

    /// Re-fetch the remote object. A page deleted or archived out from
    /// under us returns `Ok(false)` rather than an error.
    pub async fn refresh(&mut self, client: &Client, ctx: &mut SyncContext) -> Result<bool> {
        let id = self.id.get().ok_or(EditorError::Uncreated)?;
        match client
            .execute_optional(&Gateway::retrieve_page(&id))
            .await?
        {
            None => Ok(false),
            Some(response) => {
                let object: PageObject = serde_json::from_value(response).map_err(|e| {
                    EditorError::BadResponse {
                        message: format!("invalid page object: {}", e),
                    }
                })?;
                self.apply_object(&object);
                ctx.registry.bind(&object.id, self.title().unwrap_or_default());
                Ok(true)
            }
        }
    }
}
