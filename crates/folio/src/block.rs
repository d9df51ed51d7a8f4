//! Block editors and their child collections.
//!
//! Children split into two sets: already-fetched blocks flush as per-block
//! updates, newly-created blocks batch into append chunks. Consecutive new
//! leaf blocks share one append call; a new container closes its chunk,
//! because its own id must exist before its children's appends can target
//! it. `save()` applies fetched updates first, then chunks in creation
//! order, so edits land top to bottom however deeply they were expressed.

use std::future::Future;
use std::pin::Pin;

use serde_json::{json, Value as Json};
use tracing::{debug, info};

use folio_api::{BlockContent, BlockObject, PagedBody};
use folio_client::{Client, Gateway};

use crate::context::SyncContext;
use crate::error::{EditorError, Result};
use crate::id::IdCell;

pub struct BlockEditor {
    id: IdCell,
    parent: IdCell,
    archived: bool,
    archived_dirty: bool,
    content: BlockContent,
    content_dirty: bool,
    has_children_remote: bool,
    children: Children,
}

impl BlockEditor {
    /// An Uncreated block that will be appended under `parent`.
    pub fn create_under(parent: IdCell, content: BlockContent) -> Self {
        let id = IdCell::unset();
        Self {
            children: Children::new(id.clone()),
            id,
            parent,
            archived: false,
            archived_dirty: false,
            content,
            content_dirty: false,
            has_children_remote: false,
        }
    }

    /// An editor over an already-fetched block object.
    pub fn from_object(object: &BlockObject) -> Self {
        let id = IdCell::known(&object.id);
        Self {
            children: Children::new(id.clone()),
            id,
            parent: object
                .parent
                .as_ref()
                .and_then(|p| p.id())
                .map(IdCell::known)
                .unwrap_or_default(),
            archived: object.archived,
            archived_dirty: false,
            content: BlockContent::parse(&object.kind, object.payload()),
            content_dirty: false,
            has_children_remote: object.has_children,
        }
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
    /// block with `false` un-archives it.
    pub fn set_archived(&mut self, archived: bool) {
        if self.archived != archived {
            self.archived = archived;
            self.archived_dirty = true;
        }
    }

    pub fn content(&self) -> &BlockContent {
        &self.content
    }

    /// Mutable content access; marks the block dirty.
    pub fn content_mut(&mut self) -> &mut BlockContent {
        self.content_dirty = true;
        &mut self.content
    }

    pub fn set_content(&mut self, content: BlockContent) {
        self.content = content;
        self.content_dirty = true;
    }

    pub fn plain_text(&self) -> String {
        self.content.plain_text()
    }

    /// Whether the remote store reported children under this block.
    pub fn has_children_remote(&self) -> bool {
        self.has_children_remote
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Children {
        &mut self.children
    }

    /// Queue a new child block beneath this one.
    pub fn create_child(&mut self, content: BlockContent) -> &mut BlockEditor {
        self.children.create_new(content)
    }

    /// Refresh from a fetched object. Pending local content and archived
    /// edits win over the fetched state until the next save.
    pub fn apply_object(&mut self, object: &BlockObject) {
        self.id.set(&object.id);
        if !self.archived_dirty {
            self.archived = object.archived;
        }
        self.has_children_remote = object.has_children;
        if !self.content_dirty {
            self.content = BlockContent::parse(&object.kind, object.payload());
        }
    }

    /// Fetch one page-worth (or `limit`) of children into the fetched set.
    pub async fn fetch_children(
        &mut self,
        client: &Client,
        limit: Option<usize>,
    ) -> Result<usize> {
        let id = self.id.get().ok_or(EditorError::Uncreated)?;
        let state = client
            .paginate(&Gateway::list_children(&id), limit, None)
            .await?;
        let mut count = 0;
        for fragment in &state.results {
            let object: BlockObject = serde_json::from_value(fragment.clone())
                .map_err(|e| EditorError::BadResponse {
                    message: format!("invalid block object: {}", e),
                })?;
            self.children.attach_object(&object);
            count += 1;
        }
        debug!("[BlockEditor] Fetched {} children of {}", count, id);
        Ok(count)
    }

    /// Archive this block remotely, effective immediately.
    pub async fn delete(&mut self, client: &Client) -> Result<()> {
        let id = self.id.get().ok_or(EditorError::Uncreated)?;
        client.execute(&Gateway::delete_block(&id)).await?;
        self.archived = true;
        self.archived_dirty = false;
        info!("[BlockEditor] Archived block {}", id);
        Ok(())
    }

    /// Clear the archived flag remotely, effective immediately.
    pub async fn restore(&mut self, client: &Client) -> Result<()> {
        let id = self.id.get().ok_or(EditorError::Uncreated)?;
        client
            .execute(&Gateway::update_block(&id, json!({ "archived": false })))
            .await?;
        self.archived = false;
        self.archived_dirty = false;
        Ok(())
    }

    /// Flush this block and its children: own create/update first, then
    /// the child collection. An archived block still flushes its own
    /// pending edits (saving with `archived == false` un-archives it) but
    /// its children are not descended into.
    pub async fn save(&mut self, client: &Client, ctx: &mut SyncContext) -> Result<()> {
        if self.id.is_unset() {
            let parent_id = self.parent.require()?;
            let gateway = Gateway::append_children(&parent_id, vec![self.content.encode()]);
            let response = client.execute(&gateway).await?;
            let body: PagedBody<BlockObject> = serde_json::from_value(response)
                .map_err(|e| EditorError::BadResponse {
                    message: format!("invalid append response: {}", e),
                })?;
            let object = body.results.first().ok_or_else(|| EditorError::BadResponse {
                message: "append response carried no results".to_string(),
            })?;
            self.id.set(&object.id);
            self.content_dirty = false;
            ctx.registry.bind(&object.id, self.plain_text());
            info!("[BlockEditor] Created block {} under {}", object.id, parent_id);
        } else if self.content_dirty || self.archived_dirty {
            let id = self.id.get().ok_or(EditorError::Uncreated)?;
            let mut body = json!({});
            if self.content_dirty {
                let encoded = self.content.encode();
                let wire_type = self.content.wire_type();
                body[wire_type] = encoded[wire_type].clone();
            }
            if self.archived_dirty {
                body["archived"] = json!(self.archived);
            }
            client.execute(&Gateway::update_block(&id, body)).await?;
            self.content_dirty = false;
            self.archived_dirty = false;
            debug!("[BlockEditor] Updated block {}", id);
        }

        if self.archived {
            debug!(
                "[BlockEditor] Not descending into archived block {:?}",
                self.id.get()
            );
            return Ok(());
        }
        self.children.save(client, ctx).await
    }
}

/// The child collection of one block (or page treated as a block root).
pub struct Children {
    owner: IdCell,
    fetched: Vec<BlockEditor>,
    fresh: Vec<BlockEditor>,
}

impl Children {
    pub fn new(owner: IdCell) -> Self {
        Self {
            owner,
            fetched: Vec::new(),
            fresh: Vec::new(),
        }
    }

    pub fn fetched(&self) -> &[BlockEditor] {
        &self.fetched
    }

    pub fn fetched_mut(&mut self) -> &mut [BlockEditor] {
        &mut self.fetched
    }

    pub fn fresh_count(&self) -> usize {
        self.fresh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetched.is_empty() && self.fresh.is_empty()
    }

    /// Queue a new block in the Uncreated state. Its parent id forwards to
    /// the owner's id cell, resolved at save time.
    pub fn create_new(&mut self, content: BlockContent) -> &mut BlockEditor {
        self.fresh
            .push(BlockEditor::create_under(self.owner.clone(), content));
        self.fresh.last_mut().expect("just pushed")
    }

    /// Track a fetched block object: update the existing editor for its id
    /// or construct a new one. Never duplicates an editor.
    pub fn attach_object(&mut self, object: &BlockObject) -> &mut BlockEditor {
        let pos = self
            .fetched
            .iter()
            .position(|b| b.id().as_deref() == Some(object.id.as_str()));
        match pos {
            Some(index) => {
                self.fetched[index].apply_object(object);
                &mut self.fetched[index]
            }
            None => {
                self.fetched.push(BlockEditor::from_object(object));
                self.fetched.last_mut().expect("just pushed")
            }
        }
    }

    /// Flush the collection in deterministic order:
    /// 1. per-block updates of already-fetched children,
    /// 2. append chunks of new children in creation order, descending into
    ///    each container right after its chunk so parents exist before
    ///    descendants,
    /// 3. move the created blocks into the fetched set.
    pub fn save<'a>(
        &'a mut self,
        client: &'a Client,
        ctx: &'a mut SyncContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            for child in &mut self.fetched {
                child.save(client, ctx).await?;
            }

            if self.fresh.is_empty() {
                return Ok(());
            }
            let owner_id = self.owner.require()?;

            let fresh = std::mem::take(&mut self.fresh);
            let mut chunks: Vec<Vec<BlockEditor>> = Vec::new();
            let mut current: Vec<BlockEditor> = Vec::new();
            for block in fresh {
                let closes_chunk = block.content().can_have_children();
                current.push(block);
                if closes_chunk {
                    chunks.push(std::mem::take(&mut current));
                }
            }
            if !current.is_empty() {
                chunks.push(current);
            }

            for mut chunk in chunks {
                let encoded: Vec<Json> =
                    chunk.iter().map(|b| b.content().encode()).collect();
                let gateway = Gateway::append_children(&owner_id, encoded);
                let response = client.execute(&gateway).await?;
                let body: PagedBody<BlockObject> = serde_json::from_value(response)
                    .map_err(|e| EditorError::BadResponse {
                        message: format!("invalid append response: {}", e),
                    })?;
                if body.results.len() != chunk.len() {
                    return Err(EditorError::BadResponse {
                        message: format!(
                            "append under {} returned {} results for {} blocks",
                            owner_id,
                            body.results.len(),
                            chunk.len()
                        ),
                    });
                }
                for (block, object) in chunk.iter_mut().zip(body.results.iter()) {
                    block.id.set(&object.id);
                    block.content_dirty = false;
                    ctx.registry.bind(&object.id, block.plain_text());
                }
                debug!(
                    "[Children] Appended {} blocks under {}",
                    chunk.len(),
                    owner_id
                );
                // Containers flush their own queued children now that
                // their ids exist.
                for block in &mut chunk {
                    if block.children.fresh_count() > 0 {
                        block.children.save(client, ctx).await?;
                    }
                }
                self.fetched.extend(chunk);
            }
            Ok(())
        })
    }
}
