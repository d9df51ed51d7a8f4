//! The database editor: a frame plus the page list that queries it.

use std::sync::{Arc, RwLock};

use tracing::info;

use folio_api::{DatabaseObject, RichText};
use folio_client::{Client, Gateway};

use crate::context::SyncContext;
use crate::error::{EditorError, Result};
use crate::frame::PropertyFrame;
use crate::id::IdCell;
use crate::page::{PageEditor, SharedFrame};
use crate::pagelist::{PageList, Query};
use crate::policy::WritePolicy;

pub struct DatabaseEditor {
    id: IdCell,
    title: String,
    frame: SharedFrame,
    pages: PageList,
}

impl DatabaseEditor {
    /// Open an editor over a known remote database. The frame may be
    /// under-specified; `load_schema` or any parsed response completes it.
    pub fn new(id: &str, frame: PropertyFrame, policy: WritePolicy) -> Self {
        let id = IdCell::known(id);
        let frame: SharedFrame = Arc::new(RwLock::new(frame));
        let pages = PageList::new(id.clone(), frame.clone(), policy);
        Self {
            id,
            title: String::new(),
            frame,
            pages,
        }
    }

    pub fn id(&self) -> Option<String> {
        self.id.get()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn frame(&self) -> SharedFrame {
        self.frame.clone()
    }

    /// Fetch the remote schema and teach it to the frame, sparing the
    /// frame from having to learn types one query at a time. A deleted
    /// database returns `Ok(false)`.
    pub async fn load_schema(&mut self, client: &Client) -> Result<bool> {
        let id = self.id.get().ok_or(EditorError::Uncreated)?;
        let response = match client
            .execute_optional(&Gateway::retrieve_database(&id))
            .await?
        {
            None => return Ok(false),
            Some(response) => response,
        };
        let object: DatabaseObject =
            serde_json::from_value(response).map_err(|e| EditorError::BadResponse {
                message: format!("invalid database object: {}", e),
            })?;
        self.title = RichText::parse(&object.title).plain_text();
        self.frame
            .write()
            .expect("frame poisoned")
            .learn_schema(&object.properties);
        info!(
            "[DatabaseEditor] Loaded schema of '{}' ({} fields)",
            self.title,
            object.properties.len()
        );
        Ok(true)
    }

    pub fn open_query(&self) -> Query {
        self.pages.open_query()
    }

    /// Run a query and absorb results into the page list.
    pub async fn run_query(
        &mut self,
        client: &Client,
        ctx: &mut SyncContext,
        query: Query,
    ) -> Result<usize> {
        self.pages.run_query(client, ctx, query).await
    }

    pub fn pages(&self) -> &PageList {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut PageList {
        &mut self.pages
    }

    /// A new Uncreated page in this database.
    pub fn create_page(&mut self) -> &mut PageEditor {
        self.pages.create_new()
    }
}
