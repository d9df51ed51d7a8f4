//! Editor scenarios against the fake transport: state transitions, write
//! policy, deferred parent resolution, chunked child flushes and batch
//! isolation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::{json, Value as Json};

use folio_api::{BlockContent, PropertyValue, RichText};
use folio_client::{Client, FakeTransport, Method, RetryPolicy};

use crate::context::SyncContext;
use crate::error::EditorError;
use crate::frame::PropertyFrame;
use crate::id::IdCell;
use crate::page::{PageEditor, ParentLink, SharedFrame, WriteOutcome};
use crate::pagelist::PageList;
use crate::policy::WritePolicy;

fn quick_client(fake: &Arc<FakeTransport>) -> Client {
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
    };
    Client::new(fake.clone(), policy)
}

fn shared_frame() -> SharedFrame {
    let frame = PropertyFrame::seeded([("title", "Name"), ("note", "Note")]).unwrap();
    Arc::new(RwLock::new(frame))
}

fn title_fragment(content: &str) -> Json {
    json!({
        "type": "title",
        "title": [{ "type": "text", "text": { "content": content, "link": null } }]
    })
}

fn page_response(id: &str, properties: Json) -> Json {
    json!({
        "id": id,
        "archived": false,
        "properties": properties,
        "url": format!("https://folio.dev/{}", id),
    })
}

fn block_results(ids: &[&str]) -> Json {
    json!({
        "results": ids
            .iter()
            .map(|id| json!({ "id": id, "type": "paragraph", "paragraph": { "rich_text": [] } }))
            .collect::<Vec<_>>(),
        "has_more": false,
        "next_cursor": null,
    })
}

#[tokio::test]
async fn test_create_transitions_uncreated_to_created() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let mut page = PageEditor::create_under(
        shared_frame(),
        WritePolicy::new(),
        ParentLink::Database(IdCell::known("db-1")),
    );
    assert!(page.yet_uncreated());
    assert!(page.read_at("title").is_none());

    let outcome = page
        .write_at("title", PropertyValue::Title(RichText::plain("Foo")))
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Stashed);

    fake.push_ok(page_response("p-1", json!({ "Name": title_fragment("Foo") })));
    page.save(&client, &mut ctx).await.unwrap();

    // One Create call, carrying the parent and the stash.
    assert_eq!(fake.calls(), 1);
    let request = &fake.requests()[0];
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "pages");
    let body = request.body.as_ref().unwrap();
    assert_eq!(body["parent"]["database_id"], "db-1");
    assert!(body["properties"]["Name"]["title"].is_array());

    // Created state: id from the response, stash empty, cache refreshed.
    assert!(!page.yet_uncreated());
    assert_eq!(page.id().as_deref(), Some("p-1"));
    assert!(!page.has_pending());
    assert_eq!(page.plain_at("title").as_deref(), Some("Foo"));

    // The registry learned the new id immediately.
    assert_eq!(ctx.registry.resolve("p-1"), Some("Foo"));
}

#[tokio::test]
async fn test_update_sends_only_the_stash() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let object = serde_json::from_value(page_response(
        "p-2",
        json!({
            "Name": title_fragment("Existing"),
            "Note": { "type": "rich_text", "rich_text": [] }
        }),
    ))
    .unwrap();
    let mut page = PageEditor::from_object(shared_frame(), WritePolicy::new(), &object);

    page.write_at("note", PropertyValue::Text(RichText::plain("annotated")))
        .unwrap();
    fake.push_ok(page_response(
        "p-2",
        json!({
            "Name": title_fragment("Existing"),
            "Note": { "type": "rich_text", "rich_text": [
                { "type": "text", "text": { "content": "annotated", "link": null } }
            ]}
        }),
    ));
    page.save(&client, &mut ctx).await.unwrap();

    let request = &fake.requests()[0];
    assert_eq!(request.method, Method::Patch);
    assert_eq!(request.path, "pages/p-2");
    let properties = request.body.as_ref().unwrap()["properties"].as_object().unwrap();
    // Only the stashed name, never a full snapshot.
    assert_eq!(properties.len(), 1);
    assert!(properties.contains_key("Note"));
}

#[tokio::test]
async fn test_write_policy_drops_second_write_against_existing_value() {
    let object = serde_json::from_value(page_response(
        "p-3",
        json!({ "Name": title_fragment("existing") }),
    ))
    .unwrap();
    let mut page = PageEditor::from_object(shared_frame(), WritePolicy::new(), &object);

    let outcome = page
        .write_at("title", PropertyValue::Title(RichText::plain("new")))
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Skipped);
    assert!(page.pending_properties().is_empty());

    // Overwrite mode applies the same write.
    page.policy_mut().set_overwrite(true);
    let outcome = page
        .write_at("title", PropertyValue::Title(RichText::plain("new")))
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Stashed);
    assert_eq!(page.pending_properties(), vec!["Name"]);
}

#[tokio::test]
async fn test_stash_keeps_last_write_per_name() {
    let mut page = PageEditor::create_under(
        shared_frame(),
        WritePolicy::new(),
        ParentLink::Database(IdCell::known("db-1")),
    );
    page.write_at("title", PropertyValue::Title(RichText::plain("first")))
        .unwrap();
    page.write_at("title", PropertyValue::Title(RichText::plain("second")))
        .unwrap();

    assert_eq!(page.pending_properties(), vec!["Name"]);
    match page.read_at("title") {
        None => {} // reads stay empty until created; the stash is separate
        Some(v) => panic!("uncreated page should read empty, got {:?}", v),
    }
}

#[tokio::test]
async fn test_unknown_key_and_read_only_writes_fail() {
    let mut page = PageEditor::create_under(
        shared_frame(),
        WritePolicy::new(),
        ParentLink::Database(IdCell::known("db-1")),
    );
    let err = page
        .write_at("missing", PropertyValue::Checkbox(true))
        .unwrap_err();
    assert!(matches!(err, EditorError::UnknownKey { .. }));

    let err = page
        .write_at(
            "note",
            PropertyValue::Formula(Box::new(PropertyValue::Number(Some(1.0)))),
        )
        .unwrap_err();
    assert!(matches!(err, EditorError::ReadOnlyProperty { .. }));
}

#[tokio::test]
async fn test_parent_id_resolves_transitively_at_save_time() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    // The owning database is itself uncreated when the child is requested.
    let database_cell = IdCell::unset();
    let mut list = PageList::new(database_cell.clone(), shared_frame(), WritePolicy::new());
    let page = list.create_new();
    page.write_at("title", PropertyValue::Title(RichText::plain("Child")))
        .unwrap();

    let err = page.save(&client, &mut ctx).await.unwrap_err();
    assert!(matches!(err, EditorError::ParentUnresolved));
    assert_eq!(fake.calls(), 0);

    // Once the owner's id exists, the same editor saves without rebinding.
    database_cell.set("db-9");
    fake.push_ok(page_response("p-9", json!({ "Name": title_fragment("Child") })));
    let page = list.page_by_title("Child");
    assert!(page.is_none(), "uncreated pages are not indexed by title yet");
    let page = list.iter_mut().next().unwrap();
    page.save(&client, &mut ctx).await.unwrap();

    let body = fake.requests()[0].body.clone().unwrap();
    assert_eq!(body["parent"]["database_id"], "db-9");
}

#[tokio::test]
async fn test_query_accumulates_pages_and_dedupes_by_id() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let page_json = |id: &str, name: &str| {
        json!({ "id": id, "archived": false, "properties": { "Name": title_fragment(name) } })
    };
    fake.push_ok(json!({
        "results": [page_json("p-1", "One"), page_json("p-2", "Two")],
        "has_more": true, "next_cursor": "c1"
    }));
    fake.push_ok(json!({
        "results": [page_json("p-3", "Three"), page_json("p-4", "Four")],
        "has_more": true, "next_cursor": "c2"
    }));
    fake.push_ok(json!({
        "results": [page_json("p-5", "Five"), page_json("p-6", "Six")],
        "has_more": false, "next_cursor": null
    }));

    let mut list = PageList::new(IdCell::known("db-1"), shared_frame(), WritePolicy::new());
    let query = list.open_query().with_limit(50);
    let fetched = list.run_query(&client, &mut ctx, query).await.unwrap();

    assert_eq!(fetched, 6);
    assert_eq!(list.len(), 6);
    assert_eq!(fake.calls(), 3);

    // A second query returning a known id updates in place.
    fake.push_ok(json!({
        "results": [page_json("p-1", "One renamed")],
        "has_more": false, "next_cursor": null
    }));
    list.run_query(&client, &mut ctx, list.open_query())
        .await
        .unwrap();
    assert_eq!(list.len(), 6);
    assert_eq!(
        list.page_by_id("p-1").unwrap().plain_at("title").as_deref(),
        Some("One renamed")
    );
    assert_eq!(ctx.registry.resolve("p-1"), Some("One renamed"));
}

#[tokio::test]
async fn test_lazy_value_index() {
    let mut ctx = SyncContext::silent();
    let mut list = PageList::new(IdCell::known("db-1"), shared_frame(), WritePolicy::new());
    for (id, name) in [("p-1", "Alpha"), ("p-2", "Beta"), ("p-3", "Alpha")] {
        let object = serde_json::from_value(page_response(
            id,
            json!({ "Name": title_fragment(name) }),
        ))
        .unwrap();
        list.attach(&object, &mut ctx);
    }
    let matches = list.find_by_value("Name", "Alpha");
    assert_eq!(matches.len(), 2);
    assert!(list.find_by_value("Name", "Gamma").is_empty());
}

#[tokio::test]
async fn test_children_flush_chunks_and_order() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let root_object = serde_json::from_value(json!({
        "id": "root",
        "type": "paragraph",
        "paragraph": { "rich_text": [] }
    }))
    .unwrap();
    let mut root = crate::block::BlockEditor::from_object(&root_object);

    // Two leaves, then a container holding its own new child, then a leaf.
    root.create_child(BlockContent::divider());
    root.create_child(BlockContent::code("x = 1", "python"));
    let toggle = root.create_child(BlockContent::toggle("details"));
    toggle.create_child(BlockContent::divider());
    root.create_child(BlockContent::divider());

    // Chunk 1: divider, code, toggle (the container closes its chunk).
    fake.push_ok(block_results(&["b-1", "b-2", "b-3"]));
    // The toggle's own child appends beneath the fresh id.
    fake.push_ok(block_results(&["b-4"]));
    // Chunk 2: the trailing leaf.
    fake.push_ok(block_results(&["b-5"]));

    root.save(&client, &mut ctx).await.unwrap();

    let requests = fake.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].path, "blocks/root/children");
    assert_eq!(requests[0].body.as_ref().unwrap()["children"].as_array().unwrap().len(), 3);
    assert_eq!(requests[1].path, "blocks/b-3/children");
    assert_eq!(requests[2].path, "blocks/root/children");

    // Every new block moved into the fetched set with its id assigned.
    assert_eq!(root.children().fresh_count(), 0);
    assert_eq!(root.children().fetched().len(), 4);
    let toggle = &root.children().fetched()[2];
    assert_eq!(toggle.id().as_deref(), Some("b-3"));
    assert_eq!(toggle.children().fetched().len(), 1);
    assert_eq!(toggle.children().fetched()[0].id().as_deref(), Some("b-4"));
}

#[tokio::test]
async fn test_append_calls_carry_idempotency_keys() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let mut block = crate::block::BlockEditor::create_under(
        IdCell::known("page-1"),
        BlockContent::paragraph("fresh"),
    );
    fake.push_ok(block_results(&["b-9"]));
    block.save(&client, &mut ctx).await.unwrap();

    assert_eq!(block.id().as_deref(), Some("b-9"));
    assert!(fake.requests()[0].idempotency_key.is_some());
}

#[tokio::test]
async fn test_batch_flush_isolates_per_entity_failures() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let mut list = PageList::new(
        IdCell::known("db-1"),
        shared_frame(),
        WritePolicy::overwrite(),
    );
    for (id, name) in [("p-1", "One"), ("p-2", "Two")] {
        let object = serde_json::from_value(page_response(
            id,
            json!({ "Name": title_fragment(name) }),
        ))
        .unwrap();
        list.attach(&object, &mut ctx);
    }
    for page in list.iter_mut() {
        page.write_at("note", PropertyValue::Text(RichText::plain("touched")))
            .unwrap();
    }

    // First update fails server-side; the second still flushes.
    fake.push_status(500, "boom");
    fake.push_ok(page_response("p-2", json!({ "Name": title_fragment("Two") })));

    let outcome = list.execute(&client, &mut ctx).await.unwrap();
    assert_eq!(outcome.saved, 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, "p-1");
    assert_eq!(fake.calls(), 2);
}

#[tokio::test]
async fn test_unarchive_via_save() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let object = serde_json::from_value(json!({
        "id": "p-8",
        "archived": true,
        "properties": { "Name": title_fragment("Stale") }
    }))
    .unwrap();
    let mut page = PageEditor::from_object(shared_frame(), WritePolicy::new(), &object);
    assert!(page.archived());

    page.set_archived(false);
    fake.push_ok(page_response("p-8", json!({ "Name": title_fragment("Stale") })));
    page.save(&client, &mut ctx).await.unwrap();

    let body = fake.requests()[0].body.clone().unwrap();
    assert_eq!(body["archived"], json!(false));
    assert!(!page.archived());
}

#[tokio::test]
async fn test_archived_block_still_flushes_its_own_edits() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let object = serde_json::from_value(json!({
        "id": "b-7",
        "archived": true,
        "type": "paragraph",
        "paragraph": { "rich_text": [] }
    }))
    .unwrap();
    let mut block = crate::block::BlockEditor::from_object(&object);
    assert!(block.archived());

    block.set_content(BlockContent::paragraph("kept"));
    block.set_archived(false);

    fake.push_ok(json!({}));
    block.save(&client, &mut ctx).await.unwrap();

    // One update carrying both the content edit and the un-archive.
    assert_eq!(fake.calls(), 1);
    let request = &fake.requests()[0];
    assert_eq!(request.path, "blocks/b-7");
    let body = request.body.as_ref().unwrap();
    assert_eq!(body["archived"], json!(false));
    assert!(body["paragraph"]["rich_text"].is_array());
    assert!(!block.archived());
}

#[tokio::test]
async fn test_archived_block_is_not_descended_into() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let object = serde_json::from_value(json!({
        "id": "b-8",
        "archived": true,
        "type": "toggle",
        "toggle": { "rich_text": [] }
    }))
    .unwrap();
    let mut block = crate::block::BlockEditor::from_object(&object);
    block.create_child(BlockContent::divider());

    block.save(&client, &mut ctx).await.unwrap();

    // Nothing pending on the block itself, and no descent while archived.
    assert_eq!(fake.calls(), 0);
    assert_eq!(block.children().fresh_count(), 1);
}

#[tokio::test]
async fn test_refresh_maps_missing_page_to_false() {
    let fake = Arc::new(FakeTransport::new());
    let client = quick_client(&fake);
    let mut ctx = SyncContext::silent();

    let object = serde_json::from_value(page_response(
        "p-7",
        json!({ "Name": title_fragment("Gone") }),
    ))
    .unwrap();
    let mut page = PageEditor::from_object(shared_frame(), WritePolicy::new(), &object);

    fake.push_status(404, "not found");
    let found = page.refresh(&client, &mut ctx).await.unwrap();
    assert!(!found);
}
