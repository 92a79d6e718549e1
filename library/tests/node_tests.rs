//! End-to-end tests for the contact sheet selector node.
//!
//! Verifies the full flow: execute → queue a selection over the store →
//! re-execute → the queued picks govern the new output.

use std::sync::Arc;

use serde_json::json;

use contact_sheet::frame::{Frame, FrameBatch};
use contact_sheet::node::{ContactSheetSelector, ExecutingContext};
use contact_sheet::preview::{PreviewCache, batch_signature};
use contact_sheet::selection::SelectionStore;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn context(node_id: &str) -> ExecutingContext {
    ExecutingContext {
        prompt_id: "prompt-1".to_string(),
        node_id: node_id.to_string(),
    }
}

fn test_frame(seed: f32) -> Frame {
    let data: Vec<f32> = (0..8 * 8 * 3)
        .map(|i| ((i as f32) * 0.013 + seed).fract())
        .collect();
    Frame::new(8, 8, 3, data).unwrap()
}

fn test_batch(size: usize) -> FrameBatch {
    FrameBatch::new((0..size).map(|i| test_frame(i as f32 * 0.37)).collect()).unwrap()
}

fn test_node() -> (ContactSheetSelector, Arc<SelectionStore>, Arc<PreviewCache>) {
    let store = Arc::new(SelectionStore::new());
    let cache = Arc::new(PreviewCache::new());
    let node = ContactSheetSelector::with_components(Arc::clone(&store), Arc::clone(&cache));
    (node, store, cache)
}

#[test]
fn first_run_outputs_full_batch() {
    init_logging();
    let (node, _, _) = test_node();
    let images = test_batch(3);
    let ctx = context("node-a");

    let output = node.execute(&images, &json!(0), Some(&ctx)).unwrap();

    assert_eq!(output.selected_images.len(), 3);
    assert_eq!(output.ui.selected_active, vec![0, 1, 2]);
    assert_eq!(output.ui.selected_next, vec![0, 1, 2]);
    assert_eq!(output.ui.batch_size, 3);
    assert_eq!(output.ui.images.len(), 3);
    assert!(output.ui.images[0].starts_with("data:image/png;base64,"));
}

#[test]
fn queued_selection_applies_on_next_run() {
    init_logging();
    let (node, store, _) = test_node();
    let images = test_batch(3);
    let ctx = context("node-b");

    let first = node.execute(&images, &json!(0), Some(&ctx)).unwrap();
    assert_eq!(first.selected_images.len(), 3);

    store.queue_pending("node-b", &[2]);

    let second = node.execute(&images, &json!(0), Some(&ctx)).unwrap();
    assert_eq!(second.selected_images.len(), 1);
    assert_eq!(second.selected_images.get(0), images.get(2));
    assert_eq!(second.ui.selected_active, vec![2]);
    assert_eq!(second.ui.selected_next, vec![2]);
}

#[test]
fn shrinking_batch_discards_stale_pending() {
    init_logging();
    let (node, store, _) = test_node();
    let ctx = context("node-c");

    node.execute(&test_batch(2), &json!(0), Some(&ctx)).unwrap();
    // Valid when queued (the estimate expands to 6), stale by the next run.
    store.queue_pending("node-c", &[5]);

    let output = node.execute(&test_batch(1), &json!(0), Some(&ctx)).unwrap();
    assert_eq!(output.ui.selected_active, vec![0]);
    assert_eq!(output.selected_images.len(), 1);
}

#[test]
fn identical_batch_reuses_cached_previews() {
    init_logging();
    let (node, _, cache) = test_node();
    let images = test_batch(2);
    let ctx = context("node-d");

    node.execute(&images, &json!(0), Some(&ctx)).unwrap();

    // Replace the cached previews with sentinels under the same signature;
    // if the second run re-encoded, the sentinels would be overwritten.
    let sentinel = vec!["cached-0".to_string(), "cached-1".to_string()];
    cache.put("node-d", batch_signature(&images), sentinel.clone());

    let second = node.execute(&images, &json!(0), Some(&ctx)).unwrap();
    assert_eq!(second.ui.images, sentinel);
}

#[test]
fn reordered_batch_invalidates_previews() {
    init_logging();
    let (node, _, cache) = test_node();
    let images = test_batch(2);
    let reversed = FrameBatch::new(vec![
        images.get(1).unwrap().clone(),
        images.get(0).unwrap().clone(),
    ])
    .unwrap();
    let ctx = context("node-e");

    node.execute(&images, &json!(0), Some(&ctx)).unwrap();
    let sentinel = vec!["cached-0".to_string(), "cached-1".to_string()];
    cache.put("node-e", batch_signature(&images), sentinel.clone());

    let output = node.execute(&reversed, &json!(0), Some(&ctx)).unwrap();
    assert_ne!(output.ui.images, sentinel);
    assert!(output.ui.images[0].starts_with("data:image/png;base64,"));

    let (token, _) = cache.get("node-e").unwrap();
    assert_eq!(token, batch_signature(&reversed));
}

#[test]
fn fingerprint_absent_before_first_contact() {
    init_logging();
    let (node, _, _) = test_node();
    let ctx = context("node-f");

    assert_eq!(node.fingerprint(&serde_json::Map::new(), Some(&ctx)), None);
}

#[test]
fn fingerprint_changes_when_pending_is_queued() {
    init_logging();
    let (node, store, _) = test_node();
    let ctx = context("node-g");
    let mut params = serde_json::Map::new();
    params.insert("columns".to_string(), json!(0));

    node.execute(&test_batch(3), &json!(0), Some(&ctx)).unwrap();
    let before = node.fingerprint(&params, Some(&ctx)).unwrap();

    store.queue_pending("node-g", &[1]);
    let after = node.fingerprint(&params, Some(&ctx)).unwrap();
    assert_ne!(before, after);

    // Pure read: repeating the call observes the same state.
    assert_eq!(node.fingerprint(&params, Some(&ctx)).unwrap(), after);
    assert_eq!(store.inspect("node-g").unwrap().pending, Some(vec![1]));
}

#[test]
fn fingerprint_reflects_columns_parameter() {
    init_logging();
    let (node, _, _) = test_node();
    let ctx = context("node-h");

    node.execute(&test_batch(2), &json!(0), Some(&ctx)).unwrap();

    let mut narrow = serde_json::Map::new();
    narrow.insert("columns".to_string(), json!(2));
    let mut wide = serde_json::Map::new();
    wide.insert("columns".to_string(), json!(6));

    assert_ne!(
        node.fingerprint(&narrow, Some(&ctx)),
        node.fingerprint(&wide, Some(&ctx))
    );
}

#[test]
fn missing_context_falls_back_to_shared_identity() {
    init_logging();
    let (node, store, _) = test_node();

    node.execute(&test_batch(2), &json!(0), None).unwrap();

    let snapshot = store.inspect("ContactSheetSelector").unwrap();
    assert_eq!(snapshot.last_batch_size, 2);
}

#[test]
fn rejects_malformed_columns_parameter() {
    init_logging();
    let (node, _, _) = test_node();
    let ctx = context("node-i");

    let result = node.execute(&test_batch(1), &json!("wide"), Some(&ctx));
    assert!(result.is_err());
}

#[test]
fn empty_batch_executes_cleanly() {
    init_logging();
    let (node, _, _) = test_node();
    let ctx = context("node-j");

    let output = node
        .execute(&FrameBatch::empty(), &json!(0), Some(&ctx))
        .unwrap();
    assert!(output.selected_images.is_empty());
    assert_eq!(output.ui.batch_size, 0);
    assert!(output.ui.images.is_empty());
}
