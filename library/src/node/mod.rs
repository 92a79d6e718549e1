//! The contact sheet selector node: execution entry point and fingerprint.
//!
//! `execute` emits the sub-batch picked on a *previous* run and publishes
//! previews of the current batch for the UI; `fingerprint` lets the host
//! engine decide whether a re-run would produce a different output.

pub mod schema;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::error::NodeError;
use crate::frame::FrameBatch;
use crate::preview::{PreviewCache, SharedPreviewCache, previews_for_batch};
use crate::selection::{SelectionStore, SharedSelectionStore};

/// Fallback id used when the engine supplies no execution context. All such
/// invocations share a single selection state.
pub const DEFAULT_NODE_ID: &str = "ContactSheetSelector";

/// Per-run identity supplied by the execution engine.
#[derive(Clone, Debug)]
pub struct ExecutingContext {
    pub prompt_id: String,
    pub node_id: String,
}

/// UI side-channel payload describing one contact sheet.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContactSheetUi {
    pub images: Vec<String>,
    pub selected_active: Vec<usize>,
    pub selected_next: Vec<usize>,
    pub columns: u32,
    pub batch_size: usize,
}

/// Result of one node invocation.
#[derive(Clone, Debug)]
pub struct NodeOutput {
    pub selected_images: FrameBatch,
    pub ui: ContactSheetUi,
}

/// Convert the host-supplied `columns` parameter to a plain integer.
///
/// Accepts a JSON integer or a single-element integer array; any other
/// representation is a type error. Values below zero clamp to zero, the
/// upper bound is enforced by the node schema.
pub fn columns_from_value(value: &Value) -> Result<u32, NodeError> {
    let raw = match value {
        Value::Number(number) => number.as_i64().ok_or_else(|| {
            NodeError::InvalidArgument(format!("columns must be an integer, got {}", number))
        })?,
        Value::Array(items) => match items.as_slice() {
            [] => 0,
            [Value::Number(number)] => number.as_i64().ok_or_else(|| {
                NodeError::InvalidArgument(format!("columns must be an integer, got {}", number))
            })?,
            _ => {
                return Err(NodeError::InvalidArgument(
                    "columns array must hold a single integer".to_string(),
                ));
            }
        },
        other => {
            return Err(NodeError::InvalidArgument(format!(
                "columns must be an integer, got {}",
                other
            )));
        }
    };
    Ok(raw.max(0) as u32)
}

/// A node that presents a grid of images and lets the user pick which ones
/// should be forwarded on the next execution.
pub struct ContactSheetSelector {
    store: SharedSelectionStore,
    cache: SharedPreviewCache,
}

impl ContactSheetSelector {
    /// Node wired to the process-wide store and cache.
    pub fn new() -> Self {
        Self {
            store: SelectionStore::shared(),
            cache: PreviewCache::shared(),
        }
    }

    /// Node with injected collaborators (tests, embedding hosts).
    pub fn with_components(store: SharedSelectionStore, cache: SharedPreviewCache) -> Self {
        Self { store, cache }
    }

    fn node_id(context: Option<&ExecutingContext>) -> String {
        match context {
            Some(context) => context.node_id.clone(),
            None => {
                warn!(
                    "Executing contact sheet selector without execution context; selections will be shared"
                );
                DEFAULT_NODE_ID.to_string()
            }
        }
    }

    /// Execute the node for one batch.
    pub fn execute(
        &self,
        images: &FrameBatch,
        columns: &Value,
        context: Option<&ExecutingContext>,
    ) -> Result<NodeOutput, NodeError> {
        let batch_size = images.len();
        let columns_value = columns_from_value(columns)?;
        let node_id = Self::node_id(context);

        let (selection_for_output, selection_for_next) =
            self.store.resolve_for_execution(&node_id, batch_size);

        info!(
            "Contact sheet execute node={} batch={} columns={} output_selection={:?} next_selection={:?}",
            node_id, batch_size, columns_value, selection_for_output, selection_for_next
        );

        if batch_size > 0 && selection_for_output.is_empty() {
            warn!(
                "Contact sheet node={} produced empty selection for non-empty batch",
                node_id
            );
        }

        let selected_images = images.gather(&selection_for_output);
        let preview_data = previews_for_batch(&self.cache, &node_id, images);

        Ok(NodeOutput {
            selected_images,
            ui: ContactSheetUi {
                images: preview_data,
                selected_active: selection_for_output,
                selected_next: selection_for_next,
                columns: columns_value,
                batch_size,
            },
        })
    }

    /// Fingerprint for the engine's staleness decision.
    ///
    /// Changes whenever the next resolved output would differ: it covers the
    /// pending selection if one is queued (else the active one), the last
    /// observed batch size and the columns parameter. `None` means no state
    /// exists yet and the engine should fall back to its default caching.
    /// Pure read; never mutates the store.
    pub fn fingerprint(
        &self,
        params: &serde_json::Map<String, Value>,
        context: Option<&ExecutingContext>,
    ) -> Option<Vec<u64>> {
        let node_id = Self::node_id(context);
        let snapshot = self.store.inspect(&node_id)?;

        let selection = snapshot.pending.unwrap_or(snapshot.active);
        let columns_value = params
            .get("columns")
            .and_then(|value| columns_from_value(value).ok())
            .unwrap_or(0);

        let mut fingerprint: Vec<u64> = selection.iter().map(|&idx| idx as u64).collect();
        fingerprint.push(snapshot.last_batch_size as u64);
        fingerprint.push(u64::from(columns_value));
        Some(fingerprint)
    }
}

impl Default for ContactSheetSelector {
    fn default() -> Self {
        Self::new()
    }
}
