//! Per-node selection lifecycle for the contact sheet selector.
//!
//! The store reconciles three independent timelines: the batch size observed
//! at execution time, a selection posted out-of-band by the UI, and the
//! execution schedule itself. A selection queued by the UI only takes effect
//! on the *next* run, because the UI update arrives after the node has
//! already executed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use once_cell::sync::Lazy;

pub type SharedSelectionStore = Arc<SelectionStore>;

static SHARED_STORE: Lazy<SharedSelectionStore> = Lazy::new(|| Arc::new(SelectionStore::new()));

/// Selection lifecycle state for one node id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeSelectionState {
    /// Unique, ascending indices governing the current run and serving as
    /// the baseline for the next one.
    pub active: Vec<usize>,
    /// One-shot override queued from the UI. `None` means nothing is queued;
    /// `Some(vec![])` means the user explicitly cleared the selection.
    pub pending: Option<Vec<usize>>,
    /// Batch size observed on the most recent execution.
    pub last_batch_size: usize,
}

/// Normalize a selection to unique, sorted, in-range indices.
///
/// Anything negative or `>= batch_size` is dropped, never clamped.
pub fn sanitize_selection(selection: &[i64], batch_size: usize) -> Vec<usize> {
    let mut sanitized: Vec<usize> = selection
        .iter()
        .filter(|&&idx| idx >= 0 && (idx as usize) < batch_size)
        .map(|&idx| idx as usize)
        .collect();
    sanitized.sort_unstable();
    sanitized.dedup();
    if sanitized.len() < selection.len() {
        debug!(
            "Selection pruned to in-range values: {:?} -> {:?} (batch size={})",
            selection, sanitized, batch_size
        );
    }
    sanitized
}

fn as_raw(selection: &[usize]) -> Vec<i64> {
    selection.iter().map(|&idx| idx as i64).collect()
}

/// Single source of truth for per-node selections, safe to call from the
/// execution thread and the HTTP update thread concurrently.
///
/// Every operation takes the table lock for a short, allocation-only
/// critical section; callers only ever receive copies of the state.
pub struct SelectionStore {
    states: Mutex<HashMap<String, NodeSelectionState>>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide store shared by the execution path and the HTTP update
    /// path. The host instantiates nodes, so the table outlives any of them.
    pub fn shared() -> SharedSelectionStore {
        Arc::clone(&SHARED_STORE)
    }

    /// Fetch or initialise the state for a node.
    ///
    /// If no active selection exists yet, default to the full batch so that
    /// the first execution returns every image.
    pub fn get_or_init(&self, node_id: &str, batch_size: usize) -> NodeSelectionState {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(node_id.to_string()).or_default();
        if state.active.is_empty() {
            debug!(
                "Initialising default selection for node {} to full batch of size {}",
                node_id, batch_size
            );
            state.active = (0..batch_size).collect();
        }
        let sanitized = sanitize_selection(&as_raw(&state.active), batch_size);
        state.active = if sanitized.is_empty() {
            (0..batch_size).collect()
        } else {
            sanitized
        };
        state.last_batch_size = batch_size;
        state.clone()
    }

    /// Resolve the selection that governs the current execution.
    ///
    /// Returns `(selection_for_output, selection_for_next_run)`. The resolved
    /// selection becomes the new active baseline immediately, and any pending
    /// selection is consumed whether or not it was usable.
    pub fn resolve_for_execution(&self, node_id: &str, batch_size: usize) -> (Vec<usize>, Vec<usize>) {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(node_id.to_string()).or_default();

        if state.active.is_empty() {
            state.active = (0..batch_size).collect();
        }
        let sanitized_active = sanitize_selection(&as_raw(&state.active), batch_size);
        let active = if sanitized_active.is_empty() {
            (0..batch_size).collect::<Vec<_>>()
        } else {
            sanitized_active
        };

        let original_pending = state.pending.take();
        let mut pending = original_pending
            .as_deref()
            .map(|queued| sanitize_selection(&as_raw(queued), batch_size));

        // A queued selection whose every index fell out of range is stale
        // (the batch shrank since it was posted): fall back to the active
        // selection. An explicitly empty queued selection is honored as-is.
        if let Some(original) = &original_pending {
            let sanitized_to_empty = pending.as_ref().is_some_and(|queued| queued.is_empty());
            if !original.is_empty() && sanitized_to_empty {
                info!(
                    "Dropping stale pending selection for node {} (original={:?}, batch size={})",
                    node_id, original, batch_size
                );
                pending = None;
            }
        }

        let selection_for_output = pending.unwrap_or(active);
        state.active = selection_for_output.clone();
        state.last_batch_size = batch_size;

        debug!(
            "Resolved selection for node {}: output={:?} next={:?} (batch size={})",
            node_id, selection_for_output, state.active, batch_size
        );

        let next = state.active.clone();
        (selection_for_output, next)
    }

    /// Store a pending selection uploaded from the UI.
    ///
    /// Returns the sanitized selection so the caller can reflect it back.
    pub fn queue_pending(&self, node_id: &str, selection: &[i64]) -> Vec<usize> {
        let mut states = self.states.lock().unwrap();
        let state = states.entry(node_id.to_string()).or_default();

        // The UI may reference a batch the store has not observed yet (its
        // update can overtake the execution that produced the batch), so use
        // the larger of the last known size and what the selection implies.
        let inferred_size = selection
            .iter()
            .max()
            .map_or(0, |&highest| if highest >= 0 { highest as usize + 1 } else { 0 });
        let batch_size = state.last_batch_size.max(inferred_size);
        let sanitized = sanitize_selection(selection, batch_size);

        if !selection.is_empty() && sanitized.is_empty() {
            warn!(
                "Discarding selection outside batch bounds for node {} (incoming={:?}, last batch size={}, inferred size={})",
                node_id, selection, state.last_batch_size, inferred_size
            );
            state.pending = None;
        } else if selection.is_empty() {
            info!("Clearing pending selection for node {}", node_id);
            state.pending = Some(Vec::new());
        } else {
            info!(
                "Queued pending selection for node {}: {:?} (incoming={:?}, effective batch size={})",
                node_id, sanitized, selection, batch_size
            );
            state.pending = Some(sanitized.clone());
        }
        sanitized
    }

    /// Read-only snapshot for diagnostics and fingerprinting. Never mutates.
    pub fn inspect(&self, node_id: &str) -> Option<NodeSelectionState> {
        self.states.lock().unwrap().get(node_id).cloned()
    }

    /// Clear all selection state (test isolation).
    pub fn reset(&self) {
        self.states.lock().unwrap().clear();
        debug!("Cleared all contact sheet selection state");
    }
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}
