//! HTTP endpoint through which the browser UI posts selection updates.
//!
//! The body is parsed from raw bytes rather than through an extractor so
//! each malformed-input case maps to its own machine-readable 400 code.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use log::{info, warn};
use serde_json::{Value, json};

use crate::selection::SharedSelectionStore;

/// Router exposing `POST /contact-sheet-selector/selection`.
pub fn selection_router(store: SharedSelectionStore) -> Router {
    Router::new()
        .route("/contact-sheet-selector/selection", post(update_selection))
        .with_state(store)
}

fn bad_request(code: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": code }))).into_response()
}

async fn update_selection(State(store): State<SharedSelectionStore>, body: Bytes) -> Response {
    let data: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            warn!("Invalid JSON payload for contact sheet selection: {}", err);
            return bad_request("invalid_json");
        }
    };

    let node_id = match data.get("node_id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return bad_request("missing_node_id"),
    };

    // A missing selection field means "clear", same as an empty list.
    let raw_selection = data.get("selection").cloned().unwrap_or(json!([]));
    let items = match raw_selection {
        Value::Array(items) => items,
        _ => return bad_request("selection_must_be_list"),
    };

    let mut selection = Vec::with_capacity(items.len());
    for item in &items {
        match item.as_i64() {
            Some(idx) => selection.push(idx),
            None => return bad_request("selection_contains_non_int"),
        }
    }

    let sanitized = store.queue_pending(&node_id, &selection);
    info!(
        "Received UI selection for node {} (raw={:?}, sanitized={:?})",
        node_id, selection, sanitized
    );
    (StatusCode::OK, Json(json!({ "selection": sanitized }))).into_response()
}
