//! Preview encoding and the per-node preview cache.
//!
//! Encoding a full batch to PNG data URLs is the expensive part of an
//! invocation, so the cache keeps the encoded previews keyed by a cheap
//! content signature and skips the work when the batch is unchanged.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use log::{debug, error};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

use crate::error::NodeError;
use crate::frame::{Frame, FrameBatch};

/// Number of leading f32 values of the flattened batch fed to the signature.
const SIGNATURE_SAMPLE_LEN: usize = 4096;

pub type SharedPreviewCache = Arc<PreviewCache>;

static SHARED_CACHE: Lazy<SharedPreviewCache> = Lazy::new(|| Arc::new(PreviewCache::new()));

#[derive(Clone, Debug)]
struct PreviewEntry {
    token: String,
    data: Vec<String>,
}

/// Per-node cache of the last-encoded batch signature and its previews.
///
/// Token and data are always replaced together; readers get copies.
pub struct PreviewCache {
    entries: Mutex<HashMap<String, PreviewEntry>>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide cache instance.
    pub fn shared() -> SharedPreviewCache {
        Arc::clone(&SHARED_CACHE)
    }

    /// Cached token and encoded previews for a node, if any.
    pub fn get(&self, node_id: &str) -> Option<(String, Vec<String>)> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(node_id)
            .filter(|entry| !entry.data.is_empty())
            .map(|entry| (entry.token.clone(), entry.data.clone()))
    }

    /// Replace the cached token and previews wholesale.
    pub fn put(&self, node_id: &str, token: String, data: Vec<String>) {
        self.entries
            .lock()
            .unwrap()
            .insert(node_id.to_string(), PreviewEntry { token, data });
    }

    /// Drop all cached previews (test isolation).
    pub fn reset(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Content signature for a batch, cheap enough to compute on every run.
///
/// The shape and a bounded sample of the raw content are hashed together, so
/// shape changes, frame reordering and content edits within the sample all
/// produce a new token. Batches that differ only outside the sampled prefix
/// collide; that is an accepted heuristic, not a correctness guarantee.
pub fn batch_signature(batch: &FrameBatch) -> String {
    let shape = batch.shape();
    let sample = batch.flat_sample(SIGNATURE_SAMPLE_LEN);
    if sample.is_empty() {
        return format!("{:?}|empty", shape);
    }
    let mut hasher = Sha256::new();
    for value in &sample {
        hasher.update(value.to_le_bytes());
    }
    format!("{:?}|{}|{:x}", shape, sample.len(), hasher.finalize())
}

fn buffer_shape_error() -> NodeError {
    NodeError::InvalidArgument("Frame buffer does not match its declared shape".to_string())
}

/// Encode one frame as a PNG data URL for the contact sheet UI.
pub fn encode_frame_to_data_url(frame: &Frame) -> Result<String, NodeError> {
    let bytes: Vec<u8> = frame
        .data
        .iter()
        .map(|&value| (value.clamp(0.0, 1.0) * 255.0) as u8)
        .collect();

    let image = match frame.channels {
        1 => DynamicImage::ImageLuma8(
            GrayImage::from_raw(frame.width, frame.height, bytes).ok_or_else(buffer_shape_error)?,
        ),
        3 => DynamicImage::ImageRgb8(
            RgbImage::from_raw(frame.width, frame.height, bytes).ok_or_else(buffer_shape_error)?,
        ),
        4 => DynamicImage::ImageRgba8(
            RgbaImage::from_raw(frame.width, frame.height, bytes).ok_or_else(buffer_shape_error)?,
        ),
        other => {
            return Err(NodeError::InvalidArgument(format!(
                "Unsupported channel count for preview encoding: {}",
                other
            )));
        }
    };

    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(buffer.into_inner())
    ))
}

/// Previews for the whole batch, reusing the cache when the signature of the
/// incoming batch matches the cached token.
///
/// Encoding happens outside any lock; a failed encode degrades to an empty
/// preview list so the invocation itself still succeeds.
pub fn previews_for_batch(cache: &PreviewCache, node_id: &str, batch: &FrameBatch) -> Vec<String> {
    let signature = batch_signature(batch);
    if let Some((token, data)) = cache.get(node_id) {
        if token == signature {
            debug!("Reusing cached previews for node {}", node_id);
            return data;
        }
    }

    let encoded: Result<Vec<String>, NodeError> =
        batch.frames().iter().map(encode_frame_to_data_url).collect();
    match encoded {
        Ok(data) => {
            cache.put(node_id, signature, data.clone());
            data
        }
        Err(err) => {
            error!("Failed to encode preview images for node {}: {}", node_id, err);
            Vec::new()
        }
    }
}
