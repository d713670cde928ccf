//! Explicit decoding of persisted blobs and wishlist payloads.
//!
//! Persisted values are untrusted: they may come from an older release, a
//! hand-edited profile, or a crash mid-development. Decoding either yields a
//! collection that satisfies the store invariants or fails as a whole; the
//! stores turn a failure into an empty collection.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use chrono::{DateTime, Utc};
use swan_botanical_core::{CartLine, Identity, Price, ProductId, WishlistEntry};

/// Why a persisted blob or payload was rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JSON at all.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON of the wrong shape.
    #[error("expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },

    /// An element of the array is not a valid record.
    #[error("record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn expect_array(raw: &str) -> Result<Vec<Value>, DecodeError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => Ok(items),
        other => Err(DecodeError::Shape {
            expected: "an array",
            found: kind(&other),
        }),
    }
}

/// Decode a persisted cart.
///
/// Every element must be a line with a non-blank product id and a quantity of
/// at least one. Lines that share an identity are merged into the first one
/// (quantities summed) so the uniqueness invariant holds after loading.
///
/// # Errors
///
/// Returns `DecodeError` if the blob is not an array of valid lines.
pub fn decode_cart(raw: &str) -> Result<Vec<CartLine>, DecodeError> {
    let mut lines: Vec<CartLine> = Vec::new();

    for (index, value) in expect_array(raw)?.into_iter().enumerate() {
        let invalid = |reason: String| DecodeError::InvalidRecord { index, reason };

        let mut line: CartLine =
            serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
        if line.product_id.is_blank() {
            return Err(invalid("blank product id".to_string()));
        }
        if line.quantity == 0 {
            return Err(invalid("quantity must be at least 1".to_string()));
        }
        if line.variant.as_deref().is_some_and(|v| v.trim().is_empty()) {
            line.variant = None;
        }

        match lines.iter_mut().find(|l| l.key() == line.key()) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            }
            None => lines.push(line),
        }
    }

    Ok(lines)
}

/// Wishlist record as found in storage or in API payloads.
///
/// Storage uses `productId`; the first release stored products with both
/// `id` and `_id`; the API returns populated products keyed by `_id` with an
/// `images` array and a `price`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WishlistRecord {
    product_id: Option<String>,
    #[serde(rename = "_id")]
    object_id: Option<String>,
    id: Option<String>,
    name: String,
    image_ref: Option<String>,
    image: Option<String>,
    #[serde(default)]
    images: Vec<String>,
    unit_price: Option<Price>,
    price: Option<Price>,
    added_at: Option<DateTime<Utc>>,
}

impl WishlistRecord {
    fn into_entry(self) -> Option<WishlistEntry> {
        let product_id = [self.product_id, self.object_id, self.id]
            .into_iter()
            .flatten()
            .find(|id| !id.trim().is_empty())?;

        Some(WishlistEntry {
            product_id: ProductId::new(product_id),
            name: self.name,
            image_ref: self
                .image_ref
                .or(self.image)
                .or_else(|| self.images.into_iter().next()),
            unit_price: self.unit_price.or(self.price),
            added_at: self.added_at,
        })
    }
}

fn decode_wishlist_items(items: Vec<Value>) -> Result<Vec<WishlistEntry>, DecodeError> {
    let mut entries: Vec<WishlistEntry> = Vec::new();

    for (index, value) in items.into_iter().enumerate() {
        let record: WishlistRecord =
            serde_json::from_value(value).map_err(|e| DecodeError::InvalidRecord {
                index,
                reason: e.to_string(),
            })?;
        let entry = record.into_entry().ok_or(DecodeError::InvalidRecord {
            index,
            reason: "missing product id".to_string(),
        })?;

        if !entries.iter().any(|e| e.product_id == entry.product_id) {
            entries.push(entry);
        }
    }

    Ok(entries)
}

/// Decode a persisted wishlist.
///
/// Duplicate product ids keep their first occurrence.
///
/// # Errors
///
/// Returns `DecodeError` if the blob is not an array of valid entries.
pub fn decode_wishlist(raw: &str) -> Result<Vec<WishlistEntry>, DecodeError> {
    decode_wishlist_items(expect_array(raw)?)
}

/// Decode the wishlist returned by the API.
///
/// Accepts either a bare array or an object with a `wishlist` array.
///
/// # Errors
///
/// Returns `DecodeError` if neither shape matches or a record is invalid.
pub fn decode_wishlist_payload(payload: Value) -> Result<Vec<WishlistEntry>, DecodeError> {
    match payload {
        Value::Array(items) => decode_wishlist_items(items),
        Value::Object(mut map) => match map.remove("wishlist") {
            Some(Value::Array(items)) => decode_wishlist_items(items),
            Some(other) => Err(DecodeError::Shape {
                expected: "a wishlist array",
                found: kind(&other),
            }),
            None => Err(DecodeError::Shape {
                expected: "a wishlist array",
                found: "an object without `wishlist`",
            }),
        },
        other => Err(DecodeError::Shape {
            expected: "a wishlist array",
            found: kind(&other),
        }),
    }
}

/// Decode a persisted identity.
///
/// # Errors
///
/// Returns `DecodeError` if the blob is not an identity object with a valid
/// email.
pub fn decode_identity(raw: &str) -> Result<Identity, DecodeError> {
    match serde_json::from_str::<Value>(raw)? {
        value @ Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(DecodeError::Shape {
            expected: "an object",
            found: kind(&other),
        }),
    }
}
