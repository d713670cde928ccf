//! Wishlist entry type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Price, Product, ProductId};

/// A liked product.
///
/// Entries are snapshots taken when the product was liked and are never
/// updated in place; `product_id` is unique within a wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl WishlistEntry {
    /// Create an entry with only the required fields.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            image_ref: None,
            unit_price: None,
            added_at: None,
        }
    }

    /// Set the image reference.
    #[must_use]
    pub fn image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    /// Set the price snapshot.
    #[must_use]
    pub const fn price(mut self, unit_price: Price) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}

impl From<&Product> for WishlistEntry {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            image_ref: product.primary_image().map(str::to_owned),
            unit_price: Some(product.price),
            added_at: None,
        }
    }
}
