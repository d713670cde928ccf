//! Cart line types.
//!
//! A line is identified by its `(product_id, variant)` pair. An absent
//! variant and an empty variant label are the same identity class, so every
//! comparison goes through [`normalize_variant`].

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// Collapse an empty (or whitespace-only) variant label to "no variant".
#[must_use]
pub fn normalize_variant(variant: Option<&str>) -> Option<&str> {
    variant.filter(|v| !v.trim().is_empty())
}

/// Identity of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey<'a> {
    pub product_id: &'a str,
    pub variant: Option<&'a str>,
}

impl<'a> LineKey<'a> {
    /// Build a normalized key.
    #[must_use]
    pub fn new(product_id: &'a str, variant: Option<&'a str>) -> Self {
        Self {
            product_id,
            variant: normalize_variant(variant),
        }
    }
}

/// A purchase line in the cart.
///
/// Field names follow the persisted layout. The aliases accept records
/// written by the first storefront release (`id`, `size`, `price`, `image`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product this line refers to.
    #[serde(alias = "id")]
    pub product_id: ProductId,
    /// Variant label such as a size ("30ml"). `None` means no variant.
    #[serde(default, alias = "size", skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Display name captured when the line was added.
    pub name: String,
    /// Price of one unit.
    #[serde(alias = "price")]
    pub unit_price: Price,
    /// Image reference for display.
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    /// Number of units, always `>= 1` inside a cart.
    pub quantity: u32,
}

impl CartLine {
    /// Identity of this line.
    #[must_use]
    pub fn key(&self) -> LineKey<'_> {
        LineKey::new(self.product_id.as_str(), self.variant.as_deref())
    }

    /// Whether this line has the given identity.
    #[must_use]
    pub fn matches(&self, key: LineKey<'_>) -> bool {
        self.key() == key
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// An item handed to the cart's `add` operation.
///
/// Unlike [`CartLine`] the quantity is optional (missing means one) and may be
/// any integer; the cart clamps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant: Option<String>,
    pub name: String,
    pub unit_price: Price,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl CartItem {
    /// Create an item with no variant, no image and the default quantity.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, unit_price: Price) -> Self {
        Self {
            product_id: product_id.into(),
            variant: None,
            name: name.into(),
            unit_price,
            image_ref: None,
            quantity: None,
        }
    }

    /// Set the variant label.
    #[must_use]
    pub fn variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Set the image reference.
    #[must_use]
    pub fn image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    /// Set an explicit quantity.
    #[must_use]
    pub const fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Identity of the line this item adds to.
    #[must_use]
    pub fn key(&self) -> LineKey<'_> {
        LineKey::new(self.product_id.as_str(), self.variant.as_deref())
    }
}

impl From<&CartLine> for CartItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            variant: line.variant.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            image_ref: line.image_ref.clone(),
            quantity: Some(i64::from(line.quantity)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_variant_is_no_variant() {
        assert_eq!(LineKey::new("p1", Some("")), LineKey::new("p1", None));
        assert_eq!(LineKey::new("p1", Some("  ")), LineKey::new("p1", None));
        assert_ne!(LineKey::new("p1", Some("30ml")), LineKey::new("p1", None));
    }

    #[test]
    fn test_decodes_legacy_record() {
        let json = r#"{"id":"p1","name":"Cleanser","price":899,"quantity":2,"image":"/c.jpg","size":"100ml"}"#;
        let line: CartLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.product_id.as_str(), "p1");
        assert_eq!(line.variant.as_deref(), Some("100ml"));
        assert_eq!(line.image_ref.as_deref(), Some("/c.jpg"));
        assert_eq!(line.line_total(), Price::from_units(1798));
    }

    #[test]
    fn test_serializes_current_field_names() {
        let line = CartLine {
            product_id: ProductId::new("p1"),
            variant: None,
            name: "Cleanser".to_string(),
            unit_price: Price::from_units(899),
            image_ref: None,
            quantity: 1,
        };
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["productId"], "p1");
        assert!(value.get("variant").is_none());
        assert_eq!(value["quantity"], 1);
    }

    #[test]
    fn test_item_builder() {
        let item = CartItem::new("p1", "Serum", Price::from_units(1299))
            .variant("30ml")
            .quantity(2);
        assert_eq!(item.key(), LineKey::new("p1", Some("30ml")));
        assert_eq!(item.quantity, Some(2));
    }
}
