//! Represents one row of a cart or wishlist.
//!
//! Items are never constructed directly by consumers: they are produced by folding an
//! [`AddItem`](crate::model::AddItem) mutation into a [`Collection`](crate::model::Collection),
//! or decoded from the remote store and the local cache.
//!
//! The uniqueness key of an item is its [`ItemKey`] (`product_id`, `size`, `color`). A
//! collection holds at most one item per key.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::ResourceKind;

/// Prefix of item ids minted on the client (guest mode).
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Prefix of item ids carried by optimistic predictions still awaiting the server.
pub const PENDING_ID_PREFIX: &str = "pending-";

/// Mints a fresh client-side item id.
pub fn local_item_id() -> String {
    format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4())
}

fn default_true() -> bool {
    true
}

fn default_quantity() -> u32 {
    1
}

/// Snapshot of the referenced product, taken when the item was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

impl ProductSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            original_price: None,
            image: None,
            in_stock: true,
        }
    }

    pub fn with_original_price(mut self, original_price: Decimal) -> Self {
        self.original_price = Some(original_price);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn out_of_stock(mut self) -> Self {
        self.in_stock = false;
        self
    }

    /// Savings per unit against the original price. Never negative.
    pub fn unit_savings(&self) -> Decimal {
        self.original_price
            .map(|original| original.saturating_sub(self.price).max(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Where in the storefront an item was added from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    ProductPage,
    Listing,
    Search,
    Feed,
    Cart,
    Wishlist,
    Other,
}

impl From<ResourceKind> for Provenance {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Cart => Provenance::Cart,
            ResourceKind::Wishlist => Provenance::Wishlist,
        }
    }
}

/// Uniqueness key of an item within one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl ItemKey {
    pub fn new(product_id: impl Into<String>, size: Option<&str>, color: Option<&str>) -> Self {
        Self {
            product_id: product_id.into(),
            size: size.map(str::to_owned),
            color: color.map(str::to_owned),
        }
    }
}

/// One cart or wishlist row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceItem {
    pub id: String,
    pub product: ProductSnapshot,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub added_from: Provenance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type CartItem = ResourceItem;
pub type WishlistItem = ResourceItem;

impl ResourceItem {
    pub fn key(&self) -> ItemKey {
        ItemKey {
            product_id: self.product.id.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    /// Matches a product, treating an absent `size` or `color` as "any variant".
    pub fn matches(&self, product_id: &str, size: Option<&str>, color: Option<&str>) -> bool {
        self.product.id == product_id
            && size.map_or(true, |s| self.size.as_deref() == Some(s))
            && color.map_or(true, |c| self.color.as_deref() == Some(c))
    }

    pub fn line_total(&self) -> Decimal {
        self.product.price.saturating_mul(Decimal::from(self.quantity))
    }

    pub fn line_savings(&self) -> Decimal {
        self.product.unit_savings().saturating_mul(Decimal::from(self.quantity))
    }

    /// True for rows the server has never seen.
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX) || self.id.starts_with(PENDING_ID_PREFIX)
    }
}
