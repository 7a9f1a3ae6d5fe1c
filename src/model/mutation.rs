//! Mutation intents.
//!
//! A [`Mutation`] describes *what the user asked for*, independently of where it is served.
//! The same value is folded optimistically into the visible collection, sent to the remote
//! store, and replayed against the local cache in guest mode.

use super::item::{ItemKey, ProductSnapshot, Provenance, ResourceItem};
use serde::{Deserialize, Serialize};

/// Largest quantity a single row may hold. Merges clamp to it.
pub const MAX_QUANTITY: u32 = 9_999;

/// Whether `quantity` is one a row may be asked to hold.
pub fn quantity_in_range(quantity: u32) -> bool {
    (1..=MAX_QUANTITY).contains(&quantity)
}

/// Parameters for adding a product to a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    pub product: ProductSnapshot,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub added_from: Provenance,
}

impl AddItem {
    pub fn new(product: ProductSnapshot) -> Self {
        Self {
            product,
            quantity: 1,
            size: None,
            color: None,
            notes: None,
            added_from: Provenance::default(),
        }
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn added_from(mut self, provenance: Provenance) -> Self {
        self.added_from = provenance;
        self
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(
            self.product.id.clone(),
            self.size.as_deref(),
            self.color.as_deref(),
        )
    }

    /// Re-adds an existing row, e.g. when it moves to the other collection.
    pub fn from_item(item: &ResourceItem, added_from: Provenance) -> Self {
        Self {
            product: item.product.clone(),
            quantity: item.quantity,
            size: item.size.clone(),
            color: item.color.clone(),
            notes: item.notes.clone(),
            added_from,
        }
    }
}

/// Partial update of an existing row. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ItemPatch {
    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.size.is_none() && self.color.is_none() && self.notes.is_none()
    }
}

/// A mutation against one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Add(AddItem),
    Update { item_id: String, patch: ItemPatch },
    Remove { item_id: String },
    BulkRemove { item_ids: Vec<String> },
    Clear,
}

impl Mutation {
    /// Short name used in logs and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::Add(_) => "add",
            Mutation::Update { .. } => "update",
            Mutation::Remove { .. } => "remove",
            Mutation::BulkRemove { .. } => "bulk_remove",
            Mutation::Clear => "clear",
        }
    }

    /// Rejects intents no store could ever accept.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Mutation::Add(spec) if !quantity_in_range(spec.quantity) => Err(format!(
                "quantity {} for product {} is outside 1..={MAX_QUANTITY}",
                spec.quantity, spec.product.id
            )),
            Mutation::Update { patch, .. } if patch.quantity.is_some_and(|q| !quantity_in_range(q)) => {
                Err(format!("quantity must be within 1..={MAX_QUANTITY}"))
            }
            Mutation::Update { item_id, patch } if patch.is_empty() => {
                Err(format!("empty update for item {item_id}"))
            }
            Mutation::BulkRemove { item_ids } if item_ids.is_empty() => {
                Err("bulk remove needs at least one item".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Ids of the rows this mutation removes outright.
    pub fn removed_ids(&self) -> Vec<String> {
        match self {
            Mutation::Remove { item_id } => vec![item_id.clone()],
            Mutation::BulkRemove { item_ids } => item_ids.clone(),
            _ => Vec::new(),
        }
    }
}
