//! # Collections
//!
//! A [`Collection`] is the ordered list of rows of one resource plus its aggregate fields.
//!
//! The aggregate fields (`total_items`, `total_amount`, `total_savings`) are private and
//! recomputed by every constructor and by [`Collection::apply`], so they are always a pure fold
//! over the item list. There is deliberately no setter.
//!
//! [`Collection::apply`] is the single fold used for optimistic predictions, guest-mode
//! mutations and the in-memory backend, so all three agree on key merging:
//!
//! - a repeated add of the same [`ItemKey`](super::ItemKey) raises the quantity in a cart and
//!   is a no-op in a wishlist;
//! - an update that moves a row onto an existing key folds the two rows into one.
//!
//! Quantities never exceed [`MAX_QUANTITY`]; merges clamp to it and the aggregates saturate.

use super::item::{local_item_id, ItemKey, ResourceItem};
use super::mutation::{AddItem, ItemPatch, Mutation, MAX_QUANTITY};
use super::resource::ResourceKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    kind: ResourceKind,
    owner_id: Option<String>,
    items: Vec<ResourceItem>,
    total_items: u32,
    total_amount: Decimal,
    total_savings: Decimal,
    last_updated: DateTime<Utc>,
    is_active: bool,
}

impl Collection {
    pub fn empty(kind: ResourceKind) -> Self {
        Self {
            kind,
            owner_id: None,
            items: Vec::new(),
            total_items: 0,
            total_amount: Decimal::ZERO,
            total_savings: Decimal::ZERO,
            last_updated: Utc::now(),
            is_active: true,
        }
    }

    /// Builds a collection from raw rows, merging rows that share a key.
    pub fn from_items(
        kind: ResourceKind,
        owner_id: Option<String>,
        items: impl IntoIterator<Item = ResourceItem>,
    ) -> Self {
        let mut collection = Self::empty(kind);
        collection.owner_id = owner_id;
        for item in items {
            collection.insert_or_merge(item);
        }
        collection.recompute();
        collection
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn items(&self) -> &[ResourceItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ResourceItem> {
        self.items
    }

    /// Sum of quantities (cart) or number of rows (wishlist).
    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn total_savings(&self) -> Decimal {
        self.total_savings
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn with_owner(mut self, owner_id: Option<String>) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn find(&self, item_id: &str) -> Option<&ResourceItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn find_key(&self, key: &ItemKey) -> Option<&ResourceItem> {
        self.items.iter().find(|item| item.key() == *key)
    }

    /// Whether a product is present. Absent `size`/`color` match any variant.
    pub fn contains(&self, product_id: &str, size: Option<&str>, color: Option<&str>) -> bool {
        self.items
            .iter()
            .any(|item| item.matches(product_id, size, color))
    }

    /// Folds a mutation, minting client-side ids for new rows.
    pub fn apply(&self, mutation: &Mutation) -> Collection {
        self.apply_as(mutation, local_item_id)
    }

    /// Folds a mutation, naming a newly inserted row with `new_id`.
    ///
    /// Mutations that reference unknown item ids leave the collection unchanged.
    pub fn apply_as(&self, mutation: &Mutation, new_id: impl FnOnce() -> String) -> Collection {
        let mut next = self.clone();
        let now = Utc::now();
        match mutation {
            Mutation::Add(spec) => next.add(spec, new_id, now),
            Mutation::Update { item_id, patch } => next.update(item_id, patch, now),
            Mutation::Remove { item_id } => next.items.retain(|item| item.id != *item_id),
            Mutation::BulkRemove { item_ids } => {
                let doomed: HashSet<&str> = item_ids.iter().map(String::as_str).collect();
                next.items.retain(|item| !doomed.contains(item.id.as_str()));
            }
            Mutation::Clear => next.items.clear(),
        }
        next.last_updated = now;
        next.recompute();
        next
    }

    fn add(&mut self, spec: &AddItem, new_id: impl FnOnce() -> String, now: DateTime<Utc>) {
        let key = spec.key();
        let tracks_quantity = self.kind.tracks_quantity();
        if let Some(existing) = self.items.iter_mut().find(|item| item.key() == key) {
            if tracks_quantity {
                existing.quantity = merged_quantity(existing.quantity, spec.quantity);
                existing.updated_at = now;
            }
            return;
        }
        self.items.push(ResourceItem {
            id: new_id(),
            product: spec.product.clone(),
            quantity: if tracks_quantity {
                spec.quantity.min(MAX_QUANTITY)
            } else {
                1
            },
            size: spec.size.clone(),
            color: spec.color.clone(),
            notes: spec.notes.clone(),
            added_from: spec.added_from,
            created_at: now,
            updated_at: now,
        });
    }

    fn update(&mut self, item_id: &str, patch: &ItemPatch, now: DateTime<Utc>) {
        let tracks_quantity = self.kind.tracks_quantity();
        let Some(index) = self.items.iter().position(|item| item.id == item_id) else {
            return;
        };
        let mut patched = self.items.remove(index);
        if let Some(quantity) = patch.quantity.filter(|_| tracks_quantity) {
            patched.quantity = quantity.min(MAX_QUANTITY);
        }
        if let Some(size) = &patch.size {
            patched.size = Some(size.clone());
        }
        if let Some(color) = &patch.color {
            patched.color = Some(color.clone());
        }
        if let Some(notes) = &patch.notes {
            patched.notes = Some(notes.clone());
        }
        patched.updated_at = now;

        // A variant change may land on a row that already exists.
        let key = patched.key();
        if let Some(twin) = self.items.iter_mut().find(|item| item.key() == key) {
            if tracks_quantity {
                twin.quantity = merged_quantity(twin.quantity, patched.quantity);
                twin.updated_at = now;
            }
            return;
        }
        self.items.insert(index, patched);
    }

    fn insert_or_merge(&mut self, mut item: ResourceItem) {
        item.quantity = if self.kind.tracks_quantity() {
            item.quantity.min(MAX_QUANTITY)
        } else {
            1
        };
        let key = item.key();
        match self.items.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) if self.kind.tracks_quantity() => {
                existing.quantity = merged_quantity(existing.quantity, item.quantity);
            }
            Some(_) => {}
            None => self.items.push(item),
        }
    }

    fn recompute(&mut self) {
        self.total_items = self
            .items
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.quantity));
        self.total_amount = self
            .items
            .iter()
            .fold(Decimal::ZERO, |total, item| total.saturating_add(item.line_total()));
        self.total_savings = self
            .items
            .iter()
            .fold(Decimal::ZERO, |total, item| total.saturating_add(item.line_savings()));
    }
}

fn merged_quantity(current: u32, added: u32) -> u32 {
    current.saturating_add(added).min(MAX_QUANTITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductSnapshot;

    fn product(id: &str, cents: i64) -> ProductSnapshot {
        ProductSnapshot::new(id, format!("Product {id}"), Decimal::new(cents, 2))
    }

    fn assert_fold_invariant(collection: &Collection) {
        let quantities: u32 = collection.items().iter().map(|i| i.quantity).sum();
        assert_eq!(collection.total_items(), quantities);
        let amount: Decimal = collection.items().iter().map(|i| i.line_total()).sum();
        assert_eq!(collection.total_amount(), amount);
        let keys: HashSet<ItemKey> = collection.items().iter().map(|i| i.key()).collect();
        assert_eq!(keys.len(), collection.len(), "duplicate key in {collection:?}");
    }

    #[test]
    fn test_repeated_add_raises_cart_quantity() {
        let spec = AddItem::new(product("p1", 1000)).size("M").quantity(2);
        let cart = Collection::empty(ResourceKind::Cart)
            .apply(&Mutation::Add(spec.clone()))
            .apply(&Mutation::Add(spec.quantity(1)));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_amount(), Decimal::new(3000, 2));
        assert_fold_invariant(&cart);
    }

    #[test]
    fn test_merged_quantity_clamps_at_cap() {
        let spec = AddItem::new(product("p1", 1000)).quantity(MAX_QUANTITY);
        let cart = Collection::empty(ResourceKind::Cart)
            .apply(&Mutation::Add(spec.clone()))
            .apply(&Mutation::Add(spec.quantity(u32::MAX)));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_items(), MAX_QUANTITY);
        assert_eq!(cart.total_amount(), Decimal::new(1000, 2) * Decimal::from(MAX_QUANTITY));
        assert_fold_invariant(&cart);
    }

    #[test]
    fn test_extreme_rows_saturate_totals() {
        let cart = Collection::empty(ResourceKind::Cart)
            .apply(&Mutation::Add(AddItem::new(product("p1", 1000))));
        let mut rows = cart.into_items();
        rows[0].product.price = Decimal::MAX;
        rows[0].quantity = u32::MAX;

        let rebuilt = Collection::from_items(ResourceKind::Cart, None, rows);

        assert_eq!(rebuilt.items()[0].quantity, MAX_QUANTITY);
        assert_eq!(rebuilt.total_items(), MAX_QUANTITY);
        assert_eq!(rebuilt.total_amount(), Decimal::MAX);
    }

    #[test]
    fn test_repeated_add_is_noop_in_wishlist() {
        let spec = AddItem::new(product("p1", 1000)).quantity(5);
        let wishlist = Collection::empty(ResourceKind::Wishlist)
            .apply(&Mutation::Add(spec.clone()))
            .apply(&Mutation::Add(spec));

        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist.total_items(), 1);
        assert_fold_invariant(&wishlist);
    }

    #[test]
    fn test_distinct_variants_are_distinct_rows() {
        let cart = Collection::empty(ResourceKind::Cart)
            .apply(&Mutation::Add(AddItem::new(product("p1", 1000)).size("M")))
            .apply(&Mutation::Add(AddItem::new(product("p1", 1000)).size("L")));
        assert_eq!(cart.len(), 2);
        assert_fold_invariant(&cart);
    }

    #[test]
    fn test_add_then_remove_restores_totals() {
        let before = Collection::empty(ResourceKind::Cart)
            .apply(&Mutation::Add(AddItem::new(product("p0", 2500))));
        let after_add = before.apply(&Mutation::Add(AddItem::new(product("p1", 1000))));
        let added_id = after_add
            .find_key(&ItemKey::new("p1", None, None))
            .map(|item| item.id.clone())
            .unwrap();
        let after_remove = after_add.apply(&Mutation::Remove { item_id: added_id });

        assert_eq!(after_remove.total_items(), before.total_items());
        assert_eq!(after_remove.total_amount(), before.total_amount());
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let cart = Collection::empty(ResourceKind::Cart)
            .apply(&Mutation::Add(AddItem::new(product("p1", 1000))));
        let again = cart.apply(&Mutation::Remove { item_id: "missing".into() });
        assert_eq!(again.items(), cart.items());
    }

    #[test]
    fn test_variant_update_onto_existing_key_merges_rows() {
        let cart = Collection::empty(ResourceKind::Cart)
            .apply(&Mutation::Add(AddItem::new(product("p1", 1000)).size("M").quantity(2)))
            .apply(&Mutation::Add(AddItem::new(product("p1", 1000)).size("L")));
        let large = cart.find_key(&ItemKey::new("p1", Some("L"), None)).unwrap().id.clone();

        let merged = cart.apply(&Mutation::Update {
            item_id: large,
            patch: ItemPatch::default().size("M"),
        });

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.total_items(), 3);
        assert_fold_invariant(&merged);
    }

    #[test]
    fn test_update_quantity_ignored_in_wishlist() {
        let wishlist = Collection::empty(ResourceKind::Wishlist)
            .apply(&Mutation::Add(AddItem::new(product("p1", 1000))));
        let id = wishlist.items()[0].id.clone();
        let updated = wishlist.apply(&Mutation::Update {
            item_id: id,
            patch: ItemPatch::default().quantity(4).notes("gift"),
        });
        assert_eq!(updated.total_items(), 1);
        assert_eq!(updated.items()[0].notes.as_deref(), Some("gift"));
    }

    #[test]
    fn test_from_items_merges_duplicate_keys() {
        let cart = Collection::empty(ResourceKind::Cart)
            .apply(&Mutation::Add(AddItem::new(product("p1", 1000)).quantity(2)));
        let mut rows = cart.items().to_vec();
        rows.extend(cart.items().to_vec());

        let rebuilt = Collection::from_items(ResourceKind::Cart, Some("u1".into()), rows);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt.total_items(), 4);
        assert_eq!(rebuilt.owner_id(), Some("u1"));
        assert_fold_invariant(&rebuilt);
    }

    #[test]
    fn test_bulk_remove_and_clear() {
        let cart = Collection::empty(ResourceKind::Cart)
            .apply(&Mutation::Add(AddItem::new(product("p1", 1000))))
            .apply(&Mutation::Add(AddItem::new(product("p2", 1000))))
            .apply(&Mutation::Add(AddItem::new(product("p3", 1000))));
        let ids: Vec<String> = cart.items()[..2].iter().map(|i| i.id.clone()).collect();

        let trimmed = cart.apply(&Mutation::BulkRemove { item_ids: ids });
        assert_eq!(trimmed.len(), 1);
        assert_fold_invariant(&trimmed);

        let cleared = trimmed.apply(&Mutation::Clear);
        assert!(cleared.is_empty());
        assert_eq!(cleared.total_amount(), Decimal::ZERO);
    }
}
