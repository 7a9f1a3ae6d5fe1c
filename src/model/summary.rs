//! Derived projections: [`Summary`], [`Snapshot`] and [`TotalCounter`].

use super::collection::Collection;
use super::resource::ResourceKind;
use rust_decimal::Decimal;
use serde::Serialize;

/// Item count from which the cart total price is shown.
pub const DEFAULT_PRICE_THRESHOLD: u32 = 4;

/// Read-only projection of a [`Collection`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    item_count: u32,
    total_quantity: u32,
    total_amount: Decimal,
    total_savings: Decimal,
    show_total_price: bool,
}

impl Summary {
    pub fn of(collection: &Collection, threshold: u32) -> Self {
        let item_count = u32::try_from(collection.len()).unwrap_or(u32::MAX);
        Self {
            item_count,
            total_quantity: collection.total_items(),
            total_amount: collection.total_amount(),
            total_savings: collection.total_savings(),
            show_total_price: collection.total_items() >= threshold,
        }
    }

    /// Number of distinct rows.
    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    pub fn total_quantity(&self) -> u32 {
        self.total_quantity
    }

    /// The figure badges and thresholds are computed from.
    pub fn total_items(&self) -> u32 {
        self.total_quantity
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn total_savings(&self) -> Decimal {
        self.total_savings
    }

    pub fn show_total_price(&self) -> bool {
        self.show_total_price
    }
}

/// A collection and its summary, always emitted together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub collection: Collection,
    pub summary: Summary,
}

impl Snapshot {
    pub fn new(collection: Collection, threshold: u32) -> Self {
        let summary = Summary::of(&collection, threshold);
        Self {
            collection,
            summary,
        }
    }

    pub fn empty(kind: ResourceKind, threshold: u32) -> Self {
        Self::new(Collection::empty(kind), threshold)
    }

    pub fn kind(&self) -> ResourceKind {
        self.collection.kind()
    }
}

/// Cross-resource counters shown in the header badge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCounter {
    pub cart_count: u32,
    pub wishlist_count: u32,
    pub total_count: u32,
}

impl TotalCounter {
    pub fn new(cart_count: u32, wishlist_count: u32) -> Self {
        Self {
            cart_count,
            wishlist_count,
            total_count: cart_count.saturating_add(wishlist_count),
        }
    }
}
