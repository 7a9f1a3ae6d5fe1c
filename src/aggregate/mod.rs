//! # Aggregator
//!
//! Cross-resource totals derived from the two store summaries: the header badge count and
//! whether the cart total price is shown.
//!
//! [`aggregate`] is a pure function. The [`Aggregator`] task re-evaluates it whenever either
//! store emits and publishes the result on a watch channel; it holds nothing that is not
//! derived from the stores, so clearing the stores resets it.

use crate::framework::StoreClient;
use crate::model::{Snapshot, Summary, TotalCounter};
use futures::stream::{BoxStream, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub counter: TotalCounter,
    pub cart_total_amount: Decimal,
    pub show_cart_total_price: bool,
}

/// Combines the cart and wishlist summaries.
pub fn aggregate(cart: &Summary, wishlist: &Summary, threshold: u32) -> Totals {
    Totals {
        counter: TotalCounter::new(cart.total_items(), wishlist.total_items()),
        cart_total_amount: cart.total_amount(),
        show_cart_total_price: cart.total_items() >= threshold,
    }
}

pub struct Aggregator {
    cart: watch::Receiver<Arc<Snapshot>>,
    wishlist: watch::Receiver<Arc<Snapshot>>,
    threshold: u32,
    totals: watch::Sender<Totals>,
}

impl Aggregator {
    pub fn new(cart: &StoreClient, wishlist: &StoreClient, threshold: u32) -> (Self, TotalsClient) {
        let cart = cart.subscribe();
        let wishlist = wishlist.subscribe();
        let initial = aggregate(&cart.borrow().summary, &wishlist.borrow().summary, threshold);
        let (totals, totals_rx) = watch::channel(initial);
        let aggregator = Self {
            cart,
            wishlist,
            threshold,
            totals,
        };
        (aggregator, TotalsClient { totals: totals_rx })
    }

    /// Recomputes on every store emission until either store shuts down.
    pub async fn run(mut self) {
        info!(threshold = self.threshold, "Aggregator started");
        loop {
            let next = aggregate(
                &self.cart.borrow_and_update().summary,
                &self.wishlist.borrow_and_update().summary,
                self.threshold,
            );
            self.totals.send_if_modified(|totals| {
                if *totals == next {
                    return false;
                }
                debug!(total_count = next.counter.total_count, "Totals changed");
                *totals = next;
                true
            });

            let changed = tokio::select! {
                changed = self.cart.changed() => changed,
                changed = self.wishlist.changed() => changed,
            };
            if changed.is_err() {
                break;
            }
        }
        info!("Aggregator stopped");
    }
}

/// Read side of the aggregator.
#[derive(Debug, Clone)]
pub struct TotalsClient {
    totals: watch::Receiver<Totals>,
}

impl TotalsClient {
    pub fn current(&self) -> Totals {
        *self.totals.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Totals> {
        self.totals.clone()
    }

    /// Waits until the totals satisfy `condition` and returns them.
    pub async fn wait_for(&self, condition: impl FnMut(&Totals) -> bool) -> Option<Totals> {
        let mut totals = self.totals.clone();
        let matched = totals.wait_for(condition).await.ok().map(|t| *t);
        matched
    }

    pub fn total_count(&self) -> BoxStream<'static, u32> {
        self.project(|totals| totals.counter.total_count)
    }

    pub fn cart_total_amount(&self) -> BoxStream<'static, Decimal> {
        self.project(|totals| totals.cart_total_amount)
    }

    pub fn show_cart_total_price(&self) -> BoxStream<'static, bool> {
        self.project(|totals| totals.show_cart_total_price)
    }

    fn project<T: Send + 'static>(&self, field: fn(&Totals) -> T) -> BoxStream<'static, T> {
        WatchStream::new(self.totals.clone())
            .map(move |totals| field(&totals))
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::StoreActor;
    use crate::model::{AddItem, Collection, Mutation, ProductSnapshot, ResourceKind};

    fn collection(kind: ResourceKind, quantities: &[u32]) -> Collection {
        quantities
            .iter()
            .enumerate()
            .fold(Collection::empty(kind), |c, (i, q)| {
                let spec = AddItem::new(ProductSnapshot::new(
                    format!("p{i}"),
                    "Item",
                    Decimal::new(1000, 2),
                ))
                .quantity(*q);
                c.apply(&Mutation::Add(spec))
            })
    }

    #[test]
    fn test_total_count_sums_both_resources() {
        let cart = Summary::of(&collection(ResourceKind::Cart, &[2, 1]), 4);
        let wishlist = Summary::of(&collection(ResourceKind::Wishlist, &[1, 1, 1]), 4);

        let totals = aggregate(&cart, &wishlist, 4);

        assert_eq!(totals.counter.cart_count, 3);
        assert_eq!(totals.counter.wishlist_count, 3);
        assert_eq!(totals.counter.total_count, 6);
        assert_eq!(totals.cart_total_amount, Decimal::new(3000, 2));
    }

    #[test]
    fn test_price_shown_from_threshold() {
        let empty = Summary::default();
        let three = Summary::of(&collection(ResourceKind::Cart, &[3]), 4);
        let four = Summary::of(&collection(ResourceKind::Cart, &[3, 1]), 4);

        assert!(!aggregate(&three, &empty, 4).show_cart_total_price);
        assert!(aggregate(&four, &empty, 4).show_cart_total_price);
        assert!(aggregate(&three, &empty, 3).show_cart_total_price);
    }

    #[tokio::test]
    async fn test_aggregator_follows_store_emissions() {
        let (cart_actor, cart) = StoreActor::new(ResourceKind::Cart, 4, 8);
        let (wishlist_actor, wishlist) = StoreActor::new(ResourceKind::Wishlist, 4, 8);
        tokio::spawn(cart_actor.run());
        tokio::spawn(wishlist_actor.run());
        let (aggregator, totals) = Aggregator::new(&cart, &wishlist, 4);
        tokio::spawn(aggregator.run());

        cart.adopt(collection(ResourceKind::Cart, &[2, 2])).await.unwrap();
        wishlist
            .adopt(collection(ResourceKind::Wishlist, &[1]))
            .await
            .unwrap();

        let settled = totals
            .wait_for(|t| t.counter.total_count == 5)
            .await
            .unwrap();
        assert!(settled.show_cart_total_price);

        cart.clear().await.unwrap();
        wishlist.clear().await.unwrap();
        let cleared = totals.wait_for(|t| t.counter.total_count == 0).await.unwrap();
        assert!(!cleared.show_cart_total_price);
    }
}
