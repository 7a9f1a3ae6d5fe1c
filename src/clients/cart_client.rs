use super::collection_client::CollectionClient;
use crate::engine::{MutationOutcome, ReconciliationEngine};
use crate::model::{ItemPatch, ResourceKind};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

/// Client for the cart.
#[derive(Clone)]
pub struct CartClient {
    engine: ReconciliationEngine,
}

impl CartClient {
    pub fn new(engine: ReconciliationEngine) -> Self {
        Self { engine }
    }

    #[instrument(skip(self))]
    pub async fn set_quantity(&self, item_id: &str, quantity: u32) -> MutationOutcome {
        debug!("set_quantity called");
        self.update(item_id, ItemPatch::default().quantity(quantity))
            .await
    }

    #[instrument(skip(self))]
    pub async fn move_to_wishlist(&self, item_id: &str) -> MutationOutcome {
        debug!("move_to_wishlist called");
        self.engine
            .move_item(ResourceKind::Cart, item_id, ResourceKind::Wishlist)
            .await
    }

    /// Sum of line totals of the visible cart.
    pub fn total_amount(&self) -> Decimal {
        self.current().summary.total_amount()
    }
}

#[async_trait::async_trait]
impl CollectionClient for CartClient {
    fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    fn resource(&self) -> ResourceKind {
        ResourceKind::Cart
    }
}
