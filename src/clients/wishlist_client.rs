use super::collection_client::CollectionClient;
use crate::engine::{MutationOutcome, ReconciliationEngine};
use crate::model::{AddItem, ResourceKind};
use tracing::{debug, info, instrument};

/// Client for the wishlist.
#[derive(Clone)]
pub struct WishlistClient {
    engine: ReconciliationEngine,
}

impl WishlistClient {
    pub fn new(engine: ReconciliationEngine) -> Self {
        Self { engine }
    }

    #[instrument(skip(self))]
    pub async fn move_to_cart(&self, item_id: &str) -> MutationOutcome {
        debug!("move_to_cart called");
        self.engine
            .move_item(ResourceKind::Wishlist, item_id, ResourceKind::Cart)
            .await
    }

    /// Adds the product, or removes every wishlisted variant of it if already present.
    #[instrument(skip(self, spec), fields(product_id = %spec.product.id))]
    pub async fn toggle(&self, spec: AddItem) -> MutationOutcome {
        let product_id = spec.product.id.clone();
        let wishlisted: Vec<String> = self
            .current()
            .collection
            .items()
            .iter()
            .filter(|item| item.product.id == product_id)
            .map(|item| item.id.clone())
            .collect();

        if wishlisted.is_empty() {
            info!("Adding to wishlist");
            self.add(spec).await
        } else {
            info!(rows = wishlisted.len(), "Removing from wishlist");
            self.bulk_remove(wishlisted).await
        }
    }
}

#[async_trait::async_trait]
impl CollectionClient for WishlistClient {
    fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    fn resource(&self) -> ResourceKind {
        ResourceKind::Wishlist
    }
}
