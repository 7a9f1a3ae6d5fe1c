use crate::engine::{MutationOutcome, ReconciliationEngine, SyncError};
use crate::model::{AddItem, Collection, ItemPatch, ResourceKind, Snapshot, Summary};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;

/// Operations shared by the cart and the wishlist.
///
/// Implementors supply the engine and the resource they address; everything else is
/// provided. The streams replay the latest state to new subscribers.
#[async_trait]
pub trait CollectionClient: Send + Sync {
    fn engine(&self) -> &ReconciliationEngine;

    fn resource(&self) -> ResourceKind;

    /// Latest visible state, optimistic predictions included.
    fn current(&self) -> Arc<Snapshot> {
        self.engine().store(self.resource()).current()
    }

    fn collection(&self) -> BoxStream<'static, Collection> {
        WatchStream::new(self.engine().store(self.resource()).subscribe())
            .map(|snapshot| snapshot.collection.clone())
            .boxed()
    }

    fn summary(&self) -> BoxStream<'static, Summary> {
        WatchStream::new(self.engine().store(self.resource()).subscribe())
            .map(|snapshot| snapshot.summary.clone())
            .boxed()
    }

    /// Whether the last committed state holds the product. `None` matches any variant.
    fn contains(&self, product_id: &str, size: Option<&str>, color: Option<&str>) -> bool {
        self.engine()
            .is_in_collection(self.resource(), product_id, size, color)
    }

    async fn load(&self) -> Result<Arc<Snapshot>, SyncError> {
        self.engine().load(self.resource()).await
    }

    async fn add(&self, spec: AddItem) -> MutationOutcome {
        self.engine().add(self.resource(), spec).await
    }

    async fn update(&self, item_id: &str, patch: ItemPatch) -> MutationOutcome {
        self.engine().update(self.resource(), item_id, patch).await
    }

    async fn remove(&self, item_id: &str) -> MutationOutcome {
        self.engine().remove(self.resource(), item_id).await
    }

    async fn bulk_remove(&self, item_ids: Vec<String>) -> MutationOutcome {
        self.engine().bulk_remove(self.resource(), item_ids).await
    }

    async fn clear(&self) -> MutationOutcome {
        self.engine().clear(self.resource()).await
    }
}
