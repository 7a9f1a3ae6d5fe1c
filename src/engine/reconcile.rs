//! # Reconciliation Engine
//!
//! Runs every mutation of the cart and the wishlist through the same lifecycle:
//!
//! 1. **Validate** the intent. Invalid intents never touch state.
//! 2. **Wait** for the session to settle. While the coordinator is logging in or out,
//!    mutations are held back.
//! 3. **Guest mode**: apply to the store and the local cache. Nothing reaches the gateway.
//! 4. **Authenticated mode**: `Begin` an optimistic prediction (emitted before the gateway is
//!    awaited), dispatch, then settle the prediction:
//!
//! | Gateway result | Store | Side effect | Outcome |
//! |----------------|-------|-------------|---------|
//! | success | `Commit` (stale responses discarded) | cache mirror | `Committed` |
//! | `NotFound` | `Converge` (row removed locally, stale answers discarded) | cache mirror | `Committed` for removals, else `RolledBack` |
//! | `NetworkUnavailable` / `ServerFault` | `Rollback` | cache fallback | `RolledBack` |
//! | `ValidationFailed` | `Rollback` | none | `RolledBack` |
//! | `Unauthenticated` | `Rollback` | session expired | `Unauthenticated` |
//!
//! Failures are never retried. Loads are single-flight per resource.

use super::outcome::{MutationOutcome, SyncError};
use super::single_flight::SingleFlight;
use crate::cache::LocalCache;
use crate::framework::{FrameworkError, StoreClient};
use crate::gateway::{GatewayError, GatewayResult, RemoteGateway};
use crate::model::{
    AddItem, Collection, ItemPatch, Mutation, ResourceItem, ResourceKind, SessionMode, Snapshot,
};
use crate::notify::{NoticeKind, Notifier};
use crate::session::{SessionLink, SessionState};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

type LoadResult = Result<Arc<Snapshot>, SyncError>;

/// The two store handles, addressed by resource.
#[derive(Debug, Clone)]
pub struct Stores {
    pub cart: StoreClient,
    pub wishlist: StoreClient,
}

impl Stores {
    pub fn get(&self, resource: ResourceKind) -> &StoreClient {
        match resource {
            ResourceKind::Cart => &self.cart,
            ResourceKind::Wishlist => &self.wishlist,
        }
    }
}

/// What a mutation was meant to achieve, for user-facing notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Add,
    Update,
    Remove,
    BulkRemove(usize),
    Clear,
    Move(ResourceKind),
}

impl Intent {
    fn of(mutation: &Mutation) -> Self {
        match mutation {
            Mutation::Add(_) => Intent::Add,
            Mutation::Update { .. } => Intent::Update,
            Mutation::Remove { .. } => Intent::Remove,
            Mutation::BulkRemove { item_ids } => Intent::BulkRemove(item_ids.len()),
            Mutation::Clear => Intent::Clear,
        }
    }

    fn success(self, resource: ResourceKind) -> String {
        match self {
            Intent::Add => format!("Added to {resource}"),
            Intent::Update => format!("Updated {resource}"),
            Intent::Remove => format!("Removed from {resource}"),
            Intent::BulkRemove(n) => format!("Removed {n} items from {resource}"),
            Intent::Clear => format!("Cleared {resource}"),
            Intent::Move(destination) => format!("Moved to {destination}"),
        }
    }

    fn failure(self, resource: ResourceKind, error: &SyncError) -> String {
        let action = match self {
            Intent::Add => format!("add to {resource}"),
            Intent::Update => format!("update {resource}"),
            Intent::Remove | Intent::BulkRemove(_) => format!("remove from {resource}"),
            Intent::Clear => format!("clear {resource}"),
            Intent::Move(destination) => format!("move to {destination}"),
        };
        format!("Could not {action}: {error}")
    }
}

/// Drives the stores, the gateway and the cache for both resources.
///
/// Cheap to clone; all clones share the same single-flight registry.
#[derive(Clone)]
pub struct ReconciliationEngine {
    inner: Arc<Inner>,
}

struct Inner {
    stores: Stores,
    gateway: Arc<dyn RemoteGateway>,
    cache: LocalCache,
    notifier: Arc<dyn Notifier>,
    session: SessionLink,
    loads: SingleFlight<ResourceKind, LoadResult>,
}

impl ReconciliationEngine {
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn RemoteGateway>,
        cache: LocalCache,
        notifier: Arc<dyn Notifier>,
        session: SessionLink,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                stores,
                gateway,
                cache,
                notifier,
                session,
                loads: SingleFlight::new(),
            }),
        }
    }

    pub fn store(&self, resource: ResourceKind) -> &StoreClient {
        self.inner.stores.get(resource)
    }

    /// Whether the last committed state of `resource` holds a matching row.
    ///
    /// `None` for `size` or `color` matches any variant. Optimistic predictions do not count.
    pub fn is_in_collection(
        &self,
        resource: ResourceKind,
        product_id: &str,
        size: Option<&str>,
        color: Option<&str>,
    ) -> bool {
        self.store(resource)
            .committed()
            .contains(product_id, size, color)
    }

    /// Refreshes `resource`. Concurrent loads of the same resource share one gateway call.
    pub async fn load(&self, resource: ResourceKind) -> LoadResult {
        match self.mode().await? {
            SessionMode::Guest => self.load_local(resource).await,
            SessionMode::Authenticated => {
                let engine = self.clone();
                self.inner
                    .loads
                    .run(resource, move || async move { engine.load_remote(resource).await })
                    .await
            }
        }
    }

    pub async fn add(&self, resource: ResourceKind, spec: AddItem) -> MutationOutcome {
        self.mutate(resource, Mutation::Add(spec)).await
    }

    pub async fn update(
        &self,
        resource: ResourceKind,
        item_id: impl Into<String>,
        patch: ItemPatch,
    ) -> MutationOutcome {
        let item_id = item_id.into();
        self.mutate(resource, Mutation::Update { item_id, patch }).await
    }

    /// Removes a row. Removing a row the remote store no longer has is a success.
    pub async fn remove(&self, resource: ResourceKind, item_id: impl Into<String>) -> MutationOutcome {
        let item_id = item_id.into();
        self.mutate(resource, Mutation::Remove { item_id }).await
    }

    pub async fn bulk_remove(&self, resource: ResourceKind, item_ids: Vec<String>) -> MutationOutcome {
        self.mutate(resource, Mutation::BulkRemove { item_ids }).await
    }

    pub async fn clear(&self, resource: ResourceKind) -> MutationOutcome {
        self.mutate(resource, Mutation::Clear).await
    }

    /// Moves a row from `source` to `destination`.
    ///
    /// Both stores predict the move. The outcome carries the source state; the destination is
    /// refreshed from the remote store once the move is confirmed.
    pub async fn move_item(
        &self,
        source: ResourceKind,
        item_id: impl Into<String>,
        destination: ResourceKind,
    ) -> MutationOutcome {
        let item_id = item_id.into();
        let outcome = self
            .try_move(source, item_id, destination)
            .await
            .unwrap_or_else(MutationOutcome::from);
        self.report(source, Intent::Move(destination), &outcome);
        outcome
    }

    async fn mode(&self) -> Result<SessionMode, SyncError> {
        self.inner
            .session
            .settled_mode()
            .await
            .ok_or(SyncError::Store(FrameworkError::ActorClosed))
    }

    async fn mutate(&self, resource: ResourceKind, mutation: Mutation) -> MutationOutcome {
        let intent = Intent::of(&mutation);
        let outcome = self
            .try_mutate(resource, mutation)
            .await
            .unwrap_or_else(MutationOutcome::from);
        self.report(resource, intent, &outcome);
        outcome
    }

    async fn try_mutate(
        &self,
        resource: ResourceKind,
        mutation: Mutation,
    ) -> Result<MutationOutcome, SyncError> {
        if let Err(reason) = mutation.validate() {
            debug!(%resource, mutation = mutation.label(), %reason, "Rejected invalid mutation");
            return Err(SyncError::ValidationFailed(reason));
        }
        match self.mode().await? {
            SessionMode::Guest => self.mutate_locally(resource, mutation).await,
            SessionMode::Authenticated => self.mutate_remotely(resource, mutation).await,
        }
    }

    async fn mutate_locally(
        &self,
        resource: ResourceKind,
        mutation: Mutation,
    ) -> Result<MutationOutcome, SyncError> {
        let snapshot = self.store(resource).local(mutation).await?;
        self.mirror(resource).await;
        Ok(MutationOutcome::Committed(snapshot))
    }

    async fn mutate_remotely(
        &self,
        resource: ResourceKind,
        mutation: Mutation,
    ) -> Result<MutationOutcome, SyncError> {
        let ticket = self.store(resource).begin(mutation.clone()).await?;
        debug!(%resource, seq = ticket.seq, mutation = mutation.label(), "Predicted");
        let result = self.dispatch(resource, &mutation).await;
        self.settle(resource, ticket.seq, &mutation, result).await
    }

    async fn dispatch(&self, resource: ResourceKind, mutation: &Mutation) -> GatewayResult {
        let gateway = &self.inner.gateway;
        match mutation {
            Mutation::Add(spec) => gateway.add(resource, spec).await,
            Mutation::Update { item_id, patch } => gateway.update(resource, item_id, patch).await,
            Mutation::Remove { item_id } => gateway.remove(resource, item_id).await,
            Mutation::BulkRemove { item_ids } => gateway.bulk_remove(resource, item_ids).await,
            Mutation::Clear => gateway.clear(resource).await,
        }
    }

    /// Resolves the prediction `seq` against the gateway result.
    async fn settle(
        &self,
        resource: ResourceKind,
        seq: u64,
        mutation: &Mutation,
        result: GatewayResult,
    ) -> Result<MutationOutcome, SyncError> {
        let store = self.store(resource);
        match result {
            Ok(snapshot) => {
                let applied = store.commit(seq, snapshot.collection).await?;
                if applied.is_fresh() {
                    self.mirror(resource).await;
                }
                Ok(MutationOutcome::Committed(applied.snapshot().clone()))
            }
            Err(GatewayError::NotFound(message)) => {
                let targets = match mutation {
                    Mutation::Update { item_id, .. } => vec![item_id.clone()],
                    other => other.removed_ids(),
                };
                let applied = store.converge(seq, targets).await?;
                if applied.is_fresh() {
                    self.mirror(resource).await;
                    info!(%resource, seq, %message, "Converged on missing item");
                }
                if mutation.removed_ids().is_empty() {
                    Err(SyncError::NotFound(message))
                } else {
                    Ok(MutationOutcome::Committed(applied.snapshot().clone()))
                }
            }
            Err(error) => {
                store.rollback(seq).await?;
                Err(self.absorb(resource, error).await)
            }
        }
    }

    async fn try_move(
        &self,
        source: ResourceKind,
        item_id: String,
        destination: ResourceKind,
    ) -> Result<MutationOutcome, SyncError> {
        if source == destination {
            return Err(SyncError::ValidationFailed(format!(
                "item {item_id} is already in the {source}"
            )));
        }
        let item = self.store(source).current().collection.find(&item_id).cloned();
        match self.mode().await? {
            SessionMode::Guest => {
                let Some(item) = item else {
                    return Err(SyncError::NotFound(item_id));
                };
                let spec = AddItem::from_item(&item, source.into());
                self.store(destination).local(Mutation::Add(spec)).await?;
                self.mirror(destination).await;
                self.mutate_locally(source, Mutation::Remove { item_id }).await
            }
            SessionMode::Authenticated => {
                self.move_remotely(source, item_id, item, destination).await
            }
        }
    }

    async fn move_remotely(
        &self,
        source: ResourceKind,
        item_id: String,
        item: Option<ResourceItem>,
        destination: ResourceKind,
    ) -> Result<MutationOutcome, SyncError> {
        let removal = Mutation::Remove {
            item_id: item_id.clone(),
        };
        let source_seq = self.store(source).begin(removal.clone()).await?.seq;
        let destination_seq = match &item {
            Some(item) => {
                let spec = AddItem::from_item(item, source.into());
                self.store(destination).begin(Mutation::Add(spec)).await?.seq
            }
            None => self.store(destination).reserve().await?,
        };
        debug!(%source, %destination, source_seq, destination_seq, %item_id, "Predicted move");

        let moved = match self
            .inner
            .gateway
            .move_item(source, &item_id, destination)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(error) => {
                self.store(destination).rollback(destination_seq).await?;
                if let GatewayError::NotFound(message) = error {
                    let applied = self.store(source).converge(source_seq, vec![item_id]).await?;
                    if applied.is_fresh() {
                        self.mirror(source).await;
                    }
                    return Err(SyncError::NotFound(message));
                }
                self.store(source).rollback(source_seq).await?;
                return Err(self.absorb(source, error).await);
            }
        };

        let outcome = self.settle(source, source_seq, &removal, Ok(moved)).await?;
        self.follow(destination, destination_seq).await?;
        Ok(outcome)
    }

    /// Replaces the prediction `seq` of `resource` with a fresh remote load.
    async fn follow(&self, resource: ResourceKind, seq: u64) -> Result<(), SyncError> {
        let store = self.store(resource);
        match self.inner.gateway.load(resource).await {
            Ok(snapshot) => {
                if store.commit(seq, snapshot.collection).await?.is_fresh() {
                    self.mirror(resource).await;
                }
            }
            Err(error) => {
                warn!(%resource, seq, %error, "Reload after move failed");
                store.rollback(seq).await?;
                self.absorb(resource, error).await;
            }
        }
        Ok(())
    }

    async fn load_local(&self, resource: ResourceKind) -> LoadResult {
        let store = self.store(resource);
        let items = self.cached_items(resource, None).await;
        if store.fallback(items).await? {
            debug!(%resource, "Guest collection hydrated from cache");
        }
        Ok(store.snapshot().await?)
    }

    async fn load_remote(&self, resource: ResourceKind) -> LoadResult {
        let store = self.store(resource);
        let seq = store.reserve().await?;
        match self.inner.gateway.load(resource).await {
            Ok(snapshot) => {
                let applied = store.commit(seq, snapshot.collection).await?;
                if applied.is_fresh() {
                    self.mirror(resource).await;
                }
                info!(%resource, seq, items = applied.snapshot().collection.len(), "Loaded");
                Ok(applied.snapshot().clone())
            }
            Err(error) => Err(self.absorb(resource, error).await),
        }
    }

    /// Applies the side effects of a failed gateway call and translates the error.
    async fn absorb(&self, resource: ResourceKind, error: GatewayError) -> SyncError {
        match &error {
            GatewayError::Unauthenticated => {
                warn!(%resource, "Credential rejected; ending session");
                self.inner.session.expire().await;
            }
            GatewayError::NetworkUnavailable(_) | GatewayError::ServerFault { .. } => {
                warn!(%resource, %error, "Remote call failed");
                self.fall_back(resource).await;
            }
            GatewayError::NotFound(_) | GatewayError::ValidationFailed(_) => {
                warn!(%resource, %error, "Remote store refused the call");
            }
        }
        error.into()
    }

    /// Shows cached rows if the store has nothing better to display.
    async fn fall_back(&self, resource: ResourceKind) {
        let owner = self.inner.session.current().user_id().map(str::to_string);
        let items = self.cached_items(resource, owner.as_deref()).await;
        match self.store(resource).fallback(items).await {
            Ok(true) => info!(%resource, "Displaying cached collection"),
            Ok(false) => {}
            Err(e) => error!(%resource, error = %e, "Store unavailable for cache fallback"),
        }
    }

    /// Writes the committed state of `resource` to the local cache, tagged with the signed-in
    /// user so a restart never reads it back as guest rows.
    async fn mirror(&self, resource: ResourceKind) {
        let session = self.inner.session.current();
        if session == SessionState::LoggingOut {
            debug!(%resource, "Session ending; cache left to the purge");
            return;
        }
        let committed = self.store(resource).committed();
        let owner = session.user_id();
        if let Err(e) = self
            .inner
            .cache
            .write(resource, owner, committed.items())
            .await
        {
            warn!(%resource, error = %e, "Cache write failed");
        }
    }

    async fn cached_items(&self, resource: ResourceKind, owner: Option<&str>) -> Vec<ResourceItem> {
        self.inner.cache.read(resource, owner).await.unwrap_or_else(|e| {
            warn!(%resource, error = %e, "Cache read failed");
            Vec::new()
        })
    }

    fn report(&self, resource: ResourceKind, intent: Intent, outcome: &MutationOutcome) {
        let notifier = &self.inner.notifier;
        match outcome {
            MutationOutcome::Committed(_) => {
                notifier.notify(&intent.success(resource), NoticeKind::Success)
            }
            MutationOutcome::RolledBack(error) => {
                notifier.notify(&intent.failure(resource, error), NoticeKind::Error)
            }
            MutationOutcome::Unauthenticated => notifier.notify(
                "Your session has expired. Please sign in again.",
                NoticeKind::LoginRequired,
            ),
        }
    }

    // Session transitions. Only the coordinator calls these; none of them waits for the
    // session to settle or reports back to the coordinator.

    /// Replaces both stores with the guest collections held in the cache.
    pub(crate) async fn restore_guest(&self) {
        for resource in ResourceKind::ALL {
            let items = self.cached_items(resource, None).await;
            let collection = Collection::from_items(resource, None, items);
            if let Err(e) = self.store(resource).adopt(collection).await {
                error!(%resource, error = %e, "Could not restore guest collection");
            }
        }
    }

    /// Guest rows awaiting a login merge.
    pub(crate) async fn guest_items(&self, resource: ResourceKind) -> Vec<ResourceItem> {
        match self.inner.cache.read(resource, None).await {
            Ok(items) => items,
            Err(e) => {
                warn!(%resource, error = %e, "Cache unreadable; merging in-memory guest rows");
                self.store(resource).committed().items().to_vec()
            }
        }
    }

    pub(crate) async fn fetch(&self, resource: ResourceKind) -> GatewayResult {
        self.inner.gateway.load(resource).await
    }

    pub(crate) async fn replace(&self, resource: ResourceKind, items: &[ResourceItem]) -> GatewayResult {
        self.inner.gateway.replace(resource, items).await
    }

    /// Commits `collection` as the new authoritative state and mirrors it to the cache.
    pub(crate) async fn adopt(&self, resource: ResourceKind, collection: Collection) -> LoadResult {
        let snapshot = self.store(resource).adopt(collection).await?;
        self.mirror(resource).await;
        Ok(snapshot)
    }

    /// Commits `collection` for display only; the cache keeps what it holds.
    pub(crate) async fn display(&self, resource: ResourceKind, collection: Collection) -> LoadResult {
        Ok(self.store(resource).adopt(collection).await?)
    }

    /// Empties both stores and the cache.
    pub(crate) async fn purge(&self) -> Result<(), SyncError> {
        for resource in ResourceKind::ALL {
            self.store(resource).clear().await?;
        }
        if let Err(e) = self.inner.cache.purge_all().await {
            error!(error = %e, "Cache purge failed");
        }
        Ok(())
    }
}
