//! # Store Actor
//!
//! This module defines the `StoreActor`, the reactive state store of one resource. It is the
//! "Server" half of the Actor Model: it owns the collection state and processes requests
//! sequentially, so no lock guards the state and no two folds ever interleave.
//!
//! ## State
//!
//! - `committed`: the last authoritative collection (server response, guest fold or cache).
//! - `pending`: optimistic mutations still waiting for the gateway, keyed by sequence number.
//! - `gate`: the [`SequenceGate`] deciding which responses are fresh.
//!
//! The *visible* collection is always `pending` folded over `committed`, in sequence order.
//! Each request that changes state recomputes it and publishes it exactly once, together with
//! its summary, as one [`Snapshot`]. Subscribers therefore never observe a collection paired
//! with a summary of a different state.

use crate::framework::client::StoreClient;
use crate::framework::message::{Applied, StoreRequest, Ticket};
use crate::framework::sequence::SequenceGate;
use crate::model::{
    Collection, Mutation, ResourceItem, ResourceKind, Snapshot, PENDING_ID_PREFIX,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// The reactive state store of one resource.
///
/// # Usage Pattern
///
/// 1. **Create**: `StoreActor::new()` returns the actor and its [`StoreClient`].
/// 2. **Run**: spawn `actor.run()` in a background task.
/// 3. **Use**: hand clones of the client to the reconciliation engine; subscribers call
///    [`StoreClient::subscribe`].
///
/// The actor stops once every client has been dropped.
pub struct StoreActor {
    kind: ResourceKind,
    threshold: u32,
    receiver: mpsc::Receiver<StoreRequest>,
    committed: Collection,
    pending: BTreeMap<u64, Mutation>,
    gate: SequenceGate,
    visible_tx: watch::Sender<Arc<Snapshot>>,
    committed_tx: watch::Sender<Arc<Collection>>,
}

impl StoreActor {
    /// Creates a new `StoreActor` and its associated `StoreClient`.
    ///
    /// # Arguments
    ///
    /// * `kind` - The resource this store holds.
    /// * `threshold` - Item count from which summaries show the total price.
    /// * `buffer_size` - Capacity of the request channel.
    pub fn new(kind: ResourceKind, threshold: u32, buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let committed = Collection::empty(kind);
        let (visible_tx, visible_rx) =
            watch::channel(Arc::new(Snapshot::new(committed.clone(), threshold)));
        let (committed_tx, committed_rx) = watch::channel(Arc::new(committed.clone()));
        let actor = Self {
            kind,
            threshold,
            receiver,
            committed,
            pending: BTreeMap::new(),
            gate: SequenceGate::new(),
            visible_tx,
            committed_tx,
        };
        let client = StoreClient::new(kind, sender, visible_rx, committed_rx);
        (actor, client)
    }

    /// Runs the actor's event loop, processing requests until the channel closes.
    pub async fn run(mut self) {
        let resource = self.kind;
        info!(%resource, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(self.visible_tx.borrow().clone());
                }
                StoreRequest::Reserve { respond_to } => {
                    let seq = self.gate.issue();
                    debug!(%resource, seq, "Reserve");
                    let _ = respond_to.send(seq);
                }
                StoreRequest::Begin {
                    mutation,
                    respond_to,
                } => {
                    let seq = self.gate.issue();
                    debug!(%resource, seq, mutation = mutation.label(), "Begin");
                    self.pending.insert(seq, mutation);
                    let predicted = self.publish();
                    let _ = respond_to.send(Ticket { seq, predicted });
                }
                StoreRequest::Commit {
                    seq,
                    collection,
                    respond_to,
                } => {
                    self.pending.remove(&seq);
                    let applied = if self.gate.admit(seq) {
                        info!(%resource, seq, total_items = collection.total_items(), "Committed");
                        self.committed = collection;
                        Applied::Fresh(self.publish())
                    } else {
                        warn!(
                            %resource,
                            seq,
                            highest = self.gate.highest_admitted(),
                            "Discarded stale response"
                        );
                        Applied::Stale(self.publish())
                    };
                    let _ = respond_to.send(applied);
                }
                StoreRequest::Rollback { seq, respond_to } => {
                    let dropped = self.pending.remove(&seq);
                    warn!(%resource, seq, found = dropped.is_some(), "Rolled back");
                    let _ = respond_to.send(self.publish());
                }
                StoreRequest::Converge {
                    seq,
                    item_ids,
                    respond_to,
                } => {
                    self.pending.remove(&seq);
                    let applied = if self.gate.admit(seq) {
                        debug!(%resource, seq, ?item_ids, "Converge");
                        self.committed = self
                            .committed
                            .apply(&Mutation::BulkRemove { item_ids });
                        Applied::Fresh(self.publish())
                    } else {
                        warn!(
                            %resource,
                            seq,
                            highest = self.gate.highest_admitted(),
                            "Discarded stale convergence"
                        );
                        Applied::Stale(self.publish())
                    };
                    let _ = respond_to.send(applied);
                }
                StoreRequest::Local {
                    mutation,
                    respond_to,
                } => {
                    let seq = self.gate.stamp();
                    debug!(%resource, seq, mutation = mutation.label(), "Local");
                    self.committed = self.committed.apply(&mutation);
                    let _ = respond_to.send(self.publish());
                }
                StoreRequest::Adopt {
                    collection,
                    respond_to,
                } => {
                    let seq = self.gate.stamp();
                    info!(%resource, seq, total_items = collection.total_items(), "Adopted");
                    self.committed = collection;
                    let _ = respond_to.send(self.publish());
                }
                StoreRequest::Fallback { items, respond_to } => {
                    let adopted = self.fallback(items);
                    let _ = respond_to.send(adopted);
                }
                StoreRequest::Clear { respond_to } => {
                    self.gate.invalidate();
                    self.pending.clear();
                    self.committed = Collection::empty(self.kind);
                    self.publish();
                    info!(%resource, "Cleared");
                    let _ = respond_to.send(());
                }
            }
        }

        info!(
            %resource,
            items = self.committed.len(),
            pending = self.pending.len(),
            "Shutdown"
        );
    }

    /// Uses cached rows for display only when nothing better is known.
    fn fallback(&mut self, items: Vec<ResourceItem>) -> bool {
        if items.is_empty() || !self.committed.is_empty() || !self.pending.is_empty() {
            return false;
        }
        let owner = self.committed.owner_id().map(str::to_owned);
        self.committed = Collection::from_items(self.kind, owner, items);
        info!(resource = %self.kind, items = self.committed.len(), "Fell back to cache");
        self.publish();
        true
    }

    /// Folds pending mutations over the committed state and emits the result once.
    fn publish(&mut self) -> Arc<Snapshot> {
        let visible = self
            .pending
            .iter()
            .fold(self.committed.clone(), |collection, (seq, mutation)| {
                collection.apply_as(mutation, || format!("{PENDING_ID_PREFIX}{seq}"))
            });
        let snapshot = Arc::new(Snapshot::new(visible, self.threshold));
        self.visible_tx.send_replace(snapshot.clone());
        self.committed_tx
            .send_replace(Arc::new(self.committed.clone()));
        snapshot
    }
}
