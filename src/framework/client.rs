//! # Store Client
//!
//! The handle used to talk to a [`StoreActor`](crate::framework::StoreActor).

use crate::framework::error::FrameworkError;
use crate::framework::message::{Applied, StoreRequest, Ticket};
use crate::model::{Collection, Mutation, ResourceItem, ResourceKind, Snapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// A type-safe client for interacting with a `StoreActor`.
///
/// Requests travel over an mpsc channel and are answered on oneshot channels. Reads of the
/// latest state do not go through the actor at all: they borrow from the watch channels the
/// actor publishes to, so they are synchronous and never wait behind a slow request.
///
/// The client is cheap to clone and can be shared across tasks.
#[derive(Clone, Debug)]
pub struct StoreClient {
    kind: ResourceKind,
    sender: mpsc::Sender<StoreRequest>,
    visible: watch::Receiver<Arc<Snapshot>>,
    committed: watch::Receiver<Arc<Collection>>,
}

impl StoreClient {
    pub fn new(
        kind: ResourceKind,
        sender: mpsc::Sender<StoreRequest>,
        visible: watch::Receiver<Arc<Snapshot>>,
        committed: watch::Receiver<Arc<Collection>>,
    ) -> Self {
        Self {
            kind,
            sender,
            visible,
            committed,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Subscribes to the visible state. The receiver starts with the latest value.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.visible.clone()
    }

    /// The latest visible state, optimistic predictions included.
    pub fn current(&self) -> Arc<Snapshot> {
        self.visible.borrow().clone()
    }

    /// The last committed collection, predictions excluded.
    pub fn committed(&self) -> Arc<Collection> {
        self.committed.borrow().clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> StoreRequest,
    ) -> Result<T, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)
    }

    pub async fn snapshot(&self) -> Result<Arc<Snapshot>, FrameworkError> {
        self.request(|respond_to| StoreRequest::Snapshot { respond_to })
            .await
    }

    /// Issues a sequence number for a call with no optimistic prediction (a load).
    pub async fn reserve(&self) -> Result<u64, FrameworkError> {
        self.request(|respond_to| StoreRequest::Reserve { respond_to })
            .await
    }

    pub async fn begin(&self, mutation: Mutation) -> Result<Ticket, FrameworkError> {
        self.request(|respond_to| StoreRequest::Begin {
            mutation,
            respond_to,
        })
        .await
    }

    pub async fn commit(&self, seq: u64, collection: Collection) -> Result<Applied, FrameworkError> {
        self.request(|respond_to| StoreRequest::Commit {
            seq,
            collection,
            respond_to,
        })
        .await
    }

    pub async fn rollback(&self, seq: u64) -> Result<Arc<Snapshot>, FrameworkError> {
        self.request(|respond_to| StoreRequest::Rollback { seq, respond_to })
            .await
    }

    pub async fn converge(
        &self,
        seq: u64,
        item_ids: Vec<String>,
    ) -> Result<Applied, FrameworkError> {
        self.request(|respond_to| StoreRequest::Converge {
            seq,
            item_ids,
            respond_to,
        })
        .await
    }

    pub async fn local(&self, mutation: Mutation) -> Result<Arc<Snapshot>, FrameworkError> {
        self.request(|respond_to| StoreRequest::Local {
            mutation,
            respond_to,
        })
        .await
    }

    pub async fn adopt(&self, collection: Collection) -> Result<Arc<Snapshot>, FrameworkError> {
        self.request(|respond_to| StoreRequest::Adopt {
            collection,
            respond_to,
        })
        .await
    }

    pub async fn fallback(&self, items: Vec<ResourceItem>) -> Result<bool, FrameworkError> {
        self.request(|respond_to| StoreRequest::Fallback { items, respond_to })
            .await
    }

    pub async fn clear(&self) -> Result<(), FrameworkError> {
        self.request(|respond_to| StoreRequest::Clear { respond_to })
            .await
    }
}
