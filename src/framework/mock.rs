//! # Mock Store
//!
//! Utilities for testing code that drives a [`StoreClient`] without spawning a store actor.
//!
//! [`create_mock_store`] returns a client wired to a channel the test controls. The test then
//! pulls requests off the receiver with the `expect_*` helpers, asserts on them, and answers
//! (or withholds an answer) through the returned responder. This makes ordering observable:
//! a test can hold the engine at "prediction requested" and check that the gateway has not
//! been called yet.
//!
//! | Feature | Mock store | Real `StoreActor` |
//! |---------|------------|-------------------|
//! | **Determinism** | Test decides when each request completes | Subject to scheduler |
//! | **State** | None (test answers) | Real fold over committed + pending |
//! | **Use Case** | Ordering of engine steps | Store semantics, full flows |

use crate::framework::client::StoreClient;
use crate::framework::message::{Applied, Response, StoreRequest, Ticket};
use crate::model::{Collection, Mutation, ResourceKind, Snapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Creates a store client and a receiver for asserting requests.
///
/// The client's watch channels hold an empty snapshot that never changes.
pub fn create_mock_store(
    kind: ResourceKind,
    threshold: u32,
    buffer_size: usize,
) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let (_, visible) = watch::channel(Arc::new(Snapshot::empty(kind, threshold)));
    let (_, committed) = watch::channel(Arc::new(Collection::empty(kind)));
    (StoreClient::new(kind, sender, visible, committed), receiver)
}

/// Helper to verify that the next message is a Begin request.
pub async fn expect_begin(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Mutation, Response<Ticket>)> {
    match receiver.recv().await {
        Some(StoreRequest::Begin {
            mutation,
            respond_to,
        }) => Some((mutation, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Commit request.
pub async fn expect_commit(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(u64, Collection, Response<Applied>)> {
    match receiver.recv().await {
        Some(StoreRequest::Commit {
            seq,
            collection,
            respond_to,
        }) => Some((seq, collection, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Rollback request.
pub async fn expect_rollback(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(u64, Response<Arc<Snapshot>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Rollback { seq, respond_to }) => Some((seq, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Reserve request.
pub async fn expect_reserve(receiver: &mut mpsc::Receiver<StoreRequest>) -> Option<Response<u64>> {
    match receiver.recv().await {
        Some(StoreRequest::Reserve { respond_to }) => Some(respond_to),
        _ => None,
    }
}
