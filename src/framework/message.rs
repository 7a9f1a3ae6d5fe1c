//! # Store Messages
//!
//! The request vocabulary of a [`StoreActor`](crate::framework::StoreActor). Every request
//! carries a one-shot channel the actor answers on once the request has been applied and the
//! resulting state emitted.
//!
//! The variants follow the reconciliation lifecycle of a mutation:
//!
//! - **Begin**: optimistic apply. The mutation joins the pending set, the prediction is emitted
//!   and a sequence number is issued for the gateway call.
//! - **Commit**: the authoritative response arrived. Applied only if its sequence number is the
//!   highest seen so far.
//! - **Rollback**: the gateway call failed; the pending mutation is dropped.
//! - **Converge**: the server no longer knows the target rows; they are removed locally. Gated
//!   like a commit, so a late answer cannot remove rows from a newer state.
//!
//! Plus the writes that bypass the gateway: **Local** (guest mode), **Adopt** (login),
//! **Fallback** (cache read after a failure) and **Clear** (logout).

use crate::model::{Collection, Mutation, ResourceItem, Snapshot};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by store actors.
pub type Response<T> = oneshot::Sender<T>;

/// Receipt of an optimistic apply.
#[derive(Debug, Clone)]
pub struct Ticket {
    /// Sequence number to present with the gateway response.
    pub seq: u64,
    /// The state emitted to subscribers by the apply.
    pub predicted: Arc<Snapshot>,
}

/// Result of presenting a gateway response to the store.
#[derive(Debug, Clone)]
pub enum Applied {
    /// The response was the newest seen and replaced the committed state.
    Fresh(Arc<Snapshot>),
    /// A newer response had already been applied; this one was discarded.
    Stale(Arc<Snapshot>),
}

impl Applied {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Applied::Fresh(_))
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        match self {
            Applied::Fresh(snapshot) | Applied::Stale(snapshot) => snapshot,
        }
    }
}

/// Requests understood by a store actor.
#[derive(Debug)]
pub enum StoreRequest {
    Snapshot {
        respond_to: Response<Arc<Snapshot>>,
    },
    Reserve {
        respond_to: Response<u64>,
    },
    Begin {
        mutation: Mutation,
        respond_to: Response<Ticket>,
    },
    Commit {
        seq: u64,
        collection: Collection,
        respond_to: Response<Applied>,
    },
    Rollback {
        seq: u64,
        respond_to: Response<Arc<Snapshot>>,
    },
    Converge {
        seq: u64,
        item_ids: Vec<String>,
        respond_to: Response<Applied>,
    },
    Local {
        mutation: Mutation,
        respond_to: Response<Arc<Snapshot>>,
    },
    Adopt {
        collection: Collection,
        respond_to: Response<Arc<Snapshot>>,
    },
    Fallback {
        items: Vec<ResourceItem>,
        respond_to: Response<bool>,
    },
    Clear {
        respond_to: Response<()>,
    },
}
