//! Session handling: the transition coordinator, the tracker feeding it, and login merging.
//!
//! - [`TransitionCoordinator`] / [`CoordinatorClient`] - guest/authenticated state machine
//! - [`SessionTracker`] - authentication stream to coordinator transitions
//! - [`SessionState`] / [`SessionLink`] - what the engine sees of the session
//! - [`merge`](merge::merge), [`MergePolicy`], [`MergePrompt`] - combining guest and server rows

pub mod coordinator;
pub mod merge;
pub mod state;
pub mod tracker;

pub use coordinator::{CoordinatorClient, CoordinatorContext, CoordinatorRequest, TransitionCoordinator};
pub use merge::{MergeChoice, MergePolicy, MergePrompt};
pub use state::{SessionLink, SessionState};
pub use tracker::SessionTracker;
