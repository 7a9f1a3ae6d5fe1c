//! Reconciliation engine: optimistic mutations, rollback and convergence.
//!
//! - [`ReconciliationEngine`] - the mutation lifecycle for both resources
//! - [`MutationOutcome`] / [`SyncError`] - what callers get back
//! - [`SingleFlight`] - de-duplication of concurrent loads

pub mod outcome;
pub mod reconcile;
pub mod single_flight;

pub use outcome::{MutationOutcome, SyncError};
pub use reconcile::{ReconciliationEngine, Stores};
pub use single_flight::SingleFlight;
