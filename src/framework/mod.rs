//! Reactive state store framework.
//!
//! This module provides the building blocks of the per-resource state stores: an actor that
//! owns the collection state, the messages it understands, and the client used to drive it.
//!
//! # Main Components
//!
//! - [`StoreActor`] - Owns committed state, pending predictions and the sequence gate
//! - [`StoreClient`] - Cloneable handle; async requests plus synchronous watch reads
//! - [`StoreRequest`] - The request vocabulary (Begin / Commit / Rollback / ...)
//! - [`SequenceGate`] - Stale-response discarding
//! - [`FrameworkError`] - Channel failures
//!
//! # Testing
//!
//! See [`mock`] module for utilities to test store-driving code without spawning actors.

pub mod actor;
pub mod client;
pub mod error;
pub mod message;
pub mod mock;
pub mod sequence;

// Re-export core types for convenience
pub use actor::StoreActor;
pub use client::StoreClient;
pub use error::FrameworkError;
pub use message::{Applied, Response, StoreRequest, Ticket};
pub use sequence::SequenceGate;
