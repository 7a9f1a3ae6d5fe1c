//! # Framework Errors
//!
//! Failures of the actor plumbing itself. Domain failures (gateway faults, validation)
//! never travel through the store channel; they are handled by the reconciliation engine.

/// Errors that can occur while talking to a store actor.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
}
