//! Results handed back to callers of the reconciliation engine.

use crate::framework::FrameworkError;
use crate::gateway::GatewayError;
use crate::model::Snapshot;
use std::sync::Arc;
use thiserror::Error;

/// Why a sync operation did not go through.
///
/// Transport and authentication details stop at the engine; this is the whole vocabulary
/// callers ever see.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Server error: {0}")]
    ServerFault(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    ValidationFailed(String),

    #[error("State store unavailable: {0}")]
    Store(#[from] FrameworkError),
}

impl From<GatewayError> for SyncError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unauthenticated => SyncError::Unauthenticated,
            GatewayError::NetworkUnavailable(message) => SyncError::NetworkUnavailable(message),
            GatewayError::ServerFault { status, message } => {
                SyncError::ServerFault(format!("{status}: {message}"))
            }
            GatewayError::NotFound(message) => SyncError::NotFound(message),
            GatewayError::ValidationFailed(message) => SyncError::ValidationFailed(message),
        }
    }
}

/// Terminal state of one mutation.
#[derive(Debug, Clone)]
pub enum MutationOutcome {
    /// The mutation holds. Carries the state emitted when it settled.
    Committed(Arc<Snapshot>),
    /// The mutation failed and its prediction was withdrawn.
    RolledBack(SyncError),
    /// The remote store rejected the credential; the session was ended.
    Unauthenticated,
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed(_))
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            MutationOutcome::Committed(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<SyncError> {
        match self {
            MutationOutcome::Committed(_) => None,
            MutationOutcome::RolledBack(e) => Some(e.clone()),
            MutationOutcome::Unauthenticated => Some(SyncError::Unauthenticated),
        }
    }
}

impl From<SyncError> for MutationOutcome {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Unauthenticated => MutationOutcome::Unauthenticated,
            other => MutationOutcome::RolledBack(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_translate() {
        let e: SyncError = GatewayError::ServerFault {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert_eq!(e, SyncError::ServerFault("502: bad gateway".into()));
        assert_eq!(SyncError::from(GatewayError::Unauthenticated), SyncError::Unauthenticated);
    }

    #[test]
    fn test_unauthenticated_error_becomes_its_own_outcome() {
        let outcome = MutationOutcome::from(SyncError::Unauthenticated);
        assert!(matches!(outcome, MutationOutcome::Unauthenticated));

        let outcome = MutationOutcome::from(SyncError::NotFound("c1".into()));
        assert_eq!(outcome.error(), Some(SyncError::NotFound("c1".into())));
        assert!(!outcome.is_committed());
    }
}
