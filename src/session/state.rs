//! Session states published by the transition coordinator.

use crate::model::SessionMode;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::coordinator::CoordinatorRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Guest collections are being restored from the local cache.
    #[default]
    Restoring,
    Guest,
    Authenticating { user_id: String },
    Authenticated { user_id: String },
    LoggingOut,
}

impl SessionState {
    /// Settled states accept mutations; transitional ones hold them back.
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionState::Guest | SessionState::Authenticated { .. })
    }

    /// Where mutations are served. Transitional states count as guest.
    pub fn mode(&self) -> SessionMode {
        match self {
            SessionState::Authenticated { .. } => SessionMode::Authenticated,
            _ => SessionMode::Guest,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionState::Authenticating { user_id } | SessionState::Authenticated { user_id } => {
                Some(user_id)
            }
            _ => None,
        }
    }
}

/// The engine's view of the coordinator.
///
/// It holds only a weak sender, so the engine does not keep the coordinator alive: once every
/// [`CoordinatorClient`](super::CoordinatorClient) is gone, the coordinator stops even though it
/// still owns the engine.
#[derive(Debug, Clone)]
pub struct SessionLink {
    state: watch::Receiver<SessionState>,
    requests: mpsc::WeakSender<CoordinatorRequest>,
}

impl SessionLink {
    pub(crate) fn new(
        state: watch::Receiver<SessionState>,
        requests: mpsc::WeakSender<CoordinatorRequest>,
    ) -> Self {
        Self { state, requests }
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Waits until the session is in a settled state and returns its mode.
    ///
    /// Returns `None` once the coordinator has stopped without settling.
    pub async fn settled_mode(&self) -> Option<SessionMode> {
        let mut state = self.state.clone();
        let mode = state
            .wait_for(SessionState::is_settled)
            .await
            .ok()
            .map(|settled| settled.mode());
        mode
    }

    /// Asks the coordinator to end the session after the remote store rejected the credential.
    /// Resolves once the session has been torn down.
    pub async fn expire(&self) {
        let Some(requests) = self.requests.upgrade() else {
            debug!("Coordinator gone; nothing to expire");
            return;
        };
        let (respond_to, done) = oneshot::channel();
        if requests
            .send(CoordinatorRequest::Expire { respond_to })
            .await
            .is_ok()
        {
            let _ = done.await;
        }
    }
}
