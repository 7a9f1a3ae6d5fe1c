//! # Transition Coordinator
//!
//! The state machine that moves the sync layer between guest and authenticated sessions:
//!
//! ```text
//! Restoring -> Guest -> Authenticating -> Authenticated -> LoggingOut -> Guest
//!                             |                                          ^
//!                             +---------- credential rejected -----------+
//! ```
//!
//! It runs as an actor: transitions are processed one at a time from its mailbox, and the
//! current [`SessionState`] is published on a watch channel that the engine waits on before
//! dispatching mutations.
//!
//! The coordinator drives the [`ReconciliationEngine`], and the engine asks the coordinator to
//! expire the session when the remote store rejects the credential. The engine is injected at
//! [`run`](TransitionCoordinator::run) time, after both sides exist, and it reaches back only
//! through a weak [`SessionLink`].

use super::merge::{merge, MergeChoice, MergePolicy, MergePrompt};
use super::state::{SessionLink, SessionState};
use crate::auth::{AuthProvider, AuthUser};
use crate::engine::ReconciliationEngine;
use crate::framework::{FrameworkError, Response};
use crate::gateway::GatewayError;
use crate::model::{Collection, ResourceItem, ResourceKind};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

#[derive(Debug)]
pub enum CoordinatorRequest {
    Login {
        user: AuthUser,
        respond_to: Response<SessionState>,
    },
    Logout {
        respond_to: Response<SessionState>,
    },
    /// The remote store rejected the credential.
    Expire { respond_to: Response<()> },
}

/// Dependencies injected when the coordinator starts.
#[derive(Clone)]
pub struct CoordinatorContext {
    pub engine: ReconciliationEngine,
    pub auth: Arc<dyn AuthProvider>,
    pub prompt: Option<Arc<dyn MergePrompt>>,
}

/// Raised when the remote store rejects the credential mid-login.
struct Rejected;

pub struct TransitionCoordinator {
    receiver: mpsc::Receiver<CoordinatorRequest>,
    state: watch::Sender<SessionState>,
    policy: MergePolicy,
}

impl TransitionCoordinator {
    pub fn new(policy: MergePolicy, buffer_size: usize) -> (Self, CoordinatorClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (state, state_rx) = watch::channel(SessionState::default());
        let coordinator = Self {
            receiver,
            state,
            policy,
        };
        (coordinator, CoordinatorClient::new(sender, state_rx))
    }

    /// Restores the guest session, then processes transitions until every client is gone.
    pub async fn run(mut self, ctx: CoordinatorContext) {
        info!(policy = ?self.policy, "Coordinator started");
        ctx.engine.restore_guest().await;
        self.set(SessionState::Guest);

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CoordinatorRequest::Login { user, respond_to } => {
                    self.login(&ctx, user).await;
                    let _ = respond_to.send(self.current());
                }
                CoordinatorRequest::Logout { respond_to } => {
                    self.logout(&ctx, "signed out").await;
                    let _ = respond_to.send(self.current());
                }
                CoordinatorRequest::Expire { respond_to } => {
                    self.logout(&ctx, "credential rejected").await;
                    let _ = respond_to.send(());
                }
            }
        }

        info!(state = ?self.current(), "Shutdown");
    }

    fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn set(&self, next: SessionState) {
        debug!(?next, "Session state");
        self.state.send_replace(next);
    }

    async fn login(&mut self, ctx: &CoordinatorContext, user: AuthUser) {
        match self.current() {
            SessionState::Authenticated { user_id } if user_id == user.id => {
                debug!(%user_id, "Already signed in");
                return;
            }
            SessionState::Authenticated { .. } => self.logout(ctx, "account switch").await,
            _ => {}
        }

        let user_id = user.id;
        self.set(SessionState::Authenticating {
            user_id: user_id.clone(),
        });
        info!(%user_id, "Login started");

        for resource in ResourceKind::ALL {
            if self.sign_in(ctx, resource, &user_id).await.is_err() {
                warn!(%user_id, %resource, "Credential rejected during login; staying guest");
                ctx.auth.revoke();
                ctx.engine.restore_guest().await;
                self.set(SessionState::Guest);
                return;
            }
        }

        self.set(SessionState::Authenticated {
            user_id: user_id.clone(),
        });
        info!(%user_id, "Login complete");
    }

    /// Loads `resource` for the new session, merging guest rows into it.
    async fn sign_in(
        &self,
        ctx: &CoordinatorContext,
        resource: ResourceKind,
        user_id: &str,
    ) -> Result<(), Rejected> {
        let engine = &ctx.engine;
        let guest = engine.guest_items(resource).await;

        let server = match engine.fetch(resource).await {
            Ok(snapshot) => snapshot.collection,
            Err(GatewayError::Unauthenticated) => return Err(Rejected),
            Err(e) => {
                error!(%resource, error = %e, "Login load failed; starting with an empty collection");
                let empty = Collection::empty(resource).with_owner(Some(user_id.to_string()));
                if let Err(e) = engine.display(resource, empty).await {
                    error!(%resource, error = %e, "Store unavailable");
                }
                return Ok(());
            }
        };

        let choice = if guest.is_empty() {
            MergeChoice::KeepServer
        } else {
            self.choose(ctx, resource, &server, &guest).await
        };
        if choice == MergeChoice::KeepServer {
            self.adopt(ctx, resource, server).await;
            return Ok(());
        }

        let merged = merge(choice, &server, &guest);
        info!(
            %resource,
            ?choice,
            guest = guest.len(),
            server = server.len(),
            merged = merged.len(),
            "Merging guest items"
        );
        match engine.replace(resource, merged.items()).await {
            Ok(written) => self.adopt(ctx, resource, written.collection).await,
            Err(GatewayError::Unauthenticated) => return Err(Rejected),
            Err(e) => {
                // Guest rows stay in the cache for the next login.
                error!(%resource, error = %e, "Could not store merged collection");
                if let Err(e) = engine.display(resource, server).await {
                    error!(%resource, error = %e, "Store unavailable");
                }
            }
        }
        Ok(())
    }

    async fn choose(
        &self,
        ctx: &CoordinatorContext,
        resource: ResourceKind,
        server: &Collection,
        guest: &[ResourceItem],
    ) -> MergeChoice {
        match (self.policy, &ctx.prompt) {
            (MergePolicy::Prompt, Some(prompt)) => prompt.choose(resource, server, guest).await,
            (MergePolicy::Prompt, None) => {
                warn!(%resource, "No merge prompt configured; merging additively");
                self.policy.default_choice()
            }
            (policy, _) => policy.default_choice(),
        }
    }

    async fn adopt(&self, ctx: &CoordinatorContext, resource: ResourceKind, collection: Collection) {
        if let Err(e) = ctx.engine.adopt(resource, collection).await {
            error!(%resource, error = %e, "Could not adopt collection");
        }
    }

    async fn logout(&mut self, ctx: &CoordinatorContext, reason: &'static str) {
        if !matches!(self.current(), SessionState::Authenticated { .. }) {
            debug!(reason, state = ?self.current(), "Not signed in; nothing to log out");
            return;
        }

        self.set(SessionState::LoggingOut);
        if let Err(e) = ctx.engine.purge().await {
            error!(error = %e, "Purge failed during logout");
        }
        ctx.auth.revoke();
        self.set(SessionState::Guest);
        info!(reason, "Logged out");
    }
}

/// Handle to the [`TransitionCoordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    sender: mpsc::Sender<CoordinatorRequest>,
    state: watch::Receiver<SessionState>,
}

impl CoordinatorClient {
    pub fn new(sender: mpsc::Sender<CoordinatorRequest>, state: watch::Receiver<SessionState>) -> Self {
        Self { sender, state }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// A non-owning link for the engine.
    pub fn link(&self) -> SessionLink {
        SessionLink::new(self.state.clone(), self.sender.downgrade())
    }

    /// Resolves once the session is settled, with the state it settled in.
    pub async fn settled(&self) -> Result<SessionState, FrameworkError> {
        let mut state = self.state.clone();
        let settled = state
            .wait_for(SessionState::is_settled)
            .await
            .map(|state| state.clone())
            .map_err(|_| FrameworkError::ActorClosed);
        settled
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> CoordinatorRequest,
    ) -> Result<T, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)
    }

    pub async fn login(&self, user: AuthUser) -> Result<SessionState, FrameworkError> {
        self.request(|respond_to| CoordinatorRequest::Login { user, respond_to })
            .await
    }

    pub async fn logout(&self) -> Result<SessionState, FrameworkError> {
        self.request(|respond_to| CoordinatorRequest::Logout { respond_to })
            .await
    }
}
