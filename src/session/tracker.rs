//! # Session Mode Tracker
//!
//! Watches the authentication provider's user stream and turns its edges into coordinator
//! transitions: a user appearing triggers a login, a user disappearing triggers a logout, a
//! different user appearing triggers a login (the coordinator handles the account switch).

use super::coordinator::CoordinatorClient;
use crate::auth::AuthProvider;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub struct SessionTracker {
    auth: Arc<dyn AuthProvider>,
    coordinator: CoordinatorClient,
}

impl SessionTracker {
    pub fn new(auth: Arc<dyn AuthProvider>, coordinator: CoordinatorClient) -> Self {
        Self { auth, coordinator }
    }

    /// Follows the user stream until it ends, the coordinator stops, or `shutdown` fires.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut users = self.auth.subscribe();
        let mut signed_in: Option<String> = None;
        info!("Session tracker started");

        loop {
            let user = users.borrow_and_update().clone();
            let previous = signed_in.clone();
            let result = match (previous.as_deref(), user) {
                (None, None) => Ok(()),
                (Some(current), Some(user)) if current == user.id => Ok(()),
                (_, Some(user)) => {
                    debug!(user_id = %user.id, "User signed in");
                    signed_in = Some(user.id.clone());
                    self.coordinator.login(user).await.map(drop)
                }
                (Some(_), None) => {
                    debug!("User signed out");
                    signed_in = None;
                    self.coordinator.logout().await.map(drop)
                }
            };
            if let Err(e) = result {
                warn!(error = %e, "Coordinator unavailable");
                break;
            }

            tokio::select! {
                changed = users.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        info!("Session tracker stopped");
    }
}
