//! # Authentication Collaborator
//!
//! The sync layer does not authenticate anyone. It consumes an [`AuthProvider`] that knows
//! the current credential, publishes the signed-in user, and can revoke the credential when
//! the remote store rejects it.
//!
//! [`MemoryAuth`] is the in-process provider used by the demo binary and the tests.

use std::fmt::{Debug, Formatter};
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use tracing::info;

/// Bearer credential presented to the remote store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Source of credentials and of the authenticated-user stream.
pub trait AuthProvider: Send + Sync + Debug {
    /// The credential to attach to remote calls, if any.
    fn credential(&self) -> Option<Credential>;

    /// Stream of the signed-in user; `None` while browsing as a guest.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;

    /// Drops the cached credential, e.g. after the remote store answered 401.
    fn revoke(&self);
}

/// In-process [`AuthProvider`] with explicit login/logout triggers.
#[derive(Debug)]
pub struct MemoryAuth {
    credential: Mutex<Option<Credential>>,
    user: watch::Sender<Option<AuthUser>>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuth {
    pub fn new() -> Self {
        let (user, _) = watch::channel(None);
        Self {
            credential: Mutex::new(None),
            user,
        }
    }

    /// Signs a user in. The credential is in place before the user is published.
    pub fn login(&self, user: AuthUser, token: impl Into<String>) {
        *self.lock() = Some(Credential::new(token));
        info!(user_id = %user.id, "Signed in");
        self.user.send_replace(Some(user));
    }

    /// Signs the current user out.
    pub fn logout(&self) {
        self.clear("Signed out");
    }

    fn clear(&self, reason: &'static str) {
        let had_credential = self.lock().take().is_some();
        if had_credential || self.user.borrow().is_some() {
            info!(reason, "Credential cleared");
        }
        self.user.send_if_modified(|user| user.take().is_some());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.credential.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuthProvider for MemoryAuth {
    fn credential(&self) -> Option<Credential> {
        self.lock().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.user.subscribe()
    }

    fn revoke(&self) {
        self.clear("Revoked");
    }
}
