//! # Login Merge
//!
//! When a guest signs in, the rows collected as a guest are merged into the server-side
//! collections. How they combine is a [`MergePolicy`]; the [`Prompt`](MergePolicy::Prompt)
//! policy defers the decision to a [`MergePrompt`] collaborator, which answers with a
//! [`MergeChoice`].

use crate::model::{Collection, ResourceItem, ResourceKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configured merge behaviour.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Union on item key; a cart sums quantities of rows present on both sides.
    #[default]
    Additive,
    /// Guest rows replace server rows with the same key.
    Overwrite,
    /// Ask the [`MergePrompt`].
    Prompt,
}

/// A concrete merge decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeChoice {
    Additive,
    Overwrite,
    /// Discard the guest rows.
    KeepServer,
}

impl MergePolicy {
    /// The choice this policy makes without asking anyone.
    pub fn default_choice(self) -> MergeChoice {
        match self {
            MergePolicy::Overwrite => MergeChoice::Overwrite,
            MergePolicy::Additive | MergePolicy::Prompt => MergeChoice::Additive,
        }
    }
}

#[async_trait]
pub trait MergePrompt: Send + Sync {
    async fn choose(
        &self,
        resource: ResourceKind,
        server: &Collection,
        guest: &[ResourceItem],
    ) -> MergeChoice;
}

/// Combines the server collection with guest rows.
///
/// Server rows keep their ids and their position; guest rows with a new key are appended.
pub fn merge(choice: MergeChoice, server: &Collection, guest: &[ResourceItem]) -> Collection {
    let owner = server.owner_id().map(str::to_owned);
    match choice {
        MergeChoice::KeepServer => server.clone(),
        MergeChoice::Additive => Collection::from_items(
            server.kind(),
            owner,
            server.items().iter().chain(guest).cloned(),
        ),
        MergeChoice::Overwrite => {
            let mut items = server.items().to_vec();
            for row in guest {
                let key = row.key();
                match items.iter_mut().find(|item| item.key() == key) {
                    Some(existing) => {
                        *existing = ResourceItem {
                            id: existing.id.clone(),
                            created_at: existing.created_at,
                            ..row.clone()
                        };
                    }
                    None => items.push(row.clone()),
                }
            }
            Collection::from_items(server.kind(), owner, items)
        }
    }
}
