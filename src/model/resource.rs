//! Resource identifiers and session modes.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The two user-scoped collections kept in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cart,
    Wishlist,
}

impl ResourceKind {
    /// Both resources, cart first.
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Cart, ResourceKind::Wishlist];

    /// Key of the serialized blob in the local persistent cache.
    pub fn cache_key(self) -> &'static str {
        match self {
            ResourceKind::Cart => "cart",
            ResourceKind::Wishlist => "wishlist",
        }
    }

    /// Root path of the resource on the remote API.
    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::Cart => "/cart",
            ResourceKind::Wishlist => "/wishlist",
        }
    }

    /// The collection an item moves to from this one.
    pub fn other(self) -> Self {
        match self {
            ResourceKind::Cart => ResourceKind::Wishlist,
            ResourceKind::Wishlist => ResourceKind::Cart,
        }
    }

    /// Carts count units; wishlists hold each product variant once.
    pub fn tracks_quantity(self) -> bool {
        matches!(self, ResourceKind::Cart)
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.cache_key())
    }
}

/// Whether mutations are served by the remote store or the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionMode {
    #[default]
    Guest,
    Authenticated,
}
