//! Resource-specific facades over the [`ReconciliationEngine`](crate::engine::ReconciliationEngine).

pub mod cart_client;
pub mod collection_client;
pub mod wishlist_client;

pub use cart_client::*;
pub use collection_client::*;
pub use wishlist_client::*;
