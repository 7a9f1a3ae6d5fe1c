//! Remote resource gateway.
//!
//! The [`RemoteGateway`] trait is the only way the sync layer talks to the remote store. Every
//! call resolves to a validated [`Snapshot`] of the addressed resource or a typed
//! [`GatewayError`]; the gateway keeps no state between calls.
//!
//! - [`HttpGateway`] - REST over a [`Transport`]
//! - [`InMemoryBackend`] - a [`Transport`] that behaves like the remote store, for the demo
//!   binary and tests

pub mod error;
pub mod http;
pub mod memory;
pub mod transport;
pub mod wire;

pub use error::{GatewayError, TransportError};
pub use http::HttpGateway;
pub use memory::InMemoryBackend;
pub use transport::{ApiRequest, ApiResponse, Method, Transport};

use crate::model::{AddItem, ItemPatch, ResourceItem, ResourceKind, Snapshot};
use async_trait::async_trait;

pub type GatewayResult = Result<Snapshot, GatewayError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn load(&self, resource: ResourceKind) -> GatewayResult;

    async fn add(&self, resource: ResourceKind, spec: &AddItem) -> GatewayResult;

    async fn update(&self, resource: ResourceKind, item_id: &str, patch: &ItemPatch) -> GatewayResult;

    async fn remove(&self, resource: ResourceKind, item_id: &str) -> GatewayResult;

    async fn bulk_remove(&self, resource: ResourceKind, item_ids: &[String]) -> GatewayResult;

    async fn clear(&self, resource: ResourceKind) -> GatewayResult;

    /// Moves a row to `destination`. Resolves to the *source* collection.
    async fn move_item(
        &self,
        resource: ResourceKind,
        item_id: &str,
        destination: ResourceKind,
    ) -> GatewayResult;

    /// Overwrites the whole collection. Rows with client-side ids get server ids.
    async fn replace(&self, resource: ResourceKind, items: &[ResourceItem]) -> GatewayResult;
}
