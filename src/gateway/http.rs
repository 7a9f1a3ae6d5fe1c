//! # HTTP Gateway
//!
//! [`HttpGateway`] is the [`RemoteGateway`] used in production. It builds REST requests for
//! a [`Transport`], attaches the bearer credential from the [`AuthProvider`], translates the
//! status code into a [`GatewayError`] and validates success bodies through [`wire::decode`].
//!
//! | Operation | Request |
//! |-----------|---------|
//! | load | `GET /{resource}` |
//! | add | `POST /{resource}/items` |
//! | update | `PATCH /{resource}/items/{id}` |
//! | remove | `DELETE /{resource}/items/{id}` |
//! | bulk_remove | `POST /{resource}/items/bulk-delete` |
//! | clear | `DELETE /{resource}` |
//! | move_item | `POST /{resource}/items/{id}/move` |
//! | replace | `PUT /{resource}` |

use super::error::GatewayError;
use super::transport::{ApiRequest, Method, Transport};
use super::wire::{self, BulkDelete, MoveTo, Replace};
use super::{GatewayResult, RemoteGateway};
use crate::auth::AuthProvider;
use crate::model::{AddItem, ItemPatch, ResourceItem, ResourceKind};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Stateless gateway over a [`Transport`].
#[derive(Clone)]
pub struct HttpGateway {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    threshold: u32,
}

impl HttpGateway {
    /// # Arguments
    ///
    /// * `transport` - Request/response collaborator.
    /// * `auth` - Source of the bearer credential.
    /// * `threshold` - Item count from which decoded summaries show the total price.
    pub fn new(transport: Arc<dyn Transport>, auth: Arc<dyn AuthProvider>, threshold: u32) -> Self {
        Self {
            transport,
            auth,
            threshold,
        }
    }

    async fn call(
        &self,
        resource: ResourceKind,
        method: Method,
        path: String,
        body: Option<Value>,
    ) -> GatewayResult {
        let Some(bearer) = self.auth.credential() else {
            debug!(%resource, %method, %path, "No credential; call not sent");
            return Err(GatewayError::Unauthenticated);
        };

        debug!(%resource, %method, %path, "Request");
        let response = self
            .transport
            .send(ApiRequest {
                method,
                path: path.clone(),
                bearer,
                body,
            })
            .await
            .map_err(|e| {
                warn!(%resource, %method, %path, error = %e, "Transport failed");
                GatewayError::NetworkUnavailable(e.to_string())
            })?;

        match response.status {
            200..=299 => wire::decode(resource, response.body, self.threshold),
            401 => Err(GatewayError::Unauthenticated),
            404 => Err(GatewayError::NotFound(response.message())),
            400..=499 => Err(GatewayError::ValidationFailed(response.message())),
            status => Err(GatewayError::ServerFault {
                status,
                message: response.message(),
            }),
        }
    }

    fn item_path(resource: ResourceKind, item_id: &str) -> String {
        format!("{}/items/{item_id}", resource.path())
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn load(&self, resource: ResourceKind) -> GatewayResult {
        self.call(resource, Method::Get, resource.path().to_string(), None)
            .await
    }

    async fn add(&self, resource: ResourceKind, spec: &AddItem) -> GatewayResult {
        let body = wire::encode(spec)?;
        self.call(
            resource,
            Method::Post,
            format!("{}/items", resource.path()),
            Some(body),
        )
        .await
    }

    async fn update(&self, resource: ResourceKind, item_id: &str, patch: &ItemPatch) -> GatewayResult {
        let body = wire::encode(patch)?;
        self.call(
            resource,
            Method::Patch,
            Self::item_path(resource, item_id),
            Some(body),
        )
        .await
    }

    async fn remove(&self, resource: ResourceKind, item_id: &str) -> GatewayResult {
        self.call(resource, Method::Delete, Self::item_path(resource, item_id), None)
            .await
    }

    async fn bulk_remove(&self, resource: ResourceKind, item_ids: &[String]) -> GatewayResult {
        let body = wire::encode(&BulkDelete {
            item_ids: item_ids.to_vec(),
        })?;
        self.call(
            resource,
            Method::Post,
            format!("{}/items/bulk-delete", resource.path()),
            Some(body),
        )
        .await
    }

    async fn clear(&self, resource: ResourceKind) -> GatewayResult {
        self.call(resource, Method::Delete, resource.path().to_string(), None)
            .await
    }

    async fn move_item(
        &self,
        resource: ResourceKind,
        item_id: &str,
        destination: ResourceKind,
    ) -> GatewayResult {
        let body = wire::encode(&MoveTo { destination })?;
        self.call(
            resource,
            Method::Post,
            format!("{}/move", Self::item_path(resource, item_id)),
            Some(body),
        )
        .await
    }

    async fn replace(&self, resource: ResourceKind, items: &[ResourceItem]) -> GatewayResult {
        let body = wire::encode(&Replace {
            items: items.to_vec(),
        })?;
        self.call(resource, Method::Put, resource.path().to_string(), Some(body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthUser, MemoryAuth};
    use crate::gateway::error::TransportError;
    use crate::gateway::transport::ApiResponse;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every request with a fixed response and records what it saw.
    struct Canned {
        reply: Result<ApiResponse, TransportError>,
        seen: Mutex<Vec<(Method, String, Option<Value>)>>,
    }

    impl Canned {
        fn new(reply: Result<ApiResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.method, request.path, request.body));
            self.reply.clone()
        }
    }

    fn signed_in() -> Arc<MemoryAuth> {
        let auth = Arc::new(MemoryAuth::new());
        auth.login(AuthUser::new("u1"), "token");
        auth
    }

    fn empty_body() -> Value {
        json!({ "collection": { "items": [] } })
    }

    #[tokio::test]
    async fn test_missing_credential_never_reaches_transport() {
        let transport = Canned::new(Ok(ApiResponse::new(200, empty_body())));
        let gateway = HttpGateway::new(transport.clone(), Arc::new(MemoryAuth::new()), 4);

        let result = gateway.load(ResourceKind::Cart).await;

        assert_eq!(result, Err(GatewayError::Unauthenticated));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_codes_map_to_error_kinds() {
        let cases = [
            (401, GatewayError::Unauthenticated),
            (404, GatewayError::NotFound("gone".into())),
            (422, GatewayError::ValidationFailed("gone".into())),
            (
                503,
                GatewayError::ServerFault {
                    status: 503,
                    message: "gone".into(),
                },
            ),
        ];
        for (status, expected) in cases {
            let transport = Canned::new(Ok(ApiResponse::new(status, json!({ "message": "gone" }))));
            let gateway = HttpGateway::new(transport, signed_in(), 4);
            assert_eq!(gateway.remove(ResourceKind::Cart, "c1").await, Err(expected));
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_unavailable() {
        let transport = Canned::new(Err(TransportError::Timeout));
        let gateway = HttpGateway::new(transport, signed_in(), 4);

        let result = gateway.load(ResourceKind::Wishlist).await;

        assert!(matches!(result, Err(GatewayError::NetworkUnavailable(_))));
    }

    #[tokio::test]
    async fn test_requests_use_resource_paths() {
        let transport = Canned::new(Ok(ApiResponse::new(200, empty_body())));
        let gateway = HttpGateway::new(transport.clone(), signed_in(), 4);

        gateway
            .move_item(ResourceKind::Wishlist, "w1", ResourceKind::Cart)
            .await
            .unwrap();
        gateway
            .bulk_remove(ResourceKind::Cart, &["c1".to_string(), "c2".to_string()])
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].0, Method::Post);
        assert_eq!(seen[0].1, "/wishlist/items/w1/move");
        assert_eq!(seen[0].2, Some(json!({ "destination": "cart" })));
        assert_eq!(seen[1].1, "/cart/items/bulk-delete");
        assert_eq!(seen[1].2, Some(json!({ "itemIds": ["c1", "c2"] })));
    }
}
