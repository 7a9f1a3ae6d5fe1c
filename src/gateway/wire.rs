//! JSON payloads exchanged with the remote store.
//!
//! Responses are decoded into typed [`Snapshot`]s here and nowhere else. The aggregate fields
//! the server sends are advisory: the collection is rebuilt from its rows so the fold
//! invariant holds, and any disagreement is logged.

use super::error::GatewayError;
use crate::model::{quantity_in_range, Collection, ResourceItem, ResourceKind, Snapshot, MAX_QUANTITY};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub items: Vec<ResourceItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub collection: CollectionPayload,
}

/// Body of `POST {resource}/items/bulk-delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDelete {
    pub item_ids: Vec<String>,
}

/// Body of `POST {resource}/items/{id}/move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTo {
    pub destination: ResourceKind,
}

/// Body of `PUT {resource}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replace {
    pub items: Vec<ResourceItem>,
}

impl Envelope {
    pub fn of(collection: &Collection) -> Self {
        Self {
            collection: CollectionPayload {
                owner_id: collection.owner_id().map(str::to_owned),
                items: collection.items().to_vec(),
                total_items: Some(collection.total_items()),
                total_amount: Some(collection.total_amount()),
                is_active: collection.is_active(),
            },
        }
    }
}

pub fn encode<T: Serialize>(body: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(body).map_err(|e| GatewayError::ValidationFailed(e.to_string()))
}

/// Validates a success body into a snapshot of `resource`.
pub fn decode(resource: ResourceKind, body: Value, threshold: u32) -> Result<Snapshot, GatewayError> {
    let envelope: Envelope = serde_json::from_value(body).map_err(|e| GatewayError::ServerFault {
        status: 200,
        message: format!("malformed {resource} payload: {e}"),
    })?;
    let payload = envelope.collection;

    if payload.items.iter().any(|item| item.id.is_empty()) {
        return Err(GatewayError::ServerFault {
            status: 200,
            message: format!("{resource} payload has an item without id"),
        });
    }

    if let Some(item) = payload
        .items
        .iter()
        .find(|item| !quantity_in_range(item.quantity))
    {
        return Err(GatewayError::ServerFault {
            status: 200,
            message: format!(
                "{resource} item {} has quantity {} outside 1..={MAX_QUANTITY}",
                item.id, item.quantity
            ),
        });
    }

    let declared_items = payload.total_items;
    let declared_amount = payload.total_amount;
    let mut collection = Collection::from_items(resource, payload.owner_id, payload.items);
    if !payload.is_active {
        collection = collection.deactivated();
    }

    let items_drift = declared_items.is_some_and(|n| n != collection.total_items());
    let amount_drift = declared_amount.is_some_and(|a| a != collection.total_amount());
    if items_drift || amount_drift {
        warn!(
            %resource,
            ?declared_items,
            ?declared_amount,
            total_items = collection.total_items(),
            total_amount = %collection.total_amount(),
            "Server aggregates disagree with items; using recomputed values"
        );
    }

    Ok(Snapshot::new(collection, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: &str, product: &str, quantity: u32) -> Value {
        json!({
            "id": id,
            "product": { "id": product, "name": "Item", "price": "12.50" },
            "quantity": quantity,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z"
        })
    }

    #[test]
    fn test_decode_recomputes_aggregates() {
        let body = json!({
            "collection": {
                "ownerId": "u1",
                "items": [row("c1", "p1", 2), row("c2", "p2", 1)],
                "totalItems": 99,
                "totalAmount": "1.00"
            }
        });

        let snapshot = decode(ResourceKind::Cart, body, 4).unwrap();

        assert_eq!(snapshot.collection.total_items(), 3);
        assert_eq!(snapshot.collection.total_amount(), Decimal::new(3750, 2));
        assert_eq!(snapshot.collection.owner_id(), Some("u1"));
        assert!(!snapshot.summary.show_total_price());
    }

    #[test]
    fn test_decode_rejects_malformed_body() {
        let result = decode(ResourceKind::Wishlist, json!({ "items": "nope" }), 4);
        assert!(matches!(result, Err(GatewayError::ServerFault { .. })));
    }

    #[test]
    fn test_decode_rejects_rows_without_id() {
        let body = json!({ "collection": { "items": [row("", "p1", 1)] } });
        assert!(decode(ResourceKind::Cart, body, 4).is_err());
    }

    #[test]
    fn test_decode_rejects_out_of_range_quantities() {
        let oversized = json!({ "collection": { "items": [row("c1", "p1", u32::MAX)] } });
        assert!(matches!(
            decode(ResourceKind::Cart, oversized, 4),
            Err(GatewayError::ServerFault { .. })
        ));

        let empty = json!({ "collection": { "items": [row("c1", "p1", 0)] } });
        assert!(decode(ResourceKind::Cart, empty, 4).is_err());
    }

    #[test]
    fn test_wishlist_rows_are_clamped_to_one() {
        let body = json!({ "collection": { "items": [row("w1", "p1", 5)] } });
        let snapshot = decode(ResourceKind::Wishlist, body, 4).unwrap();
        assert_eq!(snapshot.collection.items()[0].quantity, 1);
    }
}
