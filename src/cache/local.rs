//! # Local Persistent Cache
//!
//! One JSON blob per resource, `{ "items": [...] }`, stored under the resource's cache key
//! (`cart`, `wishlist`). In guest mode it is the source of truth; while authenticated it
//! mirrors the last committed server state so a failed call can fall back to it.
//!
//! A mirrored blob is tagged with the user it belongs to. Reads name the owner they expect,
//! and a blob written for someone else reads as empty, so server rows are never taken for
//! guest rows after a restart.

use super::error::CacheError;
use super::storage::KeyValueStorage;
use crate::model::{ResourceItem, ResourceKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheBlob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(default)]
    items: Vec<ResourceItem>,
}

#[derive(Clone)]
pub struct LocalCache {
    storage: Arc<dyn KeyValueStorage>,
}

impl LocalCache {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Rows cached for `resource` by `owner` (`None` for guest rows); empty when nothing is
    /// stored or the blob belongs to someone else.
    pub async fn read(
        &self,
        resource: ResourceKind,
        owner: Option<&str>,
    ) -> Result<Vec<ResourceItem>, CacheError> {
        let key = resource.cache_key();
        let Some(blob) = self.storage.get(key).await? else {
            return Ok(Vec::new());
        };
        let blob: CacheBlob = serde_json::from_str(&blob).map_err(|source| CacheError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        if blob.owner.as_deref() != owner {
            debug!(%resource, cached_for = ?blob.owner, requested = ?owner, "Cache owned by another session");
            return Ok(Vec::new());
        }
        debug!(%resource, items = blob.items.len(), "Cache read");
        Ok(blob.items)
    }

    pub async fn write(
        &self,
        resource: ResourceKind,
        owner: Option<&str>,
        items: &[ResourceItem],
    ) -> Result<(), CacheError> {
        let key = resource.cache_key();
        let blob = serde_json::to_string(&CacheBlob {
            owner: owner.map(str::to_string),
            items: items.to_vec(),
        })
        .map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.storage.set(key, blob).await?;
        debug!(%resource, items = items.len(), "Cache written");
        Ok(())
    }

    pub async fn purge(&self, resource: ResourceKind) -> Result<(), CacheError> {
        self.storage.remove(resource.cache_key()).await?;
        info!(%resource, "Cache purged");
        Ok(())
    }

    /// Purges every resource, attempting all of them before reporting the first failure.
    pub async fn purge_all(&self) -> Result<(), CacheError> {
        let mut first_error = None;
        for resource in ResourceKind::ALL {
            if let Err(e) = self.purge(resource).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
