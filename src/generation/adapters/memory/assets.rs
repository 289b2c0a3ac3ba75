//! In-memory asset store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::generation::{
    domain::{GenerationTaskId, StoredAsset},
    ports::{AssetError, AssetResult, AssetStore, asset_location, describe_asset},
};
use crate::identity::domain::UserId;

/// Asset store keeping bytes in a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryAssetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes writes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the bytes stored at `location`.
    #[must_use]
    pub fn get(&self, location: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(location).cloned())
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn put(
        &self,
        user_id: UserId,
        task_id: GenerationTaskId,
        bytes: &[u8],
    ) -> AssetResult<StoredAsset> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AssetError::storage(std::io::Error::other(
                "asset store unavailable",
            )));
        }
        let location = asset_location(user_id, task_id);
        let mut objects = self
            .objects
            .write()
            .map_err(|err| AssetError::storage(std::io::Error::other(err.to_string())))?;
        objects.insert(location.clone(), bytes.to_vec());
        Ok(describe_asset(location, bytes))
    }
}
