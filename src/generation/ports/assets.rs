//! Durable storage for finished videos.

use crate::generation::domain::{GenerationTaskId, StoredAsset};
use crate::identity::domain::UserId;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

/// Result type for asset storage.
pub type AssetResult<T> = Result<T, AssetError>;

/// Asset storage contract.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Stores `bytes` as the result of `task_id` and reports where.
    ///
    /// Writing the same task twice replaces the previous content.
    async fn put(
        &self,
        user_id: UserId,
        task_id: GenerationTaskId,
        bytes: &[u8],
    ) -> AssetResult<StoredAsset>;
}

/// Storage key for a task's video.
#[must_use]
pub fn asset_location(user_id: UserId, task_id: GenerationTaskId) -> String {
    format!("{user_id}/{task_id}.mp4")
}

/// Describes `bytes` stored at `location`: size and hex SHA-256.
#[must_use]
pub fn describe_asset(location: String, bytes: &[u8]) -> StoredAsset {
    StoredAsset {
        location,
        size_bytes: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
        sha256: format!("{:x}", Sha256::digest(bytes)),
    }
}

/// Errors returned by asset stores.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    /// The backing store failed.
    #[error("asset storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl AssetError {
    /// Wraps a storage error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
