//! Asset store writing videos under a local directory.

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::sync::Arc;

use crate::generation::{
    domain::{GenerationTaskId, StoredAsset},
    ports::{AssetError, AssetResult, AssetStore, asset_location, describe_asset},
};
use crate::identity::domain::UserId;

/// Asset store rooted at a capability-scoped directory.
///
/// Videos land at `{root}/{user}/{task}.mp4`. Each write goes to a
/// temporary sibling first and is renamed into place, so readers never see
/// a partial file.
#[derive(Debug, Clone)]
pub struct FilesystemAssetStore {
    root: Arc<Dir>,
}

impl FilesystemAssetStore {
    /// Opens (creating if needed) the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Storage`] when the directory cannot be opened.
    pub fn open(path: &str) -> AssetResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority()).map_err(AssetError::storage)?;
        let root = Dir::open_ambient_dir(path, ambient_authority()).map_err(AssetError::storage)?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    /// Reads back a stored video.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Storage`] when the file cannot be read.
    pub fn read(&self, location: &str) -> AssetResult<Vec<u8>> {
        self.root.read(location).map_err(AssetError::storage)
    }
}

#[async_trait]
impl AssetStore for FilesystemAssetStore {
    async fn put(
        &self,
        user_id: UserId,
        task_id: GenerationTaskId,
        bytes: &[u8],
    ) -> AssetResult<StoredAsset> {
        let root = Arc::clone(&self.root);
        let location = asset_location(user_id, task_id);
        let owned = bytes.to_vec();

        tokio::task::spawn_blocking(move || {
            root.create_dir_all(user_id.to_string())
                .map_err(AssetError::storage)?;
            let staging = format!("{location}.partial");
            root.write(&staging, &owned).map_err(AssetError::storage)?;
            root.rename(&staging, &root, &location)
                .map_err(AssetError::storage)?;
            Ok(describe_asset(location, &owned))
        })
        .await
        .map_err(AssetError::storage)?
    }
}
