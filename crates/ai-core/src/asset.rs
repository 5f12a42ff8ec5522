use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::AiError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AssetId(pub u64);

/// Immutable assets shared by id. Agents keep an `Arc` to the asset they were spawned with.
#[derive(Debug)]
pub struct AssetDb<T> {
    assets: BTreeMap<AssetId, Arc<T>>,
}

impl<T> Default for AssetDb<T> {
    fn default() -> Self {
        Self {
            assets: BTreeMap::new(),
        }
    }
}

impl<T> AssetDb<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: AssetId, asset: T) -> Result<Arc<T>, AiError> {
        if self.assets.contains_key(&id) {
            return Err(AiError::DuplicateAsset(id));
        }
        let asset = Arc::new(asset);
        self.assets.insert(id, Arc::clone(&asset));
        Ok(asset)
    }

    pub fn find(&self, id: AssetId) -> Option<Arc<T>> {
        self.assets.get(&id).cloned()
    }

    pub fn get(&self, id: AssetId) -> Result<Arc<T>, AiError> {
        self.find(id).ok_or(AiError::MissingAsset(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.assets.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
