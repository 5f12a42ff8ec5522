use thiserror::Error;

use crate::blackboard::BlackboardTag;
use crate::AssetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("list handle {index}:{generation} is stale (freed or never allocated)")]
    Stale { index: u32, generation: u32 },
    #[error("list handle {index} refers to a list of a different element type")]
    TypeMismatch { index: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlackboardError {
    #[error("blackboard key {key} was never registered")]
    Unregistered { key: u64 },
    #[error("blackboard key {key} is registered as {registered:?}, got {requested:?}")]
    TagMismatch {
        key: u64,
        registered: BlackboardTag,
        requested: BlackboardTag,
    },
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    List(#[from] ListError),
    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
    #[error("invalid asset `{asset}`: {reason}")]
    InvalidAsset { asset: String, reason: String },
    #[error("asset {0:?} not found")]
    MissingAsset(AssetId),
    #[error("asset {0:?} registered twice")]
    DuplicateAsset(AssetId),
}

impl AiError {
    pub fn invalid_asset(asset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAsset {
            asset: asset.into(),
            reason: reason.into(),
        }
    }
}
