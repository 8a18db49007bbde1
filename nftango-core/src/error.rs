use crate::types::{AssetRef, Identity};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NftangoError>;

#[derive(Error, Debug)]
pub enum NftangoError {
    #[error("Asset {asset} is held by {holder}, not {from}")]
    NotHolder {
        asset: AssetRef,
        from: Identity,
        holder: Identity,
    },

    #[error("{operator} is not approved to move {owner}'s assets in {collection}")]
    NotApproved {
        collection: String,
        owner: Identity,
        operator: Identity,
    },

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetRef),

    #[error("Asset already exists: {0}")]
    AssetExists(AssetRef),

    #[error("Asset item id does not fit the ledger's key range: {0}")]
    ItemOutOfRange(AssetRef),

    #[error("Asset appears more than once in a transfer batch: {0}")]
    DuplicateAsset(AssetRef),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NftangoError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for failures caused by the custody rules rather than by the
    /// storage substrate.
    pub fn is_custody_violation(&self) -> bool {
        matches!(
            self,
            Self::NotHolder { .. }
                | Self::NotApproved { .. }
                | Self::AssetNotFound(_)
                | Self::DuplicateAsset(_)
                | Self::ItemOutOfRange(_)
        )
    }
}
