use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An account, contract or escrow known to the custody service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identity under which a game holds its escrowed assets.
    pub fn escrow(game_id: Uuid) -> Self {
        Self(format!("escrow:{}", game_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A single non-fungible asset: an item within a named collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub collection: String,
    pub item: u64,
}

impl AssetRef {
    pub fn new(collection: impl Into<String>, item: u64) -> Self {
        Self {
            collection: collection.into(),
            item,
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.collection, self.item)
    }
}

/// One custody move inside a transfer batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub asset: AssetRef,
    pub from: Identity,
    pub to: Identity,
}

impl Transfer {
    pub fn new(asset: AssetRef, from: Identity, to: Identity) -> Self {
        Self { asset, from, to }
    }
}
