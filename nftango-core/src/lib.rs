//! NFTango core - asset custody primitives for escrow wagers
//!
//! This crate defines the custody contract the wager protocol relies on,
//! together with two reference ledgers (in-memory and SQLite) and the
//! storage used to persist game snapshots.

pub mod custody;
pub mod error;
pub mod storage;
pub mod types;

pub use custody::{AssetCustody, MemoryLedger, SqliteLedger};
pub use error::{NftangoError, Result};
pub use storage::{GameStore, Storage};
pub use types::{AssetRef, Identity, Transfer};
