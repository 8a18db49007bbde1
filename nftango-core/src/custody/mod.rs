pub mod memory;
pub mod sqlite;

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

use crate::error::{NftangoError, Result};
use crate::types::{AssetRef, Identity, Transfer};
use async_trait::async_trait;
use std::collections::HashSet;

/// Custody service that records which identity holds each asset.
///
/// A move is authorised when the operator is the current holder, or when the
/// holder has approved the operator for the asset's whole collection.
#[async_trait]
pub trait AssetCustody: Send + Sync {
    /// Apply every move or none of them.
    async fn transfer_batch(&self, operator: &Identity, moves: &[Transfer]) -> Result<()>;

    async fn holder_of(&self, asset: &AssetRef) -> Result<Option<Identity>>;

    async fn approval_granted(
        &self,
        collection: &str,
        owner: &Identity,
        operator: &Identity,
    ) -> Result<bool>;

    async fn transfer(
        &self,
        operator: &Identity,
        asset: &AssetRef,
        from: &Identity,
        to: &Identity,
    ) -> Result<()> {
        let moves = [Transfer::new(asset.clone(), from.clone(), to.clone())];
        self.transfer_batch(operator, &moves).await
    }
}

pub(crate) fn ensure_distinct(moves: &[Transfer]) -> Result<()> {
    let mut seen = HashSet::with_capacity(moves.len());
    for m in moves {
        if !seen.insert(&m.asset) {
            return Err(NftangoError::DuplicateAsset(m.asset.clone()));
        }
    }
    Ok(())
}

/// Check a single move against the current holder and approval state.
pub(crate) fn check_move(
    operator: &Identity,
    m: &Transfer,
    holder: Option<&Identity>,
    approved: bool,
) -> Result<()> {
    let holder = holder.ok_or_else(|| NftangoError::AssetNotFound(m.asset.clone()))?;

    if *holder != m.from {
        return Err(NftangoError::NotHolder {
            asset: m.asset.clone(),
            from: m.from.clone(),
            holder: holder.clone(),
        });
    }

    if *operator != m.from && !approved {
        return Err(NftangoError::NotApproved {
            collection: m.asset.collection.clone(),
            owner: m.from.clone(),
            operator: operator.clone(),
        });
    }

    Ok(())
}
