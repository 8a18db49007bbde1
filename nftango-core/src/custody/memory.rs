use crate::custody::{check_move, ensure_distinct, AssetCustody};
use crate::error::{NftangoError, Result};
use crate::types::{AssetRef, Identity, Transfer};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct LedgerState {
    holders: HashMap<AssetRef, Identity>,
    // (collection, owner, operator)
    approvals: HashSet<(String, Identity, Identity)>,
}

/// In-process custody ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&self, asset: AssetRef, owner: Identity) -> Result<()> {
        let mut state = self.state.write();
        if state.holders.contains_key(&asset) {
            return Err(NftangoError::AssetExists(asset));
        }

        tracing::info!("Minted {} to {}", asset, owner);
        state.holders.insert(asset, owner);
        Ok(())
    }

    pub fn set_approval_for_all(
        &self,
        collection: &str,
        owner: &Identity,
        operator: &Identity,
        approved: bool,
    ) {
        let key = (collection.to_string(), owner.clone(), operator.clone());
        let mut state = self.state.write();
        if approved {
            state.approvals.insert(key);
        } else {
            state.approvals.remove(&key);
        }
    }

    pub fn balance_of(&self, collection: &str, owner: &Identity) -> usize {
        self.state
            .read()
            .holders
            .iter()
            .filter(|(asset, holder)| asset.collection == collection && *holder == owner)
            .count()
    }

    pub fn assets_of(&self, owner: &Identity) -> Vec<AssetRef> {
        let mut assets: Vec<AssetRef> = self
            .state
            .read()
            .holders
            .iter()
            .filter(|(_, holder)| *holder == owner)
            .map(|(asset, _)| asset.clone())
            .collect();
        assets.sort_by(|a, b| (&a.collection, a.item).cmp(&(&b.collection, b.item)));
        assets
    }
}

#[async_trait]
impl AssetCustody for MemoryLedger {
    async fn transfer_batch(&self, operator: &Identity, moves: &[Transfer]) -> Result<()> {
        ensure_distinct(moves)?;

        let mut state = self.state.write();

        // Assets are distinct, so validating against the pre-batch state is
        // the same as validating each move in sequence.
        for m in moves {
            let approved = state.approvals.contains(&(
                m.asset.collection.clone(),
                m.from.clone(),
                operator.clone(),
            ));
            check_move(operator, m, state.holders.get(&m.asset), approved)?;
        }

        for m in moves {
            state.holders.insert(m.asset.clone(), m.to.clone());
            tracing::debug!("Moved {} from {} to {}", m.asset, m.from, m.to);
        }

        Ok(())
    }

    async fn holder_of(&self, asset: &AssetRef) -> Result<Option<Identity>> {
        Ok(self.state.read().holders.get(asset).cloned())
    }

    async fn approval_granted(
        &self,
        collection: &str,
        owner: &Identity,
        operator: &Identity,
    ) -> Result<bool> {
        Ok(self.state.read().approvals.contains(&(
            collection.to_string(),
            owner.clone(),
            operator.clone(),
        )))
    }
}
