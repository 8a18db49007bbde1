use crate::custody::{check_move, ensure_distinct, AssetCustody};
use crate::error::{NftangoError, Result};
use crate::storage::Storage;
use crate::types::{AssetRef, Identity, Transfer};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;

/// Custody ledger persisted in the `assets` and `approvals` tables.
pub struct SqliteLedger {
    storage: Arc<Storage>,
}

impl SqliteLedger {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn mint(&self, asset: AssetRef, owner: Identity) -> Result<()> {
        let conn = self.storage.get_connection().await;

        if load_holder(&conn, &asset)?.is_some() {
            return Err(NftangoError::AssetExists(asset));
        }

        conn.execute(
            "INSERT INTO assets (collection, item, holder) VALUES (?1, ?2, ?3)",
            params![asset.collection, item_key(&asset)?, owner.as_str()],
        )?;

        tracing::info!("Minted {} to {}", asset, owner);
        Ok(())
    }

    pub async fn set_approval_for_all(
        &self,
        collection: &str,
        owner: &Identity,
        operator: &Identity,
        approved: bool,
    ) -> Result<()> {
        let conn = self.storage.get_connection().await;

        if approved {
            conn.execute(
                "INSERT OR IGNORE INTO approvals (collection, owner, operator)
                 VALUES (?1, ?2, ?3)",
                params![collection, owner.as_str(), operator.as_str()],
            )?;
        } else {
            conn.execute(
                "DELETE FROM approvals WHERE collection = ?1 AND owner = ?2 AND operator = ?3",
                params![collection, owner.as_str(), operator.as_str()],
            )?;
        }

        Ok(())
    }

    pub async fn balance_of(&self, collection: &str, owner: &Identity) -> Result<usize> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM assets WHERE collection = ?1 AND holder = ?2",
            params![collection, owner.as_str()],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}

fn load_holder(conn: &Connection, asset: &AssetRef) -> Result<Option<Identity>> {
    let holder: Option<String> = conn
        .query_row(
            "SELECT holder FROM assets WHERE collection = ?1 AND item = ?2",
            params![asset.collection, item_key(asset)?],
            |row| row.get(0),
        )
        .optional()?;

    Ok(holder.map(Identity::from))
}

fn load_approval(
    conn: &Connection,
    collection: &str,
    owner: &Identity,
    operator: &Identity,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM approvals WHERE collection = ?1 AND owner = ?2 AND operator = ?3",
        params![collection, owner.as_str(), operator.as_str()],
        |row| row.get(0),
    )?;

    Ok(count > 0)
}

// SQLite integers are signed 64-bit.
fn item_key(asset: &AssetRef) -> Result<i64> {
    i64::try_from(asset.item).map_err(|_| NftangoError::ItemOutOfRange(asset.clone()))
}

#[async_trait]
impl AssetCustody for SqliteLedger {
    async fn transfer_batch(&self, operator: &Identity, moves: &[Transfer]) -> Result<()> {
        ensure_distinct(moves)?;

        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        // An early return drops `tx`, which rolls the batch back.
        for m in moves {
            let holder = load_holder(&tx, &m.asset)?;
            let approved = load_approval(&tx, &m.asset.collection, &m.from, operator)?;
            check_move(operator, m, holder.as_ref(), approved)?;

            tx.execute(
                "UPDATE assets SET holder = ?3 WHERE collection = ?1 AND item = ?2",
                params![m.asset.collection, item_key(&m.asset)?, m.to.as_str()],
            )?;
        }

        tx.commit()?;
        tracing::debug!("Committed custody batch of {} moves", moves.len());
        Ok(())
    }

    async fn holder_of(&self, asset: &AssetRef) -> Result<Option<Identity>> {
        let conn = self.storage.get_connection().await;
        load_holder(&conn, asset)
    }

    async fn approval_granted(
        &self,
        collection: &str,
        owner: &Identity,
        operator: &Identity,
    ) -> Result<bool> {
        let conn = self.storage.get_connection().await;
        load_approval(&conn, collection, owner, operator)
    }
}
