//! NFTango wagers - escrowed 1v1 bets on non-fungible assets
//!
//! A creator stakes one asset and names how many assets an opponent must
//! put up. Once an opponent joins, a referee records the outcome and the
//! winner claims everything held in escrow.

pub mod config;
pub mod error;
pub mod game;
pub mod registry;

pub use config::{CollectionPolicy, RefereePolicy, RegistryConfig};
pub use error::{Result, WagerError};
pub use game::{Game, GameInfo, GamePhase, Transition};
pub use registry::Registry;

#[cfg(test)]
mod tests {
    use super::*;
    use nftango_core::{
        AssetCustody, AssetRef, GameStore, Identity, MemoryLedger, NftangoError, SqliteLedger,
        Storage, Transfer,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::Semaphore;

    #[tokio::test]
    async fn test_opponent_wins_round_trip() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let ledger = Arc::new(MemoryLedger::new());
        let registry = Registry::new(ledger.clone(), RegistryConfig::default()).unwrap();
        let operator = registry.config().operator.clone();
        let creator = Identity::from("creator");
        let opponent = Identity::from("opponent");
        let referee = Identity::from("referee");

        ledger.mint(AssetRef::new("punks", 1), creator.clone()).unwrap();
        ledger.mint(AssetRef::new("punks", 2), opponent.clone()).unwrap();
        ledger.mint(AssetRef::new("punks", 3), opponent.clone()).unwrap();
        ledger.set_approval_for_all("punks", &creator, &operator, true);
        ledger.set_approval_for_all("punks", &opponent, &operator, true);

        let game_id = registry
            .initialize_game(&creator, creator.clone(), "punks", 1, 2)
            .await
            .unwrap();
        registry
            .join_game(opponent.clone(), game_id, &["punks", "punks"], &[2, 3])
            .await
            .unwrap();
        registry
            .play_game(&referee, &creator, false)
            .await
            .unwrap();
        let payout = registry
            .claim("punks", &opponent, &creator)
            .await
            .unwrap();

        assert_eq!(payout.len(), 3);
        assert_eq!(
            ledger.assets_of(&opponent),
            vec![
                AssetRef::new("punks", 1),
                AssetRef::new("punks", 2),
                AssetRef::new("punks", 3),
            ]
        );
        assert!(ledger.assets_of(&creator).is_empty());
        assert!(ledger.assets_of(&Identity::escrow(game_id)).is_empty());
    }

    async fn sqlite_setup(
        path: &std::path::Path,
    ) -> (Arc<Storage>, Arc<SqliteLedger>, Registry) {
        let storage = Arc::new(Storage::new(path).await.unwrap());
        let ledger = Arc::new(SqliteLedger::new(storage.clone()));
        let registry = Registry::open(ledger.clone(), storage.clone(), RegistryConfig::default())
            .await
            .unwrap();
        (storage, ledger, registry)
    }

    #[tokio::test]
    async fn test_registry_restores_from_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nftango.db");
        let creator = Identity::from("creator");
        let opponent = Identity::from("opponent");

        let game_id = {
            let (_storage, ledger, registry) = sqlite_setup(&db_path).await;
            let operator = registry.config().operator.clone();

            ledger
                .mint(AssetRef::new("punks", 1), creator.clone())
                .await
                .unwrap();
            ledger
                .mint(AssetRef::new("punks", 2), opponent.clone())
                .await
                .unwrap();
            for owner in [&creator, &opponent] {
                ledger
                    .set_approval_for_all("punks", owner, &operator, true)
                    .await
                    .unwrap();
            }

            let game_id = registry
                .initialize_game(&creator, creator.clone(), "punks", 1, 1)
                .await
                .unwrap();
            registry
                .join_game(opponent.clone(), game_id, &["punks"], &[2])
                .await
                .unwrap();
            game_id
        };

        let (_storage, ledger, registry) = sqlite_setup(&db_path).await;
        assert_eq!(registry.games(&creator), Some(game_id));
        let info = registry.game_for(&creator).await.unwrap();
        assert_eq!(info.phase, "joined");
        assert_eq!(info.opponent, Some(opponent.clone()));

        registry
            .play_game(&creator, &creator, true)
            .await
            .unwrap();
        registry
            .claim("punks", &creator, &creator)
            .await
            .unwrap();
        assert_eq!(ledger.balance_of("punks", &creator).await.unwrap(), 2);

        // Finished games come back as finished.
        drop(registry);
        let (_storage, _ledger, registry) = sqlite_setup(&db_path).await;
        assert!(registry.games(&creator).is_none());
        let err = registry
            .claim("punks", &creator, &creator)
            .await
            .unwrap_err();
        assert!(matches!(err, WagerError::HasClaimed));
    }

    #[tokio::test]
    async fn test_failed_join_leaves_snapshot_untouched() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nftango.db");
        let creator = Identity::from("creator");
        let opponent = Identity::from("opponent");

        {
            let (_storage, ledger, registry) = sqlite_setup(&db_path).await;
            let operator = registry.config().operator.clone();
            ledger
                .mint(AssetRef::new("punks", 1), creator.clone())
                .await
                .unwrap();
            ledger
                .mint(AssetRef::new("punks", 2), opponent.clone())
                .await
                .unwrap();
            ledger
                .set_approval_for_all("punks", &creator, &operator, true)
                .await
                .unwrap();

            let game_id = registry
                .initialize_game(&creator, creator.clone(), "punks", 1, 1)
                .await
                .unwrap();

            // Opponent never approved the registry.
            let err = registry
                .join_game(opponent.clone(), game_id, &["punks"], &[2])
                .await
                .unwrap_err();
            assert!(matches!(err, WagerError::Core(_)));
        }

        let (_storage, ledger, registry) = sqlite_setup(&db_path).await;
        let info = registry.game_for(&creator).await.unwrap();
        assert_eq!(info.phase, "created");
        assert!(info.opponent.is_none());
        assert_eq!(
            ledger
                .holder_of(&AssetRef::new("punks", 2))
                .await
                .unwrap(),
            Some(opponent)
        );

        registry.cancel_game(&creator).await.unwrap();
        assert_eq!(ledger.balance_of("punks", &creator).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_funding_leaves_no_snapshot() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nftango.db");
        let creator = Identity::from("creator");

        {
            let (_storage, ledger, registry) = sqlite_setup(&db_path).await;
            ledger
                .mint(AssetRef::new("punks", 1), creator.clone())
                .await
                .unwrap();

            // The registry operator was never approved.
            let err = registry
                .initialize_game(&creator, creator.clone(), "punks", 1, 1)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                WagerError::Core(NftangoError::NotApproved { .. })
            ));
            assert!(registry.games(&creator).is_none());
        }

        let (storage, ledger, registry) = sqlite_setup(&db_path).await;
        assert!(registry.games(&creator).is_none());
        let snapshots: Vec<Game> = GameStore::new(&storage).list_games().await.unwrap();
        assert!(snapshots.is_empty());
        assert_eq!(
            ledger.holder_of(&AssetRef::new("punks", 1)).await.unwrap(),
            Some(creator)
        );
    }

    /// Ledger whose batches each wait for a permit.
    struct GatedCustody {
        inner: Arc<SqliteLedger>,
        gate: Semaphore,
    }

    #[async_trait::async_trait]
    impl AssetCustody for GatedCustody {
        async fn transfer_batch(
            &self,
            operator: &Identity,
            moves: &[Transfer],
        ) -> nftango_core::Result<()> {
            self.gate
                .acquire()
                .await
                .map_err(|_| NftangoError::internal("gate closed"))?
                .forget();
            self.inner.transfer_batch(operator, moves).await
        }

        async fn holder_of(&self, asset: &AssetRef) -> nftango_core::Result<Option<Identity>> {
            self.inner.holder_of(asset).await
        }

        async fn approval_granted(
            &self,
            collection: &str,
            owner: &Identity,
            operator: &Identity,
        ) -> nftango_core::Result<bool> {
            self.inner.approval_granted(collection, owner, operator).await
        }
    }

    #[tokio::test]
    async fn test_abandoned_join_still_commits() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nftango.db");
        let creator = Identity::from("creator");
        let opponent = Identity::from("opponent");

        let game_id = {
            let storage = Arc::new(Storage::new(&db_path).await.unwrap());
            let ledger = Arc::new(SqliteLedger::new(storage.clone()));
            let custody = Arc::new(GatedCustody {
                inner: ledger.clone(),
                gate: Semaphore::new(1),
            });
            let registry = Registry::open(custody.clone(), storage, RegistryConfig::default())
                .await
                .unwrap();
            let operator = registry.config().operator.clone();

            ledger
                .mint(AssetRef::new("punks", 1), creator.clone())
                .await
                .unwrap();
            ledger
                .mint(AssetRef::new("punks", 2), opponent.clone())
                .await
                .unwrap();
            for owner in [&creator, &opponent] {
                ledger
                    .set_approval_for_all("punks", owner, &operator, true)
                    .await
                    .unwrap();
            }

            let game_id = registry
                .initialize_game(&creator, creator.clone(), "punks", 1, 1)
                .await
                .unwrap();

            // The caller gives up while the deposit is waiting on custody.
            let abandoned = tokio::time::timeout(
                Duration::from_millis(50),
                registry.join_game(opponent.clone(), game_id, &["punks"], &[2]),
            )
            .await;
            assert!(abandoned.is_err());

            custody.gate.add_permits(1);
            let info = registry.game(game_id).await.unwrap();
            assert_eq!(info.phase, "joined");
            assert_eq!(
                ledger.holder_of(&AssetRef::new("punks", 2)).await.unwrap(),
                Some(Identity::escrow(game_id))
            );
            game_id
        };

        let (_storage, ledger, registry) = sqlite_setup(&db_path).await;
        let info = registry.game(game_id).await.unwrap();
        assert_eq!(info.phase, "joined");
        assert_eq!(info.opponent, Some(opponent.clone()));

        registry
            .play_game(&creator, &creator, false)
            .await
            .unwrap();
        registry
            .claim("punks", &opponent, &creator)
            .await
            .unwrap();
        assert_eq!(ledger.balance_of("punks", &opponent).await.unwrap(), 2);
    }
}
