use crate::config::RegistryConfig;
use crate::error::{Result, WagerError};
use crate::game::{Game, GameInfo, GamePhase, Transition};
use nftango_core::{AssetCustody, AssetRef, GameStore, Identity, Storage};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type GameHandle = Arc<Mutex<Game>>;

#[derive(Default)]
struct Directory {
    // creator -> the game occupying their slot
    active: HashMap<Identity, Uuid>,
    // creator -> their most recent cancelled or claimed game
    finished: HashMap<Identity, Uuid>,
    // every game ever opened or restored, kept so `game(id)` still answers
    // after the creator's slot has moved on
    games: HashMap<Uuid, GameHandle>,
}

/// What a commit needs, cloned into the task that runs it.
#[derive(Clone)]
struct Backend {
    custody: Arc<dyn AssetCustody>,
    storage: Option<Arc<Storage>>,
    directory: Arc<RwLock<Directory>>,
}

/// Entry point for wagers: one active game per creator.
///
/// Each game sits behind its own async mutex, held for the whole of a
/// transition including the custody moves. A transition is committed on a
/// spawned task that owns the game's lock, so it runs to the end even if the
/// caller stops waiting. The directory lock is only taken for short
/// synchronous lookups.
///
/// Must be driven from within a Tokio runtime.
pub struct Registry {
    backend: Backend,
    config: RegistryConfig,
}

impl Registry {
    pub fn new(custody: Arc<dyn AssetCustody>, config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            backend: Backend {
                custody,
                storage: None,
                directory: Arc::new(RwLock::new(Directory::default())),
            },
            config,
        })
    }

    /// Registry backed by `storage`, restoring every persisted game.
    pub async fn open(
        custody: Arc<dyn AssetCustody>,
        storage: Arc<Storage>,
        config: RegistryConfig,
    ) -> Result<Self> {
        config.validate()?;

        let snapshots: Vec<Game> = GameStore::new(&storage).list_games().await?;
        let mut directory = Directory::default();

        for game in snapshots {
            let creator = game.creator().clone();
            let id = game.id();

            if game.is_finished() {
                directory.finished.insert(creator, id);
            } else if let Some(previous) = directory.active.insert(creator.clone(), id) {
                tracing::warn!(
                    "Creator {} had unfinished games {} and {}, keeping the newer",
                    creator,
                    previous,
                    id
                );
            }

            directory.games.insert(id, Arc::new(Mutex::new(game)));
        }

        tracing::info!(
            "Restored {} games ({} active)",
            directory.games.len(),
            directory.active.len()
        );

        Ok(Self {
            backend: Backend {
                custody,
                storage: Some(storage),
                directory: Arc::new(RwLock::new(directory)),
            },
            config,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The game currently occupying `creator`'s slot.
    pub fn games(&self, creator: &Identity) -> Option<Uuid> {
        self.backend.directory.read().active.get(creator).copied()
    }

    /// Any game this registry knows, finished ones included.
    pub async fn game(&self, game_id: Uuid) -> Option<GameInfo> {
        let handle = self.backend.directory.read().games.get(&game_id).cloned()?;
        let game = handle.lock().await;
        Some(game.get_info())
    }

    pub async fn game_for(&self, creator: &Identity) -> Option<GameInfo> {
        let game_id = self.games(creator)?;
        self.game(game_id).await
    }

    /// Open a game for `creator`, moving their stake into escrow.
    ///
    /// `caller` must be the creator or an operator the creator approved on the
    /// stake's collection.
    pub async fn initialize_game(
        &self,
        caller: &Identity,
        creator: Identity,
        collection: &str,
        item: u64,
        join_requirement: u32,
    ) -> Result<Uuid> {
        let game = Game::new(creator.clone(), AssetRef::new(collection, item), join_requirement)?;

        if *caller != creator
            && !self
                .backend
                .custody
                .approval_granted(collection, &creator, caller)
                .await?
        {
            return Err(WagerError::NotAuthorized {
                caller: caller.clone(),
                creator,
            });
        }

        let game_id = game.id();
        let stake = game.creator_stake().clone();
        let handle = Arc::new(Mutex::new(game));
        let game = handle
            .clone()
            .try_lock_owned()
            .map_err(|_| WagerError::internal("New game lock was contended"))?;

        // Reserve the slot while holding the game's lock, so nobody can act on
        // the game before its stake is in escrow.
        {
            let mut directory = self.backend.directory.write();
            if directory.active.contains_key(&creator) {
                return Err(WagerError::GameAlreadyExists(creator));
            }
            directory.active.insert(creator.clone(), game_id);
            directory.games.insert(game_id, handle);
        }

        let funding = game.fund(self.config.operator.clone());
        if let Err(e) = self.commit(game, funding, true).await {
            tracing::warn!("Failed to fund game for {}: {}", creator, e);
            return Err(e);
        }

        tracing::info!(
            "Creator {} opened game {} staking {} (join requirement {})",
            creator,
            game_id,
            stake,
            join_requirement
        );
        Ok(game_id)
    }

    /// Return the stake of a game nobody has joined and free the creator's slot.
    pub async fn cancel_game(&self, creator: &Identity) -> Result<()> {
        let game = self.resolve(creator)?.lock_owned().await;
        let game_id = game.id();

        let transition = game.cancel()?;
        self.commit(game, transition, false).await?;

        tracing::info!("Creator {} cancelled game {}", creator, game_id);
        Ok(())
    }

    pub async fn join_game<S: AsRef<str>>(
        &self,
        opponent: Identity,
        game_id: Uuid,
        collections: &[S],
        items: &[u64],
    ) -> Result<()> {
        if collections.len() != items.len() {
            return Err(WagerError::AssetListMismatch {
                collections: collections.len(),
                items: items.len(),
            });
        }

        let stakes: Vec<AssetRef> = collections
            .iter()
            .zip(items)
            .map(|(collection, item)| AssetRef::new(collection.as_ref(), *item))
            .collect();

        let handle = self
            .backend
            .directory
            .read()
            .games
            .get(&game_id)
            .cloned()
            .ok_or(WagerError::UnknownGame(game_id))?;
        let game = handle.lock_owned().await;

        let transition = game.join(
            opponent.clone(),
            stakes,
            self.config.collections,
            self.config.operator.clone(),
        )?;
        let deposited = transition.moves.len();
        self.commit(game, transition, false).await?;

        tracing::info!(
            "Opponent {} joined game {} with {} assets",
            opponent,
            game_id,
            deposited
        );
        Ok(())
    }

    /// Record the outcome of `creator`'s game. No assets move.
    pub async fn play_game(
        &self,
        caller: &Identity,
        creator: &Identity,
        creator_won: bool,
    ) -> Result<()> {
        if !self.config.referee.permits(caller, creator) {
            return Err(WagerError::NotReferee(caller.clone()));
        }

        let game = self.resolve(creator)?.lock_owned().await;
        let game_id = game.id();

        let transition = game.play(creator_won)?;
        self.commit(game, transition, false).await?;

        tracing::info!(
            "Game {} played by {}: creator {}",
            game_id,
            caller,
            if creator_won { "won" } else { "lost" }
        );
        Ok(())
    }

    /// Pay every escrowed asset of `creator`'s game out to `claimant`, who must
    /// be the winner. Returns the assets paid out.
    pub async fn claim(
        &self,
        collection: &str,
        claimant: &Identity,
        creator: &Identity,
    ) -> Result<Vec<AssetRef>> {
        let game = self.resolve(creator)?.lock_owned().await;
        let game_id = game.id();

        let transition = game.claim(collection, claimant)?;
        let payout: Vec<AssetRef> = transition.moves.iter().map(|m| m.asset.clone()).collect();
        self.commit(game, transition, false).await?;

        tracing::info!(
            "Winner {} claimed {} assets from game {}",
            claimant,
            payout.len(),
            game_id
        );
        Ok(payout)
    }

    fn resolve(&self, creator: &Identity) -> Result<GameHandle> {
        let directory = self.backend.directory.read();
        directory
            .active
            .get(creator)
            .or_else(|| directory.finished.get(creator))
            .and_then(|id| directory.games.get(id))
            .cloned()
            .ok_or_else(|| WagerError::GameNotFound(creator.clone()))
    }

    /// Hand the transition and the game's lock to a spawned task and wait for
    /// it. Dropping the returned future does not stop the commit.
    async fn commit(
        &self,
        game: OwnedMutexGuard<Game>,
        transition: Transition,
        is_new: bool,
    ) -> Result<()> {
        let backend = self.backend.clone();
        tokio::spawn(async move { backend.commit(game, transition, is_new).await })
            .await
            .map_err(|e| WagerError::internal(format!("Commit task failed: {}", e)))?
    }
}

impl Backend {
    async fn commit(
        &self,
        mut game: OwnedMutexGuard<Game>,
        transition: Transition,
        is_new: bool,
    ) -> Result<()> {
        let result = self.apply(&mut game, transition, is_new).await;

        match &result {
            Err(_) if is_new => self.abandon(&mut game),
            Ok(()) if game.is_finished() => self.retire(&game),
            _ => {}
        }
        result
    }

    /// Snapshot first, then custody, then memory.
    ///
    /// If the custody moves fail the snapshot is put back (or removed for a
    /// game that was never funded) and `game` is left untouched.
    async fn apply(&self, game: &mut Game, transition: Transition, is_new: bool) -> Result<()> {
        let Transition {
            operator,
            moves,
            next,
        } = transition;

        if let Some(storage) = &self.storage {
            let mut staged = game.clone();
            staged.apply(next.clone());
            GameStore::new(storage)
                .save_game(staged.id(), staged.creator(), staged.created_at(), &staged)
                .await?;
        }

        if !moves.is_empty() {
            if let Err(e) = self.custody.transfer_batch(&operator, &moves).await {
                self.rollback_snapshot(game, is_new).await;
                if e.is_custody_violation() {
                    tracing::warn!("Custody rejected moves for game {}: {}", game.id(), e);
                }
                return Err(e.into());
            }
        }

        game.apply(next);
        Ok(())
    }

    async fn rollback_snapshot(&self, game: &Game, is_new: bool) {
        let Some(storage) = &self.storage else {
            return;
        };

        let store = GameStore::new(storage);
        let restored = if is_new {
            store.delete_game(game.id()).await
        } else {
            store
                .save_game(game.id(), game.creator(), game.created_at(), game)
                .await
        };

        if let Err(e) = restored {
            tracing::error!("Failed to restore snapshot of game {}: {}", game.id(), e);
        }
    }

    /// Drop a game whose funding failed and free the creator's slot.
    fn abandon(&self, game: &mut Game) {
        game.apply(GamePhase::Cancelled);

        let mut directory = self.directory.write();
        if directory.active.get(game.creator()) == Some(&game.id()) {
            directory.active.remove(game.creator());
        }
        directory.games.remove(&game.id());
    }

    fn retire(&self, game: &Game) {
        let mut directory = self.directory.write();
        if directory.active.get(game.creator()) == Some(&game.id()) {
            directory.active.remove(game.creator());
        }
        directory.finished.insert(game.creator().clone(), game.id());
    }
}
