use crate::config::CollectionPolicy;
use crate::error::{Result, WagerError};
use chrono::{DateTime, Utc};
use nftango_core::{AssetRef, Identity, Transfer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a single wager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GamePhase {
    Created,
    Joined {
        opponent: Identity,
        opponent_stakes: Vec<AssetRef>,
    },
    Played {
        opponent: Identity,
        opponent_stakes: Vec<AssetRef>,
        creator_won: bool,
    },
    Claimed {
        opponent: Identity,
        opponent_stakes: Vec<AssetRef>,
        creator_won: bool,
    },
    Cancelled,
}

impl GamePhase {
    pub fn name(&self) -> &'static str {
        match self {
            GamePhase::Created => "created",
            GamePhase::Joined { .. } => "joined",
            GamePhase::Played { .. } => "played",
            GamePhase::Claimed { .. } => "claimed",
            GamePhase::Cancelled => "cancelled",
        }
    }
}

/// Custody moves a transition needs, and the phase it lands in once they
/// have been applied.
#[derive(Debug, Clone)]
pub struct Transition {
    pub operator: Identity,
    pub moves: Vec<Transfer>,
    pub next: GamePhase,
}

/// Escrow state for one wager.
///
/// Transition methods only validate and plan; the registry applies the
/// custody moves and then commits the returned phase with [`Game::apply`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    id: Uuid,
    escrow: Identity,
    creator: Identity,
    creator_stake: AssetRef,
    join_requirement: u32,
    created_at: DateTime<Utc>,
    phase: GamePhase,
}

impl Game {
    pub fn new(creator: Identity, creator_stake: AssetRef, join_requirement: u32) -> Result<Self> {
        if join_requirement == 0 {
            return Err(WagerError::InvalidJoinRequirement);
        }

        let id = Uuid::new_v4();
        Ok(Self {
            id,
            escrow: Identity::escrow(id),
            creator,
            creator_stake,
            join_requirement,
            created_at: Utc::now(),
            phase: GamePhase::Created,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn escrow(&self) -> &Identity {
        &self.escrow
    }

    pub fn creator(&self) -> &Identity {
        &self.creator
    }

    pub fn creator_stake(&self) -> &AssetRef {
        &self.creator_stake
    }

    pub fn join_requirement(&self) -> u32 {
        self.join_requirement
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn phase(&self) -> &GamePhase {
        &self.phase
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, GamePhase::Cancelled)
    }

    pub fn opponent(&self) -> Option<&Identity> {
        match &self.phase {
            GamePhase::Joined { opponent, .. }
            | GamePhase::Played { opponent, .. }
            | GamePhase::Claimed { opponent, .. } => Some(opponent),
            GamePhase::Created | GamePhase::Cancelled => None,
        }
    }

    pub fn opponent_stakes(&self) -> &[AssetRef] {
        match &self.phase {
            GamePhase::Joined {
                opponent_stakes, ..
            }
            | GamePhase::Played {
                opponent_stakes, ..
            }
            | GamePhase::Claimed {
                opponent_stakes, ..
            } => opponent_stakes,
            GamePhase::Created | GamePhase::Cancelled => &[],
        }
    }

    pub fn creator_won(&self) -> Option<bool> {
        match &self.phase {
            GamePhase::Played { creator_won, .. } | GamePhase::Claimed { creator_won, .. } => {
                Some(*creator_won)
            }
            _ => None,
        }
    }

    pub fn has_claimed(&self) -> bool {
        matches!(self.phase, GamePhase::Claimed { .. })
    }

    pub fn winner(&self) -> Option<&Identity> {
        match &self.phase {
            GamePhase::Played {
                opponent,
                creator_won,
                ..
            }
            | GamePhase::Claimed {
                opponent,
                creator_won,
                ..
            } => Some(if *creator_won { &self.creator } else { opponent }),
            _ => None,
        }
    }

    /// Cancelled and claimed games no longer occupy their creator's slot.
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Cancelled | GamePhase::Claimed { .. })
    }

    /// Pull the creator's stake into escrow.
    pub fn fund(&self, operator: Identity) -> Transition {
        Transition {
            operator,
            moves: vec![Transfer::new(
                self.creator_stake.clone(),
                self.creator.clone(),
                self.escrow.clone(),
            )],
            next: GamePhase::Created,
        }
    }

    pub fn cancel(&self) -> Result<Transition> {
        match &self.phase {
            GamePhase::Created => Ok(Transition {
                operator: self.escrow.clone(),
                moves: vec![Transfer::new(
                    self.creator_stake.clone(),
                    self.escrow.clone(),
                    self.creator.clone(),
                )],
                next: GamePhase::Cancelled,
            }),
            GamePhase::Cancelled => Err(WagerError::GameNotActive),
            _ => Err(WagerError::GameHasOpponent),
        }
    }

    pub fn join(
        &self,
        opponent: Identity,
        stakes: Vec<AssetRef>,
        policy: CollectionPolicy,
        operator: Identity,
    ) -> Result<Transition> {
        match &self.phase {
            GamePhase::Created => {}
            GamePhase::Cancelled => return Err(WagerError::GameNotActive),
            _ => return Err(WagerError::GameHasOpponent),
        }

        if opponent == self.creator {
            return Err(WagerError::NotPlayer(opponent));
        }

        let required = self.join_requirement;
        if stakes.len() != required as usize {
            return Err(WagerError::JoinAmountRequirementNotMet {
                required,
                provided: stakes.len(),
            });
        }

        // duplicates and assets the collection policy rejects do not count
        let eligible = policy.eligible_count(&self.creator_stake, &stakes);
        if eligible != stakes.len() {
            return Err(WagerError::JoinAmountRequirementNotMet {
                required,
                provided: eligible,
            });
        }

        let moves = stakes
            .iter()
            .map(|asset| Transfer::new(asset.clone(), opponent.clone(), self.escrow.clone()))
            .collect();

        Ok(Transition {
            operator,
            moves,
            next: GamePhase::Joined {
                opponent,
                opponent_stakes: stakes,
            },
        })
    }

    pub fn play(&self, creator_won: bool) -> Result<Transition> {
        match &self.phase {
            GamePhase::Joined {
                opponent,
                opponent_stakes,
            } => Ok(Transition {
                operator: self.escrow.clone(),
                moves: Vec::new(),
                next: GamePhase::Played {
                    opponent: opponent.clone(),
                    opponent_stakes: opponent_stakes.clone(),
                    creator_won,
                },
            }),
            GamePhase::Created => Err(WagerError::NoOpponent),
            GamePhase::Played { .. } | GamePhase::Claimed { .. } => Err(WagerError::AlreadyPlayed),
            GamePhase::Cancelled => Err(WagerError::GameNotActive),
        }
    }

    pub fn claim(&self, collection: &str, claimant: &Identity) -> Result<Transition> {
        let (opponent, opponent_stakes, creator_won) = match &self.phase {
            GamePhase::Played {
                opponent,
                opponent_stakes,
                creator_won,
            } => (opponent, opponent_stakes, *creator_won),
            GamePhase::Claimed { .. } => return Err(WagerError::HasClaimed),
            GamePhase::Created | GamePhase::Joined { .. } => return Err(WagerError::NotPlayed),
            GamePhase::Cancelled => return Err(WagerError::GameNotActive),
        };

        let winner = if creator_won { &self.creator } else { opponent };
        if claimant != winner {
            return Err(WagerError::NotPlayer(claimant.clone()));
        }

        if collection != self.creator_stake.collection {
            return Err(WagerError::CollectionMismatch {
                requested: collection.to_string(),
                expected: self.creator_stake.collection.clone(),
            });
        }

        let moves = std::iter::once(&self.creator_stake)
            .chain(opponent_stakes.iter())
            .map(|asset| Transfer::new(asset.clone(), self.escrow.clone(), winner.clone()))
            .collect();

        Ok(Transition {
            operator: self.escrow.clone(),
            moves,
            next: GamePhase::Claimed {
                opponent: opponent.clone(),
                opponent_stakes: opponent_stakes.clone(),
                creator_won,
            },
        })
    }

    pub(crate) fn apply(&mut self, next: GamePhase) {
        tracing::debug!(
            "Game {} moved from {} to {}",
            self.id,
            self.phase.name(),
            next.name()
        );
        self.phase = next;
    }

    pub fn get_info(&self) -> GameInfo {
        GameInfo {
            id: self.id,
            escrow: self.escrow.clone(),
            creator: self.creator.clone(),
            creator_stake: self.creator_stake.clone(),
            join_requirement: self.join_requirement,
            opponent: self.opponent().cloned(),
            opponent_stakes: self.opponent_stakes().to_vec(),
            active: self.is_active(),
            creator_won: self.creator_won(),
            has_claimed: self.has_claimed(),
            winner: self.winner().cloned(),
            phase: self.phase.name().to_string(),
            created_at: self.created_at,
        }
    }
}

/// Game info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInfo {
    pub id: Uuid,
    pub escrow: Identity,
    pub creator: Identity,
    pub creator_stake: AssetRef,
    pub join_requirement: u32,
    pub opponent: Option<Identity>,
    pub opponent_stakes: Vec<AssetRef>,
    pub active: bool,
    pub creator_won: Option<bool>,
    pub has_claimed: bool,
    pub winner: Option<Identity>,
    pub phase: String,
    pub created_at: DateTime<Utc>,
}
