use nftango_core::Identity;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, WagerError>;

#[derive(Error, Debug)]
pub enum WagerError {
    #[error("NFTango core error: {0}")]
    Core(#[from] nftango_core::NftangoError),

    #[error("A game already exists for creator {0}")]
    GameAlreadyExists(Identity),

    #[error("Game is not active")]
    GameNotActive,

    #[error("Game already has an opponent")]
    GameHasOpponent,

    // `provided` counts only distinct deposits the collection policy admits.
    #[error("Join requires {required} eligible assets, got {provided}")]
    JoinAmountRequirementNotMet { required: u32, provided: usize },

    #[error("{0} is not the winning player of this game")]
    NotPlayer(Identity),

    #[error("Winnings have already been claimed")]
    HasClaimed,

    #[error("Game has already been played")]
    AlreadyPlayed,

    #[error("No game found for creator {0}")]
    GameNotFound(Identity),

    #[error("Unknown game: {0}")]
    UnknownGame(Uuid),

    #[error("Join requirement must be greater than 0")]
    InvalidJoinRequirement,

    #[error("Asset lists differ in length: {collections} collections, {items} items")]
    AssetListMismatch { collections: usize, items: usize },

    #[error("{caller} is not authorised to stake on behalf of {creator}")]
    NotAuthorized { caller: Identity, creator: Identity },

    #[error("{0} is not an authorised referee")]
    NotReferee(Identity),

    #[error("Game has no opponent yet")]
    NoOpponent,

    #[error("Game has not been played")]
    NotPlayed,

    #[error("Collection {requested} does not match stake collection {expected}")]
    CollectionMismatch { requested: String, expected: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WagerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
