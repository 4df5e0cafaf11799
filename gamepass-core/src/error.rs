use thiserror::Error;

use crate::types::GameId;

pub type Result<T> = std::result::Result<T, GamePassError>;

#[derive(Error, Debug)]
pub enum GamePassError {
    #[error("Caller is not authorized for this operation")]
    Unauthorized,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid game state: {0}")]
    InvalidState(String),

    #[error("Invalid payment: expected {expected}, got {got}")]
    InvalidPayment { expected: u64, got: u64 },

    #[error("Player already joined")]
    AlreadyJoined,

    #[error("Game is full")]
    GameFull,

    #[error("Minimum players not met: need {need}, have {have}")]
    MinPlayersNotMet { need: u32, have: u32 },

    #[error("Declared winner did not join the game")]
    InvalidWinner,

    #[error("Game not found: {0}")]
    NotFound(GameId),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountExists(String),

    #[error("Insufficient funds: need {need}, have {available}")]
    InsufficientFunds { need: u64, available: u64 },

    #[error("Payout failed: {0}")]
    PayoutFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GamePassError {
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn payout_failed(msg: impl Into<String>) -> Self {
        Self::PayoutFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
