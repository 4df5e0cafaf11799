use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GamePassError, Result};

/// Sequential game identifier allocated by the registry.
pub type GameId = u64;

/// 32-byte opaque commitment to an off-chain outcome.
pub type ResultHash = [u8; 32];

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Admission open, players may join by paying the entry fee.
    Sale,
    /// Admission frozen, awaiting the result.
    Active,
    /// Winner paid out, fee collected.
    Finished,
    /// Aborted during sale, entry fees refunded.
    Cancelled,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Finished | GameStatus::Cancelled)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Sale => write!(f, "sale"),
            GameStatus::Active => write!(f, "active"),
            GameStatus::Finished => write!(f, "finished"),
            GameStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Parse a 64-character hex string into a result commitment.
pub fn parse_result_hash(s: &str) -> Result<ResultHash> {
    let bytes = hex::decode(s.trim())
        .map_err(|e| GamePassError::invalid_parameters(format!("Invalid result hash hex: {}", e)))?;

    bytes.as_slice().try_into().map_err(|_| {
        GamePassError::invalid_parameters(format!(
            "Result hash must be 32 bytes, got {}",
            bytes.len()
        ))
    })
}

pub fn format_result_hash(hash: &ResultHash) -> String {
    hex::encode(hash)
}
