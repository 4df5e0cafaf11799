use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GamePassError, Result};
use crate::types::GameId;

/// Ledger-wide registry: privileged identities, the platform fee and the
/// game id counter. Created once at ledger initialization; only the id
/// counter, the oracle designation and the fee accrual change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    owner: Uuid,
    oracle: Option<Uuid>,
    platform_fee_percentage: u8,
    game_id_counter: GameId,
    fees_accrued: u64,
}

impl Registry {
    pub fn new(owner: Uuid, oracle: Option<Uuid>, platform_fee_percentage: u8) -> Result<Self> {
        if platform_fee_percentage > 100 {
            return Err(GamePassError::invalid_parameters(format!(
                "Platform fee percentage must be 0-100, got {}",
                platform_fee_percentage
            )));
        }

        Ok(Self {
            owner,
            oracle,
            platform_fee_percentage,
            game_id_counter: 0,
            fees_accrued: 0,
        })
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn oracle(&self) -> Option<Uuid> {
        self.oracle
    }

    pub fn platform_fee_percentage(&self) -> u8 {
        self.platform_fee_percentage
    }

    pub fn game_id_counter(&self) -> GameId {
        self.game_id_counter
    }

    pub fn fees_accrued(&self) -> u64 {
        self.fees_accrued
    }

    pub fn is_owner(&self, caller: Uuid) -> bool {
        caller == self.owner
    }

    /// Owner or the designated oracle may submit settlement results.
    pub fn may_settle(&self, caller: Uuid) -> bool {
        caller == self.owner || self.oracle == Some(caller)
    }

    /// Allocate the next game id. The returned id is the counter value
    /// before the increment.
    pub(crate) fn allocate_game_id(&mut self) -> GameId {
        let id = self.game_id_counter;
        self.game_id_counter += 1;
        id
    }

    pub(crate) fn set_oracle(&mut self, oracle: Option<Uuid>) {
        self.oracle = oracle;
    }

    pub(crate) fn accrue_fee(&mut self, amount: u64) {
        self.fees_accrued += amount;
    }
}
