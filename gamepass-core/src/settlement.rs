use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{GameId, ResultHash};

/// Outcome summary returned by a successful settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub game_id: GameId,
    pub winner: Uuid,
    pub winner_payout: u64,
    pub collected_fee: u64,
    pub result_hash: ResultHash,
}

/// Split a pool into `(platform fee, winner payout)`.
///
/// The fee rounds down, so the two parts always sum to `pool` and the
/// platform absorbs the remainder of an inexact percentage split.
pub fn split_pool(pool: u64, fee_percentage: u8) -> (u64, u64) {
    debug_assert!(fee_percentage <= 100);
    let fee = (pool as u128 * fee_percentage as u128 / 100) as u64;
    (fee, pool - fee)
}
