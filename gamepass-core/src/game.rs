use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GamePassError, Result};
use crate::types::{GameId, GameStatus, ResultHash};

/// A single escrow game record. Lives in the ledger's game map and is
/// returned to callers as a snapshot; all mutation goes through the
/// guard methods below so the pool and player bookkeeping stay balanced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    /// Sequential identifier, assigned at creation.
    pub id: GameId,
    /// Identity that created the game.
    pub creator: Uuid,
    pub min_players: u32,
    pub max_players: u32,
    /// Fixed cost to join, in ledger units. Zero is allowed.
    pub entry_fee: u64,
    /// Escrowed entry fees; zero after any terminal transition.
    pub pool: u64,
    pub status: GameStatus,
    pub player_count: u32,
    /// Joined identities in join order, no duplicates.
    pub players: Vec<Uuid>,
    /// Winner (None until settled).
    pub winner: Option<Uuid>,
    /// Commitment to the off-chain outcome (None until settled).
    pub result_hash: Option<ResultHash>,
    /// Fee retained by the platform at settlement.
    pub collected_fee: u64,
    /// Optional close of the admission window, checked against a
    /// caller-supplied clock only.
    pub sale_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub(crate) fn new(
        id: GameId,
        creator: Uuid,
        min_players: u32,
        max_players: u32,
        entry_fee: u64,
        sale_deadline: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if min_players < 1 {
            return Err(GamePassError::invalid_parameters(
                "Minimum player count must be at least 1",
            ));
        }
        if max_players < min_players {
            return Err(GamePassError::invalid_parameters(format!(
                "Maximum players ({}) below minimum ({})",
                max_players, min_players
            )));
        }

        Ok(Self {
            id,
            creator,
            min_players,
            max_players,
            entry_fee,
            pool: 0,
            status: GameStatus::Sale,
            player_count: 0,
            players: Vec::new(),
            winner: None,
            result_hash: None,
            collected_fee: 0,
            sale_deadline,
            created_at: Utc::now(),
        })
    }

    pub fn is_full(&self) -> bool {
        self.player_count >= self.max_players
    }

    pub fn has_player(&self, player: Uuid) -> bool {
        self.players.contains(&player)
    }

    /// Admission guard plus pool credit. The caller debits the entry fee
    /// from the joining account in the same ledger operation, so the
    /// `pool == player_count * entry_fee` invariant holds throughout.
    pub(crate) fn admit(&mut self, player: Uuid, payment: u64) -> Result<()> {
        if self.status != GameStatus::Sale {
            return Err(GamePassError::invalid_state(format!(
                "Game {} is not accepting players ({})",
                self.id, self.status
            )));
        }
        if self.has_player(player) {
            return Err(GamePassError::AlreadyJoined);
        }
        if self.is_full() {
            return Err(GamePassError::GameFull);
        }
        if payment != self.entry_fee {
            return Err(GamePassError::InvalidPayment {
                expected: self.entry_fee,
                got: payment,
            });
        }

        let pool = self
            .pool
            .checked_add(self.entry_fee)
            .ok_or_else(|| GamePassError::internal("Pool overflow"))?;

        self.players.push(player);
        self.player_count += 1;
        self.pool = pool;

        tracing::debug!("Player {} admitted to game {}", player, self.id);
        Ok(())
    }

    /// Freeze admission. The filling join may trigger this automatically;
    /// either way the minimum player count must already be met.
    pub(crate) fn start(&mut self) -> Result<()> {
        if self.status != GameStatus::Sale {
            return Err(GamePassError::invalid_state(format!(
                "Game {} cannot start from {}",
                self.id, self.status
            )));
        }
        if self.player_count < self.min_players {
            return Err(GamePassError::MinPlayersNotMet {
                need: self.min_players,
                have: self.player_count,
            });
        }

        self.status = GameStatus::Active;
        Ok(())
    }

    /// Flip to `Cancelled` and empty the pool. Returns the per-player
    /// refund list for the ledger to credit back.
    pub(crate) fn cancel(&mut self) -> Result<Vec<(Uuid, u64)>> {
        if self.status != GameStatus::Sale {
            return Err(GamePassError::invalid_state(format!(
                "Game {} cannot be cancelled from {}",
                self.id, self.status
            )));
        }

        let refunds = self
            .players
            .iter()
            .map(|player| (*player, self.entry_fee))
            .collect();

        self.pool = 0;
        self.status = GameStatus::Cancelled;
        Ok(refunds)
    }

    /// Record the settlement outcome. The ledger computes the fee split
    /// and credits the winner before calling this.
    pub(crate) fn finish(
        &mut self,
        winner: Uuid,
        result_hash: ResultHash,
        collected_fee: u64,
    ) -> Result<()> {
        if self.status != GameStatus::Active {
            return Err(GamePassError::invalid_state(format!(
                "Game {} is not active ({})",
                self.id, self.status
            )));
        }
        if !self.has_player(winner) {
            return Err(GamePassError::InvalidWinner);
        }

        self.winner = Some(winner);
        self.result_hash = Some(result_hash);
        self.collected_fee = collected_fee;
        self.pool = 0;
        self.status = GameStatus::Finished;
        Ok(())
    }
}
