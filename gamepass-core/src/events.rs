use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{GameId, ResultHash};

/// Observability events emitted by the ledger, one per successful
/// operation. Write-only: nothing in the core reads them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    GameCreated {
        game_id: GameId,
        creator: Uuid,
        min_players: u32,
        max_players: u32,
        entry_fee: u64,
    },
    PlayerJoined {
        game_id: GameId,
        player: Uuid,
        pool: u64,
        player_count: u32,
    },
    GameStarted {
        game_id: GameId,
    },
    GameCancelled {
        game_id: GameId,
        refund_total: u64,
        players_refunded: u32,
    },
    GameSettled {
        game_id: GameId,
        winner: Uuid,
        payout: u64,
        fee: u64,
        result_hash: ResultHash,
    },
    AccountFunded {
        account: Uuid,
        balance: u64,
    },
}

/// Append-only in-memory event log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: RwLock<Vec<Event>>,
}

impl EventLog {
    pub fn emit(&self, event: Event) {
        self.events.write().push(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}
