//! GamePass - escrowed pooled-stake game ledger
//!
//! Players pay a fixed entry fee into a per-game pool during the sale
//! window; settlement pays the pool to a declared winner minus the
//! platform fee, cancellation refunds it. All transitions are role-gated,
//! atomic and irreversible.

pub mod accounts;
pub mod error;
pub mod events;
pub mod game;
pub mod ledger;
pub mod policy;
pub mod registry;
pub mod settlement;
pub mod storage;
pub mod types;

pub use accounts::Account;
pub use error::{GamePassError, Result};
pub use events::{Event, EventLog};
pub use game::Game;
pub use ledger::GameLedger;
pub use policy::{DefaultPolicy, LifecyclePolicy};
pub use registry::Registry;
pub use settlement::{split_pool, Settlement};
pub use types::{format_result_hash, parse_result_hash, GameId, GameStatus, ResultHash};
