use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::accounts::Account;
use crate::error::{GamePassError, Result};
use crate::events::{Event, EventLog};
use crate::game::Game;
use crate::policy::{DefaultPolicy, LifecyclePolicy};
use crate::registry::Registry;
use crate::settlement::{split_pool, Settlement};
use crate::storage::{AccountStore, GameStore, Storage};
use crate::types::{GameId, GameStatus, ResultHash};

/// Account created on first run to hold the owner identity.
const OWNER_ACCOUNT: &str = "owner";

/// The game ledger: registry, game records and accounts.
///
/// Every mutating operation runs to completion while holding `serial`,
/// and persists its full effect in one storage transaction before the
/// in-memory commit, so a failed operation leaves no partial state and
/// no moved funds. No operation ever addresses more than one game.
pub struct GameLedger {
    storage: Arc<Storage>,
    registry: RwLock<Registry>,
    games: RwLock<HashMap<GameId, Game>>,
    accounts: RwLock<HashMap<Uuid, Account>>,
    events: EventLog,
    policy: Box<dyn LifecyclePolicy>,
    serial: Mutex<()>,
}

impl GameLedger {
    /// Open the ledger at `data_dir` with the default lifecycle policy.
    ///
    /// On first run this creates the registry (and the owner account) with
    /// the given fee percentage; on later runs the persisted registry wins
    /// and `platform_fee_percentage` is ignored.
    pub async fn open(data_dir: &Path, platform_fee_percentage: u8) -> Result<Self> {
        Self::open_with_policy(data_dir, platform_fee_percentage, Box::new(DefaultPolicy)).await
    }

    pub async fn open_with_policy(
        data_dir: &Path,
        platform_fee_percentage: u8,
        policy: Box<dyn LifecyclePolicy>,
    ) -> Result<Self> {
        let db_path = data_dir.join("gamepass.db");
        let storage = Arc::new(Storage::new(&db_path).await?);

        let account_store = AccountStore::new(&storage);
        let mut accounts = HashMap::new();
        for account in account_store.list_accounts().await? {
            accounts.insert(account.id, account);
        }

        let game_store = GameStore::new(&storage);
        let registry = match game_store.load_registry().await? {
            Some(registry) => registry,
            None => {
                let owner = match accounts.values().find(|a| a.name == OWNER_ACCOUNT) {
                    Some(account) => account.id,
                    None => {
                        let account = Account::new(OWNER_ACCOUNT);
                        account_store.save_account(&account).await?;
                        let id = account.id;
                        accounts.insert(id, account);
                        id
                    }
                };

                let registry = Registry::new(owner, None, platform_fee_percentage)?;
                game_store.save_registry(&registry).await?;
                tracing::info!(
                    "Initialized registry (owner {}, fee {}%)",
                    owner,
                    platform_fee_percentage
                );
                registry
            }
        };

        let mut games = HashMap::new();
        for game in game_store.list_games().await? {
            games.insert(game.id, game);
        }

        tracing::info!(
            "Opened game ledger with {} games, {} accounts",
            games.len(),
            accounts.len()
        );

        Ok(Self {
            storage,
            registry: RwLock::new(registry),
            games: RwLock::new(games),
            accounts: RwLock::new(accounts),
            events: EventLog::default(),
            policy,
            serial: Mutex::new(()),
        })
    }

    // ---- game operations ----

    /// Create a new game in `Sale`. Owner only; no funds move. Returns the
    /// assigned id, which always precedes the post-increment counter.
    pub async fn create_game(
        &self,
        caller: Uuid,
        min_players: u32,
        max_players: u32,
        entry_fee: u64,
        sale_deadline: Option<DateTime<Utc>>,
    ) -> Result<GameId> {
        let _serial = self.serial.lock().await;

        let mut registry = self.registry.read().clone();
        if !registry.is_owner(caller) {
            return Err(GamePassError::Unauthorized);
        }

        let id = registry.allocate_game_id();
        let game = Game::new(id, caller, min_players, max_players, entry_fee, sale_deadline)?;

        GameStore::new(&self.storage)
            .commit_operation(&game, Some(&registry), &[])
            .await?;

        *self.registry.write() = registry;
        self.games.write().insert(id, game);

        self.events.emit(Event::GameCreated {
            game_id: id,
            creator: caller,
            min_players,
            max_players,
            entry_fee,
        });
        tracing::info!(
            "Created game {} (players {}-{}, entry fee {})",
            id,
            min_players,
            max_players,
            entry_fee
        );
        Ok(id)
    }

    /// Join a `Sale` game, paying exactly the entry fee from the caller's
    /// account. The join that fills the last seat may start the game
    /// immediately, depending on the policy.
    pub async fn join_game(&self, caller: Uuid, id: GameId, payment: u64) -> Result<()> {
        let _serial = self.serial.lock().await;

        let mut game = self.get_game(id)?;
        let mut account = self
            .accounts
            .read()
            .get(&caller)
            .cloned()
            .ok_or_else(|| GamePassError::AccountNotFound(caller.to_string()))?;

        game.admit(caller, payment)?;
        account.debit(payment)?;

        let auto_started = self.policy.auto_start_on_full() && game.is_full();
        if auto_started {
            game.start()?;
        }

        GameStore::new(&self.storage)
            .commit_operation(&game, None, &[&account])
            .await?;

        let pool = game.pool;
        let player_count = game.player_count;
        self.games.write().insert(id, game);
        self.accounts.write().insert(caller, account);

        self.events.emit(Event::PlayerJoined {
            game_id: id,
            player: caller,
            pool,
            player_count,
        });
        tracing::info!("Player {} joined game {} ({} in pool)", caller, id, pool);

        if auto_started {
            self.events.emit(Event::GameStarted { game_id: id });
            tracing::info!("Game {} filled and started", id);
        }
        Ok(())
    }

    /// Freeze admission on a `Sale` game. Gated by the lifecycle policy
    /// (owner or creator under the default policy).
    pub async fn start_game(&self, caller: Uuid, id: GameId) -> Result<()> {
        let _serial = self.serial.lock().await;

        let mut game = self.get_game(id)?;
        if game.status != GameStatus::Sale {
            return Err(GamePassError::invalid_state(format!(
                "Game {} is not in sale ({})",
                id, game.status
            )));
        }

        let registry = self.registry.read().clone();
        if !self.policy.may_start(&registry, &game, caller) {
            return Err(GamePassError::Unauthorized);
        }

        game.start()?;

        GameStore::new(&self.storage)
            .commit_operation(&game, None, &[])
            .await?;

        self.games.write().insert(id, game);
        self.events.emit(Event::GameStarted { game_id: id });
        tracing::info!("Game {} started by {}", id, caller);
        Ok(())
    }

    /// Cancel a `Sale` game and refund every joined player exactly the
    /// entry fee. `now` comes from the caller; the ledger keeps no clock
    /// of its own.
    pub async fn cancel_game(&self, caller: Uuid, id: GameId, now: DateTime<Utc>) -> Result<()> {
        let _serial = self.serial.lock().await;

        let mut game = self.get_game(id)?;
        if game.status != GameStatus::Sale {
            return Err(GamePassError::invalid_state(format!(
                "Game {} is not in sale ({})",
                id, game.status
            )));
        }

        let registry = self.registry.read().clone();
        if !self.policy.may_cancel(&registry, &game, caller, now) {
            return Err(GamePassError::Unauthorized);
        }

        let refund_total = game.pool;
        let refunds = game.cancel()?;

        let mut refunded: Vec<Account> = Vec::with_capacity(refunds.len());
        {
            let accounts = self.accounts.read();
            for (player, amount) in &refunds {
                let mut account = accounts.get(player).cloned().ok_or_else(|| {
                    GamePassError::payout_failed(format!(
                        "Refund destination {} does not exist",
                        player
                    ))
                })?;
                account.credit(*amount)?;
                refunded.push(account);
            }
        }

        let account_refs: Vec<&Account> = refunded.iter().collect();
        GameStore::new(&self.storage)
            .commit_operation(&game, None, &account_refs)
            .await?;

        self.games.write().insert(id, game);
        {
            let mut accounts = self.accounts.write();
            for account in refunded {
                accounts.insert(account.id, account);
            }
        }

        self.events.emit(Event::GameCancelled {
            game_id: id,
            refund_total,
            players_refunded: refunds.len() as u32,
        });
        tracing::info!(
            "Game {} cancelled, {} refunded across {} players",
            id,
            refund_total,
            refunds.len()
        );
        Ok(())
    }

    /// Settle an `Active` game: atomically compute the fee split, credit
    /// the winner, accrue the fee and finish the game. A failed payout
    /// leaves the game `Active` with the pool intact, so the settlement
    /// can be retried with a corrected target.
    pub async fn settle_game(
        &self,
        caller: Uuid,
        id: GameId,
        winner: Uuid,
        result_hash: ResultHash,
    ) -> Result<Settlement> {
        let _serial = self.serial.lock().await;

        let mut registry = self.registry.read().clone();
        if !registry.may_settle(caller) {
            return Err(GamePassError::Unauthorized);
        }

        let mut game = self.get_game(id)?;
        if game.status != GameStatus::Active {
            return Err(GamePassError::invalid_state(format!(
                "Game {} is not active ({})",
                id, game.status
            )));
        }
        if !game.has_player(winner) {
            return Err(GamePassError::InvalidWinner);
        }

        let (collected_fee, winner_payout) =
            split_pool(game.pool, registry.platform_fee_percentage());

        // The payout destination must accept funds before anything is
        // recorded.
        let mut winner_account = self
            .accounts
            .read()
            .get(&winner)
            .cloned()
            .ok_or_else(|| {
                GamePassError::payout_failed(format!("Winner account {} does not exist", winner))
            })?;
        winner_account.credit(winner_payout)?;
        registry.accrue_fee(collected_fee);
        game.finish(winner, result_hash, collected_fee)?;

        GameStore::new(&self.storage)
            .commit_operation(&game, Some(&registry), &[&winner_account])
            .await?;

        *self.registry.write() = registry;
        self.games.write().insert(id, game);
        self.accounts.write().insert(winner, winner_account);

        self.events.emit(Event::GameSettled {
            game_id: id,
            winner,
            payout: winner_payout,
            fee: collected_fee,
            result_hash,
        });
        tracing::info!(
            "Game {} settled: winner {} paid {} (fee {})",
            id,
            winner,
            winner_payout,
            collected_fee
        );

        Ok(Settlement {
            game_id: id,
            winner,
            winner_payout,
            collected_fee,
            result_hash,
        })
    }

    // ---- reads ----

    /// Full snapshot of one game.
    pub fn game(&self, id: GameId) -> Result<Game> {
        self.get_game(id)
    }

    pub fn list_games(&self) -> Vec<Game> {
        let mut games: Vec<Game> = self.games.read().values().cloned().collect();
        games.sort_by_key(|game| game.id);
        games
    }

    pub fn registry(&self) -> Registry {
        self.registry.read().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.snapshot()
    }

    fn get_game(&self, id: GameId) -> Result<Game> {
        self.games
            .read()
            .get(&id)
            .cloned()
            .ok_or(GamePassError::NotFound(id))
    }

    // ---- accounts ----

    /// Create a named account with zero balance.
    pub async fn create_account(&self, name: &str) -> Result<Account> {
        let _serial = self.serial.lock().await;

        {
            let accounts = self.accounts.read();
            if accounts.values().any(|a| a.name == name) {
                return Err(GamePassError::AccountExists(name.to_string()));
            }
        }

        let account = Account::new(name);
        AccountStore::new(&self.storage).save_account(&account).await?;
        self.accounts.write().insert(account.id, account.clone());

        tracing::info!("Created account '{}' with ID: {}", name, account.id);
        Ok(account)
    }

    /// Set an account balance outright. Owner only; this is the
    /// development funding helper, not a transfer.
    pub async fn fund_account(&self, caller: Uuid, name: &str, balance: u64) -> Result<Account> {
        let _serial = self.serial.lock().await;

        if !self.registry.read().is_owner(caller) {
            return Err(GamePassError::Unauthorized);
        }

        let mut account = self.account_by_name(name)?;
        account.balance = balance;

        AccountStore::new(&self.storage).save_account(&account).await?;
        self.accounts.write().insert(account.id, account.clone());

        self.events.emit(Event::AccountFunded {
            account: account.id,
            balance,
        });
        tracing::info!("Funded account '{}' to {}", name, balance);
        Ok(account)
    }

    /// Remove an empty account. Owner only; a closed account can no
    /// longer receive payouts.
    pub async fn close_account(&self, caller: Uuid, name: &str) -> Result<()> {
        let _serial = self.serial.lock().await;

        if !self.registry.read().is_owner(caller) {
            return Err(GamePassError::Unauthorized);
        }

        let account = self.account_by_name(name)?;
        if self.registry.read().is_owner(account.id) {
            return Err(GamePassError::invalid_parameters(
                "Cannot close the owner account",
            ));
        }
        if account.balance != 0 {
            return Err(GamePassError::invalid_parameters(format!(
                "Account '{}' still holds {} units",
                name, account.balance
            )));
        }

        AccountStore::new(&self.storage).delete_account(account.id).await?;
        self.accounts.write().remove(&account.id);

        tracing::info!("Closed account '{}'", name);
        Ok(())
    }

    /// Authorize an additional identity to submit settlement results.
    pub async fn designate_oracle(&self, caller: Uuid, oracle: Uuid) -> Result<()> {
        let _serial = self.serial.lock().await;

        let mut registry = self.registry.read().clone();
        if !registry.is_owner(caller) {
            return Err(GamePassError::Unauthorized);
        }

        registry.set_oracle(Some(oracle));
        GameStore::new(&self.storage).save_registry(&registry).await?;
        *self.registry.write() = registry;

        tracing::info!("Oracle set to {}", oracle);
        Ok(())
    }

    pub fn account(&self, name: &str) -> Result<Account> {
        self.account_by_name(name)
    }

    pub fn account_by_id(&self, id: Uuid) -> Result<Account> {
        self.accounts
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| GamePassError::AccountNotFound(id.to_string()))
    }

    pub fn list_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.accounts.read().values().cloned().collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        accounts
    }

    fn account_by_name(&self, name: &str) -> Result<Account> {
        self.accounts
            .read()
            .values()
            .find(|a| a.name == name)
            .cloned()
            .ok_or_else(|| GamePassError::AccountNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    async fn ledger_with_players(
        fee_percentage: u8,
        balances: &[(&str, u64)],
    ) -> (tempfile::TempDir, GameLedger, Vec<Uuid>) {
        let temp_dir = tempdir().unwrap();
        let ledger = GameLedger::open(temp_dir.path(), fee_percentage).await.unwrap();
        let owner = ledger.registry().owner();

        let mut ids = Vec::new();
        for (name, balance) in balances {
            let account = ledger.create_account(name).await.unwrap();
            ledger.fund_account(owner, name, *balance).await.unwrap();
            ids.push(account.id);
        }
        (temp_dir, ledger, ids)
    }

    /// Sum of every balance, open pool and accrued fee. Constant across
    /// all operations except funding.
    fn total_funds(ledger: &GameLedger) -> u64 {
        let balances: u64 = ledger.list_accounts().iter().map(|a| a.balance).sum();
        let pools: u64 = ledger.list_games().iter().map(|g| g.pool).sum();
        balances + pools + ledger.registry().fees_accrued()
    }

    #[tokio::test]
    async fn test_create_game_assigns_pre_increment_id() {
        let temp_dir = tempdir().unwrap();
        let ledger = GameLedger::open(temp_dir.path(), 5).await.unwrap();
        let owner = ledger.registry().owner();

        let counter_before = ledger.registry().game_id_counter();
        let id = ledger.create_game(owner, 2, 5, 10, None).await.unwrap();

        assert_eq!(id, counter_before);
        assert_eq!(ledger.registry().game_id_counter(), counter_before + 1);

        let game = ledger.game(id).unwrap();
        assert_eq!(game.creator, owner);
        assert_eq!(game.min_players, 2);
        assert_eq!(game.max_players, 5);
        assert_eq!(game.entry_fee, 10);
        assert_eq!(game.pool, 0);
        assert_eq!(game.status, GameStatus::Sale);
        assert_eq!(game.player_count, 0);
        assert_eq!(game.winner, None);
        assert_eq!(game.result_hash, None);
        assert_eq!(game.collected_fee, 0);
    }

    #[tokio::test]
    async fn test_create_game_requires_owner() {
        let (_dir, ledger, ids) = ledger_with_players(5, &[("alice", 100)]).await;

        let err = ledger.create_game(ids[0], 2, 5, 10, None).await.unwrap_err();
        assert!(matches!(err, GamePassError::Unauthorized));
        assert_eq!(ledger.registry().game_id_counter(), 0);
    }

    #[tokio::test]
    async fn test_create_game_rejects_bad_bounds_without_burning_id() {
        let temp_dir = tempdir().unwrap();
        let ledger = GameLedger::open(temp_dir.path(), 5).await.unwrap();
        let owner = ledger.registry().owner();

        assert!(ledger.create_game(owner, 0, 5, 10, None).await.is_err());
        assert!(ledger.create_game(owner, 5, 2, 10, None).await.is_err());
        assert_eq!(ledger.registry().game_id_counter(), 0);
    }

    #[tokio::test]
    async fn test_two_joins_then_settle() {
        let (_dir, ledger, ids) =
            ledger_with_players(10, &[("alice", 100), ("bob", 100)]).await;
        let owner = ledger.registry().owner();
        let before = total_funds(&ledger);

        let id = ledger.create_game(owner, 2, 5, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();
        ledger.join_game(ids[1], id, 10).await.unwrap();

        let game = ledger.game(id).unwrap();
        assert_eq!(game.pool, 20);
        assert_eq!(game.player_count, 2);
        assert_eq!(ledger.account("alice").unwrap().balance, 90);

        ledger.start_game(owner, id).await.unwrap();
        let settlement = ledger
            .settle_game(owner, id, ids[0], [7u8; 32])
            .await
            .unwrap();

        assert_eq!(settlement.collected_fee, 2);
        assert_eq!(settlement.winner_payout, 18);

        let game = ledger.game(id).unwrap();
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.winner, Some(ids[0]));
        assert_eq!(game.result_hash, Some([7u8; 32]));
        assert_eq!(game.pool, 0);
        assert_eq!(game.collected_fee, 2);

        assert_eq!(ledger.account("alice").unwrap().balance, 108);
        assert_eq!(ledger.account("bob").unwrap().balance, 90);
        assert_eq!(ledger.registry().fees_accrued(), 2);
        assert_eq!(total_funds(&ledger), before);
    }

    #[tokio::test]
    async fn test_settle_during_sale_rejected() {
        let (_dir, ledger, ids) = ledger_with_players(10, &[("alice", 100)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 2, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();

        let err = ledger
            .settle_game(owner, id, ids[0], [0u8; 32])
            .await
            .unwrap_err();
        assert!(matches!(err, GamePassError::InvalidState(_)));
        assert_eq!(ledger.game(id).unwrap().status, GameStatus::Sale);
    }

    #[tokio::test]
    async fn test_double_join_leaves_state_unchanged() {
        let (_dir, ledger, ids) = ledger_with_players(10, &[("alice", 100)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 5, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();

        let err = ledger.join_game(ids[0], id, 10).await.unwrap_err();
        assert!(matches!(err, GamePassError::AlreadyJoined));

        let game = ledger.game(id).unwrap();
        assert_eq!(game.pool, 10);
        assert_eq!(game.player_count, 1);
        assert_eq!(ledger.account("alice").unwrap().balance, 90);
    }

    #[tokio::test]
    async fn test_wrong_payment_moves_no_funds() {
        let (_dir, ledger, ids) = ledger_with_players(10, &[("alice", 100)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 5, 10, None).await.unwrap();
        let err = ledger.join_game(ids[0], id, 9).await.unwrap_err();
        assert!(matches!(
            err,
            GamePassError::InvalidPayment {
                expected: 10,
                got: 9
            }
        ));

        assert_eq!(ledger.game(id).unwrap().pool, 0);
        assert_eq!(ledger.account("alice").unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_underfunded_join_rejected() {
        let (_dir, ledger, ids) = ledger_with_players(10, &[("alice", 5)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 5, 10, None).await.unwrap();
        let err = ledger.join_game(ids[0], id, 10).await.unwrap_err();
        assert!(matches!(err, GamePassError::InsufficientFunds { .. }));

        assert_eq!(ledger.game(id).unwrap().pool, 0);
        assert_eq!(ledger.account("alice").unwrap().balance, 5);
    }

    #[tokio::test]
    async fn test_filling_join_auto_starts() {
        let (_dir, ledger, ids) =
            ledger_with_players(10, &[("alice", 100), ("bob", 100), ("carol", 100)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 2, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();
        assert_eq!(ledger.game(id).unwrap().status, GameStatus::Sale);

        ledger.join_game(ids[1], id, 10).await.unwrap();
        assert_eq!(ledger.game(id).unwrap().status, GameStatus::Active);

        // a third join hits the frozen game, not the capacity check
        let err = ledger.join_game(ids[2], id, 10).await.unwrap_err();
        assert!(matches!(err, GamePassError::InvalidState(_)));
    }

    struct ManualStartPolicy;

    impl LifecyclePolicy for ManualStartPolicy {
        fn may_start(&self, registry: &Registry, game: &Game, caller: Uuid) -> bool {
            registry.is_owner(caller) || caller == game.creator
        }

        fn may_cancel(
            &self,
            registry: &Registry,
            game: &Game,
            caller: Uuid,
            _now: DateTime<Utc>,
        ) -> bool {
            registry.is_owner(caller) || caller == game.creator
        }

        fn auto_start_on_full(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_full_game_rejects_join_under_manual_start() {
        let temp_dir = tempdir().unwrap();
        let ledger =
            GameLedger::open_with_policy(temp_dir.path(), 10, Box::new(ManualStartPolicy))
                .await
                .unwrap();
        let owner = ledger.registry().owner();

        let mut ids = Vec::new();
        for name in ["alice", "bob", "carol"] {
            let account = ledger.create_account(name).await.unwrap();
            ledger.fund_account(owner, name, 100).await.unwrap();
            ids.push(account.id);
        }

        let id = ledger.create_game(owner, 1, 2, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();
        ledger.join_game(ids[1], id, 10).await.unwrap();
        assert_eq!(ledger.game(id).unwrap().status, GameStatus::Sale);

        let err = ledger.join_game(ids[2], id, 10).await.unwrap_err();
        assert!(matches!(err, GamePassError::GameFull));

        let game = ledger.game(id).unwrap();
        assert_eq!(game.pool, 20);
        assert_eq!(game.player_count, 2);
    }

    #[tokio::test]
    async fn test_cancel_refunds_pool_exactly() {
        let (_dir, ledger, ids) =
            ledger_with_players(10, &[("alice", 100), ("bob", 100)]).await;
        let owner = ledger.registry().owner();
        let before = total_funds(&ledger);

        let id = ledger.create_game(owner, 3, 5, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();
        ledger.join_game(ids[1], id, 10).await.unwrap();

        ledger.cancel_game(owner, id, Utc::now()).await.unwrap();

        let game = ledger.game(id).unwrap();
        assert_eq!(game.status, GameStatus::Cancelled);
        assert_eq!(game.pool, 0);
        assert_eq!(game.collected_fee, 0);
        assert_eq!(ledger.account("alice").unwrap().balance, 100);
        assert_eq!(ledger.account("bob").unwrap().balance, 100);
        assert_eq!(total_funds(&ledger), before);

        // terminal for good
        let err = ledger.cancel_game(owner, id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, GamePassError::InvalidState(_)));
        let err = ledger
            .settle_game(owner, id, ids[0], [0u8; 32])
            .await
            .unwrap_err();
        assert!(matches!(err, GamePassError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_expiry_cancel_by_anyone_after_deadline() {
        let (_dir, ledger, ids) =
            ledger_with_players(10, &[("alice", 100), ("bob", 100)]).await;
        let owner = ledger.registry().owner();
        let deadline = Utc::now();

        let id = ledger
            .create_game(owner, 2, 5, 10, Some(deadline))
            .await
            .unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();

        // before the deadline a stranger cannot cancel
        let err = ledger
            .cancel_game(ids[1], id, deadline - Duration::minutes(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GamePassError::Unauthorized));

        // after it, with the minimum unmet, anyone can
        ledger
            .cancel_game(ids[1], id, deadline + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(ledger.game(id).unwrap().status, GameStatus::Cancelled);
        assert_eq!(ledger.account("alice").unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_settle_requires_owner_or_oracle() {
        let (_dir, ledger, ids) =
            ledger_with_players(10, &[("alice", 100), ("bob", 100)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 2, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();
        ledger.join_game(ids[1], id, 10).await.unwrap();

        let err = ledger
            .settle_game(ids[0], id, ids[0], [0u8; 32])
            .await
            .unwrap_err();
        assert!(matches!(err, GamePassError::Unauthorized));

        ledger.designate_oracle(owner, ids[1]).await.unwrap();
        ledger
            .settle_game(ids[1], id, ids[0], [0u8; 32])
            .await
            .unwrap();
        assert_eq!(ledger.game(id).unwrap().status, GameStatus::Finished);
    }

    #[tokio::test]
    async fn test_settle_rejects_winner_who_never_joined() {
        let (_dir, ledger, ids) =
            ledger_with_players(10, &[("alice", 100), ("bob", 100), ("carol", 100)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 2, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();
        ledger.join_game(ids[1], id, 10).await.unwrap();

        let err = ledger
            .settle_game(owner, id, ids[2], [0u8; 32])
            .await
            .unwrap_err();
        assert!(matches!(err, GamePassError::InvalidWinner));
        assert_eq!(ledger.game(id).unwrap().pool, 20);
    }

    #[tokio::test]
    async fn test_failed_payout_leaves_game_settleable() {
        let (_dir, ledger, ids) =
            ledger_with_players(10, &[("alice", 100), ("bob", 10)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 2, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();
        ledger.join_game(ids[1], id, 10).await.unwrap();

        // bob's account is emptied by the join, so it can be closed out
        // from under the pending settlement
        ledger.close_account(owner, "bob").await.unwrap();

        let err = ledger
            .settle_game(owner, id, ids[1], [0u8; 32])
            .await
            .unwrap_err();
        assert!(matches!(err, GamePassError::PayoutFailed(_)));

        // nothing was recorded: still active, pool intact, no fee accrued
        let game = ledger.game(id).unwrap();
        assert_eq!(game.status, GameStatus::Active);
        assert_eq!(game.pool, 20);
        assert_eq!(game.winner, None);
        assert_eq!(ledger.registry().fees_accrued(), 0);

        // retry with a reachable winner succeeds
        ledger
            .settle_game(owner, id, ids[0], [0u8; 32])
            .await
            .unwrap();
        assert_eq!(ledger.game(id).unwrap().status, GameStatus::Finished);
    }

    #[tokio::test]
    async fn test_zero_entry_fee_game() {
        let (_dir, ledger, ids) =
            ledger_with_players(10, &[("alice", 0), ("bob", 0)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 2, 0, None).await.unwrap();
        ledger.join_game(ids[0], id, 0).await.unwrap();
        ledger.join_game(ids[1], id, 0).await.unwrap();

        let settlement = ledger
            .settle_game(owner, id, ids[0], [0u8; 32])
            .await
            .unwrap();
        assert_eq!(settlement.collected_fee, 0);
        assert_eq!(settlement.winner_payout, 0);
    }

    #[tokio::test]
    async fn test_unknown_game_is_not_found() {
        let (_dir, ledger, ids) = ledger_with_players(10, &[("alice", 100)]).await;
        let owner = ledger.registry().owner();

        assert!(matches!(ledger.game(42), Err(GamePassError::NotFound(42))));
        let err = ledger.join_game(ids[0], 42, 10).await.unwrap_err();
        assert!(matches!(err, GamePassError::NotFound(42)));
        let err = ledger.start_game(owner, 42).await.unwrap_err();
        assert!(matches!(err, GamePassError::NotFound(42)));
    }

    #[tokio::test]
    async fn test_events_trace_the_lifecycle() {
        let (_dir, ledger, ids) =
            ledger_with_players(10, &[("alice", 100), ("bob", 100)]).await;
        let owner = ledger.registry().owner();

        let id = ledger.create_game(owner, 2, 2, 10, None).await.unwrap();
        ledger.join_game(ids[0], id, 10).await.unwrap();
        ledger.join_game(ids[1], id, 10).await.unwrap();
        ledger
            .settle_game(owner, id, ids[1], [9u8; 32])
            .await
            .unwrap();

        let events = ledger.events();
        // two fundings, creation, two joins, auto-start, settlement
        assert_eq!(events.len(), 7);
        assert!(matches!(events[2], Event::GameCreated { game_id, .. } if game_id == id));
        assert!(matches!(
            events[6],
            Event::GameSettled { winner, payout: 18, fee: 2, .. } if winner == ids[1]
        ));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        let alice;
        let game_id;
        {
            let ledger = GameLedger::open(temp_dir.path(), 10).await.unwrap();
            let owner = ledger.registry().owner();
            alice = ledger.create_account("alice").await.unwrap().id;
            ledger.fund_account(owner, "alice", 100).await.unwrap();
            game_id = ledger.create_game(owner, 2, 5, 10, None).await.unwrap();
            ledger.join_game(alice, game_id, 10).await.unwrap();
        }

        // the fee argument is ignored once the registry exists
        let ledger = GameLedger::open(temp_dir.path(), 99).await.unwrap();
        let registry = ledger.registry();
        assert_eq!(registry.platform_fee_percentage(), 10);
        assert_eq!(registry.game_id_counter(), game_id + 1);

        let game = ledger.game(game_id).unwrap();
        assert_eq!(game.pool, 10);
        assert_eq!(game.players, vec![alice]);
        assert_eq!(ledger.account("alice").unwrap().balance, 90);
    }

    #[tokio::test]
    async fn test_fund_and_close_are_owner_gated() {
        let (_dir, ledger, ids) = ledger_with_players(10, &[("alice", 100)]).await;

        let err = ledger.fund_account(ids[0], "alice", 1).await.unwrap_err();
        assert!(matches!(err, GamePassError::Unauthorized));
        let err = ledger.close_account(ids[0], "alice").await.unwrap_err();
        assert!(matches!(err, GamePassError::Unauthorized));

        let owner = ledger.registry().owner();
        let err = ledger.close_account(owner, "alice").await.unwrap_err();
        assert!(matches!(err, GamePassError::InvalidParameters(_)));
        let err = ledger.close_account(owner, "owner").await.unwrap_err();
        assert!(matches!(err, GamePassError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_duplicate_account_name_rejected() {
        let (_dir, ledger, _) = ledger_with_players(10, &[("alice", 100)]).await;

        let err = ledger.create_account("alice").await.unwrap_err();
        assert!(matches!(err, GamePassError::AccountExists(_)));
    }
}
