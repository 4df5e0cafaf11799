use chrono::{DateTime, Utc};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use gamepass_core::{
    format_result_hash, parse_result_hash, GameLedger, GamePassError, Result, ResultHash,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum GameCommands {
    /// Create a new game (owner operation)
    Create {
        /// Minimum number of players
        min_players: u32,
        /// Maximum number of players
        max_players: u32,
        /// Entry fee per player in ledger units
        entry_fee: u64,
        /// Optional sale deadline (RFC 3339, e.g. 2026-09-01T12:00:00Z)
        #[arg(long)]
        deadline: Option<String>,
    },
    /// Join a game from an account
    Join {
        /// Account name to join from
        account: String,
        /// Game ID
        game_id: u64,
        /// Payment attached to the join (defaults to the entry fee)
        #[arg(long)]
        payment: Option<u64>,
    },
    /// Freeze admission and start a game
    Start {
        /// Game ID
        game_id: u64,
        /// Account acting as the caller (defaults to the owner)
        #[arg(long)]
        account: Option<String>,
    },
    /// Cancel a game and refund all joined players
    Cancel {
        /// Game ID
        game_id: u64,
        /// Account acting as the caller (defaults to the owner)
        #[arg(long)]
        account: Option<String>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Settle a game with a winner and result commitment
    Settle {
        /// Game ID
        game_id: u64,
        /// Winning account name
        winner: String,
        /// Account acting as the caller (defaults to the owner)
        #[arg(long)]
        account: Option<String>,
        /// Result commitment as 64 hex characters
        #[arg(long)]
        result_hash: Option<String>,
        /// Raw result string to hash into the commitment
        #[arg(long)]
        result: Option<String>,
    },
    /// Show one game
    Show {
        /// Game ID
        game_id: u64,
    },
    /// List all games
    List,
    /// Print emitted events as JSON lines
    Events,
}

pub async fn handle_game_command(cmd: GameCommands, ledger: &GameLedger) -> Result<()> {
    match cmd {
        GameCommands::Create {
            min_players,
            max_players,
            entry_fee,
            deadline,
        } => {
            let deadline = deadline.map(|raw| parse_deadline(&raw)).transpose()?;
            let owner = ledger.registry().owner();
            let id = ledger
                .create_game(owner, min_players, max_players, entry_fee, deadline)
                .await?;

            println!("Created game {}", id);
            println!("  Players: {}-{}", min_players, max_players);
            println!("  Entry fee: {} units", entry_fee);
        }

        GameCommands::Join {
            account,
            game_id,
            payment,
        } => {
            let caller = ledger.account(&account)?;
            let payment = match payment {
                Some(payment) => payment,
                None => ledger.game(game_id)?.entry_fee,
            };

            ledger.join_game(caller.id, game_id, payment).await?;

            let game = ledger.game(game_id)?;
            println!(
                "'{}' joined game {} ({}/{} players, {} in pool)",
                account, game_id, game.player_count, game.max_players, game.pool
            );
        }

        GameCommands::Start { game_id, account } => {
            let caller = resolve_caller(ledger, account.as_deref())?;
            ledger.start_game(caller, game_id).await?;
            println!("Game {} is now active", game_id);
        }

        GameCommands::Cancel {
            game_id,
            account,
            force,
        } => {
            if !force {
                let confirm = Confirm::new()
                    .with_prompt(format!(
                        "Cancel game {} and refund all joined players?",
                        game_id
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| GamePassError::internal(e.to_string()))?;

                if !confirm {
                    println!("Cancellation aborted.");
                    return Ok(());
                }
            }

            let caller = resolve_caller(ledger, account.as_deref())?;
            ledger.cancel_game(caller, game_id, Utc::now()).await?;
            println!("Game {} cancelled, entry fees refunded", game_id);
        }

        GameCommands::Settle {
            game_id,
            winner,
            account,
            result_hash,
            result,
        } => {
            let commitment = match (result_hash, result) {
                (Some(hex), _) => parse_result_hash(&hex)?,
                (None, Some(raw)) => hash_result(&raw),
                (None, None) => {
                    return Err(GamePassError::invalid_parameters(
                        "Provide either --result-hash or --result",
                    ))
                }
            };

            let caller = resolve_caller(ledger, account.as_deref())?;
            let winner_account = ledger.account(&winner)?;
            let settlement = ledger
                .settle_game(caller, game_id, winner_account.id, commitment)
                .await?;

            println!("Game {} settled", game_id);
            println!("  Winner: {} ({})", winner, settlement.winner);
            println!("  Payout: {} units", settlement.winner_payout);
            println!("  Platform fee: {} units", settlement.collected_fee);
            println!(
                "  Result hash: {}",
                format_result_hash(&settlement.result_hash)
            );
        }

        GameCommands::Show { game_id } => {
            let game = ledger.game(game_id)?;

            println!("Game {}:", game.id);
            println!("  Status: {}", game.status);
            println!("  Creator: {}", game.creator);
            println!(
                "  Players: {}/{} (min {})",
                game.player_count, game.max_players, game.min_players
            );
            println!("  Entry fee: {} units", game.entry_fee);
            println!("  Pool: {} units", game.pool);
            if let Some(deadline) = game.sale_deadline {
                println!("  Sale deadline: {}", deadline);
            }
            if let Some(winner) = game.winner {
                println!("  Winner: {}", winner);
                println!("  Collected fee: {} units", game.collected_fee);
            }
            if let Some(hash) = game.result_hash {
                println!("  Result hash: {}", format_result_hash(&hash));
            }
            if !game.players.is_empty() {
                println!("  Joined:");
                for player in &game.players {
                    println!("    {}", player);
                }
            }
        }

        GameCommands::List => {
            let games = ledger.list_games();

            if games.is_empty() {
                println!("No games yet.");
                println!("Create one with: gamepass game create <min> <max> <entry-fee>");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["ID", "Status", "Players", "Entry fee", "Pool", "Winner"]);

            for game in games {
                table.add_row(vec![
                    game.id.to_string(),
                    game.status.to_string(),
                    format!("{}/{}", game.player_count, game.max_players),
                    game.entry_fee.to_string(),
                    game.pool.to_string(),
                    game.winner
                        .map(|winner| winner.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ]);
            }

            println!("{}", table);
        }

        GameCommands::Events => {
            for event in ledger.events() {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
    }

    Ok(())
}

pub fn show_status(ledger: &GameLedger) -> Result<()> {
    let registry = ledger.registry();

    println!("Registry:");
    println!("  Owner: {}", registry.owner());
    match registry.oracle() {
        Some(oracle) => println!("  Oracle: {}", oracle),
        None => println!("  Oracle: (none)"),
    }
    println!("  Platform fee: {}%", registry.platform_fee_percentage());
    println!("  Games created: {}", registry.game_id_counter());
    println!("  Fees accrued: {} units", registry.fees_accrued());
    Ok(())
}

fn resolve_caller(ledger: &GameLedger, account: Option<&str>) -> Result<Uuid> {
    match account {
        Some(name) => Ok(ledger.account(name)?.id),
        None => Ok(ledger.registry().owner()),
    }
}

fn parse_deadline(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|deadline| deadline.with_timezone(&Utc))
        .map_err(|e| GamePassError::invalid_parameters(format!("Invalid deadline: {}", e)))
}

/// Hash a raw result string into the 32-byte commitment format.
fn hash_result(raw: &str) -> ResultHash {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher.finalize().into()
}
