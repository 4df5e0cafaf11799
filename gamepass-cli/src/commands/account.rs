use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use gamepass_core::{GameLedger, GamePassError, Result};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account name
        name: String,
    },
    /// Set an account balance (owner operation)
    Fund {
        /// Account name
        name: String,
        /// New balance in ledger units
        amount: u64,
    },
    /// Show an account balance
    Balance {
        /// Account name
        name: String,
    },
    /// Designate an account as the settlement oracle (owner operation)
    Oracle {
        /// Account name
        name: String,
    },
    /// Close an empty account (owner operation)
    Close {
        /// Account name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// List all accounts
    List,
}

pub async fn handle_account_command(cmd: AccountCommands, ledger: &GameLedger) -> Result<()> {
    match cmd {
        AccountCommands::Create { name } => {
            let account = ledger.create_account(&name).await?;

            println!("Account created!");
            println!("  Name: {}", account.name);
            println!("  ID: {}", account.id);
        }

        AccountCommands::Fund { name, amount } => {
            let owner = ledger.registry().owner();
            let account = ledger.fund_account(owner, &name, amount).await?;
            println!("Account '{}' funded to {} units", name, account.balance);
        }

        AccountCommands::Balance { name } => {
            let account = ledger.account(&name)?;
            println!("Balance of '{}': {} units", name, account.balance);
        }

        AccountCommands::Oracle { name } => {
            let owner = ledger.registry().owner();
            let account = ledger.account(&name)?;
            ledger.designate_oracle(owner, account.id).await?;
            println!("Account '{}' may now settle games", name);
        }

        AccountCommands::Close { name, force } => {
            if !force {
                let confirm = Confirm::new()
                    .with_prompt(format!(
                        "Close account '{}'? This action cannot be undone.",
                        name
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| GamePassError::internal(e.to_string()))?;

                if !confirm {
                    println!("Close cancelled.");
                    return Ok(());
                }
            }

            let owner = ledger.registry().owner();
            ledger.close_account(owner, &name).await?;
            println!("Account '{}' closed.", name);
        }

        AccountCommands::List => {
            let accounts = ledger.list_accounts();

            if accounts.is_empty() {
                println!("No accounts found.");
                println!("Create one with: gamepass account create <name>");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Name", "ID", "Balance"]);

            for account in accounts {
                table.add_row(vec![
                    account.name.clone(),
                    account.id.to_string(),
                    account.balance.to_string(),
                ]);
            }

            println!("{}", table);
        }
    }

    Ok(())
}
