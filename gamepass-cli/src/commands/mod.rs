pub mod account;
pub mod game;

pub use account::{handle_account_command, AccountCommands};
pub use game::{handle_game_command, show_status, GameCommands};
