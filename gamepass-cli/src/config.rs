use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fee applied when the ledger is initialized for the first time.
pub const DEFAULT_PLATFORM_FEE_PERCENTAGE: u8 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub platform_fee_percentage: u8,
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("gamepass"),
            platform_fee_percentage: DEFAULT_PLATFORM_FEE_PERCENTAGE,
            verbose: false,
        }
    }
}
