use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Starting balance of bootstrap balance records.
pub const DEFAULT_BOOTSTRAP_BALANCE: Amount = 1_000;

/// Tunables of the transition functions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    pub bootstrap_balance: Amount,
    /// Keep `Mint::supply` up to date on every mint-to.
    pub track_supply: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            bootstrap_balance: DEFAULT_BOOTSTRAP_BALANCE,
            track_supply: true,
        }
    }
}
