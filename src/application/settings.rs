//! Tunables of the economy shared by every tenant.

use serde::Deserialize;

/// Economy settings, read from the `[ledger]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EconomySettings {
    /// Most items (summed over every kind) one user may hold.
    #[serde(default = "default_inventory_capacity")]
    pub inventory_capacity: i64,
    /// Points kept per asset in the recent-price window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

fn default_inventory_capacity() -> i64 {
    5
}

fn default_window_size() -> usize {
    60
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            inventory_capacity: default_inventory_capacity(),
            window_size: default_window_size(),
        }
    }
}
