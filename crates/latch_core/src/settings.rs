//! Pool settings

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sizing knobs for the three pool variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Rows reserved up front by a dense pool.
    pub dense_initial_capacity: usize,
    /// Slots per sparse page. Must be a non-zero power of two.
    pub sparse_rows_per_page: usize,
    /// Entity population a saturated pool is sized for.
    pub saturated_population: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("sparse_rows_per_page must be a non-zero power of two (got {0})")]
    RowsPerPage(usize),
}

impl PoolSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.sparse_rows_per_page.is_power_of_two() {
            return Err(SettingsError::RowsPerPage(self.sparse_rows_per_page));
        }
        Ok(())
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            dense_initial_capacity: 1024,
            sparse_rows_per_page: 256,
            saturated_population: 4096,
        }
    }
}
