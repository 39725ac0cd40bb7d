//! Engine settings resolved from configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::calculation::IndexScope;
use crate::domain::recent_cache::DEFAULT_TTL;
use crate::domain::stock_catalog::DEFAULT_CATALOG_CAPACITY;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub ttl: Duration,
    /// `None` leaves expiry to lazy checks on access.
    pub sweep_interval: Option<Duration>,
    pub catalog_capacity: usize,
    /// `None` uses the built-in instrument table.
    pub instruments_file: Option<PathBuf>,
    pub index_scope: IndexScope,
    pub log_level: String,
    pub log_ansi: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            ttl: DEFAULT_TTL,
            sweep_interval: None,
            catalog_capacity: DEFAULT_CATALOG_CAPACITY,
            instruments_file: None,
            index_scope: IndexScope::Ledger,
            log_level: "info".to_string(),
            log_ansi: true,
        }
    }
}
