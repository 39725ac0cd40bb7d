//! Instrument reference-data port.

use crate::domain::error::GbceError;
use crate::domain::instrument::Instrument;

/// Authoritative source of instrument rows, queried on catalog cache misses.
pub trait InstrumentSource: Send + Sync {
    /// Fails with `GbceError::NotFound` when no row matches `symbol`.
    /// `symbol` is already trimmed and upper-cased.
    fn load_by_symbol(&self, symbol: &str) -> Result<Instrument, GbceError>;

    fn list_symbols(&self) -> Result<Vec<String>, GbceError>;
}
