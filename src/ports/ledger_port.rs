//! Ports between the recent-trade cache and the trade ledger.

use std::sync::Arc;

use crate::domain::error::GbceError;
use crate::domain::trade::Trade;

/// Computes a symbol's bucket on a cache miss.
pub trait TradeLoader: Send + Sync {
    fn load_recent(&self, symbol: &str) -> Result<Vec<Arc<Trade>>, GbceError>;
}

/// Receives each evicted bucket exactly once.
///
/// Called with the cache lock held: implementations must not call back into
/// the cache.
pub trait EvictionObserver: Send + Sync {
    fn on_evict(&self, symbol: &str, trades: &[Arc<Trade>]) -> Result<(), GbceError>;
}
