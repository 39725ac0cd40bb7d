//! Append-only trade ledger.
//!
//! Holds every trade ever recorded. Entries are never removed; eviction from
//! the recent-trade cache only flips their aged-out flag.

use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::Arc;
use tracing::info;

use crate::domain::error::GbceError;
use crate::domain::trade::Trade;
use crate::ports::ledger_port::{EvictionObserver, TradeLoader};

#[derive(Default)]
pub struct TradeLedger {
    trades: RwLock<Vec<Arc<Trade>>>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write access for callers that must publish a trade together with
    /// another structure. Readers are blocked until the guard drops.
    pub(crate) fn writer(&self) -> RwLockWriteGuard<'_, Vec<Arc<Trade>>> {
        self.trades.write()
    }

    /// Non-aged-out trades for `symbol`, in record order.
    pub fn for_symbol(&self, symbol: &str) -> Vec<Arc<Trade>> {
        self.trades
            .read()
            .iter()
            .filter(|t| t.symbol() == symbol && !t.is_aged_out())
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<Trade>> {
        self.trades.read().clone()
    }

    pub fn len(&self) -> usize {
        self.trades.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.read().is_empty()
    }
}

impl TradeLoader for TradeLedger {
    fn load_recent(&self, symbol: &str) -> Result<Vec<Arc<Trade>>, GbceError> {
        Ok(self.for_symbol(symbol))
    }
}

impl EvictionObserver for TradeLedger {
    fn on_evict(&self, symbol: &str, trades: &[Arc<Trade>]) -> Result<(), GbceError> {
        let newly_aged = trades.iter().filter(|t| t.mark_aged_out()).count();
        info!(
            symbol,
            evicted = trades.len(),
            newly_aged,
            "recent trades aged out"
        );
        Ok(())
    }
}
