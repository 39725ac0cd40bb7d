//! Trade store: the ledger plus its recent-trade cache.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::domain::error::GbceError;
use crate::domain::recent_cache::RecentTradeCache;
use crate::domain::trade::{normalize_symbol, NewTrade, Trade, TradeId};
use crate::domain::trade_ledger::TradeLedger;
use crate::ports::clock_port::{Clock, SystemClock};

pub struct TradeStore {
    ledger: Arc<TradeLedger>,
    cache: Arc<RecentTradeCache>,
}

impl TradeStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// The ledger is both the cache's loader and its eviction observer.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let ledger = Arc::new(TradeLedger::new());
        let cache = Arc::new(RecentTradeCache::with_clock(
            ttl,
            ledger.clone(),
            ledger.clone(),
            clock,
        ));
        TradeStore { ledger, cache }
    }

    /// Assigns an id, appends to the ledger and upserts into the recent cache.
    ///
    /// Both writes happen under the ledger write lock, so no reader sees one
    /// without the other.
    pub fn record(&self, trade: NewTrade) -> Result<TradeId, GbceError> {
        trade.validate()?;
        let trade = Arc::new(Trade::record(trade));
        let id = trade.id();
        {
            let mut ledger = self.ledger.writer();
            self.cache.upsert(trade.symbol(), trade.clone());
            ledger.push(trade.clone());
        }
        info!(%id, symbol = trade.symbol(), "trade is recorded");
        Ok(id)
    }

    /// Non-aged-out ledger trades for the symbol.
    ///
    /// Expired buckets are swept first so the aged-out flags are current even
    /// when nothing has read the cache since the TTL passed.
    pub fn trades_for_symbol(&self, symbol: &str) -> Vec<Arc<Trade>> {
        self.cache.sweep();
        self.ledger.for_symbol(&normalize_symbol(symbol))
    }

    /// The whole ledger, aged-out trades included. Sweeps first, like
    /// [`TradeStore::trades_for_symbol`].
    pub fn all_trades(&self) -> Vec<Arc<Trade>> {
        self.cache.sweep();
        self.ledger.all()
    }

    pub fn recent_trades(&self, symbol: &str) -> Result<Vec<Arc<Trade>>, GbceError> {
        self.cache.get(symbol)
    }

    pub fn recent_all(&self) -> Vec<Arc<Trade>> {
        self.cache.snapshot_all()
    }

    pub fn cache(&self) -> &Arc<RecentTradeCache> {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }
}
