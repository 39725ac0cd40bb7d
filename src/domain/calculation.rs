//! Financial indicators over recorded trades and instrument data.
//!
//! Every operation validates its inputs before touching the catalog or the
//! store. Money math is exact decimal and quotients keep full `Decimal`
//! precision; only VWAP and the index are rounded. The geometric mean goes
//! through `f64`, as a mean of logarithms so the product never overflows.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::domain::error::GbceError;
use crate::domain::instrument::StockType;
use crate::domain::stock_catalog::StockCatalog;
use crate::domain::trade::{NewTrade, Trade, TradeId};
use crate::domain::trade_store::TradeStore;

/// Decimal places of the share index.
pub const INDEX_SCALE: u32 = 2;

const HALF_UP: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Which trades feed the share index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexScope {
    /// Every trade ever recorded, aged-out or not.
    #[default]
    Ledger,
    /// Only trades still in the recent cache.
    Recent,
}

impl FromStr for IndexScope {
    type Err = GbceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ledger" => Ok(IndexScope::Ledger),
            "recent" => Ok(IndexScope::Recent),
            other => Err(GbceError::invalid(format!("unknown index scope '{other}'"))),
        }
    }
}

pub struct CalculationEngine {
    catalog: Arc<StockCatalog>,
    store: Arc<TradeStore>,
    index_scope: IndexScope,
}

impl CalculationEngine {
    pub fn new(catalog: Arc<StockCatalog>, store: Arc<TradeStore>) -> Self {
        Self::with_index_scope(catalog, store, IndexScope::default())
    }

    pub fn with_index_scope(
        catalog: Arc<StockCatalog>,
        store: Arc<TradeStore>,
        index_scope: IndexScope,
    ) -> Self {
        CalculationEngine {
            catalog,
            store,
            index_scope,
        }
    }

    pub fn store(&self) -> &Arc<TradeStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<StockCatalog> {
        &self.catalog
    }

    pub fn index_scope(&self) -> IndexScope {
        self.index_scope
    }

    /// COMMON: last dividend / price.
    /// PREFERRED: fixed dividend × par value / price.
    pub fn dividend_yield(&self, symbol: &str, price: Decimal) -> Result<Decimal, GbceError> {
        info!(symbol, %price, "calculating dividend yield");
        validate_symbol(symbol)?;
        validate_price(price)?;

        let dividend = self.dividend_per_share(symbol)?;
        let dividend_yield = divide(dividend, price)?;

        info!(symbol, %price, %dividend_yield, "calculated dividend yield");
        Ok(dividend_yield)
    }

    /// Price / dividend, where the dividend is the dividend yield at `price`.
    ///
    /// Evaluated as price² / dividend per share so no rounded yield feeds the
    /// second division.
    pub fn pe_ratio(&self, symbol: &str, price: Decimal) -> Result<Decimal, GbceError> {
        info!(symbol, %price, "calculating price earning ratio");
        validate_symbol(symbol)?;
        validate_price(price)?;

        let dividend = self.dividend_per_share(symbol)?;
        if dividend.is_zero() {
            return Err(GbceError::invalid(format!(
                "dividend for symbol={symbol} is zero, price earning ratio is undefined"
            )));
        }
        let pe_ratio = match price.checked_mul(price) {
            Some(squared) => divide(squared, dividend)?,
            // price² out of range: fall back to price / yield.
            None => divide(price, divide(dividend, price)?)?,
        };
        info!(symbol, %price, %pe_ratio, "calculated price earning ratio");
        Ok(pe_ratio)
    }

    fn dividend_per_share(&self, symbol: &str) -> Result<Decimal, GbceError> {
        let stock = self.catalog.lookup(symbol)?;
        match stock.stock_type {
            StockType::Common => Ok(stock.last_dividend),
            StockType::Preferred => stock
                .fixed_dividend
                .checked_mul(stock.par_value)
                .ok_or_else(|| {
                    GbceError::internal(format!("preferred dividend overflow for {symbol}"))
                }),
        }
    }

    /// Volume weighted price over the symbol's recent trades, rounded half up
    /// to a whole unit.
    pub fn vwap(&self, symbol: &str) -> Result<Decimal, GbceError> {
        info!(symbol, "calculating volume weighted stock price");
        validate_symbol(symbol)?;

        let trades = self.store.recent_trades(symbol)?;
        if trades.is_empty() {
            return Err(GbceError::no_data(format!(
                "symbol={symbol} to perform volume weighted price calculation"
            )));
        }
        let vwap = volume_weighted_price(&trades)?;
        info!(symbol, trades = trades.len(), %vwap, "calculated volume weighted stock price");
        Ok(vwap)
    }

    /// Geometric mean of trade prices in the configured index scope, rounded
    /// half up to two places.
    pub fn share_index(&self) -> Result<Decimal, GbceError> {
        info!(scope = ?self.index_scope, "calculating share index");
        let trades = match self.index_scope {
            IndexScope::Ledger => self.store.all_trades(),
            IndexScope::Recent => self.store.recent_all(),
        };
        if trades.is_empty() {
            return Err(GbceError::no_data("share index calculation"));
        }
        let index = geometric_mean(&trades)?;
        info!(trades = trades.len(), %index, "calculated share index");
        Ok(index)
    }

    pub fn record_trade(&self, trade: NewTrade) -> Result<TradeId, GbceError> {
        info!(symbol = %trade.symbol, quantity = trade.quantity, side = %trade.side, price = %trade.price, "recording trade");
        trade.validate()?;
        let id = self.store.record(trade)?;
        info!(%id, "trade successfully registered");
        Ok(id)
    }
}

fn validate_symbol(symbol: &str) -> Result<(), GbceError> {
    if symbol.trim().is_empty() {
        return Err(GbceError::invalid("stock symbol cannot be blank"));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), GbceError> {
    if price <= Decimal::ZERO {
        return Err(GbceError::invalid(format!("price must be positive, got {price}")));
    }
    Ok(())
}

/// Full-precision quotient. Zero quotients are checked by callers on the
/// numerator, never on a result that may have underflowed.
fn divide(numerator: Decimal, denominator: Decimal) -> Result<Decimal, GbceError> {
    numerator
        .checked_div(denominator)
        .map(|q| q.normalize())
        .ok_or_else(|| GbceError::internal(format!("cannot divide {numerator} by {denominator}")))
}

/// Σ(price × quantity) / Σ(quantity), rounded once at the end.
pub fn volume_weighted_price(trades: &[Arc<Trade>]) -> Result<Decimal, GbceError> {
    let overflow = || GbceError::internal("volume weighted price overflow");
    let mut notional = Decimal::ZERO;
    let mut volume = Decimal::ZERO;
    for trade in trades {
        let quantity = Decimal::from(trade.quantity());
        notional = trade
            .price()
            .checked_mul(quantity)
            .and_then(|value| notional.checked_add(value))
            .ok_or_else(overflow)?;
        volume = volume.checked_add(quantity).ok_or_else(overflow)?;
    }
    if volume.is_zero() {
        return Err(GbceError::no_data("volume weighted price, total quantity is zero"));
    }
    let vwap = notional.checked_div(volume).ok_or_else(overflow)?;
    Ok(vwap.round_dp_with_strategy(0, HALF_UP))
}

/// exp(mean(ln price)). Any zero price makes the mean zero.
pub fn geometric_mean(trades: &[Arc<Trade>]) -> Result<Decimal, GbceError> {
    if trades.is_empty() {
        return Err(GbceError::no_data("geometric mean"));
    }
    if trades.iter().any(|t| t.price().is_zero()) {
        return Ok(Decimal::new(0, INDEX_SCALE));
    }
    let mut log_sum = 0.0_f64;
    for trade in trades {
        let price = trade.price().to_f64().ok_or_else(|| {
            GbceError::internal(format!("price {} is not representable", trade.price()))
        })?;
        log_sum += price.ln();
    }
    let mean = (log_sum / trades.len() as f64).exp();
    let index = Decimal::from_f64(mean)
        .ok_or_else(|| GbceError::internal(format!("share index {mean} is not representable")))?;
    Ok(index.round_dp_with_strategy(INDEX_SCALE, HALF_UP))
}
