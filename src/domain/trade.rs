//! Trade records and their identifiers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::domain::error::GbceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TradeId(Uuid);

impl TradeId {
    pub(crate) fn generate() -> Self {
        TradeId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl FromStr for Side {
    type Err = GbceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" | "B" => Ok(Side::Buy),
            "SELL" | "S" => Ok(Side::Sell),
            other => Err(GbceError::invalid(format!("unknown trade side '{other}'"))),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// A trade as submitted by a caller, before it has an id.
///
/// `NewTrade::default()` is the empty trade and never validates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTrade {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub quantity: u64,
    pub side: Side,
    pub price: Decimal,
}

impl NewTrade {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        quantity: u64,
        side: Side,
        price: Decimal,
    ) -> Self {
        NewTrade {
            symbol: symbol.into(),
            timestamp,
            quantity,
            side,
            price,
        }
    }

    pub fn validate(&self) -> Result<(), GbceError> {
        if self.symbol.trim().is_empty() {
            return Err(GbceError::invalid("trade symbol cannot be blank"));
        }
        if self.quantity == 0 {
            return Err(GbceError::invalid(format!(
                "trade quantity for symbol={} must be positive",
                self.symbol
            )));
        }
        if self.price < Decimal::ZERO {
            return Err(GbceError::invalid(format!(
                "trade price for symbol={} cannot be negative",
                self.symbol
            )));
        }
        Ok(())
    }
}

/// A recorded trade. Shared between the ledger and the recent-trade cache.
#[derive(Debug)]
pub struct Trade {
    id: TradeId,
    symbol: String,
    timestamp: DateTime<Utc>,
    quantity: u64,
    side: Side,
    price: Decimal,
    aged_out: AtomicBool,
}

impl Trade {
    /// Assigns a fresh id. Symbols are stored upper-cased.
    pub(crate) fn record(new: NewTrade) -> Self {
        Trade {
            id: TradeId::generate(),
            symbol: normalize_symbol(&new.symbol),
            timestamp: new.timestamp,
            quantity: new.quantity,
            side: new.side,
            price: new.price,
            aged_out: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> TradeId {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn is_aged_out(&self) -> bool {
        self.aged_out.load(Ordering::Acquire)
    }

    /// Returns true only on the false→true transition.
    pub(crate) fn mark_aged_out(&self) -> bool {
        !self.aged_out.swap(true, Ordering::AcqRel)
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
