//! Instrument reference data.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::GbceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockType {
    Common,
    Preferred,
}

impl FromStr for StockType {
    type Err = GbceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COMMON" => Ok(StockType::Common),
            "PREFERRED" => Ok(StockType::Preferred),
            other => Err(GbceError::invalid(format!("unknown stock type '{other}'"))),
        }
    }
}

impl fmt::Display for StockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockType::Common => f.write_str("COMMON"),
            StockType::Preferred => f.write_str("PREFERRED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub stock_type: StockType,
    pub last_dividend: Decimal,
    /// Rate, e.g. 0.02 for 2%. Only meaningful for preferred stock.
    pub fixed_dividend: Decimal,
    pub par_value: Decimal,
}

impl Instrument {
    pub fn common(symbol: &str, last_dividend: Decimal, par_value: Decimal) -> Self {
        Instrument {
            symbol: symbol.to_string(),
            stock_type: StockType::Common,
            last_dividend,
            fixed_dividend: Decimal::ZERO,
            par_value,
        }
    }

    pub fn preferred(
        symbol: &str,
        last_dividend: Decimal,
        fixed_dividend: Decimal,
        par_value: Decimal,
    ) -> Self {
        Instrument {
            symbol: symbol.to_string(),
            stock_type: StockType::Preferred,
            last_dividend,
            fixed_dividend,
            par_value,
        }
    }

    pub fn validate(&self) -> Result<(), GbceError> {
        if self.symbol.trim().is_empty() {
            return Err(GbceError::invalid("instrument symbol cannot be blank"));
        }
        if self.last_dividend < Decimal::ZERO {
            return Err(GbceError::invalid(format!(
                "last dividend for {} must be non-negative",
                self.symbol
            )));
        }
        if self.fixed_dividend < Decimal::ZERO {
            return Err(GbceError::invalid(format!(
                "fixed dividend for {} must be non-negative",
                self.symbol
            )));
        }
        if self.par_value <= Decimal::ZERO {
            return Err(GbceError::invalid(format!(
                "par value for {} must be positive",
                self.symbol
            )));
        }
        Ok(())
    }
}
