//! Built-in instrument table used when no instruments file is configured.

use rust_decimal::Decimal;

use crate::domain::error::GbceError;
use crate::domain::instrument::Instrument;
use crate::ports::instrument_port::InstrumentSource;

pub struct StaticInstrumentSource {
    rows: Vec<Instrument>,
}

impl StaticInstrumentSource {
    /// The five reference instruments: TEA, POP, ALE, GIN, JOE.
    pub fn reference() -> Self {
        let rows = vec![
            Instrument::common("TEA", Decimal::ZERO, Decimal::new(100, 0)),
            Instrument::common("POP", Decimal::new(8, 0), Decimal::new(100, 0)),
            Instrument::common("ALE", Decimal::new(23, 0), Decimal::new(60, 0)),
            Instrument::preferred(
                "GIN",
                Decimal::new(8, 0),
                Decimal::new(2, 2),
                Decimal::new(100, 0),
            ),
            Instrument::common("JOE", Decimal::new(13, 0), Decimal::new(250, 0)),
        ];
        Self { rows }
    }

    pub fn from_rows(rows: Vec<Instrument>) -> Self {
        Self { rows }
    }
}

impl InstrumentSource for StaticInstrumentSource {
    fn load_by_symbol(&self, symbol: &str) -> Result<Instrument, GbceError> {
        self.rows
            .iter()
            .find(|i| i.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
            .ok_or_else(|| GbceError::NotFound {
                symbol: symbol.to_string(),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, GbceError> {
        Ok(self.rows.iter().map(|i| i.symbol.clone()).collect())
    }
}
