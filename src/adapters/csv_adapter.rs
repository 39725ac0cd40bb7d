//! CSV adapters: instrument tables and trade files.
//!
//! Instruments: `symbol,type,last_dividend,fixed_dividend,par_value`.
//! Trades: `symbol,timestamp,quantity,side,price` with RFC 3339 timestamps.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::domain::error::GbceError;
use crate::domain::instrument::{Instrument, StockType};
use crate::domain::trade::{normalize_symbol, NewTrade, Side};
use crate::ports::instrument_port::InstrumentSource;

pub struct CsvInstrumentSource {
    rows: Vec<Instrument>,
}

impl CsvInstrumentSource {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GbceError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let source = Self::from_reader(content.as_bytes(), &path.display().to_string())?;
        info!(path = %path.display(), instruments = source.rows.len(), "loaded instrument table");
        Ok(source)
    }

    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<Self, GbceError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut rows: Vec<Instrument> = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| parse_error(source_name, 0, e.to_string()))?;
            let line = record_line(&record);
            let fail = |reason: String| parse_error(source_name, line, reason);

            let symbol = normalize_symbol(field(&record, 0, "symbol").map_err(&fail)?);
            let stock_type: StockType = field(&record, 1, "type")
                .map_err(&fail)?
                .parse()
                .map_err(|e: GbceError| fail(e.to_string()))?;
            let last_dividend = decimal(&record, 2, "last_dividend").map_err(&fail)?;
            let fixed_dividend = decimal(&record, 3, "fixed_dividend").map_err(&fail)?;
            let par_value = decimal(&record, 4, "par_value").map_err(&fail)?;

            let instrument = Instrument {
                symbol,
                stock_type,
                last_dividend,
                fixed_dividend,
                par_value,
            };
            instrument.validate().map_err(|e| fail(e.to_string()))?;
            if rows.iter().any(|r| r.symbol == instrument.symbol) {
                return Err(fail(format!("duplicate symbol {}", instrument.symbol)));
            }
            rows.push(instrument);
        }

        Ok(Self { rows })
    }
}

impl InstrumentSource for CsvInstrumentSource {
    fn load_by_symbol(&self, symbol: &str) -> Result<Instrument, GbceError> {
        self.rows
            .iter()
            .find(|i| i.symbol == symbol)
            .cloned()
            .ok_or_else(|| GbceError::NotFound {
                symbol: symbol.to_string(),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, GbceError> {
        Ok(self.rows.iter().map(|i| i.symbol.clone()).collect())
    }
}

pub fn read_trades<P: AsRef<Path>>(path: P) -> Result<Vec<NewTrade>, GbceError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_trades(content.as_bytes(), &path.display().to_string())
}

/// Parses and validates every row; the first bad row fails the whole file.
pub fn parse_trades<R: Read>(reader: R, source_name: &str) -> Result<Vec<NewTrade>, GbceError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut trades = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| parse_error(source_name, 0, e.to_string()))?;
        let line = record_line(&record);
        let fail = |reason: String| parse_error(source_name, line, reason);

        let symbol = field(&record, 0, "symbol").map_err(&fail)?.to_string();
        let raw_ts = field(&record, 1, "timestamp").map_err(&fail)?;
        let timestamp = DateTime::parse_from_rfc3339(raw_ts)
            .map_err(|e| fail(format!("invalid timestamp '{raw_ts}': {e}")))?
            .with_timezone(&Utc);
        let raw_qty = field(&record, 2, "quantity").map_err(&fail)?;
        let quantity: u64 = raw_qty
            .parse()
            .map_err(|e| fail(format!("invalid quantity '{raw_qty}': {e}")))?;
        let side: Side = field(&record, 3, "side")
            .map_err(&fail)?
            .parse()
            .map_err(|e: GbceError| fail(e.to_string()))?;
        let price = decimal(&record, 4, "price").map_err(&fail)?;

        let trade = NewTrade::new(symbol, timestamp, quantity, side, price);
        trade.validate().map_err(|e| fail(e.to_string()))?;
        trades.push(trade);
    }

    Ok(trades)
}

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_error(source_name: &str, line: u64, reason: String) -> GbceError {
    GbceError::TradeParse {
        source_name: source_name.to_string(),
        line,
        reason,
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, name: &str) -> Result<&'r str, String> {
    match record.get(idx).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("missing {name} column")),
    }
}

fn decimal(record: &csv::StringRecord, idx: usize, name: &str) -> Result<Decimal, String> {
    let raw = field(record, idx, name)?;
    raw.parse::<Decimal>()
        .map_err(|e| format!("invalid {name} value '{raw}': {e}"))
}
