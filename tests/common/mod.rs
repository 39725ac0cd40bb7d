#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use gbce::domain::calculation::{CalculationEngine, IndexScope};
use gbce::domain::error::GbceError;
use gbce::domain::instrument::Instrument;
use gbce::domain::stock_catalog::StockCatalog;
use gbce::domain::trade::{NewTrade, Side};
use gbce::domain::trade_store::TradeStore;
use gbce::ports::clock_port::ManualClock;
use gbce::ports::instrument_port::InstrumentSource;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TTL: Duration = Duration::from_millis(2000);

pub struct MockInstrumentSource {
    pub rows: HashMap<String, Instrument>,
    pub errors: HashMap<String, String>,
    pub loads: AtomicUsize,
}

impl MockInstrumentSource {
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
            errors: HashMap::new(),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn with_instrument(mut self, instrument: Instrument) -> Self {
        self.rows.insert(instrument.symbol.clone(), instrument);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl InstrumentSource for MockInstrumentSource {
    fn load_by_symbol(&self, symbol: &str) -> Result<Instrument, GbceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(GbceError::Io(std::io::Error::other(reason.clone())));
        }
        self.rows
            .get(symbol)
            .cloned()
            .ok_or_else(|| GbceError::NotFound {
                symbol: symbol.to_string(),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, GbceError> {
        let mut symbols: Vec<String> = self.rows.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// The five reference rows of the exchange.
pub fn reference_source() -> MockInstrumentSource {
    MockInstrumentSource::new()
        .with_instrument(Instrument::common("TEA", Decimal::ZERO, Decimal::from(100)))
        .with_instrument(Instrument::common("POP", Decimal::from(8), Decimal::from(100)))
        .with_instrument(Instrument::common("ALE", Decimal::from(23), Decimal::from(60)))
        .with_instrument(Instrument::preferred(
            "GIN",
            Decimal::from(8),
            Decimal::new(2, 2),
            Decimal::from(100),
        ))
        .with_instrument(Instrument::common("JOE", Decimal::from(13), Decimal::from(250)))
}

pub struct TestEngine {
    pub engine: CalculationEngine,
    pub clock: Arc<ManualClock>,
    pub source: Arc<MockInstrumentSource>,
}

pub fn make_engine(scope: IndexScope) -> TestEngine {
    make_engine_with(reference_source(), scope)
}

pub fn make_engine_with(source: MockInstrumentSource, scope: IndexScope) -> TestEngine {
    let clock = Arc::new(ManualClock::new());
    let source = Arc::new(source);
    let catalog = Arc::new(StockCatalog::new(source.clone(), 5));
    let store = Arc::new(TradeStore::with_clock(TTL, clock.clone()));
    TestEngine {
        engine: CalculationEngine::with_index_scope(catalog, store, scope),
        clock,
        source,
    }
}

pub fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

pub fn buy(symbol: &str, quantity: u64, price: Decimal) -> NewTrade {
    NewTrade::new(symbol, ts(), quantity, Side::Buy, price)
}

pub fn sell(symbol: &str, quantity: u64, price: Decimal) -> NewTrade {
    NewTrade::new(symbol, ts(), quantity, Side::Sell, price)
}
