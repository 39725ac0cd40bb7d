//! Read-through instrument catalog with a bounded LRU cache.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::error::GbceError;
use crate::domain::instrument::Instrument;
use crate::domain::trade::normalize_symbol;
use crate::ports::instrument_port::InstrumentSource;

pub const DEFAULT_CATALOG_CAPACITY: usize = 5;

struct LruTable {
    entries: HashMap<String, Instrument>,
    /// Front is least recently used.
    order: VecDeque<String>,
    capacity: usize,
}

impl LruTable {
    fn new(capacity: usize) -> Self {
        LruTable {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn get(&mut self, key: &str) -> Option<Instrument> {
        let instrument = self.entries.get(key)?.clone();
        self.touch(key);
        Some(instrument)
    }

    fn insert(&mut self, key: String, instrument: Instrument) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key.clone(), instrument);
            self.touch(&key);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                debug!(symbol = %oldest, "evicting instrument from catalog cache");
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, instrument);
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

pub struct StockCatalog {
    source: Arc<dyn InstrumentSource>,
    cache: Mutex<LruTable>,
}

impl StockCatalog {
    pub fn new(source: Arc<dyn InstrumentSource>, capacity: usize) -> Self {
        StockCatalog {
            source,
            cache: Mutex::new(LruTable::new(capacity.max(1))),
        }
    }

    /// Case-insensitive lookup. Misses are loaded from the source and cached;
    /// unknown symbols are not cached.
    pub fn lookup(&self, symbol: &str) -> Result<Instrument, GbceError> {
        if symbol.trim().is_empty() {
            return Err(GbceError::invalid("stock symbol cannot be blank"));
        }
        let key = normalize_symbol(symbol);

        if let Some(instrument) = self.cache.lock().get(&key) {
            debug!(symbol = %key, "catalog cache hit");
            return Ok(instrument);
        }

        info!(symbol = %key, "catalog cache miss, loading from instrument source");
        let instrument = self.source.load_by_symbol(&key).map_err(|e| match e {
            GbceError::NotFound { .. } => GbceError::NotFound {
                symbol: symbol.to_string(),
            },
            other => GbceError::ExecutionFailure {
                reason: format!("loading instrument {key}: {other}"),
            },
        })?;

        if !instrument.symbol.eq_ignore_ascii_case(&key) {
            return Err(GbceError::internal(format!(
                "instrument source returned {} for symbol={key}",
                instrument.symbol
            )));
        }
        instrument.validate().map_err(|e| {
            GbceError::internal(format!("instrument source returned a bad row: {e}"))
        })?;

        self.cache.lock().insert(key, instrument.clone());
        Ok(instrument)
    }

    pub fn symbols(&self) -> Result<Vec<String>, GbceError> {
        self.source
            .list_symbols()
            .map_err(|e| GbceError::ExecutionFailure {
                reason: format!("listing instruments: {e}"),
            })
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().entries.len()
    }
}
