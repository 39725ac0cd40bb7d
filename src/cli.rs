//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::{read_trades, CsvInstrumentSource};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::static_instrument_adapter::StaticInstrumentSource;
use crate::domain::calculation::{CalculationEngine, IndexScope};
use crate::domain::config_validation::validate_config;
use crate::domain::error::GbceError;
use crate::domain::recent_cache::SweeperHandle;
use crate::domain::settings::EngineSettings;
use crate::domain::stock_catalog::StockCatalog;
use crate::domain::trade::normalize_symbol;
use crate::domain::trade_store::TradeStore;
use crate::ports::config_port::ConfigPort;
use crate::ports::instrument_port::InstrumentSource;

#[derive(Parser, Debug)]
#[command(name = "gbce", about = "Global Beverage Corporation Exchange trade calculator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dividend yield and P/E ratio for a stock at a given price
    Quote {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        price: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Record trades from a CSV file and report VWAP and the share index
    Replay {
        #[arg(long)]
        trades: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the instrument table
    Instruments {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Quote {
            symbol,
            price,
            config,
        } => run_quote(&symbol, &price, config.as_deref()),
        Command::Replay {
            trades,
            symbol,
            config,
        } => run_replay(&trades, symbol.as_deref(), config.as_deref()),
        Command::Instruments { config } => run_instruments(config.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, GbceError> {
    FileConfigAdapter::from_file(path)
}

fn load_optional_config(path: Option<&Path>) -> Result<FileConfigAdapter, GbceError> {
    match path {
        Some(p) => load_config(p),
        None => Ok(FileConfigAdapter::empty()),
    }
}

/// Validates `config` and resolves every key, falling back to defaults.
pub fn build_settings(config: &dyn ConfigPort) -> Result<EngineSettings, GbceError> {
    validate_config(config)?;
    let defaults = EngineSettings::default();

    let ttl_ms = config.get_int("cache", "ttl_ms", defaults.ttl.as_millis() as i64);
    let sweep_ms = config.get_int("cache", "sweep_interval_ms", 0);
    let capacity = config.get_int("catalog", "capacity", defaults.catalog_capacity as i64);
    let index_scope = match config.get_string("index", "scope") {
        Some(raw) => raw.parse::<IndexScope>()?,
        None => defaults.index_scope,
    };

    Ok(EngineSettings {
        ttl: Duration::from_millis(ttl_ms as u64),
        sweep_interval: (sweep_ms > 0).then(|| Duration::from_millis(sweep_ms as u64)),
        catalog_capacity: capacity as usize,
        instruments_file: config
            .get_string("catalog", "instruments_file")
            .map(|p| PathBuf::from(p.trim())),
        index_scope,
        log_level: config
            .get_string("logging", "level")
            .map(|l| l.trim().to_lowercase())
            .unwrap_or(defaults.log_level),
        log_ansi: config.get_bool("logging", "ansi", defaults.log_ansi),
    })
}

/// `RUST_LOG` overrides the configured level. Logs go to stderr so stdout
/// carries only command output.
pub fn init_logging(settings: &EngineSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(settings.log_ansi)
        .try_init();
}

/// Wires catalog, store and engine. The sweeper, when configured, stops when
/// the returned handle is dropped.
pub fn build_engine(
    settings: &EngineSettings,
) -> Result<(CalculationEngine, Option<SweeperHandle>), GbceError> {
    let source: Arc<dyn InstrumentSource> = match &settings.instruments_file {
        Some(path) => Arc::new(CsvInstrumentSource::from_file(path)?),
        None => Arc::new(StaticInstrumentSource::reference()),
    };
    let catalog = Arc::new(StockCatalog::new(source, settings.catalog_capacity));
    let store = Arc::new(TradeStore::new(settings.ttl));

    let sweeper = match settings.sweep_interval {
        Some(interval) => Some(store.cache().spawn_sweeper(interval)?),
        None => None,
    };

    info!(
        ttl_ms = settings.ttl.as_millis() as u64,
        capacity = settings.catalog_capacity,
        scope = ?settings.index_scope,
        sweeper = sweeper.is_some(),
        "engine ready"
    );
    Ok((
        CalculationEngine::with_index_scope(catalog, store, settings.index_scope),
        sweeper,
    ))
}

fn prepare(config_path: Option<&Path>) -> Result<EngineSettings, GbceError> {
    let config = load_optional_config(config_path)?;
    let settings = build_settings(&config)?;
    init_logging(&settings);
    for key in config.unknown_keys() {
        warn!(origin = config.origin(), key = %key, "ignoring unknown config key");
    }
    Ok(settings)
}

fn parse_price(raw: &str) -> Result<Decimal, GbceError> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| GbceError::invalid(format!("invalid price '{raw}': {e}")))
}

fn run_quote(symbol: &str, price: &str, config_path: Option<&Path>) -> Result<(), GbceError> {
    let settings = prepare(config_path)?;
    let (engine, _sweeper) = build_engine(&settings)?;
    let price = parse_price(price)?;

    let dividend_yield = engine.dividend_yield(symbol, price)?;
    println!("{:<16}{}", "symbol", normalize_symbol(symbol));
    println!("{:<16}{}", "price", price);
    println!("{:<16}{}", "dividend_yield", dividend_yield);
    if dividend_yield.is_zero() {
        println!("{:<16}undefined (zero dividend)", "pe_ratio");
    } else {
        println!("{:<16}{}", "pe_ratio", engine.pe_ratio(symbol, price)?);
    }
    Ok(())
}

fn run_replay(
    trades_path: &Path,
    symbol: Option<&str>,
    config_path: Option<&Path>,
) -> Result<(), GbceError> {
    let settings = prepare(config_path)?;
    let (engine, _sweeper) = build_engine(&settings)?;

    let trades = read_trades(trades_path)?;
    info!(path = %trades_path.display(), trades = trades.len(), "replaying trades");

    let mut symbols: Vec<String> = Vec::new();
    for trade in trades {
        let key = normalize_symbol(&trade.symbol);
        engine.record_trade(trade)?;
        if !symbols.contains(&key) {
            symbols.push(key);
        }
    }

    let report: Vec<String> = match symbol {
        Some(s) => vec![normalize_symbol(s)],
        None => symbols,
    };
    for s in &report {
        println!("{:<8}vwap {}", s, engine.vwap(s)?);
    }
    println!("share_index {}", engine.share_index()?);
    Ok(())
}

fn run_instruments(config_path: Option<&Path>) -> Result<(), GbceError> {
    let settings = prepare(config_path)?;
    let (engine, _sweeper) = build_engine(&settings)?;

    println!(
        "{:<8}{:<11}{:>14}{:>16}{:>11}",
        "symbol", "type", "last_dividend", "fixed_dividend", "par_value"
    );
    for symbol in engine.catalog().symbols()? {
        let stock = engine.catalog().lookup(&symbol)?;
        println!(
            "{:<8}{:<11}{:>14}{:>16}{:>11}",
            stock.symbol,
            stock.stock_type.to_string(),
            stock.last_dividend.to_string(),
            stock.fixed_dividend.to_string(),
            stock.par_value.to_string()
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), GbceError> {
    let config = load_config(config_path)?;
    let settings = build_settings(&config)?;
    if let Some(name) = config.unknown_keys().into_iter().next() {
        let (section, key) = name.split_once('.').unwrap_or(("", name.as_str()));
        return Err(GbceError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: "unknown key".to_string(),
        });
    }
    if let Some(path) = &settings.instruments_file {
        CsvInstrumentSource::from_file(path)?;
    }
    println!("{}: ok", config_path.display());
    Ok(())
}
