//! Core domain types and logic.

pub mod calculation;
pub mod config_validation;
pub mod error;
pub mod instrument;
pub mod recent_cache;
pub mod settings;
pub mod stock_catalog;
pub mod trade;
pub mod trade_ledger;
pub mod trade_store;
