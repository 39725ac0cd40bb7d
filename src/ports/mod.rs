//! Port traits implemented by adapters and by the trade ledger.

pub mod clock_port;
pub mod config_port;
pub mod instrument_port;
pub mod ledger_port;
