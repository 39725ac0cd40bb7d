//! Configuration validation.
//!
//! Every key is optional; present keys must hold usable values.

use crate::domain::calculation::IndexScope;
use crate::domain::error::GbceError;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), GbceError> {
    validate_ttl(config)?;
    validate_sweep_interval(config)?;
    validate_capacity(config)?;
    validate_index_scope(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> GbceError {
    GbceError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// `None` when the key is absent.
fn parse_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<i64>, GbceError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(section, key, "must be an integer")),
    }
}

fn validate_ttl(config: &dyn ConfigPort) -> Result<(), GbceError> {
    if let Some(ttl) = parse_int(config, "cache", "ttl_ms")? {
        if ttl <= 0 {
            return Err(invalid("cache", "ttl_ms", "ttl_ms must be positive"));
        }
    }
    Ok(())
}

fn validate_sweep_interval(config: &dyn ConfigPort) -> Result<(), GbceError> {
    if let Some(interval) = parse_int(config, "cache", "sweep_interval_ms")? {
        if interval < 0 {
            return Err(invalid(
                "cache",
                "sweep_interval_ms",
                "sweep_interval_ms must be non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_capacity(config: &dyn ConfigPort) -> Result<(), GbceError> {
    if let Some(capacity) = parse_int(config, "catalog", "capacity")? {
        if capacity <= 0 {
            return Err(invalid("catalog", "capacity", "capacity must be positive"));
        }
    }
    Ok(())
}

fn validate_index_scope(config: &dyn ConfigPort) -> Result<(), GbceError> {
    if let Some(scope) = config.get_string("index", "scope") {
        scope
            .parse::<IndexScope>()
            .map_err(|_| invalid("index", "scope", "scope must be 'ledger' or 'recent'"))?;
    }
    Ok(())
}

fn validate_log_level(config: &dyn ConfigPort) -> Result<(), GbceError> {
    if let Some(level) = config.get_string("logging", "level") {
        match level.trim().to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
            _ => {
                return Err(invalid(
                    "logging",
                    "level",
                    "level must be one of trace, debug, info, warn, error, off",
                ));
            }
        }
    }
    Ok(())
}
