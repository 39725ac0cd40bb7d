//! Domain error types.

/// Top-level error type for gbce.
#[derive(Debug, thiserror::Error)]
pub enum GbceError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("no instrument found for symbol={symbol}")]
    NotFound { symbol: String },

    #[error("no trades available for {scope}")]
    NoData { scope: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },

    #[error("cache load failed: {reason}")]
    ExecutionFailure { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{source_name} line {line}: {reason}")]
    TradeParse {
        source_name: String,
        line: u64,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GbceError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        GbceError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        GbceError::Internal {
            reason: reason.into(),
        }
    }

    pub fn no_data(scope: impl Into<String>) -> Self {
        GbceError::NoData {
            scope: scope.into(),
        }
    }

    /// Process exit status for this error kind.
    pub fn exit_status(&self) -> u8 {
        match self {
            GbceError::Io(_) => 1,
            GbceError::ConfigParse { .. } | GbceError::ConfigInvalid { .. } => 2,
            GbceError::InvalidArgument { .. } | GbceError::TradeParse { .. } => 3,
            GbceError::NotFound { .. } => 4,
            GbceError::NoData { .. } => 5,
            GbceError::Internal { .. } | GbceError::ExecutionFailure { .. } => 6,
        }
    }
}

impl From<&GbceError> for std::process::ExitCode {
    fn from(err: &GbceError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = GbceError::NotFound {
            symbol: "XYZ".into(),
        };
        assert_eq!(err.to_string(), "no instrument found for symbol=XYZ");

        let err = GbceError::TradeParse {
            source_name: "trades.csv".into(),
            line: 4,
            reason: "invalid side".into(),
        };
        assert_eq!(err.to_string(), "trades.csv line 4: invalid side");
    }

    #[test]
    fn exit_status_groups_by_kind() {
        assert_eq!(GbceError::invalid("x").exit_status(), 3);
        assert_eq!(
            GbceError::NotFound {
                symbol: "XYZ".into()
            }
            .exit_status(),
            4
        );
        assert_eq!(GbceError::no_data("vwap").exit_status(), 5);
        assert_eq!(GbceError::internal("x").exit_status(), 6);
        assert_eq!(
            GbceError::ConfigInvalid {
                section: "cache".into(),
                key: "ttl_ms".into(),
                reason: "must be positive".into()
            }
            .exit_status(),
            2
        );
    }
}
