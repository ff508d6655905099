//! Domain error types.

use serde::{Deserialize, Serialize};

/// Coarse error category carried inside execution results and ledger rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Auth,
    SymbolNotFound,
    SymbolUnavailable,
    PositionNotFound,
    InvalidCriteria,
    Validation,
    BrokerRejected,
    Config,
    Io,
}

/// Top-level error type for signalbridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("terminal connection error: {reason}")]
    Connection { reason: String },

    #[error("terminal login failed for account {login}: {reason}")]
    Auth { login: u64, reason: String },

    #[error("symbol {symbol} not found")]
    SymbolNotFound { symbol: String },

    #[error("symbol {symbol} unavailable: {reason}")]
    SymbolUnavailable { symbol: String, reason: String },

    #[error("no open position matches {criteria}")]
    PositionNotFound { criteria: String },

    #[error("invalid position criteria: {reason}")]
    InvalidCriteria { reason: String },

    #[error("validation error: {reason}")]
    Validation { reason: String },

    #[error("broker rejected request ({code}): {description}")]
    BrokerRejected { code: u32, description: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn validation(reason: impl Into<String>) -> Self {
        BridgeError::Validation {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Connection { .. } => ErrorKind::Connection,
            BridgeError::Auth { .. } => ErrorKind::Auth,
            BridgeError::SymbolNotFound { .. } => ErrorKind::SymbolNotFound,
            BridgeError::SymbolUnavailable { .. } => ErrorKind::SymbolUnavailable,
            BridgeError::PositionNotFound { .. } => ErrorKind::PositionNotFound,
            BridgeError::InvalidCriteria { .. } => ErrorKind::InvalidCriteria,
            BridgeError::Validation { .. } | BridgeError::Json(_) => ErrorKind::Validation,
            BridgeError::BrokerRejected { .. } => ErrorKind::BrokerRejected,
            BridgeError::ConfigParse { .. }
            | BridgeError::ConfigMissing { .. }
            | BridgeError::ConfigInvalid { .. } => ErrorKind::Config,
            BridgeError::Io(_) => ErrorKind::Io,
        }
    }

    /// Connection and auth failures abort a whole call, including every
    /// remaining leg of a multi-position close.
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            BridgeError::Connection { .. } | BridgeError::Auth { .. }
        )
    }
}

impl From<&BridgeError> for std::process::ExitCode {
    fn from(err: &BridgeError) -> Self {
        let code: u8 = match err.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Config => 2,
            ErrorKind::Connection | ErrorKind::Auth => 3,
            ErrorKind::SymbolNotFound
            | ErrorKind::SymbolUnavailable
            | ErrorKind::PositionNotFound
            | ErrorKind::InvalidCriteria => 4,
            ErrorKind::Validation => 5,
            ErrorKind::BrokerRejected => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_taxonomy() {
        let err = BridgeError::SymbolNotFound {
            symbol: "XAUUSD".into(),
        };
        assert_eq!(err.kind(), ErrorKind::SymbolNotFound);

        let err = BridgeError::BrokerRejected {
            code: 10019,
            description: "not enough money".into(),
        };
        assert_eq!(err.kind(), ErrorKind::BrokerRejected);
        assert_eq!(
            err.to_string(),
            "broker rejected request (10019): not enough money"
        );
    }

    #[test]
    fn session_failures_are_connection_and_auth_only() {
        assert!(BridgeError::Connection { reason: "x".into() }.is_session_failure());
        assert!(BridgeError::Auth {
            login: 1,
            reason: "x".into()
        }
        .is_session_failure());
        assert!(!BridgeError::validation("x").is_session_failure());
    }

    #[test]
    fn json_errors_classify_as_validation() {
        let err: BridgeError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
