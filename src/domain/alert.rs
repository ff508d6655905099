//! Alert payload normalization and dispatch.
//!
//! Alerts arrive as loosely typed JSON objects that have already passed
//! signature and schema checks upstream. Numeric fields may be JSON numbers
//! or numeric strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::engine::{CloseOutcome, ExecutionEngine, ExecutionResult};
use super::error::{BridgeError, ErrorKind};
use super::order::{OrderSide, TradingIntent};
use super::position::PositionCriteria;
use crate::ports::terminal_port::TerminalPort;

pub const DEFAULT_VOLUME: f64 = 0.01;
pub const DEFAULT_COMMENT: &str = "alert";

const REQUIRED_FIELDS: [&str; 2] = ["symbol", "action"];

/// Values used when an alert omits an optional field.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDefaults {
    pub volume: f64,
    pub comment: String,
    pub magic_number: u64,
}

impl Default for AlertDefaults {
    fn default() -> Self {
        AlertDefaults {
            volume: DEFAULT_VOLUME,
            comment: DEFAULT_COMMENT.to_string(),
            magic_number: 0,
        }
    }
}

/// What an alert asks the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertCommand {
    Open(TradingIntent),
    Close(PositionCriteria),
    Modify {
        symbol: String,
        ticket: u64,
        stop_price: Option<f64>,
        target_price: Option<f64>,
    },
    /// The action field held something other than buy/sell/close/modify.
    Unrecognized { symbol: String, action: String },
}

/// Map an alert payload to a command.
///
/// Fails with a validation error naming the first missing required field.
/// An unknown action is not an error: it yields [`AlertCommand::Unrecognized`].
pub fn normalize_alert(
    payload: &Value,
    defaults: &AlertDefaults,
) -> Result<AlertCommand, BridgeError> {
    let fields = payload
        .as_object()
        .ok_or_else(|| BridgeError::validation("alert payload must be a JSON object"))?;

    for field in REQUIRED_FIELDS {
        if text_field(fields, field)?.is_none() {
            return Err(BridgeError::validation(format!(
                "missing required field: {field}"
            )));
        }
    }
    let symbol = text_field(fields, "symbol")?.unwrap_or_default();
    let action = text_field(fields, "action")?.unwrap_or_default();

    let command = match action.to_ascii_lowercase().as_str() {
        "buy" | "sell" => {
            let side = if action.eq_ignore_ascii_case("buy") {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            };
            AlertCommand::Open(TradingIntent {
                symbol,
                side,
                volume: number_field(fields, "volume")?.unwrap_or(defaults.volume),
                price: number_field(fields, "price")?,
                stop_points: number_field(fields, "sl_points")?,
                target_points: number_field(fields, "tp_points")?,
                stop_price: number_field(fields, "sl")?,
                target_price: number_field(fields, "tp")?,
                comment: text_field(fields, "comment")?
                    .unwrap_or_else(|| defaults.comment.clone()),
                magic_number: integer_field(fields, "magic")?.unwrap_or(defaults.magic_number),
            })
        }
        "close" => {
            let criteria = if let Some(ticket) = integer_field(fields, "ticket")? {
                PositionCriteria::by_ticket(ticket)
            } else if let Some(id) = integer_field(fields, "position_id")? {
                PositionCriteria::by_position_id(id)
            } else {
                PositionCriteria::by_symbol(&symbol)
            };
            AlertCommand::Close(criteria)
        }
        "modify" => {
            let ticket = integer_field(fields, "ticket")?
                .ok_or_else(|| BridgeError::validation("missing required field: ticket"))?;
            AlertCommand::Modify {
                symbol,
                ticket,
                stop_price: number_field(fields, "sl")?,
                target_price: number_field(fields, "tp")?,
            }
        }
        _ => AlertCommand::Unrecognized { symbol, action },
    };
    Ok(command)
}

fn text_field(fields: &Map<String, Value>, name: &str) -> Result<Option<String>, BridgeError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(BridgeError::validation(format!("{name} must be a string"))),
    }
}

fn number_field(fields: &Map<String, Value>, name: &str) -> Result<Option<f64>, BridgeError> {
    let invalid = || BridgeError::validation(format!("{name} must be numeric"));
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn integer_field(fields: &Map<String, Value>, name: &str) -> Result<Option<u64>, BridgeError> {
    let invalid = || BridgeError::validation(format!("{name} must be a non-negative integer"));
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<u64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// What happened to one alert. Callers must check `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertOutcome {
    pub success: bool,
    pub action: String,
    pub symbol: String,
    pub message: String,
    pub error_kind: Option<ErrorKind>,
    pub results: Vec<ExecutionResult>,
}

impl AlertOutcome {
    fn from_error(action: &str, symbol: &str, err: &BridgeError) -> Self {
        AlertOutcome {
            success: false,
            action: action.to_string(),
            symbol: symbol.to_string(),
            message: err.to_string(),
            error_kind: Some(err.kind()),
            results: Vec::new(),
        }
    }

    fn from_result(action: &str, symbol: &str, result: ExecutionResult) -> Self {
        let message = if result.simulated {
            format!("{action} simulated, trading disabled")
        } else if result.accepted {
            format!("{action} accepted")
        } else {
            format!(
                "{action} rejected: {}",
                result.error_detail.as_deref().unwrap_or("unknown reason")
            )
        };
        AlertOutcome {
            success: result.accepted,
            action: action.to_string(),
            symbol: symbol.to_string(),
            message,
            error_kind: result.error_kind,
            results: vec![result],
        }
    }
}

/// A local failure on any leg outranks a broker rejection.
fn failed_leg_kind(outcome: &CloseOutcome) -> ErrorKind {
    outcome
        .rejected_legs()
        .filter_map(|leg| leg.result.error_kind)
        .find(|kind| *kind != ErrorKind::BrokerRejected)
        .unwrap_or(ErrorKind::BrokerRejected)
}

/// Run a normalized command through the engine.
pub fn dispatch_alert<T: TerminalPort>(
    engine: &mut ExecutionEngine<T>,
    command: &AlertCommand,
) -> AlertOutcome {
    match command {
        AlertCommand::Open(intent) => {
            let action = intent.side.to_string();
            match engine.open(intent) {
                Ok(result) => AlertOutcome::from_result(&action, &intent.symbol, result),
                Err(e) => AlertOutcome::from_error(&action, &intent.symbol, &e),
            }
        }
        AlertCommand::Close(criteria) => {
            let symbol = criteria.symbol.clone().unwrap_or_default();
            match engine.close(criteria) {
                Ok(outcome) => {
                    let success = outcome.accepted();
                    let rejected = outcome.rejected_legs().count();
                    let message = if outcome.simulated {
                        "close simulated, trading disabled".to_string()
                    } else if success {
                        format!("closed {} position(s)", outcome.legs.len())
                    } else {
                        format!(
                            "close rejected for {rejected} of {} position(s)",
                            outcome.legs.len()
                        )
                    };
                    let symbol = outcome
                        .legs
                        .first()
                        .map(|l| l.symbol.clone())
                        .unwrap_or(symbol);
                    AlertOutcome {
                        success,
                        action: "close".to_string(),
                        symbol,
                        message,
                        error_kind: (!success).then(|| failed_leg_kind(&outcome)),
                        results: outcome.legs.into_iter().map(|l| l.result).collect(),
                    }
                }
                Err(e) => AlertOutcome::from_error("close", &symbol, &e),
            }
        }
        AlertCommand::Modify {
            symbol,
            ticket,
            stop_price,
            target_price,
        } => match engine.modify(*ticket, *stop_price, *target_price) {
            Ok(result) => AlertOutcome::from_result("modify", symbol, result),
            Err(e) => AlertOutcome::from_error("modify", symbol, &e),
        },
        AlertCommand::Unrecognized { symbol, action } => {
            warn!(%symbol, %action, "unrecognized alert action");
            AlertOutcome {
                success: false,
                action: action.clone(),
                symbol: symbol.clone(),
                message: format!("unrecognized action '{action}', expected buy, sell, close or modify"),
                error_kind: Some(ErrorKind::Validation),
                results: Vec::new(),
            }
        }
    }
}

/// Normalize and dispatch in one step; normalization failures become a
/// failed outcome instead of an error.
pub fn process_alert<T: TerminalPort>(
    engine: &mut ExecutionEngine<T>,
    payload: &Value,
    defaults: &AlertDefaults,
) -> AlertOutcome {
    match normalize_alert(payload, defaults) {
        Ok(command) => dispatch_alert(engine, &command),
        Err(e) => {
            warn!(error = %e, "alert rejected during normalization");
            let symbol = payload
                .get("symbol")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let action = payload
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or_default();
            AlertOutcome::from_error(action, symbol, &e)
        }
    }
}
