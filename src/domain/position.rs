//! Broker-held positions and how to find them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::BridgeError;
use super::order::OrderSide;
use crate::ports::terminal_port::TerminalPort;

/// Snapshot of an open position as reported by the terminal.
///
/// The engine never mutates a position; changes go through trade requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticket: u64,
    pub position_id: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub open_price: f64,
    pub current_price: f64,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
    pub profit: f64,
    pub comment: String,
    pub magic_number: u64,
    pub open_time: DateTime<Utc>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side.is_buy()
    }
}

/// Server-side filter supported by the terminal's position query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionFilter {
    All,
    Ticket(u64),
    Symbol(String),
}

/// Which positions an action targets. Exactly one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCriteria {
    pub ticket: Option<u64>,
    pub position_id: Option<u64>,
    pub symbol: Option<String>,
}

impl PositionCriteria {
    pub fn by_ticket(ticket: u64) -> Self {
        PositionCriteria {
            ticket: Some(ticket),
            ..Default::default()
        }
    }

    pub fn by_position_id(position_id: u64) -> Self {
        PositionCriteria {
            position_id: Some(position_id),
            ..Default::default()
        }
    }

    pub fn by_symbol(symbol: &str) -> Self {
        PositionCriteria {
            symbol: Some(symbol.to_string()),
            ..Default::default()
        }
    }

    /// True when the criteria target every position on a symbol.
    pub fn is_symbol_wide(&self) -> bool {
        self.symbol.is_some()
    }

    fn validate(&self) -> Result<(), BridgeError> {
        let set = [
            self.ticket.is_some(),
            self.position_id.is_some(),
            self.symbol.is_some(),
        ]
        .iter()
        .filter(|s| **s)
        .count();
        match set {
            1 => Ok(()),
            0 => Err(BridgeError::InvalidCriteria {
                reason: "one of ticket, position_id or symbol is required".to_string(),
            }),
            _ => Err(BridgeError::InvalidCriteria {
                reason: "only one of ticket, position_id or symbol may be set".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PositionCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.ticket, self.position_id, &self.symbol) {
            (Some(t), _, _) => write!(f, "ticket {t}"),
            (None, Some(id), _) => write!(f, "position id {id}"),
            (None, None, Some(s)) => write!(f, "symbol {s}"),
            (None, None, None) => f.write_str("no criteria"),
        }
    }
}

/// Fetch the current positions matching `criteria`.
///
/// An empty result is not an error here; callers decide what it means.
pub fn locate_positions<T: TerminalPort>(
    terminal: &T,
    criteria: &PositionCriteria,
) -> Result<Vec<Position>, BridgeError> {
    criteria.validate()?;

    let positions = if let Some(ticket) = criteria.ticket {
        terminal.positions(&PositionFilter::Ticket(ticket))?
    } else if let Some(id) = criteria.position_id {
        // The terminal cannot filter by position id, so scan everything.
        terminal
            .positions(&PositionFilter::All)?
            .into_iter()
            .filter(|p| p.position_id == id)
            .collect()
    } else if let Some(symbol) = &criteria.symbol {
        terminal.positions(&PositionFilter::Symbol(symbol.clone()))?
    } else {
        Vec::new()
    };

    debug!(%criteria, found = positions.len(), "located positions");
    Ok(positions)
}
