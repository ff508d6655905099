//! Symbol snapshots and activation.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::BridgeError;
use crate::ports::terminal_port::TerminalPort;

/// Best bid/ask and contract metadata for one symbol at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    /// Spread in points.
    pub spread: u32,
    pub point_size: f64,
    pub visible: bool,
}

impl SymbolSnapshot {
    /// Market entry price for a side: ask when buying, bid when selling.
    pub fn entry_price(&self, buy: bool) -> f64 {
        if buy { self.ask } else { self.bid }
    }

    /// Price at which an open position is closed: bid for a long, ask for a short.
    pub fn exit_price(&self, long: bool) -> f64 {
        if long { self.bid } else { self.ask }
    }
}

/// Fetch a fresh snapshot, enabling the symbol once if it is hidden.
///
/// Never returns a snapshot whose `visible` flag is false.
pub fn resolve_symbol<T: TerminalPort>(
    terminal: &mut T,
    symbol: &str,
) -> Result<SymbolSnapshot, BridgeError> {
    let snapshot = terminal
        .symbol_info(symbol)?
        .ok_or_else(|| BridgeError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;

    let snapshot = if snapshot.visible {
        snapshot
    } else {
        debug!(symbol, "symbol hidden, enabling");
        if !terminal.select_symbol(symbol)? {
            warn!(symbol, "terminal refused to enable symbol");
            return Err(BridgeError::SymbolUnavailable {
                symbol: symbol.to_string(),
                reason: "activation failed".to_string(),
            });
        }
        match terminal.symbol_info(symbol)? {
            Some(s) if s.visible => s,
            _ => {
                return Err(BridgeError::SymbolUnavailable {
                    symbol: symbol.to_string(),
                    reason: "still inactive after activation".to_string(),
                });
            }
        }
    };

    if !(snapshot.point_size.is_finite() && snapshot.point_size > 0.0) {
        return Err(BridgeError::SymbolUnavailable {
            symbol: symbol.to_string(),
            reason: format!("invalid point size {}", snapshot.point_size),
        });
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eurusd() -> SymbolSnapshot {
        SymbolSnapshot {
            symbol: "EURUSD".into(),
            bid: 1.1048,
            ask: 1.1050,
            spread: 2,
            point_size: 0.0001,
            visible: true,
        }
    }

    #[test]
    fn entry_price_uses_ask_for_buys() {
        let s = eurusd();
        assert_eq!(s.entry_price(true), 1.1050);
        assert_eq!(s.entry_price(false), 1.1048);
    }

    #[test]
    fn exit_price_uses_bid_for_longs() {
        let s = eurusd();
        assert_eq!(s.exit_price(true), 1.1048);
        assert_eq!(s.exit_price(false), 1.1050);
    }
}
