//! Order vocabulary and trading intents.

use serde::{Deserialize, Serialize};

use super::error::BridgeError;

/// Broker order type. Only `Buy` and `Sell` execute at market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
    BuyLimit,
    SellLimit,
    BuyStop,
    SellStop,
    BuyStopLimit,
    SellStopLimit,
}

impl OrderSide {
    pub fn is_market(self) -> bool {
        matches!(self, OrderSide::Buy | OrderSide::Sell)
    }

    pub fn is_buy(self) -> bool {
        matches!(
            self,
            OrderSide::Buy | OrderSide::BuyLimit | OrderSide::BuyStop | OrderSide::BuyStopLimit
        )
    }

    /// Market side that closes a position opened on this side.
    pub fn closing_side(self) -> OrderSide {
        if self.is_buy() {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
            OrderSide::BuyLimit => "buy_limit",
            OrderSide::SellLimit => "sell_limit",
            OrderSide::BuyStop => "buy_stop",
            OrderSide::SellStop => "sell_stop",
            OrderSide::BuyStopLimit => "buy_stop_limit",
            OrderSide::SellStopLimit => "sell_stop_limit",
        };
        f.write_str(name)
    }
}

/// Broker-side execution rule for a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    FillOrKill,
    ImmediateOrCancel,
    Return,
}

/// Kind of trade request sent to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    /// Immediate market deal (open or close).
    Deal,
    /// Place a pending order.
    Pending,
    /// Change stop/target of an open position.
    StopTarget,
}

/// A normalized request to open exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub price: Option<f64>,
    pub stop_points: Option<f64>,
    pub target_points: Option<f64>,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
    pub comment: String,
    pub magic_number: u64,
}

impl TradingIntent {
    /// Market intent with no protective levels.
    pub fn market(symbol: &str, side: OrderSide, volume: f64) -> Self {
        TradingIntent {
            symbol: symbol.to_string(),
            side,
            volume,
            price: None,
            stop_points: None,
            target_points: None,
            stop_price: None,
            target_price: None,
            comment: String::new(),
            magic_number: 0,
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.symbol.trim().is_empty() {
            return Err(BridgeError::validation("symbol must not be empty"));
        }
        if !(self.volume.is_finite() && self.volume > 0.0) {
            return Err(BridgeError::validation(format!(
                "volume must be positive, got {}",
                self.volume
            )));
        }
        for (name, value) in [
            ("price", self.price),
            ("stop_points", self.stop_points),
            ("target_points", self.target_points),
            ("stop_price", self.stop_price),
            ("target_price", self.target_price),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(BridgeError::validation(format!(
                        "{name} must be a non-negative number, got {v}"
                    )));
                }
            }
        }
        if !self.side.is_market() && self.price.is_none() {
            return Err(BridgeError::validation(format!(
                "{} orders require an explicit price",
                self.side
            )));
        }
        Ok(())
    }
}
