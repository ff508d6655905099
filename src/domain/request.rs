//! Trade requests and their terminal wire encoding.
//!
//! The engine builds [`TradeRequest`]s from typed domain values. Only
//! [`TradeRequest::to_wire`] knows the terminal's numeric codes, so the
//! rest of the crate never depends on them.

use serde::{Deserialize, Serialize};

use super::order::{FillPolicy, OrderSide, TradeAction};

/// Maximum slippage, in points, accepted for market deals.
pub const DEFAULT_DEVIATION_POINTS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub action: TradeAction,
    pub symbol: String,
    pub volume: Option<f64>,
    pub side: Option<OrderSide>,
    pub price: Option<f64>,
    pub position: Option<u64>,
    pub deviation: Option<u32>,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
    pub fill_policy: Option<FillPolicy>,
    pub magic_number: u64,
    pub comment: String,
}

impl TradeRequest {
    /// Market deal, used for both opening and closing.
    #[allow(clippy::too_many_arguments)]
    pub fn deal(
        symbol: &str,
        side: OrderSide,
        volume: f64,
        price: f64,
        deviation: u32,
        magic_number: u64,
        comment: &str,
    ) -> Self {
        TradeRequest {
            action: TradeAction::Deal,
            symbol: symbol.to_string(),
            volume: Some(volume),
            side: Some(side),
            price: Some(price),
            position: None,
            deviation: Some(deviation),
            stop_price: None,
            target_price: None,
            fill_policy: Some(FillPolicy::ImmediateOrCancel),
            magic_number,
            comment: comment.to_string(),
        }
    }

    /// Pending order resting at `price`.
    pub fn pending(
        symbol: &str,
        side: OrderSide,
        volume: f64,
        price: f64,
        magic_number: u64,
        comment: &str,
    ) -> Self {
        TradeRequest {
            action: TradeAction::Pending,
            symbol: symbol.to_string(),
            volume: Some(volume),
            side: Some(side),
            price: Some(price),
            position: None,
            deviation: None,
            stop_price: None,
            target_price: None,
            fill_policy: Some(FillPolicy::Return),
            magic_number,
            comment: comment.to_string(),
        }
    }

    /// Stop/target change on an open position. Carries no price or volume.
    pub fn stop_target(
        symbol: &str,
        position: u64,
        stop_price: Option<f64>,
        target_price: Option<f64>,
        magic_number: u64,
    ) -> Self {
        TradeRequest {
            action: TradeAction::StopTarget,
            symbol: symbol.to_string(),
            volume: None,
            side: None,
            price: None,
            position: Some(position),
            deviation: None,
            stop_price,
            target_price,
            fill_policy: None,
            magic_number,
            comment: String::new(),
        }
    }

    pub fn with_protection(mut self, stop_price: Option<f64>, target_price: Option<f64>) -> Self {
        self.stop_price = stop_price;
        self.target_price = target_price;
        self
    }

    pub fn closing(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn to_wire(&self) -> WireRequest {
        WireRequest {
            action: encode_action(self.action),
            symbol: self.symbol.clone(),
            volume: self.volume.unwrap_or(0.0),
            order_type: self.side.map(encode_side).unwrap_or(0),
            price: self.price.unwrap_or(0.0),
            position: self.position.unwrap_or(0),
            deviation: self.deviation.unwrap_or(0),
            sl: self.stop_price.unwrap_or(0.0),
            tp: self.target_price.unwrap_or(0.0),
            type_filling: self.fill_policy.map(encode_fill_policy).unwrap_or(0),
            magic: self.magic_number,
            comment: self.comment.clone(),
        }
    }
}

/// Request in the terminal's own encoding. Zero means "not set".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    pub action: u32,
    pub symbol: String,
    pub volume: f64,
    pub order_type: u32,
    pub price: f64,
    pub position: u64,
    pub deviation: u32,
    pub sl: f64,
    pub tp: f64,
    pub type_filling: u32,
    pub magic: u64,
    pub comment: String,
}

/// Terminal reply to a [`WireRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireResponse {
    pub retcode: u32,
    pub price: f64,
    /// Ticket assigned to the resulting order, zero when none.
    pub order: u64,
    pub comment: String,
}

pub const WIRE_ACTION_DEAL: u32 = 1;
pub const WIRE_ACTION_PENDING: u32 = 5;
pub const WIRE_ACTION_SLTP: u32 = 6;

pub fn encode_action(action: TradeAction) -> u32 {
    match action {
        TradeAction::Deal => WIRE_ACTION_DEAL,
        TradeAction::Pending => WIRE_ACTION_PENDING,
        TradeAction::StopTarget => WIRE_ACTION_SLTP,
    }
}

pub fn decode_action(code: u32) -> Option<TradeAction> {
    match code {
        WIRE_ACTION_DEAL => Some(TradeAction::Deal),
        WIRE_ACTION_PENDING => Some(TradeAction::Pending),
        WIRE_ACTION_SLTP => Some(TradeAction::StopTarget),
        _ => None,
    }
}

pub fn encode_side(side: OrderSide) -> u32 {
    match side {
        OrderSide::Buy => 0,
        OrderSide::Sell => 1,
        OrderSide::BuyLimit => 2,
        OrderSide::SellLimit => 3,
        OrderSide::BuyStop => 4,
        OrderSide::SellStop => 5,
        OrderSide::BuyStopLimit => 6,
        OrderSide::SellStopLimit => 7,
    }
}

pub fn decode_side(code: u32) -> Option<OrderSide> {
    match code {
        0 => Some(OrderSide::Buy),
        1 => Some(OrderSide::Sell),
        2 => Some(OrderSide::BuyLimit),
        3 => Some(OrderSide::SellLimit),
        4 => Some(OrderSide::BuyStop),
        5 => Some(OrderSide::SellStop),
        6 => Some(OrderSide::BuyStopLimit),
        7 => Some(OrderSide::SellStopLimit),
        _ => None,
    }
}

pub fn encode_fill_policy(policy: FillPolicy) -> u32 {
    match policy {
        FillPolicy::FillOrKill => 0,
        FillPolicy::ImmediateOrCancel => 1,
        FillPolicy::Return => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deal_uses_ioc_and_deviation() {
        let wire =
            TradeRequest::deal("EURUSD", OrderSide::Buy, 0.1, 1.105, 20, 77, "alert").to_wire();
        assert_eq!(wire.action, WIRE_ACTION_DEAL);
        assert_eq!(wire.order_type, 0);
        assert_eq!(wire.type_filling, 1);
        assert_eq!(wire.deviation, 20);
        assert_eq!(wire.magic, 77);
        assert_eq!(wire.position, 0);
    }

    #[test]
    fn stop_target_carries_no_price_or_volume() {
        let wire = TradeRequest::stop_target("EURUSD", 123, Some(1.09), Some(1.12), 0).to_wire();
        assert_eq!(wire.action, WIRE_ACTION_SLTP);
        assert_eq!(wire.volume, 0.0);
        assert_eq!(wire.price, 0.0);
        assert_eq!(wire.position, 123);
        assert_eq!(wire.sl, 1.09);
        assert_eq!(wire.tp, 1.12);
    }

    #[test]
    fn closing_sets_position_reference() {
        let wire = TradeRequest::deal("EURUSD", OrderSide::Sell, 0.1, 1.1, 20, 0, "close")
            .closing(555)
            .to_wire();
        assert_eq!(wire.position, 555);
        assert_eq!(wire.order_type, 1);
    }

    #[test]
    fn pending_uses_return_policy() {
        let wire =
            TradeRequest::pending("EURUSD", OrderSide::BuyLimit, 0.1, 1.09, 0, "").to_wire();
        assert_eq!(wire.action, WIRE_ACTION_PENDING);
        assert_eq!(wire.type_filling, 2);
        assert_eq!(wire.order_type, 2);
    }

    #[test]
    fn side_codes_decode_back() {
        for side in [
            OrderSide::Buy,
            OrderSide::Sell,
            OrderSide::BuyLimit,
            OrderSide::SellLimit,
            OrderSide::BuyStop,
            OrderSide::SellStop,
            OrderSide::BuyStopLimit,
            OrderSide::SellStopLimit,
        ] {
            assert_eq!(decode_side(encode_side(side)), Some(side));
        }
        assert_eq!(decode_side(8), None);
    }
}
