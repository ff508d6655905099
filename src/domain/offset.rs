//! Point-offset to price conversion for protective levels.
//!
//! A stop always sits on the losing side of the reference price and a
//! target on the winning side:
//!
//! | side | stop                  | target                |
//! |------|-----------------------|-----------------------|
//! | Buy  | reference - points*pt | reference + points*pt |
//! | Sell | reference + points*pt | reference - points*pt |

use serde::{Deserialize, Serialize};

use super::error::BridgeError;
use super::order::OrderSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffsetRole {
    Stop,
    Target,
}

/// Convert a point offset into an absolute price.
///
/// Only market sides are supported; pending orders must carry explicit
/// protective prices.
pub fn apply_offset(
    side: OrderSide,
    reference_price: f64,
    points: f64,
    point_size: f64,
    role: OffsetRole,
) -> Result<f64, BridgeError> {
    let distance = points * point_size;
    match (side, role) {
        (OrderSide::Buy, OffsetRole::Stop) | (OrderSide::Sell, OffsetRole::Target) => {
            Ok(reference_price - distance)
        }
        (OrderSide::Buy, OffsetRole::Target) | (OrderSide::Sell, OffsetRole::Stop) => {
            Ok(reference_price + distance)
        }
        (pending, _) => Err(BridgeError::validation(format!(
            "point offsets are not supported for {pending} orders, supply an explicit price"
        ))),
    }
}

/// Final stop or target: the explicit price if given, otherwise the
/// offset-derived one, otherwise none.
pub fn resolve_protective_price(
    side: OrderSide,
    reference_price: f64,
    point_size: f64,
    role: OffsetRole,
    explicit: Option<f64>,
    points: Option<f64>,
) -> Result<Option<f64>, BridgeError> {
    if explicit.is_some() {
        return Ok(explicit);
    }
    points
        .map(|p| apply_offset(side, reference_price, p, point_size, role))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn buy_stop_below_target_above() {
        let stop = apply_offset(OrderSide::Buy, 100.0, 50.0, 0.01, OffsetRole::Stop).unwrap();
        let target = apply_offset(OrderSide::Buy, 100.0, 50.0, 0.01, OffsetRole::Target).unwrap();
        assert_abs_diff_eq!(stop, 99.5, epsilon = 1e-9);
        assert_abs_diff_eq!(target, 100.5, epsilon = 1e-9);
    }

    #[test]
    fn sell_stop_above_target_below() {
        let stop = apply_offset(OrderSide::Sell, 100.0, 50.0, 0.01, OffsetRole::Stop).unwrap();
        let target =
            apply_offset(OrderSide::Sell, 100.0, 50.0, 0.01, OffsetRole::Target).unwrap();
        assert_abs_diff_eq!(stop, 100.5, epsilon = 1e-9);
        assert_abs_diff_eq!(target, 99.5, epsilon = 1e-9);
    }

    #[test]
    fn zero_points_returns_reference() {
        let stop = apply_offset(OrderSide::Buy, 1.2345, 0.0, 0.0001, OffsetRole::Stop).unwrap();
        assert_abs_diff_eq!(stop, 1.2345, epsilon = 1e-12);
    }

    #[test]
    fn pending_sides_are_rejected() {
        let err = apply_offset(OrderSide::BuyLimit, 100.0, 10.0, 0.01, OffsetRole::Stop)
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation { .. }));
    }

    #[test]
    fn explicit_price_overrides_offset() {
        let stop = resolve_protective_price(
            OrderSide::Buy,
            100.0,
            0.01,
            OffsetRole::Stop,
            Some(90.0),
            Some(50.0),
        )
        .unwrap();
        assert_eq!(stop, Some(90.0));
    }

    #[test]
    fn explicit_price_skips_offset_math_for_pending_sides() {
        let target = resolve_protective_price(
            OrderSide::SellStop,
            100.0,
            0.01,
            OffsetRole::Target,
            Some(95.0),
            Some(20.0),
        )
        .unwrap();
        assert_eq!(target, Some(95.0));
    }

    #[test]
    fn neither_explicit_nor_offset_is_none() {
        let stop =
            resolve_protective_price(OrderSide::Sell, 100.0, 0.01, OffsetRole::Stop, None, None)
                .unwrap();
        assert_eq!(stop, None);
    }

    proptest! {
        #[test]
        fn stop_is_adverse_and_target_favorable(
            reference in 1.0f64..10_000.0,
            points in 0.0f64..100_000.0,
            point_exp in 0u32..6,
        ) {
            let point_size = 10f64.powi(-(point_exp as i32));
            let distance = points * point_size;

            let buy_stop = apply_offset(OrderSide::Buy, reference, points, point_size, OffsetRole::Stop).unwrap();
            let buy_target = apply_offset(OrderSide::Buy, reference, points, point_size, OffsetRole::Target).unwrap();
            let sell_stop = apply_offset(OrderSide::Sell, reference, points, point_size, OffsetRole::Stop).unwrap();
            let sell_target = apply_offset(OrderSide::Sell, reference, points, point_size, OffsetRole::Target).unwrap();

            prop_assert!(buy_stop <= reference);
            prop_assert!(buy_target >= reference);
            prop_assert!(sell_stop >= reference);
            prop_assert!(sell_target <= reference);
            prop_assert!((buy_target - reference - distance).abs() <= 1e-9 * reference.max(distance).max(1.0));
            prop_assert_eq!(buy_stop, sell_target);
            prop_assert_eq!(buy_target, sell_stop);
        }
    }
}
