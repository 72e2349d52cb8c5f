//! Mapping between prices and the regressor's target space.
//!
//! The regressor is fitted on `ln(1 + price)`; predictions come back through
//! the exact inverse `exp(l) - 1`.

use tracing::warn;

/// `ln(1 + price)`.
pub fn to_model_space(price: f64) -> f64 {
    price.ln_1p()
}

/// `exp(l) - 1`, inverse of [`to_model_space`].
pub fn from_model_space(log_price: f64) -> f64 {
    log_price.exp_m1()
}

/// Inverse transform followed by a clamp at zero.
///
/// A negative result can only come from a log prediction below zero; it is
/// reported and replaced by `0.0`.
pub fn to_price(log_price: f64) -> f64 {
    let price = from_model_space(log_price);
    if price < 0.0 {
        warn!(log_price, price, "negative predicted price clamped to 0");
        0.0
    } else {
        price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_eq!(to_model_space(0.0), 0.0);
        assert!((to_model_space(std::f64::consts::E - 1.0) - 1.0).abs() < 1e-12);
        assert_eq!(from_model_space(0.0), 0.0);
    }

    #[test]
    fn test_negative_prediction_is_clamped() {
        assert_eq!(to_price(-3.0), 0.0);
        assert!((to_price(to_model_space(1_250_000.0)) - 1_250_000.0).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_round_trip_is_exact(price in 0.0f64..1e9) {
            let back = from_model_space(to_model_space(price));
            prop_assert!((back - price).abs() <= 1e-9 * price.max(1.0));
        }
    }
}
