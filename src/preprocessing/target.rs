//! Target-space transform
//!
//! Prices are modeled as `log1p(price)` and surfaced again through `expm1`,
//! clamped at zero.

use ndarray::Array1;

/// Map a price in PKR into model space
#[inline]
pub fn to_log_space(price: f64) -> f64 {
    price.ln_1p()
}

/// Map a model-space value back to a price in PKR, never below zero
#[inline]
pub fn to_price(log_value: f64) -> f64 {
    // f64::max drops NaN, so a NaN prediction clamps to 0.0
    log_value.exp_m1().max(0.0)
}

pub fn prices_to_log_space(prices: &[f64]) -> Array1<f64> {
    prices.iter().map(|&p| to_log_space(p)).collect()
}

pub fn log_space_to_prices(values: &[f64]) -> Vec<f64> {
    values.iter().map(|&v| to_price(v)).collect()
}
