// =============================================================================
// Single-place validation/clamping boundary (spec.md §9 Design Note #3)
// =============================================================================
//
// Every field that can arrive from a client command or a session config is
// clamped here and nowhere else, so there is exactly one place to audit for
// the bounds in spec.md §3.

pub const BASE_PRICE_MIN: f64 = 100.00;
pub const BASE_PRICE_MAX: f64 = 500.00;
pub const SPREAD_MIN: f64 = 0.05;
pub const SPREAD_MAX: f64 = 0.25;
pub const SPEED_MIN: f64 = 0.25;
pub const SPEED_MAX: f64 = 2.0;
pub const SYMBOL_MAX_LEN: usize = 6;

use crate::types::round_tick;

pub fn clamp_base_price(value: f64) -> f64 {
    round_tick(value.clamp(BASE_PRICE_MIN, BASE_PRICE_MAX))
}

pub fn clamp_spread(value: f64) -> f64 {
    round_tick(value.clamp(SPREAD_MIN, SPREAD_MAX))
}

pub fn clamp_speed(value: f64) -> f64 {
    value.clamp(SPEED_MIN, SPEED_MAX)
}

/// Upper-case and truncate a symbol to the wire-legal length.
pub fn clamp_symbol(value: &str) -> String {
    let upper: String = value.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let upper = upper.to_ascii_uppercase();
    upper.chars().take(SYMBOL_MAX_LEN).collect()
}
