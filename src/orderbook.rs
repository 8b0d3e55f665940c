// =============================================================================
// SyntheticOrderBook — display-only depth book regenerated every tick
// =============================================================================
//
// Grounded on the teacher's `market_data::orderbook::OrderBookManager`,
// generalized from "summary stats (best bid/ask, aggregate depth) pulled
// from a live Binance depth stream" to "15 full price levels per side,
// synthesized around the current price" (spec.md §4.4). No order matching
// occurs; this is pure visualization.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::types::{round_tick, Sentiment, TICK};

pub const DEPTH_LEVELS: usize = 15;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OrderLevel {
    pub price: f64,
    pub quantity: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookSnapshot {
    pub bids: Vec<OrderLevel>,
    pub asks: Vec<OrderLevel>,
    pub best_bid: f64,
    pub best_ask: f64,
    pub spread: f64,
}

pub struct SyntheticOrderBook {
    rng: StdRng,
}

impl SyntheticOrderBook {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// spec.md §4.4.
    pub fn regenerate(
        &mut self,
        current_price: f64,
        spread: f64,
        sentiment: Sentiment,
    ) -> OrderBookSnapshot {
        let half = (spread.max(TICK)) / 2.0;
        let mut best_bid = round_tick(current_price - half);
        let mut best_ask = round_tick(current_price + half);

        if best_bid >= best_ask {
            let mid = round_tick(current_price);
            best_bid = mid - TICK;
            best_ask = mid + TICK;
        }

        let (bid_mult, ask_mult) = match sentiment {
            Sentiment::Bullish => (1.3, 0.7),
            Sentiment::Bearish => (0.7, 1.3),
            _ => (1.0, 1.0),
        };

        let mut bids = Vec::with_capacity(DEPTH_LEVELS);
        let mut asks = Vec::with_capacity(DEPTH_LEVELS);

        for i in 0..DEPTH_LEVELS {
            let base_qty: f64 = self.rng.gen_range(50.0..=500.0);
            let tapered = (base_qty * (DEPTH_LEVELS - i) as f64 / DEPTH_LEVELS as f64).max(10.0);

            let bid_price = round_tick(best_bid - (i as f64) * TICK);
            let bid_qty = (tapered * bid_mult).round().max(1.0) as u64;
            bids.push(OrderLevel {
                price: bid_price,
                quantity: bid_qty,
            });

            let base_qty: f64 = self.rng.gen_range(50.0..=500.0);
            let tapered = (base_qty * (DEPTH_LEVELS - i) as f64 / DEPTH_LEVELS as f64).max(10.0);
            let ask_price = round_tick(best_ask + (i as f64) * TICK);
            let ask_qty = (tapered * ask_mult).round().max(1.0) as u64;
            asks.push(OrderLevel {
                price: ask_price,
                quantity: ask_qty,
            });
        }

        OrderBookSnapshot {
            bids,
            asks,
            best_bid,
            best_ask,
            spread: round_tick(best_ask - best_bid),
        }
    }
}

impl Default for SyntheticOrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_fifteen_levels_each_side_with_positive_spread() {
        let mut book = SyntheticOrderBook::from_seed(1);
        let snap = book.regenerate(180.0, 0.10, Sentiment::Neutral);
        assert_eq!(snap.bids.len(), DEPTH_LEVELS);
        assert_eq!(snap.asks.len(), DEPTH_LEVELS);
        assert!(snap.best_bid < snap.best_ask);
        assert!((snap.spread - (snap.best_ask - snap.best_bid)).abs() < 1e-9);
    }

    #[test]
    fn degenerate_spread_still_separates_best_levels() {
        let mut book = SyntheticOrderBook::from_seed(2);
        let snap = book.regenerate(100.0, 0.0, Sentiment::Neutral);
        assert!(snap.best_bid < snap.best_ask);
    }

    #[test]
    fn bullish_bias_favors_bid_quantity() {
        let mut book = SyntheticOrderBook::from_seed(3);
        let snap = book.regenerate(180.0, 0.10, Sentiment::Bullish);
        let bid_total: u64 = snap.bids.iter().map(|l| l.quantity).sum();
        let ask_total: u64 = snap.asks.iter().map(|l| l.quantity).sum();
        assert!(bid_total > ask_total);
    }

    #[test]
    fn levels_step_by_one_tick() {
        let mut book = SyntheticOrderBook::from_seed(4);
        let snap = book.regenerate(180.0, 0.10, Sentiment::Neutral);
        for w in snap.bids.windows(2) {
            assert!((w[0].price - w[1].price - TICK).abs() < 1e-9);
        }
        for w in snap.asks.windows(2) {
            assert!((w[1].price - w[0].price - TICK).abs() < 1e-9);
        }
    }
}
