// =============================================================================
// PriceEngine — stochastic price process with pullbacks and news shocks
// =============================================================================
//
// Grounded on spec.md §4.1. The teacher crate never generates synthetic
// prices (it consumes a live Binance feed), so the stochastic machinery here
// is enriched from the wider retrieval pack: `guribe94-bog` and
// `uprootiny-arbitragefx` both pull in `rand = "0.8"` for this kind of
// per-component RNG, which this module follows (see DESIGN.md).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::news_shock::NewsShockController;
use crate::types::{round_tick, Intensity, Sentiment};

/// Forced counter-trend runs last between 2 and 5 ticks.
const PULLBACK_RUN_MIN: u32 = 2;
const PULLBACK_RUN_MAX: u32 = 5;
/// A new pullback threshold is drawn from this range at the start of every trend.
const PULLBACK_THRESHOLD_MIN: u32 = 8;
const PULLBACK_THRESHOLD_MAX: u32 = 15;

/// Result of one `PriceEngine::next_price` call.
#[derive(Debug, Clone, Copy)]
pub struct PriceStep {
    pub price: f64,
    pub shock_applied: bool,
    pub shock_type: Option<&'static str>,
}

/// Owns the trend/pullback state machine and its own RNG (spec.md §3).
pub struct PriceEngine {
    rng: StdRng,
    direction: i8,
    moves_in_trend: u32,
    pullback_remaining: u32,
    pullback_threshold: u32,
}

impl PriceEngine {
    pub fn new() -> Self {
        let mut rng = StdRng::from_entropy();
        let pullback_threshold = rng.gen_range(PULLBACK_THRESHOLD_MIN..=PULLBACK_THRESHOLD_MAX);
        Self {
            rng,
            direction: 0,
            moves_in_trend: 0,
            pullback_remaining: 0,
            pullback_threshold,
        }
    }

    #[cfg(test)]
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let pullback_threshold = rng.gen_range(PULLBACK_THRESHOLD_MIN..=PULLBACK_THRESHOLD_MAX);
        Self {
            rng,
            direction: 0,
            moves_in_trend: 0,
            pullback_remaining: 0,
            pullback_threshold,
        }
    }

    /// Reset trend/pullback bookkeeping (called from `SessionState::reset`).
    pub fn reset(&mut self) {
        self.direction = 0;
        self.moves_in_trend = 0;
        self.pullback_remaining = 0;
        self.pullback_threshold = self
            .rng
            .gen_range(PULLBACK_THRESHOLD_MIN..=PULLBACK_THRESHOLD_MAX);
    }

    /// Called whenever the caller changes sentiment: resets the trend counter
    /// without touching any in-flight pullback (spec.md §3 invariant).
    pub fn notify_sentiment_changed(&mut self) {
        self.moves_in_trend = 0;
    }

    /// Draw a bounded, roughly-normal value via Box-Muller, clamped to
    /// +/-3 standard deviations so no single tick can run away.
    fn truncated_normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z.clamp(-3.0, 3.0)
    }

    /// spec.md §4.1: advance the price process by one tick.
    pub fn next_price(
        &mut self,
        current: f64,
        sentiment: Sentiment,
        intensity: Intensity,
        shock: &mut NewsShockController,
    ) -> PriceStep {
        if shock.is_active() {
            let outcome = shock.try_shock();
            if outcome.fired {
                let price = round_tick((current * outcome.multiplier).max(TICK_FLOOR));
                return PriceStep {
                    price,
                    shock_applied: true,
                    shock_type: outcome.label,
                };
            }
        }

        let mut p_up = sentiment.up_probability();
        let mut sigma = sentiment.base_sigma() * intensity.volatility_multiplier();

        if self.pullback_remaining > 0 {
            p_up = 1.0 - p_up;
            let scale = self.rng.gen_range(0.7..=0.9);
            sigma *= scale;
            self.pullback_remaining -= 1;
        } else {
            self.moves_in_trend += 1;
            if self.moves_in_trend >= self.pullback_threshold {
                self.pullback_remaining = self.rng.gen_range(PULLBACK_RUN_MIN..=PULLBACK_RUN_MAX);
                self.pullback_threshold =
                    self.rng.gen_range(PULLBACK_THRESHOLD_MIN..=PULLBACK_THRESHOLD_MAX);
                self.moves_in_trend = 0;
            }
        }

        let u: f64 = self.rng.gen_range(0.0..1.0);
        let sign: f64 = if u < p_up { 1.0 } else { -1.0 };
        self.direction = sign as i8;

        let magnitude = current * sigma * self.truncated_normal().abs();
        let next = current + sign * magnitude;
        let price = round_tick(next.max(TICK_FLOOR));

        PriceStep {
            price,
            shock_applied: false,
            shock_type: None,
        }
    }
}

/// A session-ending non-positive price is the caller's responsibility
/// (spec.md §4.1 step 5); this floor only keeps the engine's own arithmetic
/// from producing a non-positive intermediate price.
const TICK_FLOOR: f64 = crate::types::TICK;

impl Default for PriceEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_stays_tick_aligned() {
        let mut engine = PriceEngine::from_seed(7);
        let mut shock = NewsShockController::from_seed(7);
        let mut price = 180.00;
        for _ in 0..500 {
            let step = engine.next_price(price, Sentiment::Choppy, Intensity::Extreme, &mut shock);
            let remainder = (step.price / crate::types::TICK).round() * crate::types::TICK;
            assert!((remainder - step.price).abs() < 1e-9);
            assert!(step.price > 0.0);
            price = step.price;
        }
    }

    #[test]
    fn pullback_eventually_fires_on_a_persistent_trend() {
        let mut engine = PriceEngine::from_seed(11);
        let mut shock = NewsShockController::from_seed(11);
        let mut price = 200.0;
        let mut saw_pullback_state = false;
        for _ in 0..60 {
            engine.next_price(price, Sentiment::Bullish, Intensity::Normal, &mut shock);
            if engine.pullback_remaining > 0 {
                saw_pullback_state = true;
            }
            price = 200.0;
        }
        assert!(saw_pullback_state, "expected at least one forced pullback within 60 ticks");
    }

    #[test]
    fn reset_clears_trend_state() {
        let mut engine = PriceEngine::from_seed(3);
        let mut shock = NewsShockController::from_seed(3);
        for _ in 0..20 {
            engine.next_price(180.0, Sentiment::Bearish, Intensity::Aggressive, &mut shock);
        }
        engine.reset();
        assert_eq!(engine.moves_in_trend, 0);
        assert_eq!(engine.pullback_remaining, 0);
    }
}
