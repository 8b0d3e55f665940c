// =============================================================================
// NewsShockController — bounded shock state machine with cooldown
// =============================================================================
//
// Grounded on spec.md §4.2. Structured the way the teacher's small
// single-purpose state holders are (e.g. `exit/micro_trail.rs`,
// `regime/detector.rs`): a plain struct with timestamp fields and an explicit
// `tick`/transition method, no external state-machine crate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::ShockState;

const ACTIVE_DURATION_MS: i64 = 5_000;
const COOLDOWN_DURATION_MS: i64 = 20_000;
const WARMUP_TICKS: u32 = 20;
const FIRE_PROBABILITY: f64 = 0.03;
const SHOCK_PCT_MIN: f64 = 0.01;
const SHOCK_PCT_MAX: f64 = 0.03;

/// Outcome of one `try_shock` draw.
#[derive(Debug, Clone, Copy)]
pub struct ShockOutcome {
    pub fired: bool,
    pub multiplier: f64,
    pub label: Option<&'static str>,
}

impl ShockOutcome {
    fn none() -> Self {
        Self {
            fired: false,
            multiplier: 1.0,
            label: None,
        }
    }
}

pub struct NewsShockController {
    rng: StdRng,
    state: ShockState,
    active_until_ms: i64,
    cooldown_until_ms: i64,
    ticks_since_last_shock: u32,
}

impl NewsShockController {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            state: ShockState::Idle,
            active_until_ms: 0,
            cooldown_until_ms: 0,
            ticks_since_last_shock: 0,
        }
    }

    #[cfg(test)]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            state: ShockState::Idle,
            active_until_ms: 0,
            cooldown_until_ms: 0,
            ticks_since_last_shock: 0,
        }
    }

    pub fn reset(&mut self) {
        self.state = ShockState::Idle;
        self.active_until_ms = 0;
        self.cooldown_until_ms = 0;
        self.ticks_since_last_shock = 0;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ShockState::Active)
    }

    pub fn is_cooldown(&self) -> bool {
        matches!(self.state, ShockState::Cooldown)
    }

    /// Idle -> Active. Rejected while still inside a cooldown window.
    pub fn enable(&mut self, now_ms: i64) -> bool {
        if now_ms < self.cooldown_until_ms {
            return false;
        }
        self.state = ShockState::Active;
        self.active_until_ms = now_ms + ACTIVE_DURATION_MS;
        self.ticks_since_last_shock = 0;
        true
    }

    /// Forces an immediate transition out of Active into Cooldown. A no-op
    /// outside Active.
    pub fn disable(&mut self, now_ms: i64) {
        if matches!(self.state, ShockState::Active) {
            self.state = ShockState::Cooldown;
            self.cooldown_until_ms = now_ms + COOLDOWN_DURATION_MS;
        }
    }

    /// Advance the state machine's wall-clock-driven transitions. Must be
    /// called once per tick before `try_shock`.
    pub fn tick(&mut self, now_ms: i64) {
        match self.state {
            ShockState::Idle => {}
            ShockState::Active => {
                if now_ms >= self.active_until_ms {
                    self.state = ShockState::Cooldown;
                    self.cooldown_until_ms = now_ms + COOLDOWN_DURATION_MS;
                }
            }
            ShockState::Cooldown => {
                if now_ms >= self.cooldown_until_ms {
                    self.state = ShockState::Idle;
                }
            }
        }
    }

    /// spec.md §4.2 "tryShock()" — only meaningful while Active.
    pub fn try_shock(&mut self) -> ShockOutcome {
        if !self.is_active() {
            return ShockOutcome::none();
        }

        self.ticks_since_last_shock += 1;
        if self.ticks_since_last_shock < WARMUP_TICKS {
            return ShockOutcome::none();
        }

        if self.rng.gen_range(0.0..1.0) < FIRE_PROBABILITY {
            let direction: f64 = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let pct = self.rng.gen_range(SHOCK_PCT_MIN..=SHOCK_PCT_MAX);
            self.ticks_since_last_shock = 0;
            ShockOutcome {
                fired: true,
                multiplier: 1.0 + direction * pct,
                label: if direction > 0.0 {
                    Some("bullish")
                } else {
                    Some("bearish")
                },
            }
        } else {
            ShockOutcome::none()
        }
    }

    pub fn active_remaining_sec(&self, now_ms: i64) -> u64 {
        if !self.is_active() {
            return 0;
        }
        let remaining_ms = (self.active_until_ms - now_ms).max(0);
        ((remaining_ms as f64) / 1000.0).ceil() as u64
    }

    pub fn cooldown_remaining_sec(&self, now_ms: i64) -> u64 {
        if !self.is_cooldown() {
            return 0;
        }
        let remaining_ms = (self.cooldown_until_ms - now_ms).max(0);
        ((remaining_ms as f64) / 1000.0).ceil() as u64
    }
}

impl Default for NewsShockController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_starts_a_five_second_window() {
        let mut shock = NewsShockController::from_seed(1);
        assert!(shock.enable(0));
        assert!(shock.is_active());
        shock.tick(4_999);
        assert!(shock.is_active());
        shock.tick(5_000);
        assert!(shock.is_cooldown());
        assert_eq!(shock.cooldown_until_ms, 5_000 + COOLDOWN_DURATION_MS);
    }

    #[test]
    fn cooldown_blocks_reenable() {
        let mut shock = NewsShockController::from_seed(2);
        shock.enable(0);
        shock.tick(5_000);
        assert!(!shock.enable(10_000));
        shock.tick(25_000);
        assert!(shock.enable(25_000));
    }

    #[test]
    fn never_active_and_cooldown_simultaneously() {
        let mut shock = NewsShockController::from_seed(4);
        shock.enable(0);
        for now in (0..30_000).step_by(100) {
            shock.tick(now);
            assert!(!(shock.is_active() && shock.is_cooldown()));
        }
    }

    #[test]
    fn try_shock_is_noop_before_warmup() {
        let mut shock = NewsShockController::from_seed(5);
        shock.enable(0);
        for _ in 0..19 {
            assert!(!shock.try_shock().fired);
        }
    }

    #[test]
    fn disable_forces_cooldown() {
        let mut shock = NewsShockController::from_seed(6);
        shock.enable(0);
        shock.disable(1_000);
        assert!(shock.is_cooldown());
        assert_eq!(shock.cooldown_until_ms, 1_000 + COOLDOWN_DURATION_MS);
    }
}
