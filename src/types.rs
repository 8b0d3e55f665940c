// =============================================================================
// Shared types used across the market-pulse simulation engine
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

/// The smallest price increment the engine ever produces.
pub const TICK: f64 = 0.05;

/// Round a raw price to the nearest tick, then to two decimal places to keep
/// floating-point dust out of the wire representation.
pub fn round_tick(price: f64) -> f64 {
    let ticks = (price / TICK).round();
    let snapped = ticks * TICK;
    (snapped * 100.0).round() / 100.0
}

/// Monotonically increasing session identifier, assigned on connect and never
/// reused within a process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cross-session-unique trade identifier: `sessionId * 1_000_000 + counter`.
///
/// Per spec this silently collides if a single session exceeds one million
/// trades; `session_local_counter` is capped at that limit by `SessionState`.
pub fn make_trade_id(session: SessionId, session_local_counter: u64) -> u64 {
    (session.0 as u64) * 1_000_000 + session_local_counter
}

/// Directional / volatility regime driving `PriceEngine`'s random walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Volatile,
    Sideways,
    Choppy,
    Neutral,
}

impl Sentiment {
    /// Parse the wire representation (`"BULLISH"`, `"SIDEWAYS"`, ...).
    ///
    /// The source's internal `CALM` taxonomy is intentionally not accepted
    /// here — `SIDEWAYS` is the only wire name for that regime (spec.md §9
    /// Open Question).
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "BULLISH" => Some(Self::Bullish),
            "BEARISH" => Some(Self::Bearish),
            "VOLATILE" => Some(Self::Volatile),
            "SIDEWAYS" => Some(Self::Sideways),
            "CHOPPY" => Some(Self::Choppy),
            "NEUTRAL" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Volatile => "VOLATILE",
            Self::Sideways => "SIDEWAYS",
            Self::Choppy => "CHOPPY",
            Self::Neutral => "NEUTRAL",
        }
    }

    /// Base up-probability for the direction draw (spec.md §4.1 step 1).
    pub fn up_probability(self) -> f64 {
        match self {
            Self::Bullish => 0.65,
            Self::Bearish => 0.35,
            _ => 0.50,
        }
    }

    /// Base per-step magnitude before the intensity multiplier is applied.
    pub fn base_sigma(self) -> f64 {
        match self {
            Self::Bullish | Self::Bearish => 0.0005,
            Self::Neutral => 0.0004,
            Self::Choppy => 0.0010,
            Self::Volatile => 0.0015,
            Self::Sideways => 0.0002,
        }
    }

    /// Buy-side probability used by `SessionState::generate_trade`.
    pub fn buy_probability(self) -> f64 {
        match self {
            Self::Bullish => 0.65,
            Self::Bearish => 0.35,
            _ => 0.50,
        }
    }
}

impl Default for Sentiment {
    fn default() -> Self {
        Self::Neutral
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// Magnitude multiplier applied on top of `Sentiment::base_sigma`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intensity {
    Mild,
    Moderate,
    Normal,
    Aggressive,
    Extreme,
}

impl Intensity {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "MILD" => Some(Self::Mild),
            "MODERATE" => Some(Self::Moderate),
            "NORMAL" => Some(Self::Normal),
            "AGGRESSIVE" => Some(Self::Aggressive),
            "EXTREME" => Some(Self::Extreme),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Mild => "MILD",
            Self::Moderate => "MODERATE",
            Self::Normal => "NORMAL",
            Self::Aggressive => "AGGRESSIVE",
            Self::Extreme => "EXTREME",
        }
    }

    /// Volatility multiplier applied to `Sentiment::base_sigma`.
    pub fn volatility_multiplier(self) -> f64 {
        match self {
            Self::Mild => 0.4,
            Self::Moderate => 0.7,
            Self::Normal => 1.0,
            Self::Aggressive => 1.2,
            Self::Extreme => 1.6,
        }
    }

    /// Volume multiplier used by `SessionState::generate_trade`.
    pub fn volume_multiplier(self) -> f64 {
        match self {
            Self::Mild => 0.5,
            Self::Moderate => 0.8,
            Self::Normal => 1.0,
            Self::Aggressive => 1.2,
            Self::Extreme => 1.5,
        }
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// `NewsShockController`'s internal state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShockState {
    Idle,
    Active,
    Cooldown,
}

/// Which side of the book a synthetic trade executed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_tick_snaps_to_nearest_nickel() {
        assert_eq!(round_tick(180.02), 180.00);
        assert_eq!(round_tick(180.03), 180.05);
        assert_eq!(round_tick(100.0), 100.00);
    }

    #[test]
    fn trade_id_is_unique_across_sessions() {
        let a = make_trade_id(SessionId(1), 42);
        let b = make_trade_id(SessionId(2), 42);
        assert_ne!(a, b);
        assert_eq!(a, 1_000_042);
        assert_eq!(b, 2_000_042);
    }

    #[test]
    fn sentiment_round_trips_wire_name() {
        for s in [
            Sentiment::Bullish,
            Sentiment::Bearish,
            Sentiment::Volatile,
            Sentiment::Sideways,
            Sentiment::Choppy,
            Sentiment::Neutral,
        ] {
            assert_eq!(Sentiment::from_wire(s.as_wire()), Some(s));
        }
        assert_eq!(Sentiment::from_wire("CALM"), None);
    }

    #[test]
    fn intensity_multipliers_match_spec() {
        assert_eq!(Intensity::Mild.volatility_multiplier(), 0.4);
        assert_eq!(Intensity::Extreme.volatility_multiplier(), 1.6);
    }
}
