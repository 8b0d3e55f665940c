// =============================================================================
// Configuration — server-wide startup settings and per-session config
// =============================================================================
//
// `ServerConfig` mirrors the teacher's `RuntimeConfig` struct-of-defaults
// shape (see `runtime_config.rs` in the teacher repo) but drops the
// file-persistence layer: the core does not persist state across restarts
// (spec.md §1 Non-goals), so there is nothing here worth saving to disk.
// `PORT` is the only environment input the core consults (spec.md §6).

use crate::clamp::{clamp_base_price, clamp_spread, clamp_speed, clamp_symbol};
use crate::types::{Intensity, Sentiment};

/// Process-wide server settings, built once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port the combined HTTP/WebSocket listener binds to.
    pub port: u16,
    /// Base period of the `SessionDispatcher` (spec.md §4.9).
    pub dispatcher_interval_ms: u64,
    /// How often housekeeping checks for 60-minute session timeouts.
    pub housekeeping_timeout_check_ms: u64,
    /// How often housekeeping emits the per-session summary log.
    pub housekeeping_summary_ms: u64,
    /// Hard per-session lifetime cap (spec.md §4.8).
    pub session_timeout_ms: i64,
    /// Bound on each session's outbound message queue (spec.md §4.8).
    pub outbound_queue_capacity: usize,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);

        Self {
            port,
            ..Self::defaults()
        }
    }

    fn defaults() -> Self {
        Self {
            port: 8080,
            dispatcher_interval_ms: 50,
            housekeeping_timeout_check_ms: 10_000,
            housekeeping_summary_ms: 30_000,
            session_timeout_ms: 3_600_000,
            outbound_queue_capacity: 100,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Immutable-after-validation per-session configuration (spec.md §3).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub symbol: String,
    pub base_price: f64,
    pub spread: f64,
    pub sentiment: Sentiment,
    pub intensity: Intensity,
    pub speed: f64,
}

impl SessionConfig {
    pub fn new(
        symbol: &str,
        base_price: f64,
        spread: f64,
        sentiment: Sentiment,
        intensity: Intensity,
        speed: f64,
    ) -> Self {
        let symbol = clamp_symbol(symbol);
        let symbol = if symbol.is_empty() {
            "SYN".to_string()
        } else {
            symbol
        };
        Self {
            symbol,
            base_price: clamp_base_price(base_price),
            spread: clamp_spread(spread),
            sentiment,
            intensity,
            speed: clamp_speed(speed),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(
            "SYN",
            180.00,
            0.10,
            Sentiment::default(),
            Intensity::default(),
            1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_every_field() {
        let cfg = SessionConfig::new("aapl", 50.0, 10.0, Sentiment::Bullish, Intensity::Extreme, 99.0);
        assert_eq!(cfg.symbol, "AAPL");
        assert_eq!(cfg.base_price, 100.0);
        assert_eq!(cfg.spread, 0.25);
        assert_eq!(cfg.speed, 2.0);
    }

    #[test]
    fn empty_symbol_falls_back() {
        let cfg = SessionConfig::new("---", 180.0, 0.1, Sentiment::Neutral, Intensity::Normal, 1.0);
        assert_eq!(cfg.symbol, "SYN");
    }
}
