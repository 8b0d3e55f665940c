// =============================================================================
// TickEncoder — wire frame construction (spec.md §4.6, §6)
// =============================================================================
//
// Grounded on the teacher's preference for typed `Serialize` structs over ad
// hoc `serde_json::json!` assembly for anything pushed to a client (see
// `market_data::orderbook::OrderBookState`, `app_state::ErrorRecord`). The
// outer envelope uses an internally-tagged enum so `{"type": "...", ...}`
// falls out of `#[serde(tag = "type")]` instead of being hand-built.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::candles::Candle;
use crate::orderbook::OrderLevel;
use crate::session::{AdvanceOutcome, SessionState, TradeData};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookWire {
    pub bids: Vec<OrderLevel>,
    pub asks: Vec<OrderLevel>,
    pub best_bid: f64,
    pub best_ask: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsWire {
    pub symbol: String,
    pub current_price: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub total_orders: u64,
    pub total_trades: u64,
    pub total_volume: u64,
    pub market_order_pct: f64,
    pub sentiment: &'static str,
    pub intensity: &'static str,
    pub spread: f64,
    pub speed: f64,
    pub paused: bool,
    pub news_shock_enabled: bool,
    pub news_shock_cooldown: bool,
    pub news_shock_cooldown_remaining: u64,
    pub news_shock_active_remaining: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePointWire {
    pub timestamp: i64,
    pub price: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCandleWire {
    pub timeframe: u32,
    pub candle: Candle,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickData {
    pub orderbook: OrderBookWire,
    pub stats: StatsWire,
    pub price: PricePointWire,
    pub current_candles: BTreeMap<u32, Candle>,
    pub completed_candles: Option<Vec<CompletedCandleWire>>,
    pub trade: Option<TradeData>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleHistoryData {
    pub timeframe: u32,
    pub candles: Vec<Candle>,
    pub current: Option<Candle>,
}

/// Every frame the server can push, internally tagged by `"type"` to match
/// spec.md §6 exactly.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "tick")]
    Tick { data: TickData },
    #[serde(rename = "candleHistory")]
    CandleHistory { data: CandleHistoryData },
    #[serde(rename = "simulationReset")]
    SimulationReset,
    #[serde(rename = "candleReset")]
    CandleReset,
    #[serde(rename = "pong")]
    Pong { timestamp: serde_json::Value },
    #[serde(rename = "timeout")]
    Timeout { message: String },
}

impl ServerFrame {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"type\":\"encodeError\"}".to_string())
    }
}

/// spec.md §4.6: builds one `tick` frame from a session's post-`advance`
/// state. Reads only — the encoder never mutates `SessionState`.
pub fn encode_tick(session: &SessionState, outcome: &AdvanceOutcome) -> ServerFrame {
    let book = &session.last_book;
    let orderbook = OrderBookWire {
        bids: book.bids.clone(),
        asks: book.asks.clone(),
        best_bid: book.best_bid,
        best_ask: book.best_ask,
        spread: book.spread,
    };

    let market_order_pct = if session.total_orders == 0 {
        0.0
    } else {
        (session.market_orders as f64) / (session.total_orders as f64) * 100.0
    };

    let stats = StatsWire {
        symbol: session.config.symbol.clone(),
        current_price: session.current_price,
        open_price: session.open_price,
        high_price: session.high_price,
        low_price: session.low_price,
        total_orders: session.total_orders,
        total_trades: session.total_trades,
        total_volume: session.total_volume,
        market_order_pct,
        sentiment: session.config.sentiment.as_wire(),
        intensity: session.config.intensity.as_wire(),
        spread: session.config.spread,
        speed: session.config.speed,
        paused: session.paused,
        news_shock_enabled: session.shock_controller().is_active(),
        news_shock_cooldown: session.shock_controller().is_cooldown(),
        news_shock_cooldown_remaining: session
            .shock_controller()
            .cooldown_remaining_sec(outcome.timestamp_ms),
        news_shock_active_remaining: session
            .shock_controller()
            .active_remaining_sec(outcome.timestamp_ms),
    };

    let price = PricePointWire {
        timestamp: outcome.timestamp_ms,
        price: outcome.price,
        volume: outcome.volume,
    };

    let completed_candles = if outcome.completed_candles.is_empty() {
        None
    } else {
        Some(
            outcome
                .completed_candles
                .iter()
                .map(|(tf, candle)| CompletedCandleWire {
                    timeframe: *tf,
                    candle: *candle,
                })
                .collect(),
        )
    };

    let data = TickData {
        orderbook,
        stats,
        price,
        current_candles: session.candles().current_candles(),
        completed_candles,
        trade: outcome.trade.clone(),
    };

    ServerFrame::Tick { data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::types::{Intensity, Sentiment, SessionId};

    #[test]
    fn tick_frame_is_a_consistent_snapshot() {
        let cfg = SessionConfig::new("AAPL", 180.0, 0.10, Sentiment::Neutral, Intensity::Normal, 1.0);
        let mut session = SessionState::new(SessionId(1), cfg);
        session.set_running(true);
        let outcome = session.advance(1_000).expect("running session advances");
        let frame = encode_tick(&session, &outcome);

        let ServerFrame::Tick { data } = frame else {
            panic!("expected a tick frame");
        };
        assert_eq!(data.stats.current_price, data.price.price);
        assert!(data.orderbook.best_bid < data.orderbook.best_ask);
        assert_eq!(data.orderbook.bids.len(), 15);
        assert_eq!(data.orderbook.asks.len(), 15);
    }

    #[test]
    fn envelope_matches_wire_shape() {
        let frame = ServerFrame::Pong {
            timestamp: serde_json::json!(1_737_225_600_000i64),
        };
        let json = frame.to_json();
        assert_eq!(json, r#"{"type":"pong","timestamp":1737225600000}"#);
    }

    #[test]
    fn started_frame_has_no_data_field() {
        let frame = ServerFrame::Started;
        assert_eq!(frame.to_json(), r#"{"type":"started"}"#);
    }
}
