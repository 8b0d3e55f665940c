// =============================================================================
// SessionState — per-client orchestrator (spec.md §4.5)
// =============================================================================
//
// Owns exactly one PriceEngine, NewsShockController, CandleManager and
// SyntheticOrderBook, plus the running/paused flags and running statistics.
// Grounded on the teacher's `AppState` in shape (a plain struct holding
// `Arc`-free owned subsystems, mutated in place) but scoped down from
// "one process-wide state" to "one state per connection" — no `SessionState`
// ever holds a reference to another (spec.md §3 "Ownership").

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::candles::{Candle, CandleManager};
use crate::config::SessionConfig;
use crate::news_shock::NewsShockController;
use crate::orderbook::{OrderBookSnapshot, SyntheticOrderBook};
use crate::price_engine::PriceEngine;
use crate::types::{make_trade_id, round_tick, Intensity, Sentiment, SessionId, Side};

/// One-million-trade cap per session inherited from the `TradeId` encoding
/// (spec.md §9 Open Question — we do not widen the id here).
const MAX_TRADES_PER_SESSION: u64 = 1_000_000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeData {
    pub id: u64,
    pub price: f64,
    pub quantity: u64,
    pub side: &'static str,
    pub timestamp: i64,
}

/// Everything a single `advance()` call produced, for the encoder to read.
pub struct AdvanceOutcome {
    pub timestamp_ms: i64,
    pub price: f64,
    pub volume: u64,
    pub completed_candles: Vec<(u32, Candle)>,
    pub trade: Option<TradeData>,
}

pub struct SessionState {
    pub id: SessionId,
    pub config: SessionConfig,
    pub running: bool,
    pub paused: bool,

    pub current_price: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,

    pub total_orders: u64,
    pub total_trades: u64,
    pub total_volume: u64,
    pub market_orders: u64,
    pub limit_orders: u64,
    trade_counter: u64,

    pub last_update_ms: i64,

    price_engine: PriceEngine,
    shock: NewsShockController,
    candles: CandleManager,
    order_book: SyntheticOrderBook,
    pub last_book: OrderBookSnapshot,

    rng: StdRng,
}

impl SessionState {
    pub fn new(id: SessionId, config: SessionConfig) -> Self {
        let base_price = config.base_price;
        let mut order_book = SyntheticOrderBook::new();
        let last_book = order_book.regenerate(base_price, config.spread, config.sentiment);

        Self {
            id,
            config,
            running: false,
            paused: false,
            current_price: base_price,
            open_price: base_price,
            high_price: base_price,
            low_price: base_price,
            total_orders: 0,
            total_trades: 0,
            total_volume: 0,
            market_orders: 0,
            limit_orders: 0,
            trade_counter: 0,
            // Far enough in the past that the dispatcher's due-guard never
            // skips a session's very first advance (spec.md §8 scenario 2).
            last_update_ms: i64::MIN,
            price_engine: PriceEngine::new(),
            shock: NewsShockController::new(),
            candles: CandleManager::new(),
            order_book,
            last_book,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn set_sentiment(&mut self, sentiment: Sentiment) {
        self.config.sentiment = sentiment;
        self.price_engine.notify_sentiment_changed();
    }

    pub fn set_intensity(&mut self, intensity: Intensity) {
        self.config.intensity = intensity;
    }

    pub fn set_spread(&mut self, spread: f64) {
        self.config.spread = crate::clamp::clamp_spread(spread);
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.config.speed = crate::clamp::clamp_speed(speed);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn shock_controller_mut(&mut self) -> &mut NewsShockController {
        &mut self.shock
    }

    pub fn shock_controller(&self) -> &NewsShockController {
        &self.shock
    }

    pub fn candles(&self) -> &CandleManager {
        &self.candles
    }

    /// Replace the session's config wholesale (used by the `start` command,
    /// which folds config changes and a reset into one operation).
    pub fn apply_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    /// spec.md §4.5 "reset()".
    pub fn reset(&mut self) {
        let base_price = self.config.base_price;
        self.current_price = base_price;
        self.open_price = base_price;
        self.high_price = base_price;
        self.low_price = base_price;
        self.total_orders = 0;
        self.total_trades = 0;
        self.total_volume = 0;
        self.market_orders = 0;
        self.limit_orders = 0;
        self.trade_counter = 0;
        self.price_engine.reset();
        self.shock.reset();
        self.candles.reset();
        self.last_book = self
            .order_book
            .regenerate(base_price, self.config.spread, self.config.sentiment);
    }

    /// spec.md §4.5 "generateTrade".
    pub fn generate_trade(&mut self, price: f64, now_ms: i64) -> TradeData {
        let buy_probability = self.config.sentiment.buy_probability();
        let side = if self.rng.gen_range(0.0..1.0) < buy_probability {
            Side::Buy
        } else {
            Side::Sell
        };

        let slippage = self.rng.gen_range(0.01..=0.03);
        let signed_slippage = match side {
            Side::Buy => slippage,
            Side::Sell => -slippage,
        };
        let exec_price = round_tick(price + signed_slippage);

        let volume_multiplier = self.config.intensity.volume_multiplier();
        let base_qty = 10.0 + self.rng.gen_range(0.0..99.0);
        let quantity = (base_qty * volume_multiplier).floor().max(1.0) as u64;

        self.trade_counter = (self.trade_counter + 1).min(MAX_TRADES_PER_SESSION);
        let id = make_trade_id(self.id, self.trade_counter);
        self.total_trades += 1;

        TradeData {
            id,
            price: exec_price,
            quantity,
            side: side.as_wire(),
            timestamp: now_ms,
        }
    }

    /// spec.md §4.5 "advance(nowMs)".
    pub fn advance(&mut self, now_ms: i64) -> Option<AdvanceOutcome> {
        if !self.running || self.paused {
            return None;
        }

        // (1) expire shock if needed
        self.shock.tick(now_ms);

        // (2) advance price
        let step = self.price_engine.next_price(
            self.current_price,
            self.config.sentiment,
            self.config.intensity,
            &mut self.shock,
        );

        // (3) update price + high/low
        self.current_price = step.price;
        self.high_price = self.high_price.max(step.price);
        self.low_price = self.low_price.min(step.price);

        // (4) synthesize volume + order counters
        let tick_volume: u64 = self.rng.gen_range(10..50);
        self.total_volume += tick_volume;
        self.total_orders += self.rng.gen_range(1..=3) as u64;
        if self.rng.gen_range(0.0..1.0) < 0.2 {
            self.market_orders += 1;
        } else {
            self.limit_orders += 1;
        }

        // (5) maybe synthesize a trade
        let trade = if self.rng.gen_range(0.0..1.0) < (1.0 / 3.0) {
            Some(self.generate_trade(step.price, now_ms))
        } else {
            None
        };

        // (6) candle aggregation
        let completed_candles = self.candles.update(step.price, tick_volume, now_ms);

        // (7) regenerate the synthetic book
        self.last_book =
            self.order_book
                .regenerate(self.current_price, self.config.spread, self.config.sentiment);

        Some(AdvanceOutcome {
            timestamp_ms: now_ms,
            price: step.price,
            volume: tick_volume,
            completed_candles,
            trade,
        })
    }
}
