// =============================================================================
// CandleManager — multi-timeframe OHLCV aggregation with bounded retention
// =============================================================================
//
// Grounded on the teacher's `market_data::candle_buffer::CandleBuffer`
// (ring-buffer-per-key, oldest-evicted-first), generalized from "one ring per
// (symbol, interval) fed by a live kline stream" to "one ring per timeframe
// per session, fed by the session's own `PriceEngine` output" (spec.md §4.3).

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

/// Timeframes every session aggregates, in seconds.
pub const TIMEFRAMES: [u32; 5] = [1, 5, 30, 60, 300];

/// Completed-candle rings retain at most this many entries per timeframe.
const MAX_COMPLETED: usize = 500;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub period_start_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    fn open_at(period_start_ms: i64, price: f64, volume: u64) -> Self {
        Self {
            period_start_ms,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    fn apply(&mut self, price: f64, volume: u64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += volume;
    }
}

struct TimeframeState {
    current: Option<Candle>,
    completed: VecDeque<Candle>,
}

impl TimeframeState {
    fn new() -> Self {
        Self {
            current: None,
            completed: VecDeque::new(),
        }
    }
}

pub struct CandleManager {
    timeframes: BTreeMap<u32, TimeframeState>,
}

impl CandleManager {
    pub fn new() -> Self {
        let timeframes = TIMEFRAMES
            .iter()
            .map(|&tf| (tf, TimeframeState::new()))
            .collect();
        Self { timeframes }
    }

    fn period_start(timeframe_sec: u32, now_ms: i64) -> i64 {
        let window_ms = timeframe_sec as i64 * 1000;
        (now_ms / window_ms) * window_ms
    }

    /// spec.md §4.3: returns every candle that completed as a side effect of
    /// this update, as `(timeframe, candle)` pairs.
    pub fn update(&mut self, price: f64, volume: u64, now_ms: i64) -> Vec<(u32, Candle)> {
        let mut completed = Vec::new();

        for (&timeframe, state) in self.timeframes.iter_mut() {
            let period_start = Self::period_start(timeframe, now_ms);

            match state.current.as_mut() {
                Some(candle) if candle.period_start_ms == period_start => {
                    candle.apply(price, volume);
                }
                Some(candle) => {
                    let finished = *candle;
                    state.completed.push_back(finished);
                    while state.completed.len() > MAX_COMPLETED {
                        state.completed.pop_front();
                    }
                    completed.push((timeframe, finished));
                    state.current = Some(Candle::open_at(period_start, price, volume));
                }
                None => {
                    state.current = Some(Candle::open_at(period_start, price, volume));
                }
            }
        }

        completed
    }

    /// spec.md §4.3 "historySnapshot": chronological completed candles plus
    /// the in-progress candle, if any.
    pub fn history_snapshot(&self, timeframe: u32) -> (Vec<Candle>, Option<Candle>) {
        match self.timeframes.get(&timeframe) {
            Some(state) => (state.completed.iter().copied().collect(), state.current),
            None => (Vec::new(), None),
        }
    }

    /// The in-progress candle for every timeframe, keyed by timeframe.
    pub fn current_candles(&self) -> BTreeMap<u32, Candle> {
        self.timeframes
            .iter()
            .filter_map(|(&tf, state)| state.current.map(|c| (tf, c)))
            .collect()
    }

    pub fn reset(&mut self) {
        for state in self.timeframes.values_mut() {
            state.current = None;
            state.completed.clear();
        }
    }
}

impl Default for CandleManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_a_fresh_candle_on_first_update() {
        let mut mgr = CandleManager::new();
        mgr.update(100.0, 10, 0);
        let (_, current) = mgr.history_snapshot(1);
        let candle = current.unwrap();
        assert_eq!(candle.open, 100.0);
        assert_eq!(candle.high, 100.0);
        assert_eq!(candle.low, 100.0);
        assert_eq!(candle.close, 100.0);
        assert_eq!(candle.volume, 10);
    }

    #[test]
    fn completes_candle_on_period_boundary() {
        let mut mgr = CandleManager::new();
        mgr.update(100.0, 10, 0);
        mgr.update(105.0, 5, 500);
        let completed = mgr.update(95.0, 3, 1_200);

        let one_sec = completed.iter().find(|(tf, _)| *tf == 1).unwrap();
        assert_eq!(one_sec.1.period_start_ms, 0);
        assert_eq!(one_sec.1.open, 100.0);
        assert_eq!(one_sec.1.high, 105.0);
        assert_eq!(one_sec.1.low, 100.0);
        assert_eq!(one_sec.1.close, 105.0);
        assert_eq!(one_sec.1.volume, 15);

        let (_, current) = mgr.history_snapshot(1);
        assert_eq!(current.unwrap().period_start_ms, 1_000);
    }

    #[test]
    fn ohlc_invariant_holds_for_every_completed_candle() {
        let mut mgr = CandleManager::new();
        let mut t = 0i64;
        let prices = [100.0, 102.0, 98.0, 101.0, 99.5, 103.0];
        for (i, &p) in prices.iter().enumerate() {
            t = (i as i64) * 400;
            for (_, c) in mgr.update(p, 1, t) {
                assert!(c.low <= c.open.min(c.close));
                assert!(c.open.max(c.close) <= c.high);
                assert_eq!(c.period_start_ms % 1000, 0);
            }
        }
        let _ = t;
    }

    #[test]
    fn ring_evicts_oldest_beyond_cap() {
        let mut mgr = CandleManager::new();
        for i in 0..(MAX_COMPLETED + 50) {
            mgr.update(100.0 + i as f64, 1, (i as i64) * 1_000);
        }
        let (completed, _) = mgr.history_snapshot(1);
        assert_eq!(completed.len(), MAX_COMPLETED);
        let mut prev = completed[0].period_start_ms;
        for c in completed.iter().skip(1) {
            assert!(c.period_start_ms > prev);
            prev = c.period_start_ms;
        }
    }

    #[test]
    fn reset_clears_all_timeframes() {
        let mut mgr = CandleManager::new();
        mgr.update(100.0, 1, 0);
        mgr.update(101.0, 1, 2_000);
        mgr.reset();
        for tf in TIMEFRAMES {
            let (completed, current) = mgr.history_snapshot(tf);
            assert!(completed.is_empty());
            assert!(current.is_none());
        }
    }
}
