// =============================================================================
// CommandParser — parse client commands and dispatch to a session (spec.md §4.7)
// =============================================================================
//
// Grounded on spec.md §9 Design Note #3: "explicit result types at the parser
// boundary; clamp in a single place; surface nothing to the client beyond
// effect-or-no-effect." Parsing is two-staged: first pull out the bare `type`
// string, then validate that command's own fields. An unparseable frame or a
// frame with no `type` is malformed; a well-formed but unrecognized `type` is
// silently ignored (spec.md §4.7).

use serde_json::Value;

use crate::config::SessionConfig;
use crate::encoding::{CandleHistoryData, ServerFrame};
use crate::session::SessionState;
use crate::types::{Intensity, Sentiment};

#[derive(Debug, Clone)]
pub enum ClientCommand {
    Start {
        symbol: Option<String>,
        price: Option<f64>,
        spread: Option<f64>,
        sentiment: Option<Sentiment>,
        intensity: Option<Intensity>,
        speed: Option<f64>,
    },
    Sentiment(Sentiment),
    Intensity(Intensity),
    Spread(f64),
    Speed(f64),
    Pause(bool),
    Reset,
    NewsShock(bool),
    GetCandles(u32),
    Ping(Value),
}

pub enum ParseOutcome {
    Command(ClientCommand),
    /// Well-formed JSON with a `type` the server does not recognize.
    Ignored,
    /// Unparseable JSON, missing `type`, or a recognized `type` whose payload
    /// failed validation.
    Malformed,
}

fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_start(config: &Value) -> Option<ClientCommand> {
    let symbol = config.get("symbol").and_then(Value::as_str).map(str::to_string);
    let price = config.get("price").and_then(parse_f64);
    let spread = config.get("spread").and_then(parse_f64);
    let sentiment = config
        .get("sentiment")
        .and_then(Value::as_str)
        .and_then(Sentiment::from_wire);
    let intensity = config
        .get("intensity")
        .and_then(Value::as_str)
        .and_then(Intensity::from_wire);
    let speed = config.get("speed").and_then(parse_f64);

    Some(ClientCommand::Start {
        symbol,
        price,
        spread,
        sentiment,
        intensity,
        speed,
    })
}

/// spec.md §4.7: parse one inbound text frame.
pub fn parse_command(text: &str) -> ParseOutcome {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return ParseOutcome::Malformed,
    };

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return ParseOutcome::Malformed;
    };

    match kind {
        "start" => match value.get("config") {
            Some(cfg) => match parse_start(cfg) {
                Some(cmd) => ParseOutcome::Command(cmd),
                None => ParseOutcome::Malformed,
            },
            None => ParseOutcome::Malformed,
        },
        "sentiment" => value
            .get("value")
            .and_then(Value::as_str)
            .and_then(Sentiment::from_wire)
            .map(|s| ParseOutcome::Command(ClientCommand::Sentiment(s)))
            .unwrap_or(ParseOutcome::Malformed),
        "intensity" => value
            .get("value")
            .and_then(Value::as_str)
            .and_then(Intensity::from_wire)
            .map(|i| ParseOutcome::Command(ClientCommand::Intensity(i)))
            .unwrap_or(ParseOutcome::Malformed),
        "spread" => value
            .get("value")
            .and_then(parse_f64)
            .map(|v| ParseOutcome::Command(ClientCommand::Spread(v)))
            .unwrap_or(ParseOutcome::Malformed),
        "speed" => value
            .get("value")
            .and_then(parse_f64)
            .map(|v| ParseOutcome::Command(ClientCommand::Speed(v)))
            .unwrap_or(ParseOutcome::Malformed),
        "pause" => value
            .get("value")
            .and_then(parse_bool)
            .map(|v| ParseOutcome::Command(ClientCommand::Pause(v)))
            .unwrap_or(ParseOutcome::Malformed),
        "reset" => ParseOutcome::Command(ClientCommand::Reset),
        "newsShock" => value
            .get("value")
            .and_then(parse_bool)
            .map(|v| ParseOutcome::Command(ClientCommand::NewsShock(v)))
            .unwrap_or(ParseOutcome::Malformed),
        "getCandles" => value
            .get("timeframe")
            .and_then(Value::as_u64)
            .map(|tf| ParseOutcome::Command(ClientCommand::GetCandles(tf as u32)))
            .unwrap_or(ParseOutcome::Malformed),
        "ping" => match value.get("timestamp") {
            Some(ts) => ParseOutcome::Command(ClientCommand::Ping(ts.clone())),
            None => ParseOutcome::Malformed,
        },
        _ => ParseOutcome::Ignored,
    }
}

/// spec.md §4.7 table: apply a parsed command to a session, returning the
/// reply frames (zero, one, or two — `reset` emits two).
pub fn dispatch(session: &mut SessionState, now_ms: i64, cmd: ClientCommand) -> Vec<ServerFrame> {
    match cmd {
        ClientCommand::Start {
            symbol,
            price,
            spread,
            sentiment,
            intensity,
            speed,
        } => {
            let base = session.config.clone();
            let next = SessionConfig::new(
                symbol.as_deref().unwrap_or(&base.symbol),
                price.unwrap_or(base.base_price),
                spread.unwrap_or(base.spread),
                sentiment.unwrap_or(base.sentiment),
                intensity.unwrap_or(base.intensity),
                speed.unwrap_or(base.speed),
            );
            session.apply_config(next);
            session.reset();
            session.set_running(true);
            vec![ServerFrame::Started]
        }
        ClientCommand::Sentiment(s) => {
            session.set_sentiment(s);
            vec![]
        }
        ClientCommand::Intensity(i) => {
            session.set_intensity(i);
            vec![]
        }
        ClientCommand::Spread(v) => {
            session.set_spread(v);
            vec![]
        }
        ClientCommand::Speed(v) => {
            session.set_speed(v);
            vec![]
        }
        ClientCommand::Pause(p) => {
            session.set_paused(p);
            vec![]
        }
        ClientCommand::Reset => {
            session.reset();
            vec![ServerFrame::SimulationReset, ServerFrame::CandleReset]
        }
        ClientCommand::NewsShock(enable) => {
            if enable {
                session.shock_controller_mut().enable(now_ms);
            } else {
                session.shock_controller_mut().disable(now_ms);
            }
            vec![]
        }
        ClientCommand::GetCandles(timeframe) => {
            let (candles, current) = session.candles().history_snapshot(timeframe);
            vec![ServerFrame::CandleHistory {
                data: CandleHistoryData {
                    timeframe,
                    candles,
                    current,
                },
            }]
        }
        ClientCommand::Ping(timestamp) => vec![ServerFrame::Pong { timestamp }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionId;

    fn session() -> SessionState {
        SessionState::new(SessionId(1), SessionConfig::default())
    }

    #[test]
    fn unknown_type_is_ignored_not_malformed() {
        match parse_command(r#"{"type":"doSomethingWeird"}"#) {
            ParseOutcome::Ignored => {}
            _ => panic!("expected Ignored"),
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        match parse_command("not json") {
            ParseOutcome::Malformed => {}
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn missing_type_is_malformed() {
        match parse_command(r#"{"value":"true"}"#) {
            ParseOutcome::Malformed => {}
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn ping_echoes_timestamp_exactly() {
        let ParseOutcome::Command(ClientCommand::Ping(ts)) =
            parse_command(r#"{"type":"ping","timestamp":1737225600000}"#)
        else {
            panic!("expected a ping command");
        };
        let mut s = session();
        let frames = dispatch(&mut s, 0, ClientCommand::Ping(ts));
        assert_eq!(frames[0].to_json(), r#"{"type":"pong","timestamp":1737225600000}"#);
    }

    #[test]
    fn start_applies_config_and_replies_started() {
        let mut s = session();
        let cmd = match parse_command(
            r#"{"type":"start","config":{"symbol":"AAPL","price":180,"spread":0.10,"sentiment":"NEUTRAL","intensity":"NORMAL","speed":1.0}}"#,
        ) {
            ParseOutcome::Command(c) => c,
            _ => panic!("expected a start command"),
        };
        let frames = dispatch(&mut s, 0, cmd);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].to_json(), r#"{"type":"started"}"#);
        assert_eq!(s.config.symbol, "AAPL");
        assert_eq!(s.current_price, 180.00);
        assert!(s.running);
    }

    #[test]
    fn reset_replies_with_both_frames() {
        let mut s = session();
        let frames = dispatch(&mut s, 0, ClientCommand::Reset);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].to_json(), r#"{"type":"simulationReset"}"#);
        assert_eq!(frames[1].to_json(), r#"{"type":"candleReset"}"#);
    }

    #[test]
    fn malformed_spread_value_is_dropped() {
        match parse_command(r#"{"type":"spread","value":"not-a-number"}"#) {
            ParseOutcome::Malformed => {}
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn spread_idempotence_law() {
        let mut s = session();
        s.set_spread(0.20);
        let after_first = s.config.spread;
        s.set_spread(0.20);
        assert_eq!(s.config.spread, after_first);
        s.set_spread(0.10);
        s.set_spread(0.20);
        assert_eq!(s.config.spread, after_first);
    }
}
