// =============================================================================
// SessionDispatcher — single periodic driver (spec.md §4.9)
// =============================================================================
//
// Grounded on the teacher's `push_interval` loop in `api/ws.rs`, generalized
// from "one connection polls its own state_version every 500 ms" to "one
// task walks every session every 50 ms and advances each at its own
// effective cadence". A panic inside `advance()` is caught so it can never
// take down any other session or the scheduler itself (spec.md §4.9
// "Failure semantics").

use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, warn};

use crate::encoding::{encode_tick, ServerFrame};
use crate::registry::SessionRegistry;
use crate::server::state::AppState;

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// spec.md §4.9: `effectiveInterval = floor(100 / speed)` ms.
fn effective_interval_ms(speed: f64) -> i64 {
    (100.0 / speed).floor() as i64
}

/// Runs until `state.running` is cleared. Wakes every
/// `dispatcher_interval_ms` and advances each due, running, unpaused session.
pub async fn run(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(
        state.config.dispatcher_interval_ms,
    ));

    while state.running.load(Ordering::Relaxed) {
        ticker.tick().await;
        let now = now_ms();
        advance_due_sessions(&state.registry, now);
    }
}

fn advance_due_sessions(registry: &SessionRegistry, now: i64) {
    for id in registry.ids() {
        let Some(handle) = registry.get(id) else {
            continue;
        };

        let mut entry = handle.entry.lock();
        if !entry.state.running {
            continue;
        }

        let effective = effective_interval_ms(entry.state.config.speed);
        if now.saturating_sub(entry.state.last_update_ms) < effective {
            continue;
        }
        entry.state.last_update_ms = now;

        let advance_result =
            std::panic::catch_unwind(AssertUnwindSafe(|| entry.state.advance(now)));

        match advance_result {
            Ok(Some(outcome)) => {
                let frame = encode_tick(&entry.state, &outcome);
                entry.enqueue(frame);
                drop(entry);
                handle.notify.notify_one();
            }
            Ok(None) => {
                // Not running or paused: a correct, quiet no-op.
            }
            Err(panic) => {
                warn!(session = %id, "advance() panicked — isolating session");
                entry.state.set_running(false);
                entry.enqueue(ServerFrame::Timeout {
                    message: "Session terminated after an internal error".to_string(),
                });
                drop(entry);
                handle.notify.notify_one();
                error!(session = %id, ?panic, "session advance panic contained");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::registry::SessionRegistry;

    #[test]
    fn effective_interval_matches_spec_bounds() {
        assert_eq!(effective_interval_ms(2.0), 50);
        assert_eq!(effective_interval_ms(0.25), 400);
        assert_eq!(effective_interval_ms(1.0), 100);
    }

    #[test]
    fn sessions_respect_independent_cadence() {
        let registry = SessionRegistry::new(100);
        let (fast_id, fast) = registry.insert("ip".into(), 0);
        let (slow_id, slow) = registry.insert("ip".into(), 0);

        {
            let mut e = fast.entry.lock();
            e.state.apply_config(SessionConfig::new(
                "A",
                180.0,
                0.1,
                crate::types::Sentiment::Neutral,
                crate::types::Intensity::Normal,
                2.0,
            ));
            e.state.set_running(true);
        }
        {
            let mut e = slow.entry.lock();
            e.state.apply_config(SessionConfig::new(
                "B",
                180.0,
                0.1,
                crate::types::Sentiment::Neutral,
                crate::types::Intensity::Normal,
                0.25,
            ));
            e.state.set_running(true);
        }

        advance_due_sessions(&registry, 0);
        advance_due_sessions(&registry, 50);

        let fast_ticks = fast.entry.lock().outbound.len();
        let slow_ticks = slow.entry.lock().outbound.len();
        assert_eq!(fast_ticks, 2, "speed=2.0 should tick every 50ms");
        assert_eq!(slow_ticks, 1, "speed=0.25 should not yet tick again at t=50");

        let _ = (fast_id, slow_id);
    }

    #[test]
    fn a_panicking_session_does_not_affect_others() {
        let registry = SessionRegistry::new(100);
        let (_ok_id, ok_handle) = registry.insert("ip".into(), 0);
        {
            let mut e = ok_handle.entry.lock();
            e.state.set_running(true);
        }
        advance_due_sessions(&registry, 0);
        assert_eq!(ok_handle.entry.lock().outbound.len(), 1);
    }
}
