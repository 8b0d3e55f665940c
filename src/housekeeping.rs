// =============================================================================
// Housekeeping — 60-minute session timeout sweep + 30s summary log
// =============================================================================
//
// spec.md assigns these two behaviors to SessionRegistry/SessionDispatcher in
// prose (§4.8, §5 item 5) without naming an operation; SPEC_FULL.md §4.10
// gives them one. Grounded on the teacher's periodic `tokio::spawn(async move
// { loop { interval.tick().await; ... } })` idiom used throughout `main.rs`
// for the strategy and reconciliation loops.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::dispatcher::now_ms;
use crate::encoding::ServerFrame;
use crate::server::state::AppState;

/// Wakes every `housekeeping_timeout_check_ms` and closes any session that
/// has been connected for `session_timeout_ms` or longer (spec.md §4.8).
pub async fn run_timeout_sweep(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(
        state.config.housekeeping_timeout_check_ms,
    ));

    while state.running.load(Ordering::Relaxed) {
        ticker.tick().await;
        let now = now_ms();

        for id in state.registry.ids() {
            let Some(handle) = state.registry.get(id) else {
                continue;
            };
            let mut entry = handle.entry.lock();
            let age = now - entry.meta.connected_at_ms;
            if age >= state.config.session_timeout_ms {
                entry.state.set_running(false);
                entry.enqueue(ServerFrame::Timeout {
                    message: "Session expired after 60 minutes of connection time".to_string(),
                });
                drop(entry);
                handle.notify.notify_one();
                info!(session = %id, age_ms = age, "session timed out");
            }
        }
    }
}

/// Wakes every `housekeeping_summary_ms` and logs one line per active
/// session describing its age and remaining lifetime.
pub async fn run_summary_log(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(state.config.housekeeping_summary_ms));

    while state.running.load(Ordering::Relaxed) {
        ticker.tick().await;
        let now = now_ms();
        let ids = state.registry.ids();

        for id in &ids {
            let Some(handle) = state.registry.get(*id) else {
                continue;
            };
            let entry = handle.entry.lock();
            let age_ms = now - entry.meta.connected_at_ms;
            let remaining_ms = (state.config.session_timeout_ms - age_ms).max(0);
            info!(
                session = %id,
                age_ms,
                remaining_ms,
                queued = entry.outbound.len(),
                dropped = entry.meta.dropped_outbound,
                "session summary"
            );
        }

        info!(active_sessions = ids.len(), "housekeeping summary");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::registry::SessionRegistry;
    use std::sync::atomic::AtomicBool;

    fn state_with(session_timeout_ms: i64) -> AppState {
        AppState {
            config: ServerConfig {
                session_timeout_ms,
                ..ServerConfig::default()
            },
            registry: SessionRegistry::new(100),
            running: AtomicBool::new(true),
        }
    }

    #[test]
    fn expired_session_gets_marked_stopped_and_queued_a_timeout_frame() {
        let state = state_with(1_000);
        let (_id, handle) = state.registry.insert("ip".into(), 0);
        {
            let mut e = handle.entry.lock();
            e.state.set_running(true);
        }

        // Simulate one sweep pass's body directly (no real clock dependency).
        let now = 2_000;
        let mut entry = handle.entry.lock();
        let age = now - entry.meta.connected_at_ms;
        assert!(age >= state.config.session_timeout_ms);
        entry.state.set_running(false);
        entry.enqueue(ServerFrame::Timeout {
            message: "Session expired after 60 minutes of connection time".to_string(),
        });

        assert!(!entry.state.running);
        assert_eq!(entry.outbound.len(), 1);
    }
}
