// =============================================================================
// AppState — the one structure shared across every task (spec.md §5)
// =============================================================================
//
// Grounded on the teacher's `app_state.rs` `AppState`, but slimmed down: the
// teacher's `AppState` directly owned every trading subsystem; here the
// per-session subsystems live inside `SessionRegistry`'s entries instead, so
// `AppState` only needs the registry itself, the immutable startup config,
// and the one process-wide flag every task polls to know when to stop
// (spec.md §5 "Process-wide globals").

use std::sync::atomic::AtomicBool;

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;

pub struct AppState {
    pub config: ServerConfig,
    pub registry: SessionRegistry,
    pub running: AtomicBool,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let registry = SessionRegistry::new(config.outbound_queue_capacity);
        Self {
            config,
            registry,
            running: AtomicBool::new(true),
        }
    }
}
