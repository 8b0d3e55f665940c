// =============================================================================
// SessionRegistry — SessionId -> SessionState map with per-session metrics
// =============================================================================
//
// Grounded on the teacher's `app_state.rs`: a flat, `Arc`-shared struct
// guarded by `parking_lot` locks, generalized from "one AppState per process"
// to "one `SessionHandle` per connection, looked up through one registry map"
// (spec.md §4.8, §5 "Shared-resource policy"). The registry's own lock scope
// is limited to map lookups/inserts/removals; every per-session mutation goes
// through that session's own `parking_lot::Mutex`, taken only after the
// registry lock (if any) has already been released.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use crate::config::SessionConfig;
use crate::encoding::ServerFrame;
use crate::session::SessionState;
use crate::types::SessionId;

/// Per-connection metadata the dispatcher and housekeeping loop read.
pub struct SessionMeta {
    pub connected_at_ms: i64,
    pub ip_address: String,
    pub inbound_messages: u64,
    pub inbound_bytes: u64,
    pub outbound_messages: u64,
    pub outbound_bytes: u64,
    pub malformed_commands: u64,
    pub dropped_outbound: u64,
}

impl SessionMeta {
    fn new(connected_at_ms: i64, ip_address: String) -> Self {
        Self {
            connected_at_ms,
            ip_address,
            inbound_messages: 0,
            inbound_bytes: 0,
            outbound_messages: 0,
            outbound_bytes: 0,
            malformed_commands: 0,
            dropped_outbound: 0,
        }
    }
}

/// Everything one connection owns: its simulation state, its metadata, and
/// its bounded outbound ring (spec.md §4.8: "on overflow the oldest queued
/// messages are dropped").
pub struct SessionEntry {
    pub state: SessionState,
    pub meta: SessionMeta,
    pub outbound: VecDeque<ServerFrame>,
    capacity: usize,
}

impl SessionEntry {
    fn new(state: SessionState, meta: SessionMeta, capacity: usize) -> Self {
        Self {
            state,
            meta,
            outbound: VecDeque::new(),
            capacity,
        }
    }

    /// Enqueue a frame, dropping the oldest queued frame on overflow.
    pub fn enqueue(&mut self, frame: ServerFrame) {
        if self.outbound.len() >= self.capacity {
            self.outbound.pop_front();
            self.meta.dropped_outbound += 1;
        }
        self.outbound.push_back(frame);
    }

    pub fn drain(&mut self) -> Vec<ServerFrame> {
        self.outbound.drain(..).collect()
    }
}

/// A connection's state plus the `Notify` its send pump waits on, bundled so
/// the registry only ever hands out one `Arc` per session.
pub struct SessionHandle {
    pub entry: Mutex<SessionEntry>,
    pub notify: Notify,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
    next_id: AtomicU32,
    outbound_capacity: usize,
}

impl SessionRegistry {
    pub fn new(outbound_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            outbound_capacity,
        }
    }

    /// Create and insert a fresh session, not yet running (spec.md §4.5:
    /// `running=false` until a `start` command arrives).
    pub fn insert(&self, ip_address: String, now_ms: i64) -> (SessionId, Arc<SessionHandle>) {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let state = SessionState::new(id, SessionConfig::default());
        let meta = SessionMeta::new(now_ms, ip_address);
        let entry = SessionEntry::new(state, meta, self.outbound_capacity);
        let handle = Arc::new(SessionHandle {
            entry: Mutex::new(entry),
            notify: Notify::new(),
        });

        self.sessions.write().insert(id, handle.clone());
        (id, handle)
    }

    pub fn remove(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.write().remove(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.read().get(&id).cloned()
    }

    /// Snapshot of the ids currently registered, for the dispatcher and
    /// housekeeping loop to iterate without holding the map lock.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let registry = SessionRegistry::new(100);
        let (a, _) = registry.insert("127.0.0.1".into(), 0);
        let (b, _) = registry.insert("127.0.0.1".into(), 0);
        assert!(b.0 > a.0);
        registry.remove(a);
        let (c, _) = registry.insert("127.0.0.1".into(), 0);
        assert_ne!(c, a);
        assert!(c.0 > b.0);
    }

    #[test]
    fn overflow_drops_oldest_and_counts() {
        let registry = SessionRegistry::new(2);
        let (_id, handle) = registry.insert("127.0.0.1".into(), 0);
        let mut entry = handle.entry.lock();
        entry.enqueue(ServerFrame::Started);
        entry.enqueue(ServerFrame::SimulationReset);
        entry.enqueue(ServerFrame::CandleReset);
        assert_eq!(entry.outbound.len(), 2);
        assert_eq!(entry.meta.dropped_outbound, 1);
        let drained = entry.drain();
        assert_eq!(drained.len(), 2);
        assert!(entry.outbound.is_empty());
    }

    #[test]
    fn get_returns_none_after_remove() {
        let registry = SessionRegistry::new(10);
        let (id, _) = registry.insert("127.0.0.1".into(), 0);
        assert!(registry.get(id).is_some());
        registry.remove(id);
        assert!(registry.get(id).is_none());
    }
}
