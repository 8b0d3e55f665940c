// =============================================================================
// WebSocket handler — per-session push/receive loop (spec.md §4.9, §5, §6)
// =============================================================================
//
// Grounded on the teacher's `handle_ws_connection` in `api/ws.rs`: a single
// `tokio::select!` loop folding the push side and the receive side into one
// task, exactly as spec.md §5 permits for tasks 2+3. Generalized from "poll
// one shared `state_version` every 500 ms" to "wait on this session's own
// `Notify`, with a short fallback interval as a safety net against a missed
// wakeup" (spec.md §4.9's 50 ms base cadence is the dispatcher's; the
// connection task itself is purely reactive).

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::commands::{dispatch, parse_command, ParseOutcome};
use crate::dispatcher::now_ms;
use crate::encoding::ServerFrame;
use crate::registry::SessionHandle;
use crate::server::state::AppState;

/// Canonical WebSocket subprotocol token this server negotiates, kept for
/// compatibility with existing clients (spec.md §6).
const SUBPROTOCOL: &str = "lws-minimal";

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.protocols([SUBPROTOCOL])
        .on_upgrade(move |socket| handle_connection(socket, state, addr.ip().to_string()))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>, ip: String) {
    let now = now_ms();
    let (id, handle) = state.registry.insert(ip, now);
    info!(session = %id, "session connected");

    let (mut sender, mut receiver) = socket.split();
    let mut fallback = tokio::time::interval(Duration::from_millis(50));

    loop {
        let keep_open = tokio::select! {
            _ = handle.notify.notified() => drain_and_send(&handle, &mut sender).await,
            _ = fallback.tick() => drain_and_send(&handle, &mut sender).await,
            msg = receiver.next() => handle_inbound(&handle, msg, &mut sender).await,
        };

        if !keep_open || !state.running.load(Ordering::Relaxed) {
            break;
        }
    }

    state.registry.remove(id);
    info!(session = %id, "session disconnected");
}

/// Drain every queued frame and write it. Returns `false` once a `timeout`
/// frame has been sent (spec.md §4.8: "initiates an orderly close") or the
/// socket write fails.
async fn drain_and_send(
    handle: &Arc<SessionHandle>,
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
) -> bool {
    let frames = {
        let mut entry = handle.entry.lock();
        let frames = entry.drain();
        entry.meta.outbound_messages += frames.len() as u64;
        frames
    };

    for frame in &frames {
        let json = frame.to_json();
        {
            let mut entry = handle.entry.lock();
            entry.meta.outbound_bytes += json.len() as u64;
        }
        if let Err(e) = sender.send(Message::Text(json)).await {
            debug!(error = %e, "WebSocket send failed — closing");
            return false;
        }
        if matches!(frame, ServerFrame::Timeout { .. }) {
            let _ = sender.send(Message::Close(None)).await;
            return false;
        }
    }

    true
}

async fn handle_inbound(
    handle: &Arc<SessionHandle>,
    msg: Option<Result<Message, axum::Error>>,
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
) -> bool {
    match msg {
        Some(Ok(Message::Text(text))) => {
            {
                let mut entry = handle.entry.lock();
                entry.meta.inbound_messages += 1;
                entry.meta.inbound_bytes += text.len() as u64;

                match parse_command(&text) {
                    ParseOutcome::Command(cmd) => {
                        let now = now_ms();
                        for frame in dispatch(&mut entry.state, now, cmd) {
                            entry.enqueue(frame);
                        }
                    }
                    ParseOutcome::Ignored => {}
                    ParseOutcome::Malformed => {
                        entry.meta.malformed_commands += 1;
                    }
                }
            }
            handle.notify.notify_one();
            true
        }
        Some(Ok(Message::Ping(data))) => sender.send(Message::Pong(data)).await.is_ok(),
        Some(Ok(Message::Pong(_))) => true,
        Some(Ok(Message::Close(_))) => false,
        Some(Ok(Message::Binary(_))) => true,
        Some(Err(e)) => {
            warn!(error = %e, "WebSocket receive error — closing");
            false
        }
        None => false,
    }
}
