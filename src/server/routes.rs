// =============================================================================
// HTTP router — health fallback + WebSocket upgrade (spec.md §6)
// =============================================================================
//
// Grounded on the teacher's `api/rest.rs::router`. The teacher mounts a
// named `/api/v1/health` route behind no auth; this crate generalizes that
// into a `.fallback(...)` so *any* plain HTTP request on the port gets the
// same `200 OK {"status":"ok"}` idle-watcher response (spec.md §6: "answers
// any plain HTTP request on the same port"). `api/auth.rs`'s `AuthBearer`
// extractor is not carried forward — authentication is out of scope
// (spec.md §1 Non-goals) — see DESIGN.md.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::server::state::AppState;
use crate::server::ws::ws_handler;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .fallback(health)
        .layer(cors)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
