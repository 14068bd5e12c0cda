use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;

use crate::services::session;
use crate::state::AppState;

/// Upgrade the Twilio media stream connection and hand it to a session task.
pub async fn media_stream(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| session::run(state, socket))
}
