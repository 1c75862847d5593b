use crate::interface_adapters::net::client::spawn_room_serializer;
use crate::interface_adapters::state::AppState;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

#[derive(Debug, serde::Serialize)]
struct RoomCreatedResponse {
    // Code clients use in the websocket join handshake.
    room_code: String,
}

/// Creates a room ahead of any websocket connection so a host can share
/// the code before joining.
pub async fn create_room_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let room = state.room_registry.create_room().await;
    // Wire the serializer now so the first subscriber misses nothing.
    spawn_room_serializer(&room);
    (
        StatusCode::CREATED,
        Json(RoomCreatedResponse {
            room_code: room.room_code.to_string(),
        }),
    )
        .into_response()
}
