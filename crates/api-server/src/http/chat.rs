use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::{ChatTurnRequest, ChatTurnResponse};

use super::AppState;
use super::errors::completer_error_response;

pub(super) async fn chat_turn(
    State(state): State<AppState>,
    Json(req): Json<ChatTurnRequest>,
) -> Response {
    match state
        .conversation
        .take_turn(req.conversation_history, &req.message)
        .await
    {
        Ok(turn) => (
            StatusCode::OK,
            Json(ChatTurnResponse {
                response: turn.response,
                conversation_history: turn.history,
            }),
        )
            .into_response(),
        Err(err) => completer_error_response(err),
    }
}
