use crate::socket::serve_participant;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use imitation_application::{Arena, ArenaSnapshot};
use imitation_core::ArenaError;
use imitation_core::conversation::{ConversationRecord, GameStatistics};
use serde::Serialize;
use uuid::Uuid;

pub fn router(arena: Arena) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/ws", get(ws_handler))
        .route("/stats", get(stats))
        .route("/participants/:id/conversations", get(participant_history))
        .with_state(arena)
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(State(arena): State<Arena>, ws: WebSocketUpgrade) -> Response {
    let participant_id = Uuid::new_v4().to_string();
    ws.on_upgrade(move |socket| serve_participant(arena, participant_id, socket))
}

#[derive(Serialize)]
struct StatsResponse {
    games: GameStatistics,
    live: ArenaSnapshot,
}

async fn stats(State(arena): State<Arena>) -> Result<Json<StatsResponse>, ApiError> {
    let games = arena.statistics().await?;
    let live = arena.snapshot().await;
    Ok(Json(StatsResponse { games, live }))
}

async fn participant_history(
    State(arena): State<Arena>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ConversationRecord>>, ApiError> {
    Ok(Json(arena.history(&id).await?))
}

struct ApiError(ArenaError);

impl From<ArenaError> for ApiError {
    fn from(err: ArenaError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %self.0, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = Json(ErrorResponse {
            error: self.0.client_message(),
        });
        (status, body).into_response()
    }
}
