use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::EngineError,
    models::role::NightActionKind,
    services::game_service,
    state::AppState,
    utils::auth::AuthUser,
};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:roomid",
            Router::new()
                .route("/start", post(start_game))
                .route("/end", post(end_game))
                .route("/state", get(get_game_state))
                .nest(
                    "/actions",
                    Router::new()
                        .route("/vote", post(cast_vote))
                        .route("/night-action", post(night_action)),
                ),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct StartGameResponse {
    pub session_id: String,
}

async fn start_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    user: AuthUser,
) -> Result<impl IntoResponse, EngineError> {
    let session_id = game_service::start_game(&state, &room_id, &user.user_id).await?;
    Ok((StatusCode::OK, Json(StartGameResponse { session_id })))
}

async fn end_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    user: AuthUser,
) -> Result<impl IntoResponse, EngineError> {
    game_service::end_game(&state, &room_id, &user.user_id).await?;
    Ok(StatusCode::OK)
}

async fn get_game_state(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    user: AuthUser,
) -> Result<impl IntoResponse, EngineError> {
    let view = game_service::get_state(&state, &room_id, &user.user_id).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub target_id: String,
}

async fn cast_vote(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    user: AuthUser,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, EngineError> {
    game_service::submit_vote(&state, &room_id, &user.user_id, &req.target_id).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct NightActionRequest {
    pub kind: NightActionKind,
    pub target_id: String,
}

async fn night_action(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    user: AuthUser,
    Json(req): Json<NightActionRequest>,
) -> Result<impl IntoResponse, EngineError> {
    game_service::submit_night_action(&state, &room_id, &user.user_id, req.kind, &req.target_id)
        .await?;
    Ok(StatusCode::OK)
}
