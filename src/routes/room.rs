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
    models::bonus::Bonus,
    services::room_service,
    state::AppState,
    utils::{auth::AuthUser, websocket},
};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/create", post(create_room))
        .route("/rooms", get(list_rooms))
        .route("/:roomid", get(get_room_info))
        .route("/:roomid/join", post(join_room))
        .route("/:roomid/leave", post(leave_room))
        .route("/:roomid/chat", post(send_chat))
        .route("/:roomid/bonus", post(activate_bonus))
        .route("/:roomid/state", get(room_state))
        .route("/:roomid/ws", get(websocket::handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub max_players: usize,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

async fn create_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let room_id = room_service::create_room(
        &state,
        &user.user_id,
        &req.name,
        req.max_players,
        req.password.as_deref(),
    )
    .await?;
    Ok((StatusCode::OK, Json(CreateRoomResponse { room_id })))
}

async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    Json(room_service::list_rooms(&state).await)
}

// the public summary only: seat bonuses and the password hash stay inside
async fn get_room_info(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    Ok(Json(room_service::get_room(&state, &room_id).await?.summary()))
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinRoomRequest {
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub is_creator: bool,
}

async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    user: AuthUser,
    Json(req): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let is_creator = room_service::join_room(
        &state,
        &room_id,
        &user.user_id,
        &user.user_name,
        req.password.as_deref(),
    )
    .await?;
    Ok(Json(JoinRoomResponse { is_creator }))
}

async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    user: AuthUser,
) -> impl IntoResponse {
    room_service::leave_room(&state, &room_id, &user.user_id).await;
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct SendChatRequest {
    pub message: String,
}

async fn send_chat(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    user: AuthUser,
    Json(req): Json<SendChatRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let message = room_service::send_chat(&state, &room_id, &user.user_id, &req.message).await?;
    Ok(Json(message))
}

#[derive(Debug, Deserialize)]
pub struct BonusRequest {
    pub bonus_type: Bonus,
}

async fn activate_bonus(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    user: AuthUser,
    Json(req): Json<BonusRequest>,
) -> Result<impl IntoResponse, EngineError> {
    room_service::activate_bonus(&state, &room_id, &user.user_id, req.bonus_type).await?;
    Ok(StatusCode::OK)
}

async fn room_state(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    _user: AuthUser,
) -> Result<impl IntoResponse, EngineError> {
    Ok(Json(room_service::room_snapshot(&state, &room_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::room::RoomSummary;
    use crate::utils::test_setup::{issue_token, setup_test_env};
    use axum::{body::to_bytes, body::Body, http::Request};
    use tower::ServiceExt;

    fn authed(method: &str, uri: &str, user: &str, body: serde_json::Value) -> Request<Body> {
        let token = issue_token(user, user);
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-auth-token", token)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_room() {
        setup_test_env();
        let state = AppState::new();
        let app = routes(state);

        let request = authed(
            "POST",
            "/create",
            "u1",
            serde_json::json!({ "name": "Friday game", "max_players": 8 }),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: CreateRoomResponse = serde_json::from_slice(&body).unwrap();
        assert!(!created.room_id.is_empty());
    }

    #[tokio::test]
    async fn test_create_room_requires_token() {
        setup_test_env();
        let state = AppState::new();
        let app = routes(state);

        let request = Request::builder()
            .method("POST")
            .uri("/create")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "name": "x", "max_players": 8 }).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_join_and_list() {
        setup_test_env();
        let state = AppState::new();
        let app = routes(state.clone());

        let room_id = room_service::create_room(&state, "u1", "Table", 6, None)
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                &format!("/{room_id}/join"),
                "u1",
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let joined: JoinRoomResponse = serde_json::from_slice(&body).unwrap();
        assert!(joined.is_creator);

        let response = app
            .oneshot(authed("GET", "/rooms", "u1", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let rooms: Vec<RoomSummary> = serde_json::from_slice(&body).unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].current_players, 1);
    }

    #[tokio::test]
    async fn test_room_info_hides_seat_bonuses() {
        setup_test_env();
        let state = AppState::new();
        let app = routes(state.clone());

        let room_id = room_service::create_room(&state, "u1", "Table", 6, None)
            .await
            .unwrap();
        room_service::join_room(&state, &room_id, "u1", "Ann", None)
            .await
            .unwrap();
        room_service::activate_bonus(&state, &room_id, "u1", Bonus::Shield)
            .await
            .unwrap();

        // any caller gets the summary, never the seat-level data
        let response = app
            .oneshot(authed(
                "GET",
                &format!("/{room_id}"),
                "u9",
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let info: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(info["current_players"], 1);
        assert!(info.get("players").is_none());
        assert!(!info.to_string().contains("shield"));
    }

    #[tokio::test]
    async fn test_full_room_returns_conflict() {
        setup_test_env();
        let state = AppState::new();
        let app = routes(state.clone());

        let room_id = room_service::create_room(&state, "u0", "Tiny", 4, None)
            .await
            .unwrap();
        for i in 0..4 {
            room_service::join_room(&state, &room_id, &format!("u{i}"), "x", None)
                .await
                .unwrap();
        }
        let response = app
            .oneshot(authed(
                "POST",
                &format!("/{room_id}/join"),
                "u9",
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
