use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use mafia_server::app::create_app_with_state;
use mafia_server::models::{game::GameStateView, room::WaitingSnapshot};
use mafia_server::state::AppState;
use mafia_server::utils::test_setup::{issue_token, setup_test_env};

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

async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_lobby_to_game_flow() {
    setup_test_env();
    let state = AppState::new();
    let app = create_app_with_state(state);

    // create a room
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/room/create",
            "u0",
            serde_json::json!({ "name": "Friday game", "max_players": 8 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created: serde_json::Value = json_body(response).await;
    let room_id = created["room_id"].as_str().unwrap().to_string();

    // four players take their seats
    for i in 0..4 {
        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                &format!("/api/room/{room_id}/join"),
                &format!("u{i}"),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // lobby chat lands in the snapshot
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/api/room/{room_id}/chat"),
            "u1",
            serde_json::json!({ "message": "ready when you are" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/api/room/{room_id}/state"),
            "u1",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot: WaitingSnapshot = json_body(response).await;
    assert_eq!(snapshot.players.len(), 4);
    assert_eq!(snapshot.chat.len(), 1);
    assert!(!snapshot.game_started);

    // the creator starts the game
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/api/game/{room_id}/start"),
            "u0",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let started: serde_json::Value = json_body(response).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();

    // the waiting snapshot now points at the session
    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/api/room/{room_id}/state"),
            "u1",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    let snapshot: WaitingSnapshot = json_body(response).await;
    assert!(snapshot.game_started);
    assert_eq!(snapshot.session_id.as_deref(), Some(session_id.as_str()));

    // and every member can pull a private game view
    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/api/game/{room_id}/state"),
            "u2",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view: GameStateView = json_body(response).await;
    assert_eq!(view.session_id, session_id);
    assert_eq!(view.day_number, 1);
    assert!(view.my_role.is_some());
    assert_eq!(view.players.len(), 4);
}

#[tokio::test]
async fn test_unknown_room_is_not_found() {
    setup_test_env();
    let app = create_app_with_state(AppState::new());

    let response = app
        .oneshot(authed(
            "GET",
            "/api/room/no-such-room",
            "u1",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_game_state_before_start_is_not_found() {
    setup_test_env();
    let state = AppState::new();
    let app = create_app_with_state(state);

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/room/create",
            "u0",
            serde_json::json!({ "name": "Idle", "max_players": 6 }),
        ))
        .await
        .unwrap();
    let created: serde_json::Value = json_body(response).await;
    let room_id = created["room_id"].as_str().unwrap();

    let response = app
        .oneshot(authed(
            "GET",
            &format!("/api/game/{room_id}/state"),
            "u0",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_error_body_carries_stable_code() {
    setup_test_env();
    let app = create_app_with_state(AppState::new());

    let response = app
        .oneshot(authed(
            "POST",
            "/api/room/create",
            "u1",
            serde_json::json!({ "name": "x", "max_players": 99 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = json_body(response).await;
    assert_eq!(body["code"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("max players"));
}
