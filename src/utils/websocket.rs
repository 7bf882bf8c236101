use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::services::{game_service, room_service};
use crate::state::AppState;
use crate::utils::auth;

/// Browsers cannot set headers on a WebSocket upgrade, so the token rides in
/// the query string.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    action: String,
    message: Option<String>,
}

pub async fn handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, EngineError> {
    let claims = auth::verify_token(&query.token)?;
    let user_id = claims.sub;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, user_id)))
}

async fn handle_socket(ws: WebSocket, state: AppState, room_id: String, user_id: String) {
    info!(%room_id, %user_id, "websocket attached");
    let tx = state.channel(&room_id).await;
    let mut rx = tx.subscribe();
    let (mut sender, mut receiver) = ws.split();

    // Full snapshot first, so a reconnecting client never depends on events
    // it missed while offline.
    if let Ok(room) = room_service::room_snapshot(&state, &room_id).await {
        let game = game_service::get_state(&state, &room_id, &user_id).await.ok();
        let payload = json!({ "type": "snapshot", "room": room, "game": game });
        if let Ok(text) = serde_json::to_string(&payload) {
            let _ = sender.send(Message::Text(text)).await;
        }
    }

    let recv_state = state.clone();
    let recv_room = room_id.clone();
    let recv_user = user_id.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                match serde_json::from_str::<InboundMessage>(&text) {
                    Ok(inbound) if inbound.action == "send_message" => {
                        let content = inbound.message.unwrap_or_default();
                        if let Err(e) =
                            room_service::send_chat(&recv_state, &recv_room, &recv_user, &content)
                                .await
                        {
                            debug!(room_id = %recv_room, "chat over websocket rejected: {e}");
                        }
                    }
                    Ok(inbound) => {
                        debug!(action = %inbound.action, "unsupported websocket action");
                    }
                    Err(e) => debug!("malformed websocket message: {e}"),
                }
            }
        }
    });

    let send_user = user_id.clone();
    let send_room = room_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    // private events go only to their recipient
                    if event.recipient().map_or(false, |r| r != send_user) {
                        continue;
                    }
                    match serde_json::to_string(&event) {
                        Ok(text) => {
                            if sender.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(room_id = %send_room, "failed to encode event: {e}"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // the client resynchronizes from the next poll snapshot
                    warn!(room_id = %send_room, skipped, "websocket subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let _ = tokio::join!(receive_task, send_task);
    info!(%room_id, %user_id, "websocket detached");
}
