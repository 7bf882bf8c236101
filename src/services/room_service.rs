use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{
    bonus::Bonus,
    chat::{ChatMessage, ChatMessageType},
    event::GameEvent,
    room::{Participant, Room, RoomStatus, RoomSummary, WaitingSnapshot},
};
use crate::state::AppState;

pub async fn create_room(
    state: &AppState,
    creator_id: &str,
    name: &str,
    max_players: usize,
    password: Option<&str>,
) -> Result<String, EngineError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("room name is required".into()));
    }
    if !(4..=20).contains(&max_players) {
        return Err(EngineError::Validation(
            "max players must be between 4 and 20".into(),
        ));
    }
    let password_hash = match password {
        Some(p) if !p.is_empty() => Some(
            bcrypt::hash(p, 10)
                .map_err(|_| EngineError::Validation("unusable password".into()))?,
        ),
        _ => None,
    };

    let room_id = Uuid::new_v4().to_string();
    let room = Room::new(
        room_id.clone(),
        name.to_string(),
        password_hash,
        max_players,
        creator_id.to_string(),
    );
    state.rooms.lock().await.insert(room_id.clone(), room);
    info!(%room_id, creator = %creator_id, "room created");
    Ok(room_id)
}

/// Adds the caller to the room. Joining a room you are already in is
/// idempotent and just re-reports creator status.
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    user_id: &str,
    user_name: &str,
    password: Option<&str>,
) -> Result<bool, EngineError> {
    let event;
    let is_creator;
    {
        let mut rooms = state.rooms.lock().await;
        let room = rooms.get_mut(room_id).ok_or(EngineError::RoomNotFound)?;

        if room.participant(user_id).is_some() {
            return Ok(room.is_creator(user_id));
        }
        if room.status != RoomStatus::Waiting {
            return Err(EngineError::RoomInGame);
        }
        if room.players.len() >= room.max_players {
            return Err(EngineError::RoomFull);
        }
        if let Some(hash) = &room.password_hash {
            let given = password.unwrap_or("");
            if !bcrypt::verify(given, hash).unwrap_or(false) {
                return Err(EngineError::BadPassword);
            }
        }

        room.players.push(Participant {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            is_ready: false,
            bonus: None,
            joined_at: Utc::now(),
        });
        is_creator = room.is_creator(user_id);
        event = GameEvent::PlayerJoined {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            players: room.roster(),
        };
    }
    state.broadcast(event).await;
    Ok(is_creator)
}

/// Idempotent. Deletes the room when it empties; hands the creator seat to
/// the next-joined member otherwise.
pub async fn leave_room(state: &AppState, room_id: &str, user_id: &str) {
    let event;
    {
        let mut rooms = state.rooms.lock().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        let before = room.players.len();
        room.players.retain(|p| p.user_id != user_id);
        if room.players.len() == before {
            return;
        }
        if room.players.is_empty() {
            let had_session = room.status == RoomStatus::InGame;
            rooms.remove(room_id);
            drop(rooms);
            info!(%room_id, "room emptied and deleted");
            if had_session {
                // a running game with nobody left can never finish on its own
                crate::services::game_service::abort_abandoned(state, room_id).await;
            }
            return;
        }
        if room.created_by == user_id {
            room.created_by = room.players[0].user_id.clone();
            info!(%room_id, new_creator = %room.created_by, "creator left, seat transferred");
        }
        event = GameEvent::PlayerLeft {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            players: room.roster(),
        };
    }
    state.broadcast(event).await;
}

/// Summaries in creation order.
pub async fn list_rooms(state: &AppState) -> Vec<RoomSummary> {
    let rooms = state.rooms.lock().await;
    let mut out: Vec<RoomSummary> = rooms.values().map(Room::summary).collect();
    out.sort_by_key(|r| r.created_at);
    out
}

pub async fn get_room(state: &AppState, room_id: &str) -> Result<Room, EngineError> {
    let rooms = state.rooms.lock().await;
    rooms.get(room_id).cloned().ok_or(EngineError::RoomNotFound)
}

pub async fn room_snapshot(
    state: &AppState,
    room_id: &str,
) -> Result<WaitingSnapshot, EngineError> {
    let rooms = state.rooms.lock().await;
    rooms
        .get(room_id)
        .map(Room::snapshot)
        .ok_or(EngineError::RoomNotFound)
}

/// Appends a chat message and fans it out. Members only.
pub async fn send_chat(
    state: &AppState,
    room_id: &str,
    user_id: &str,
    content: &str,
) -> Result<ChatMessage, EngineError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(EngineError::Validation("message is required".into()));
    }
    let message;
    {
        let mut rooms = state.rooms.lock().await;
        let room = rooms.get_mut(room_id).ok_or(EngineError::RoomNotFound)?;
        let sender = room
            .participant(user_id)
            .ok_or_else(|| EngineError::Unauthorized("not a member of this room".into()))?;
        message = ChatMessage::new(
            user_id.to_string(),
            sender.user_name.clone(),
            content.to_string(),
            ChatMessageType::Public,
        );
        room.chat.add_message(message.clone());
    }
    state
        .broadcast(GameEvent::NewMessage {
            room_id: room_id.to_string(),
            message: message.clone(),
        })
        .await;
    Ok(message)
}

/// Records a pre-game bonus activation on the caller's lobby seat. The
/// session folds these in when the roster is frozen.
pub async fn activate_bonus(
    state: &AppState,
    room_id: &str,
    user_id: &str,
    bonus: Bonus,
) -> Result<(), EngineError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms.get_mut(room_id).ok_or(EngineError::RoomNotFound)?;
    if room.status != RoomStatus::Waiting {
        return Err(EngineError::RoomInGame);
    }
    let participant = room
        .participant_mut(user_id)
        .ok_or_else(|| EngineError::Unauthorized("not a member of this room".into()))?;
    participant.bonus = Some(bonus);
    Ok(())
}
