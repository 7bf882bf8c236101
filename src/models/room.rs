use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bonus::Bonus;
use super::chat::{ChatLog, ChatMessage};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InGame,
    Closed,
}

/// A lobby member. Identity comes from the externally resolved auth token;
/// the bonus slot is filled by a pre-game activation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    pub is_ready: bool,
    pub bonus: Option<Bonus>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub max_players: usize,
    pub created_by: String,
    pub status: RoomStatus,
    pub players: Vec<Participant>,
    pub chat: ChatLog,
    pub active_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What the lobby list shows; the password itself never leaves the registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub has_password: bool,
    pub max_players: usize,
    pub current_players: usize,
    pub status: RoomStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Poll snapshot for the waiting room: full roster plus recent chat, so a
/// reconnecting client never has to replay missed events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaitingSnapshot {
    pub players: Vec<RosterEntry>,
    pub chat: Vec<ChatMessage>,
    pub game_started: bool,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user_id: String,
    pub user_name: String,
    pub is_creator: bool,
}

impl Room {
    pub fn new(
        room_id: String,
        name: String,
        password_hash: Option<String>,
        max_players: usize,
        created_by: String,
    ) -> Self {
        Room {
            chat: ChatLog::new(room_id.clone()),
            room_id,
            name,
            password_hash,
            max_players,
            created_by,
            status: RoomStatus::Waiting,
            players: Vec::new(),
            active_session_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn participant_mut(&mut self, user_id: &str) -> Option<&mut Participant> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|p| RosterEntry {
                user_id: p.user_id.clone(),
                user_name: p.user_name.clone(),
                is_creator: self.is_creator(&p.user_id),
            })
            .collect()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.room_id.clone(),
            name: self.name.clone(),
            has_password: self.password_hash.is_some(),
            max_players: self.max_players,
            current_players: self.players.len(),
            status: self.status,
            created_by: self.created_by.clone(),
            created_at: self.created_at,
        }
    }

    pub fn snapshot(&self) -> WaitingSnapshot {
        WaitingSnapshot {
            players: self.roster(),
            chat: self.chat.recent(50),
            game_started: self.status != RoomStatus::Waiting,
            session_id: self.active_session_id.clone(),
        }
    }
}
