use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chat::ChatMessage;
use super::game::{GamePhase, Winner};
use super::role::{Faction, Role};
use super::room::RosterEntry;

/// Everything fanned out over a room's broadcast channel. Events are appended
/// in commit order, which gives subscribers a total order per room.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PlayerJoined {
        room_id: String,
        user_id: String,
        user_name: String,
        players: Vec<RosterEntry>,
    },
    PlayerLeft {
        room_id: String,
        user_id: String,
        players: Vec<RosterEntry>,
    },
    GameStarted {
        room_id: String,
        session_id: String,
    },
    /// Private: delivered only to `recipient`.
    RoleAssigned {
        room_id: String,
        recipient: String,
        role: Role,
    },
    PhaseChanged {
        room_id: String,
        from_phase: GamePhase,
        to_phase: GamePhase,
        day_number: u32,
        deadline: DateTime<Utc>,
        killed: Option<String>,
        eliminated: Option<String>,
    },
    VoteCast {
        room_id: String,
        voter_id: String,
        target_id: String,
    },
    NewMessage {
        room_id: String,
        message: ChatMessage,
    },
    /// Private: the sheriff's night result.
    InvestigationResult {
        room_id: String,
        recipient: String,
        target_id: String,
        faction: Faction,
    },
    GameEnded {
        room_id: String,
        winner: Winner,
        day_number: u32,
    },
}

impl GameEvent {
    pub fn room_id(&self) -> &str {
        match self {
            GameEvent::PlayerJoined { room_id, .. }
            | GameEvent::PlayerLeft { room_id, .. }
            | GameEvent::GameStarted { room_id, .. }
            | GameEvent::RoleAssigned { room_id, .. }
            | GameEvent::PhaseChanged { room_id, .. }
            | GameEvent::VoteCast { room_id, .. }
            | GameEvent::NewMessage { room_id, .. }
            | GameEvent::InvestigationResult { room_id, .. }
            | GameEvent::GameEnded { room_id, .. } => room_id,
        }
    }

    /// Some(user) for private events; None means broadcast to the room.
    pub fn recipient(&self) -> Option<&str> {
        match self {
            GameEvent::RoleAssigned { recipient, .. }
            | GameEvent::InvestigationResult { recipient, .. } => Some(recipient),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_events_carry_a_recipient() {
        let e = GameEvent::RoleAssigned {
            room_id: "r1".into(),
            recipient: "u1".into(),
            role: Role::Sheriff,
        };
        assert_eq!(e.recipient(), Some("u1"));
        assert_eq!(e.room_id(), "r1");

        let e = GameEvent::GameEnded {
            room_id: "r1".into(),
            winner: Winner::Town,
            day_number: 3,
        };
        assert_eq!(e.recipient(), None);
    }

    #[test]
    fn events_tag_their_type_on_the_wire() {
        let e = GameEvent::VoteCast {
            room_id: "r1".into(),
            voter_id: "u1".into(),
            target_id: "u2".into(),
        };
        let json = serde_json::to_value(&e).expect("event serializes");
        assert_eq!(json["type"], "vote_cast");
    }
}
