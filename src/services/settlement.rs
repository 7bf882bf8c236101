use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;
use crate::models::game::{GameSession, Winner};
use crate::models::role::Faction;

/// One row per participant, pushed to the external profile service when a
/// game ends. Reputation and level math stays on the receiving side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub session_id: String,
    pub room_id: String,
    pub user_id: String,
    pub faction: Faction,
    pub won: bool,
    pub survived: bool,
}

#[derive(Clone)]
pub struct SettlementClient {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl SettlementClient {
    pub fn new(base_url: Option<String>) -> Self {
        SettlementClient {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Delivers the settlement batch. An unconfigured url disables delivery;
    /// a failed delivery is transient and never fatal to the session.
    pub async fn submit(&self, records: &[SettlementRecord]) -> Result<(), EngineError> {
        let Some(base) = &self.base_url else {
            debug!(
                records = records.len(),
                "settlement url not configured, skipping delivery"
            );
            return Ok(());
        };
        let url = format!("{}/game-results", base.trim_end_matches('/'));
        self.http
            .post(&url)
            .json(records)
            .send()
            .await
            .map_err(|e| EngineError::TransientIo(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::TransientIo(e.to_string()))?;
        Ok(())
    }
}

pub fn records_for(session: &GameSession, winner: Winner) -> Vec<SettlementRecord> {
    session
        .players
        .iter()
        .map(|p| {
            let faction = p.role.faction();
            let won = match winner {
                Winner::Town => faction == Faction::Town,
                Winner::Mafia => faction == Faction::Mafia,
                Winner::Aborted => false,
            };
            SettlementRecord {
                session_id: session.session_id.clone(),
                room_id: session.room_id.clone(),
                user_id: p.user_id.clone(),
                faction,
                won,
                survived: p.is_alive,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::EngineConfig;
    use crate::models::role::Role;
    use crate::models::room::{Participant, Room};
    use chrono::Utc;

    #[test]
    fn records_mark_winning_faction() {
        let mut room = Room::new("r1".into(), "t".into(), None, 4, "u0".into());
        room.players = (0..4)
            .map(|i| Participant {
                user_id: format!("u{i}"),
                user_name: format!("P{i}"),
                is_ready: true,
                bonus: None,
                joined_at: Utc::now(),
            })
            .collect();
        let mut s = GameSession::with_seed(&room, &EngineConfig::default(), 5);
        s.players[0].role = Role::Mafia;
        s.players[1].role = Role::Civilian;
        s.players[2].role = Role::Civilian;
        s.players[3].role = Role::Sheriff;
        s.players[0].is_alive = false;

        let records = records_for(&s, Winner::Town);
        assert_eq!(records.len(), 4);
        let mafia = &records[0];
        assert!(!mafia.won);
        assert!(!mafia.survived);
        assert!(records[1..].iter().all(|r| r.won && r.survived));
    }

    #[test]
    fn aborted_games_have_no_winners() {
        let mut room = Room::new("r1".into(), "t".into(), None, 4, "u0".into());
        room.players = (0..4)
            .map(|i| Participant {
                user_id: format!("u{i}"),
                user_name: format!("P{i}"),
                is_ready: true,
                bonus: None,
                joined_at: Utc::now(),
            })
            .collect();
        let s = GameSession::with_seed(&room, &EngineConfig::default(), 5);
        let records = records_for(&s, Winner::Aborted);
        assert!(records.iter().all(|r| !r.won));
    }
}
