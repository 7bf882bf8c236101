use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::models::{
    event::GameEvent,
    game::{GameSession, GameStateView, PhaseTransition, Winner},
    role::NightActionKind,
    room::RoomStatus,
};
use crate::services::{scheduler, settlement};
use crate::state::AppState;

pub const MIN_PLAYERS: usize = 4;

/// Freezes the room roster into a session, deals roles, and hands the
/// session to the phase scheduler. Creator only; exactly-once per room.
pub async fn start_game(
    state: &AppState,
    room_id: &str,
    requester_id: &str,
) -> Result<String, EngineError> {
    let session_id;
    let role_events;
    {
        let mut rooms = state.rooms.lock().await;
        let room = rooms.get_mut(room_id).ok_or(EngineError::RoomNotFound)?;
        if !room.is_creator(requester_id) {
            return Err(EngineError::Unauthorized(
                "only the room creator can start the game".into(),
            ));
        }
        if room.status != RoomStatus::Waiting {
            return Err(EngineError::RoomInGame);
        }
        if room.players.len() < MIN_PLAYERS {
            return Err(EngineError::NotEnoughPlayers(MIN_PLAYERS));
        }

        let session = GameSession::new(room, &state.config);
        session_id = session.session_id.clone();
        role_events = session
            .players
            .iter()
            .map(|p| GameEvent::RoleAssigned {
                room_id: room_id.to_string(),
                recipient: p.user_id.clone(),
                role: p.role,
            })
            .collect::<Vec<_>>();

        room.status = RoomStatus::InGame;
        room.active_session_id = Some(session_id.clone());
        room.chat.add_system_message("The game has started".into());

        state
            .games
            .lock()
            .await
            .insert(room_id.to_string(), Arc::new(Mutex::new(session)));
    }

    state
        .broadcast(GameEvent::GameStarted {
            room_id: room_id.to_string(),
            session_id: session_id.clone(),
        })
        .await;
    for event in role_events {
        state.broadcast(event).await;
    }
    scheduler::spawn(state.clone(), room_id.to_string());
    info!(%room_id, %session_id, "game started");
    Ok(session_id)
}

/// Per-viewer snapshot: the session view plus recent room chat, sufficient
/// for a reconnecting client to resynchronize in one call.
pub async fn get_state(
    state: &AppState,
    room_id: &str,
    viewer_id: &str,
) -> Result<GameStateView, EngineError> {
    let chat = {
        let rooms = state.rooms.lock().await;
        rooms
            .get(room_id)
            .map(|r| r.chat.recent(50))
            .unwrap_or_default()
    };
    let session = state
        .session(room_id)
        .await
        .ok_or(EngineError::SessionNotFound)?;
    let mut view = session.lock().await.view_for(viewer_id);
    view.chat = chat;
    Ok(view)
}

pub async fn submit_vote(
    state: &AppState,
    room_id: &str,
    voter_id: &str,
    target_id: &str,
) -> Result<(), EngineError> {
    let session = state
        .session(room_id)
        .await
        .ok_or(EngineError::SessionNotFound)?;
    let mut s = session.lock().await;
    s.submit_vote(voter_id, target_id)?;
    state
        .broadcast(GameEvent::VoteCast {
            room_id: room_id.to_string(),
            voter_id: voter_id.to_string(),
            target_id: target_id.to_string(),
        })
        .await;
    if s.phase_complete() {
        advance_locked(state, &mut s).await;
    }
    Ok(())
}

/// Night actions stay secret: no public event, just the recorded submission
/// and a possible early advance once every eligible actor is in.
pub async fn submit_night_action(
    state: &AppState,
    room_id: &str,
    actor_id: &str,
    kind: NightActionKind,
    target_id: &str,
) -> Result<(), EngineError> {
    let session = state
        .session(room_id)
        .await
        .ok_or(EngineError::SessionNotFound)?;
    let mut s = session.lock().await;
    s.submit_night_action(actor_id, kind, target_id)?;
    if s.phase_complete() {
        advance_locked(state, &mut s).await;
    }
    Ok(())
}

/// Administrative abort. The session still reaches `results`, with
/// `winner = aborted`; the scheduler archives it after the display window.
pub async fn end_game(
    state: &AppState,
    room_id: &str,
    requester_id: &str,
) -> Result<(), EngineError> {
    {
        let rooms = state.rooms.lock().await;
        let room = rooms.get(room_id).ok_or(EngineError::RoomNotFound)?;
        if !room.is_creator(requester_id) {
            return Err(EngineError::Unauthorized(
                "only the room creator can end the game".into(),
            ));
        }
    }
    let session = state
        .session(room_id)
        .await
        .ok_or(EngineError::SessionNotFound)?;
    let mut s = session.lock().await;
    if s.winner.is_some() {
        return Err(EngineError::SessionEnded);
    }
    s.abort(&state.config);
    let event = GameEvent::GameEnded {
        room_id: room_id.to_string(),
        winner: Winner::Aborted,
        day_number: s.day_number,
    };
    drop(s);
    state.broadcast(event).await;
    info!(%room_id, "session aborted");
    Ok(())
}

/// Aborts a session whose room lost its last member. There is nobody left to
/// call `end_game`, so the teardown has to happen here; the scheduler
/// archives the session after the results window as usual.
pub(crate) async fn abort_abandoned(state: &AppState, room_id: &str) {
    let Some(session) = state.session(room_id).await else {
        return;
    };
    let mut s = session.lock().await;
    if s.winner.is_some() {
        return;
    }
    s.abort(&state.config);
    let event = GameEvent::GameEnded {
        room_id: room_id.to_string(),
        winner: Winner::Aborted,
        day_number: s.day_number,
    };
    drop(s);
    state.broadcast(event).await;
    info!(%room_id, "session aborted, all players left");
}

/// Runs one phase transition while the session lock is held and fans out the
/// resulting events. Both the scheduler and the early-advance path land here,
/// so a phase can never resolve twice.
pub(crate) async fn advance_locked(state: &AppState, s: &mut GameSession) {
    let t: PhaseTransition = s.advance_phase(&state.config);
    if t.from == t.to {
        return;
    }
    let room_id = s.room_id.clone();

    if let Some(night) = &t.night {
        for inv in &night.investigations {
            state
                .broadcast(GameEvent::InvestigationResult {
                    room_id: room_id.clone(),
                    recipient: inv.sheriff_id.clone(),
                    target_id: inv.target_id.clone(),
                    faction: inv.faction,
                })
                .await;
        }
    }

    state
        .broadcast(GameEvent::PhaseChanged {
            room_id: room_id.clone(),
            from_phase: t.from,
            to_phase: t.to,
            day_number: s.day_number,
            deadline: s.phase_deadline,
            killed: t.night.as_ref().and_then(|n| n.killed.clone()),
            eliminated: t.eliminated.clone(),
        })
        .await;

    if let Some(winner) = t.winner {
        state
            .broadcast(GameEvent::GameEnded {
                room_id: room_id.clone(),
                winner,
                day_number: s.day_number,
            })
            .await;
        info!(%room_id, ?winner, "game ended");
        let records = settlement::records_for(s, winner);
        let client = state.settlement.clone();
        tokio::spawn(async move {
            if let Err(e) = client.submit(&records).await {
                warn!(%room_id, "settlement delivery failed: {e}");
            }
        });
    }
}

/// Tears the finished session down: the room is closed and removed together
/// with the session and its channel.
pub(crate) async fn archive_session(state: &AppState, room_id: &str) {
    {
        let mut rooms = state.rooms.lock().await;
        if let Some(room) = rooms.get_mut(room_id) {
            room.status = RoomStatus::Closed;
        }
        rooms.remove(room_id);
    }
    state.games.lock().await.remove(room_id);
    state.channels.lock().await.remove(room_id);
    info!(%room_id, "session archived");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::GamePhase;
    use crate::services::room_service;

    async fn lobby(n: usize) -> (AppState, String) {
        let state = AppState::new();
        let room_id = room_service::create_room(&state, "u0", "Table", 20, None)
            .await
            .unwrap();
        for i in 0..n {
            room_service::join_room(&state, &room_id, &format!("u{i}"), &format!("P{i}"), None)
                .await
                .unwrap();
        }
        (state, room_id)
    }

    #[tokio::test]
    async fn start_requires_creator_and_quorum() {
        let (state, room_id) = lobby(3).await;
        assert!(matches!(
            start_game(&state, &room_id, "u1").await,
            Err(EngineError::Unauthorized(_))
        ));
        assert!(matches!(
            start_game(&state, &room_id, "u0").await,
            Err(EngineError::NotEnoughPlayers(4))
        ));
    }

    #[tokio::test]
    async fn start_is_exactly_once() {
        let (state, room_id) = lobby(5).await;
        let session_id = start_game(&state, &room_id, "u0").await.unwrap();
        assert!(!session_id.is_empty());
        assert!(matches!(
            start_game(&state, &room_id, "u0").await,
            Err(EngineError::RoomInGame)
        ));
        let rooms = state.rooms.lock().await;
        assert_eq!(rooms.get(&room_id).unwrap().status, RoomStatus::InGame);
    }

    #[tokio::test]
    async fn state_view_is_private_per_viewer() {
        let (state, room_id) = lobby(5).await;
        start_game(&state, &room_id, "u0").await.unwrap();
        let view = get_state(&state, &room_id, "u2").await.unwrap();
        assert_eq!(view.phase, GamePhase::Night);
        assert!(view.my_role.is_some());
        let hidden = view
            .players
            .iter()
            .filter(|p| p.id != "u2" && p.role.is_some())
            .count();
        assert_eq!(hidden, 0);
    }

    #[tokio::test]
    async fn abort_reaches_results_and_rejects_votes() {
        let (state, room_id) = lobby(5).await;
        start_game(&state, &room_id, "u0").await.unwrap();
        end_game(&state, &room_id, "u0").await.unwrap();
        let view = get_state(&state, &room_id, "u0").await.unwrap();
        assert_eq!(view.phase, GamePhase::Results);
        assert_eq!(view.winner, Some(Winner::Aborted));
        assert!(matches!(
            submit_vote(&state, &room_id, "u1", "u2").await,
            Err(EngineError::SessionEnded)
        ));
        assert!(matches!(
            end_game(&state, &room_id, "u0").await,
            Err(EngineError::SessionEnded)
        ));
    }

    #[tokio::test]
    async fn emptied_room_aborts_its_session() {
        let (state, room_id) = lobby(4).await;
        start_game(&state, &room_id, "u0").await.unwrap();
        for i in 0..4 {
            room_service::leave_room(&state, &room_id, &format!("u{i}")).await;
        }
        assert!(state.rooms.lock().await.get(&room_id).is_none());
        // the session still reaches its terminal state for the scheduler
        let view = get_state(&state, &room_id, "u0").await.unwrap();
        assert_eq!(view.phase, GamePhase::Results);
        assert_eq!(view.winner, Some(Winner::Aborted));
    }

    #[tokio::test]
    async fn vote_in_wrong_phase_is_illegal() {
        let (state, room_id) = lobby(5).await;
        start_game(&state, &room_id, "u0").await.unwrap();
        assert!(matches!(
            submit_vote(&state, &room_id, "u1", "u2").await,
            Err(EngineError::IllegalAction(_))
        ));
    }
}
