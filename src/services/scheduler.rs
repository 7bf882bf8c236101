use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::debug;

use crate::models::game::GamePhase;
use crate::services::game_service;
use crate::state::AppState;

/// Upper bound on one scheduler nap, so a phase that advanced early gets its
/// new deadline picked up promptly.
const TICK: Duration = Duration::from_millis(500);

/// Drives one session's phase cycle on its deadlines until the session
/// reaches `results` and is archived. Each session gets its own task, so
/// rooms never block each other.
pub fn spawn(state: AppState, room_id: String) {
    tokio::spawn(async move { run(state, room_id).await });
}

async fn run(state: AppState, room_id: String) {
    loop {
        let Some(session) = state.session(&room_id).await else {
            return;
        };
        let (deadline, seq, terminal) = {
            let s = session.lock().await;
            (s.phase_deadline, s.phase_seq, s.phase == GamePhase::Results)
        };

        let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        if terminal {
            // results display window, then teardown
            sleep(remaining).await;
            game_service::archive_session(&state, &room_id).await;
            return;
        }

        if remaining > Duration::ZERO {
            sleep(remaining.min(TICK)).await;
            continue;
        }

        let mut s = session.lock().await;
        if s.phase_seq != seq {
            // a submission advanced this phase between our read and the lock
            debug!(%room_id, "phase already advanced, rescheduling");
            continue;
        }
        game_service::advance_locked(&state, &mut s).await;
    }
}
