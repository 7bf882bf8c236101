use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bonus::Bonus;
use super::chat::ChatMessage;
use super::config::EngineConfig;
use super::player::Player;
use super::role::{assign_roles, Faction, NightActionKind, Role};
use super::room::Room;
use crate::error::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Night,
    Day,
    Vote,
    Results,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Town,
    Mafia,
    Aborted,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NightAction {
    pub kind: NightActionKind,
    pub target_id: String,
}

/// One running game. All mutation happens under the session's exclusive lock
/// (see `AppState::games`); the methods here assume that exclusivity.
#[derive(Clone, Debug)]
pub struct GameSession {
    pub session_id: String,
    pub room_id: String,
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub day_number: u32,
    pub phase_deadline: DateTime<Utc>,
    /// Bumped on every transition; lets the scheduler detect that a phase it
    /// slept through was already resolved by an early advance.
    pub phase_seq: u64,
    /// Actor id -> declared action. Resubmission overwrites.
    pub night_actions: HashMap<String, NightAction>,
    /// Voter id -> candidate id. Resubmission overwrites.
    pub votes: HashMap<String, String>,
    pub last_killed: Option<String>,
    pub winner: Option<Winner>,
    pub rng: StdRng,
}

#[derive(Clone, Debug)]
pub struct Investigation {
    pub sheriff_id: String,
    pub target_id: String,
    pub faction: Faction,
}

#[derive(Clone, Debug, Default)]
pub struct NightOutcome {
    pub killed: Option<String>,
    pub investigations: Vec<Investigation>,
    pub blocked: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct PhaseTransition {
    pub from: GamePhase,
    pub to: GamePhase,
    pub night: Option<NightOutcome>,
    pub eliminated: Option<String>,
    pub winner: Option<Winner>,
}

/// Per-viewer projection of the session. Other players' roles stay hidden
/// until death or game end.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameStateView {
    pub session_id: String,
    pub room_id: String,
    pub phase: GamePhase,
    pub day_number: u32,
    pub phase_deadline: DateTime<Utc>,
    pub my_role: Option<Role>,
    pub players: Vec<PlayerView>,
    pub last_killed: Option<String>,
    pub winner: Option<Winner>,
    pub chat: Vec<ChatMessage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
    pub voted: bool,
}

fn deadline_after(d: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::seconds(d.as_secs() as i64)
}

impl GameSession {
    /// Freezes the room roster into a new session. The shuffle seed comes
    /// from OS entropy; `with_seed` exists for deterministic tests.
    pub fn new(room: &Room, cfg: &EngineConfig) -> Self {
        Self::with_seed(room, cfg, rand::random::<u64>())
    }

    pub fn with_seed(room: &Room, cfg: &EngineConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let players = assign_roles(&room.players, cfg, &mut rng);
        GameSession {
            session_id: Uuid::new_v4().to_string(),
            room_id: room.room_id.clone(),
            players,
            phase: GamePhase::Night,
            day_number: 1,
            phase_deadline: deadline_after(cfg.night_duration),
            phase_seq: 0,
            night_actions: HashMap::new(),
            votes: HashMap::new(),
            last_killed: None,
            winner: None,
            rng,
        }
    }

    pub fn player(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn player_mut(&mut self, user_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.winner.is_some() {
            Err(EngineError::SessionEnded)
        } else {
            Ok(())
        }
    }

    /// Validates and records a night action. Legality comes from the role's
    /// capability entry; a rejected submission leaves the session untouched.
    pub fn submit_night_action(
        &mut self,
        actor_id: &str,
        kind: NightActionKind,
        target_id: &str,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        if self.phase != GamePhase::Night {
            return Err(EngineError::IllegalAction(
                "night actions are only accepted at night".into(),
            ));
        }
        let actor = self.player(actor_id).ok_or_else(|| {
            EngineError::IllegalAction("actor is not part of this session".into())
        })?;
        if !actor.is_alive {
            return Err(EngineError::IllegalAction("dead players cannot act".into()));
        }
        let spec = actor.role.spec();
        if spec.night_action != Some(kind) {
            return Err(EngineError::IllegalAction(format!(
                "a {} cannot perform that action",
                actor.role
            )));
        }
        let target = self
            .player(target_id)
            .ok_or_else(|| EngineError::IllegalAction("unknown target".into()))?;
        if !target.is_alive {
            return Err(EngineError::IllegalAction("target is not alive".into()));
        }
        if actor_id == target_id && !spec.can_target_self {
            return Err(EngineError::IllegalAction("cannot target yourself".into()));
        }
        self.night_actions.insert(
            actor_id.to_string(),
            NightAction {
                kind,
                target_id: target_id.to_string(),
            },
        );
        Ok(())
    }

    pub fn submit_vote(&mut self, voter_id: &str, target_id: &str) -> Result<(), EngineError> {
        self.ensure_open()?;
        if self.phase != GamePhase::Vote {
            return Err(EngineError::IllegalAction(
                "votes are only accepted during the vote phase".into(),
            ));
        }
        let voter = self.player(voter_id).ok_or_else(|| {
            EngineError::IllegalAction("voter is not part of this session".into())
        })?;
        if !voter.is_alive {
            return Err(EngineError::IllegalAction("dead players cannot vote".into()));
        }
        let target = self
            .player(target_id)
            .ok_or_else(|| EngineError::IllegalAction("unknown candidate".into()))?;
        if !target.is_alive {
            return Err(EngineError::IllegalAction("candidate is not alive".into()));
        }
        self.votes
            .insert(voter_id.to_string(), target_id.to_string());
        Ok(())
    }

    /// True when everyone eligible to act in the current phase has submitted,
    /// which lets the phase advance ahead of its deadline.
    pub fn phase_complete(&self) -> bool {
        match self.phase {
            GamePhase::Night => {
                let eligible: Vec<&Player> = self
                    .players
                    .iter()
                    .filter(|p| p.is_alive && p.role.spec().night_action.is_some())
                    .collect();
                !eligible.is_empty()
                    && eligible
                        .iter()
                        .all(|p| self.night_actions.contains_key(&p.user_id))
            }
            GamePhase::Vote => self
                .players
                .iter()
                .filter(|p| p.is_alive)
                .all(|p| self.votes.contains_key(&p.user_id)),
            GamePhase::Day | GamePhase::Results => false,
        }
    }

    /// Resolves the night in fixed order: blocks, heals, kills, then
    /// investigations. A blocked actor's action is discarded; a healed or
    /// shielded target survives the kill.
    pub fn resolve_night(&mut self) -> NightOutcome {
        let actions = std::mem::take(&mut self.night_actions);
        self.last_killed = None;

        let blocked: HashSet<String> = actions
            .values()
            .filter(|a| a.kind == NightActionKind::Block)
            .map(|a| a.target_id.clone())
            .collect();

        let live: Vec<(&String, &NightAction)> = actions
            .iter()
            .filter(|(actor, _)| !blocked.contains(*actor))
            .collect();

        let healed: HashSet<&str> = live
            .iter()
            .filter(|(_, a)| a.kind == NightActionKind::Heal)
            .map(|(_, a)| a.target_id.as_str())
            .collect();

        let kill_target = self.select_kill_target(&live);

        let mut killed = None;
        if let Some(target_id) = kill_target {
            if !healed.contains(target_id.as_str()) {
                if let Some(target) = self.player_mut(&target_id) {
                    if target.bonus == Some(Bonus::Shield) && !target.shield_spent {
                        target.shield_spent = true;
                    } else {
                        target.is_alive = false;
                        killed = Some(target_id);
                    }
                }
            }
        }
        self.last_killed = killed.clone();

        let mut investigations = Vec::new();
        for (actor, action) in &live {
            if action.kind != NightActionKind::Investigate {
                continue;
            }
            if let Some(target) = self.player(&action.target_id) {
                let mut faction = target.role.faction();
                if target.bonus == Some(Bonus::Documents) {
                    faction = match faction {
                        Faction::Mafia => Faction::Town,
                        Faction::Town => Faction::Mafia,
                        Faction::Neutral => Faction::Neutral,
                    };
                }
                investigations.push(Investigation {
                    sheriff_id: (*actor).clone(),
                    target_id: action.target_id.clone(),
                    faction,
                });
            }
        }

        NightOutcome {
            killed,
            investigations,
            blocked: blocked.into_iter().collect(),
        }
    }

    /// Kill target precedence: the don's choice if a don acted, otherwise the
    /// majority among mafia submissions, ties broken by the session RNG over
    /// a sorted candidate list.
    fn select_kill_target(&mut self, live: &[(&String, &NightAction)]) -> Option<String> {
        let mut don_target = None;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for (actor, action) in live {
            if action.kind != NightActionKind::Kill {
                continue;
            }
            if self
                .players
                .iter()
                .any(|p| p.user_id == **actor && p.role == Role::Don)
            {
                don_target = Some(action.target_id.clone());
            }
            *counts.entry(action.target_id.clone()).or_insert(0) += 1;
        }
        if don_target.is_some() {
            return don_target;
        }
        let max = counts.values().copied().max()?;
        let mut tied: Vec<String> = counts
            .into_iter()
            .filter(|(_, c)| *c == max)
            .map(|(t, _)| t)
            .collect();
        tied.sort();
        let idx = if tied.len() == 1 {
            0
        } else {
            self.rng.gen_range(0..tied.len())
        };
        Some(tied.swap_remove(idx))
    }

    /// Strict plurality: the single most-voted candidate dies; any tie means
    /// nobody is eliminated.
    pub fn resolve_votes(&mut self) -> Option<String> {
        let votes = std::mem::take(&mut self.votes);
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for target in votes.values() {
            *counts.entry(target.as_str()).or_insert(0) += 1;
        }
        let max = counts.values().copied().max()?;
        let tied: Vec<&str> = counts
            .iter()
            .filter(|(_, c)| **c == max)
            .map(|(t, _)| *t)
            .collect();
        if tied.len() != 1 {
            return None;
        }
        let eliminated = tied[0].to_string();
        if let Some(p) = self.player_mut(&eliminated) {
            p.is_alive = false;
        }
        Some(eliminated)
    }

    /// Majority-control rule as shipped in the product: town wins at zero
    /// living mafia, mafia wins once it matches the living town count.
    pub fn evaluate_winner(&self) -> Option<Winner> {
        let mafia = self
            .players
            .iter()
            .filter(|p| p.is_alive && p.role.faction() == Faction::Mafia)
            .count();
        let town = self
            .players
            .iter()
            .filter(|p| p.is_alive && p.role.faction() == Faction::Town)
            .count();
        if mafia == 0 {
            Some(Winner::Town)
        } else if mafia >= town {
            Some(Winner::Mafia)
        } else {
            None
        }
    }

    /// Runs one transition of the night -> day -> vote cycle, resolving the
    /// finished phase and invoking the win evaluator after any elimination.
    pub fn advance_phase(&mut self, cfg: &EngineConfig) -> PhaseTransition {
        let from = self.phase;
        let mut night = None;
        let mut eliminated = None;
        let mut winner = None;

        match self.phase {
            GamePhase::Night => {
                let outcome = self.resolve_night();
                if outcome.killed.is_some() {
                    winner = self.evaluate_winner();
                }
                night = Some(outcome);
                self.phase = if winner.is_some() {
                    GamePhase::Results
                } else {
                    GamePhase::Day
                };
            }
            GamePhase::Day => {
                self.phase = GamePhase::Vote;
            }
            GamePhase::Vote => {
                eliminated = self.resolve_votes();
                if eliminated.is_some() {
                    winner = self.evaluate_winner();
                }
                if winner.is_some() {
                    self.phase = GamePhase::Results;
                } else {
                    self.day_number += 1;
                    self.phase = GamePhase::Night;
                }
            }
            GamePhase::Results => {
                return PhaseTransition {
                    from,
                    to: GamePhase::Results,
                    night: None,
                    eliminated: None,
                    winner: None,
                };
            }
        }

        if let Some(w) = winner {
            self.winner = Some(w);
        }
        self.night_actions.clear();
        self.votes.clear();
        self.phase_seq += 1;
        self.phase_deadline = deadline_after(match self.phase {
            GamePhase::Night => cfg.night_duration,
            GamePhase::Day => cfg.day_duration,
            GamePhase::Vote => cfg.vote_duration,
            GamePhase::Results => cfg.results_duration,
        });

        PhaseTransition {
            from,
            to: self.phase,
            night,
            eliminated,
            winner,
        }
    }

    /// Administrative abort: forces the terminal state without a winner.
    pub fn abort(&mut self, cfg: &EngineConfig) {
        self.winner = Some(Winner::Aborted);
        self.phase = GamePhase::Results;
        self.night_actions.clear();
        self.votes.clear();
        self.phase_seq += 1;
        self.phase_deadline = deadline_after(cfg.results_duration);
    }

    pub fn view_for(&self, viewer_id: &str) -> GameStateView {
        let reveal_all = self.winner.is_some();
        let players = self
            .players
            .iter()
            .map(|p| PlayerView {
                id: p.user_id.clone(),
                name: p.user_name.clone(),
                role: if p.user_id == viewer_id || !p.is_alive || reveal_all {
                    Some(p.role)
                } else {
                    None
                },
                alive: p.is_alive,
                voted: match self.phase {
                    // who has acted at night would betray who can act at all
                    GamePhase::Night => {
                        p.user_id == viewer_id && self.night_actions.contains_key(&p.user_id)
                    }
                    GamePhase::Vote => self.votes.contains_key(&p.user_id),
                    _ => false,
                },
            })
            .collect();
        GameStateView {
            session_id: self.session_id.clone(),
            room_id: self.room_id.clone(),
            phase: self.phase,
            day_number: self.day_number,
            phase_deadline: self.phase_deadline,
            my_role: self.player(viewer_id).map(|p| p.role),
            players,
            last_killed: self.last_killed.clone(),
            winner: self.winner,
            chat: Vec::new(),
        }
    }
}
