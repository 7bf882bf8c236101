use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::bonus::Bonus;
use super::config::EngineConfig;
use super::player::Player;
use super::room::Participant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Civilian,
    Sheriff,
    Mafia,
    Don,
    Doctor,
    Prostitute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Town,
    Mafia,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightActionKind {
    Kill,
    Investigate,
    Heal,
    Block,
}

/// What a role is allowed to do, looked up by the action resolver.
#[derive(Debug, Clone, Copy)]
pub struct RoleSpec {
    pub faction: Faction,
    pub night_action: Option<NightActionKind>,
    pub can_target_self: bool,
}

const NO_CAPABILITY: RoleSpec = RoleSpec {
    faction: Faction::Neutral,
    night_action: None,
    can_target_self: false,
};

/// Capability table. Adding a role means adding one entry here; nothing in
/// the resolver branches on role names.
static CAPABILITIES: Lazy<HashMap<Role, RoleSpec>> = Lazy::new(|| {
    HashMap::from([
        (
            Role::Civilian,
            RoleSpec {
                faction: Faction::Town,
                night_action: None,
                can_target_self: false,
            },
        ),
        (
            Role::Sheriff,
            RoleSpec {
                faction: Faction::Town,
                night_action: Some(NightActionKind::Investigate),
                can_target_self: false,
            },
        ),
        (
            Role::Mafia,
            RoleSpec {
                faction: Faction::Mafia,
                night_action: Some(NightActionKind::Kill),
                can_target_self: false,
            },
        ),
        (
            Role::Don,
            RoleSpec {
                faction: Faction::Mafia,
                night_action: Some(NightActionKind::Kill),
                can_target_self: false,
            },
        ),
        (
            Role::Doctor,
            RoleSpec {
                faction: Faction::Town,
                night_action: Some(NightActionKind::Heal),
                can_target_self: false,
            },
        ),
        (
            Role::Prostitute,
            RoleSpec {
                faction: Faction::Town,
                night_action: Some(NightActionKind::Block),
                can_target_self: false,
            },
        ),
    ])
});

impl Role {
    pub fn spec(&self) -> RoleSpec {
        CAPABILITIES.get(self).copied().unwrap_or(NO_CAPABILITY)
    }

    pub fn faction(&self) -> Faction {
        self.spec().faction
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Civilian => write!(f, "civilian"),
            Role::Sheriff => write!(f, "sheriff"),
            Role::Mafia => write!(f, "mafia"),
            Role::Don => write!(f, "don"),
            Role::Doctor => write!(f, "doctor"),
            Role::Prostitute => write!(f, "prostitute"),
        }
    }
}

/// Role list for a roster of `n` players: mafia = max(1, n/4) with one don
/// once there are two or more mafia, one sheriff, extension roles gated by
/// config and roster size, rest civilians.
pub fn role_table(n: usize, cfg: &EngineConfig) -> Vec<Role> {
    let mafia_count = std::cmp::max(1, n / 4);
    let mut roles = Vec::with_capacity(n);
    if mafia_count >= 2 {
        roles.push(Role::Don);
        roles.extend(std::iter::repeat(Role::Mafia).take(mafia_count - 1));
    } else {
        roles.push(Role::Mafia);
    }
    roles.push(Role::Sheriff);
    if cfg.doctor_enabled && n >= 6 {
        roles.push(Role::Doctor);
    }
    if cfg.prostitute_enabled && n >= 8 {
        roles.push(Role::Prostitute);
    }
    while roles.len() < n {
        roles.push(Role::Civilian);
    }
    roles
}

/// Deals roles to a frozen roster. Mafia seats are drawn first with weighted
/// sampling so a privilege bonus raises the holder's odds; everything else is
/// a Fisher-Yates shuffle from the session RNG.
pub fn assign_roles(roster: &[Participant], cfg: &EngineConfig, rng: &mut StdRng) -> Vec<Player> {
    let roles = role_table(roster.len(), cfg);
    let (mafia_roles, mut town_roles): (Vec<Role>, Vec<Role>) =
        roles.into_iter().partition(|r| r.faction() == Faction::Mafia);

    let mut seats: Vec<Option<Role>> = vec![None; roster.len()];
    let mut open: Vec<usize> = (0..roster.len()).collect();

    for role in mafia_roles {
        let weights: Vec<f64> = open
            .iter()
            .map(|&i| {
                if roster[i].bonus == Some(Bonus::Privilege) {
                    cfg.privilege_weight
                } else {
                    1.0
                }
            })
            .collect();
        let total: f64 = weights.iter().sum();
        let mut roll = rng.gen::<f64>() * total;
        let mut pick = open.len() - 1;
        for (j, w) in weights.iter().enumerate() {
            if roll < *w {
                pick = j;
                break;
            }
            roll -= w;
        }
        let seat = open.swap_remove(pick);
        seats[seat] = Some(role);
    }

    town_roles.shuffle(rng);
    for (&seat, role) in open.iter().zip(town_roles) {
        seats[seat] = Some(role);
    }

    roster
        .iter()
        .enumerate()
        .map(|(i, p)| Player {
            user_id: p.user_id.clone(),
            user_name: p.user_name.clone(),
            role: seats[i].unwrap_or(Role::Civilian),
            is_alive: true,
            bonus: p.bonus,
            shield_spent: false,
        })
        .collect()
}
