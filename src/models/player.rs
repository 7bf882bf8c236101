use serde::{Deserialize, Serialize};

use super::bonus::Bonus;
use super::role::Role;

/// A roster entry inside a running session. Created by freezing the room's
/// participant list at game start; the role never changes afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub user_id: String,
    pub user_name: String,
    pub role: Role,
    pub is_alive: bool,
    pub bonus: Option<Bonus>,
    pub shield_spent: bool,
}
