use serde::{Deserialize, Serialize};

/// Pre-game bonus activation accepted from the external bonus service.
/// The engine only folds these into role assignment and night resolution;
/// inventory bookkeeping stays on the profile side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bonus {
    /// Flips the faction a sheriff investigation reports for the holder.
    Documents,
    /// Absorbs one night kill.
    Shield,
    /// Biases the mafia-seat draw toward the holder.
    Privilege,
}
