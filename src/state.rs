use std::{collections::HashMap, sync::Arc};

use tokio::sync::{broadcast, Mutex};

use crate::models::{config::EngineConfig, event::GameEvent, game::GameSession, room::Room};
use crate::services::settlement::SettlementClient;

/// Process-wide shared state. Lock order when more than one is needed:
/// `rooms`, then `games`/session, then `channels`.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<Mutex<HashMap<String, Room>>>,
    /// One exclusive lock per session; all submissions and timer-driven
    /// transitions for a session serialize on it.
    pub games: Arc<Mutex<HashMap<String, Arc<Mutex<GameSession>>>>>,
    pub channels: Arc<Mutex<HashMap<String, broadcast::Sender<GameEvent>>>>,
    pub settlement: SettlementClient,
    pub config: Arc<EngineConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        AppState {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            games: Arc::new(Mutex::new(HashMap::new())),
            channels: Arc::new(Mutex::new(HashMap::new())),
            settlement: SettlementClient::new(config.settlement_url.clone()),
            config: Arc::new(config),
        }
    }

    pub async fn session(&self, room_id: &str) -> Option<Arc<Mutex<GameSession>>> {
        self.games.lock().await.get(room_id).cloned()
    }

    pub async fn channel(&self, room_id: &str) -> broadcast::Sender<GameEvent> {
        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get(room_id) {
            channel.clone()
        } else {
            let (tx, _) = broadcast::channel(1000);
            channels.insert(room_id.to_string(), tx.clone());
            tx
        }
    }

    /// Appends an event to its room's channel. A room with no live
    /// subscribers is fine; poll snapshots carry the same state.
    pub async fn broadcast(&self, event: GameEvent) {
        let tx = self.channel(event.room_id()).await;
        let _ = tx.send(event);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
