// Room orchestration: code allocation and spawning of room actors.

use crate::domain::GameTuning;
use crate::use_cases::session::room_task;
use crate::use_cases::types::{RoomCommand, RoomEvent};
use axum::extract::ws::Utf8Bytes;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, mpsc, watch};
use tracing::info;

pub const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Shared configuration for spawning room actors.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Capacity for inbound player commands.
    pub command_channel_capacity: usize,
    /// Capacity for broadcast room events.
    pub event_broadcast_capacity: usize,
    /// Gameplay policy applied to new rooms.
    pub tuning: GameTuning,
}

/// Per-room channels handed to connections.
#[derive(Clone)]
pub struct RoomHandle {
    /// Code clients use to target this room.
    pub room_code: Arc<str>,
    /// Sender for player commands into the room task.
    pub command_tx: mpsc::Sender<RoomCommand>,
    /// Broadcast sender for domain room events.
    pub event_tx: broadcast::Sender<RoomEvent>,
    /// Broadcast sender for serialized room events.
    pub event_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized room snapshot.
    pub snapshot_latest_tx: watch::Sender<Utf8Bytes>,
}

/// Thread-safe registry of live rooms, keyed by code.
pub struct RoomRegistry {
    settings: RoomSettings,
    rooms: RwLock<HashMap<String, RoomHandle>>,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            settings,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Allocates a collision-free code and spawns the room actor.
    pub async fn create_room(self: &Arc<Self>) -> RoomHandle {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let candidate = generate_room_code(&mut rand::thread_rng());
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        // Channel wiring for the room actor.
        let (command_tx, command_rx) =
            mpsc::channel::<RoomCommand>(self.settings.command_channel_capacity);
        let (event_tx, _event_rx) =
            broadcast::channel::<RoomEvent>(self.settings.event_broadcast_capacity);
        let (event_bytes_tx, _event_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.event_broadcast_capacity);
        let (snapshot_latest_tx, _snapshot_latest_rx) =
            watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));

        // Spawn the authoritative session loop for this room.
        tokio::spawn(room_task(
            code.clone(),
            self.settings.tuning.clone(),
            command_rx,
            event_tx.clone(),
        ));
        self.clone()
            .spawn_close_watcher(code.clone(), event_tx.subscribe());

        let handle = RoomHandle {
            room_code: Arc::from(code.as_str()),
            command_tx,
            event_tx,
            event_bytes_tx,
            snapshot_latest_tx,
        };
        rooms.insert(code.clone(), handle.clone());
        info!(room = %code, "room created");
        handle
    }

    /// Returns a handle for the given code, if the room is live.
    pub async fn get_room(&self, code: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(code).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    // Removes the registry entry once the room task announces teardown.
    fn spawn_close_watcher(
        self: Arc<Self>,
        code: String,
        mut event_rx: broadcast::Receiver<RoomEvent>,
    ) {
        tokio::spawn(async move {
            loop {
                match event_rx.recv().await {
                    Ok(RoomEvent::Closed) | Err(broadcast::error::RecvError::Closed) => {
                        self.rooms.write().await.remove(&code);
                        info!(room = %code, "room removed");
                        break;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                }
            }
        });
    }
}

/// 6-char uppercase alphanumeric room code.
pub fn generate_room_code<R: Rng>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARSET[rng.gen_range(0..ROOM_CODE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn codes_are_six_uppercase_alphanumerics() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(
                code.bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            );
        }
    }

    #[tokio::test]
    async fn created_rooms_are_resolvable_and_unique() {
        let registry = Arc::new(RoomRegistry::new(RoomSettings {
            command_channel_capacity: 16,
            event_broadcast_capacity: 16,
            tuning: GameTuning::default(),
        }));
        let first = registry.create_room().await;
        let second = registry.create_room().await;
        assert_ne!(first.room_code, second.room_code);
        assert!(registry.get_room(&first.room_code).await.is_some());
        assert!(registry.get_room("NOSUCH").await.is_none());
        assert_eq!(registry.room_count().await, 2);
    }
}
