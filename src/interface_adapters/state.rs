use crate::use_cases::RoomRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Owns the set of live room actors, keyed by room code.
    pub room_registry: Arc<RoomRegistry>,
}
