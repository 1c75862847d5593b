// Use cases layer: application workflows for the game server.

pub mod rooms;
pub mod session;
pub mod types;

pub use rooms::{RoomHandle, RoomRegistry, RoomSettings};
pub use session::GameSession;
pub use types::{
    IntentError, JoinAck, PlayerSnapshot, RoomCommand, RoomEvent, RoomJoinError, RoomSnapshot,
    RoomStatus,
};
