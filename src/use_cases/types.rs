// Use-case level inputs/outputs for the room actor.

use crate::domain::{Color, GameResult, PlayerId, PlayerProfile, RoundOutcome, TimerColor};
use tokio::sync::oneshot;

/// Room lifecycle phases broadcast to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Countdown,
    Active,
    GameOver,
}

#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub display_name: String,
    pub avatar_id: String,
    pub is_host: bool,
    pub is_eliminated: bool,
    pub score: u32,
    pub connected: bool,
    /// True once the player has a terminal outcome in the current round.
    pub has_submitted: bool,
}

/// Immutable view of the room emitted after every state transition.
/// Clients never see mutable internals.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub code: String,
    pub status: RoomStatus,
    pub round: u32,
    pub players: Vec<PlayerSnapshot>,
}

/// Why a join was refused; reported only to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomJoinError {
    RoomFull,
    DuplicateJoin,
    InvalidName,
    GameInProgress,
}

/// Rejection of a host-only intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentError {
    /// Requester lacks the host role; reported back to them.
    NotHost,
    /// Wrong phase for the intent; dropped without any notification.
    Stale,
}

#[derive(Debug)]
pub struct JoinAck {
    pub player_id: PlayerId,
}

/// Commands delivered to a room's single authoritative task. Replies carry
/// requester-scoped results so errors never reach other players.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        profile: PlayerProfile,
        resume: Option<PlayerId>,
        reply: oneshot::Sender<Result<JoinAck, RoomJoinError>>,
    },
    Start {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), IntentError>>,
    },
    PressColor {
        player_id: PlayerId,
        color: Color,
    },
    SubmitSequence {
        player_id: PlayerId,
    },
    Restart {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), IntentError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    Disconnect {
        player_id: PlayerId,
    },
}

/// Events broadcast from the room task to every connected client.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    RoomState(RoomSnapshot),
    PlayerLeft {
        player_id: PlayerId,
    },
    Countdown {
        count: u8,
    },
    RoundStart {
        round: u32,
        sequence: Vec<Color>,
    },
    InputOpen {
        round: u32,
        total_seconds: u32,
    },
    TimerTick {
        seconds_remaining: u32,
        timer_color: TimerColor,
        is_pulsing: bool,
    },
    PlayerSubmitted {
        player_id: PlayerId,
    },
    RoundResult {
        round: u32,
        outcomes: Vec<(PlayerId, RoundOutcome)>,
        scores: Vec<(PlayerId, u32)>,
    },
    GameOver(GameResult),
    GameRestarted,
    /// Internal teardown signal consumed by the registry; never sent on
    /// the wire.
    Closed,
}
