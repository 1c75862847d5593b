// Wire protocol DTOs and conversions for public game server messages.

use crate::domain::{Color, GameResult, Player, RoundOutcome, TimerColor};
use crate::use_cases::{PlayerSnapshot, RoomEvent, RoomSnapshot, RoomStatus};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity {
        player_id: String,
        room_code: String,
    },
    // Full room snapshot after every state transition.
    RoomState(RoomStateDto),
    PlayerLeft {
        player_id: String,
    },
    // Pre-game 3-2-1-0 countdown.
    Countdown {
        count: u8,
    },
    // Reveal phase start with the full sequence for this round.
    RoundStart {
        round: u32,
        sequence: Vec<Color>,
    },
    // Input window opened with its total allowance.
    InputOpen {
        round: u32,
        total_seconds: u32,
    },
    TimerTick(TimerTickDto),
    // A player reached a terminal outcome for the current round.
    PlayerSubmitted {
        player_id: String,
    },
    RoundResult(RoundResultDto),
    GameOver(GameOverDto),
    GameRestarted,
    // Requester-scoped rejection; never broadcast.
    Error(ErrorDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake: join or create a room, optionally resuming an id.
    Join(JoinPayload),
    Start,
    PressColor { color: Color },
    SubmitSequence,
    Restart,
    Leave,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub display_name: String,
    #[serde(default)]
    pub avatar_id: Option<String>,
    // Absent room code means "create a new room".
    #[serde(default)]
    pub room_code: Option<String>,
    // Prior identity for reconnects within the same room.
    #[serde(default)]
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatusDto {
    Waiting,
    Countdown,
    Active,
    GameOver,
}

impl From<RoomStatus> for RoomStatusDto {
    fn from(status: RoomStatus) -> Self {
        match status {
            RoomStatus::Waiting => RoomStatusDto::Waiting,
            RoomStatus::Countdown => RoomStatusDto::Countdown,
            RoomStatus::Active => RoomStatusDto::Active,
            RoomStatus::GameOver => RoomStatusDto::GameOver,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerDto {
    pub id: String,
    pub display_name: String,
    pub avatar_id: String,
    pub is_host: bool,
    pub is_eliminated: bool,
    pub score: u32,
    pub connected: bool,
    pub has_submitted: bool,
}

impl From<&PlayerSnapshot> for PlayerDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            id: player.id.to_string(),
            display_name: player.display_name.clone(),
            avatar_id: player.avatar_id.clone(),
            is_host: player.is_host,
            is_eliminated: player.is_eliminated,
            score: player.score,
            connected: player.connected,
            has_submitted: player.has_submitted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomStateDto {
    pub code: String,
    pub status: RoomStatusDto,
    pub round: u32,
    pub players: Vec<PlayerDto>,
}

impl From<&RoomSnapshot> for RoomStateDto {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            code: snapshot.code.clone(),
            status: snapshot.status.into(),
            round: snapshot.round,
            players: snapshot.players.iter().map(PlayerDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimerTickDto {
    pub seconds_remaining: u32,
    pub timer_color: TimerColor,
    pub is_pulsing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerOutcomeDto {
    pub player_id: String,
    pub outcome: RoundOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerScoreDto {
    pub player_id: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundResultDto {
    pub round: u32,
    pub outcomes: Vec<PlayerOutcomeDto>,
    pub scores: Vec<PlayerScoreDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalScoreDto {
    pub player_id: String,
    pub display_name: String,
    pub score: u32,
    pub is_eliminated: bool,
}

impl From<&Player> for FinalScoreDto {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id.to_string(),
            display_name: player.display_name.clone(),
            score: player.score,
            is_eliminated: player.is_eliminated,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GameOverDto {
    pub winner: Option<FinalScoreDto>,
    pub final_scores: Vec<FinalScoreDto>,
    pub rounds_played: u32,
}

impl From<&GameResult> for GameOverDto {
    fn from(result: &GameResult) -> Self {
        Self {
            winner: result.winner.as_ref().map(FinalScoreDto::from),
            final_scores: result.final_scores.iter().map(FinalScoreDto::from).collect(),
            rounds_played: result.rounds_played,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDto {
    pub code: &'static str,
    pub message: String,
}

impl ServerMessage {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorDto {
            code,
            message: message.into(),
        })
    }

    /// Wire form of a room event; `None` for internal-only events.
    pub fn from_event(event: &RoomEvent) -> Option<Self> {
        let message = match event {
            RoomEvent::RoomState(snapshot) => {
                ServerMessage::RoomState(RoomStateDto::from(snapshot))
            }
            RoomEvent::PlayerLeft { player_id } => ServerMessage::PlayerLeft {
                player_id: player_id.to_string(),
            },
            RoomEvent::Countdown { count } => ServerMessage::Countdown { count: *count },
            RoomEvent::RoundStart { round, sequence } => ServerMessage::RoundStart {
                round: *round,
                sequence: sequence.clone(),
            },
            RoomEvent::InputOpen {
                round,
                total_seconds,
            } => ServerMessage::InputOpen {
                round: *round,
                total_seconds: *total_seconds,
            },
            RoomEvent::TimerTick {
                seconds_remaining,
                timer_color,
                is_pulsing,
            } => ServerMessage::TimerTick(TimerTickDto {
                seconds_remaining: *seconds_remaining,
                timer_color: *timer_color,
                is_pulsing: *is_pulsing,
            }),
            RoomEvent::PlayerSubmitted { player_id } => ServerMessage::PlayerSubmitted {
                player_id: player_id.to_string(),
            },
            RoomEvent::RoundResult {
                round,
                outcomes,
                scores,
            } => ServerMessage::RoundResult(RoundResultDto {
                round: *round,
                outcomes: outcomes
                    .iter()
                    .map(|&(id, outcome)| PlayerOutcomeDto {
                        player_id: id.to_string(),
                        outcome,
                    })
                    .collect(),
                scores: scores
                    .iter()
                    .map(|&(id, score)| PlayerScoreDto {
                        player_id: id.to_string(),
                        score,
                    })
                    .collect(),
            }),
            RoomEvent::GameOver(result) => ServerMessage::GameOver(GameOverDto::from(result)),
            RoomEvent::GameRestarted => ServerMessage::GameRestarted,
            RoomEvent::Closed => return None,
        };
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let join: ClientMessage = serde_json::from_str(
            r#"{"type":"Join","data":{"display_name":"alice","room_code":"AB12CD"}}"#,
        )
        .unwrap();
        match join {
            ClientMessage::Join(payload) => {
                assert_eq!(payload.display_name, "alice");
                assert_eq!(payload.room_code.as_deref(), Some("AB12CD"));
                assert!(payload.player_id.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let press: ClientMessage =
            serde_json::from_str(r#"{"type":"PressColor","data":{"color":"green"}}"#).unwrap();
        assert!(matches!(
            press,
            ClientMessage::PressColor {
                color: Color::Green
            }
        ));

        let submit: ClientMessage = serde_json::from_str(r#"{"type":"SubmitSequence"}"#).unwrap();
        assert!(matches!(submit, ClientMessage::SubmitSequence));
    }

    #[test]
    fn round_start_serializes_sequence_colors() {
        let msg = ServerMessage::RoundStart {
            round: 2,
            sequence: vec![Color::Green, Color::Red],
        };
        let txt = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            txt,
            r#"{"type":"RoundStart","data":{"round":2,"sequence":["green","red"]}}"#
        );
    }

    #[test]
    fn internal_close_event_has_no_wire_form() {
        assert!(ServerMessage::from_event(&RoomEvent::Closed).is_none());
    }
}
