use crate::domain::GameTuning;
use std::env;

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("SIMON_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 256;
pub const EVENT_BROADCAST_CAPACITY: usize = 128;

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Gameplay policy for new rooms, with env overrides for operators.
pub fn game_tuning() -> GameTuning {
    let defaults = GameTuning::default();
    GameTuning {
        input_base_seconds: env_u32("SIMON_INPUT_BASE_SECONDS", defaults.input_base_seconds),
        input_seconds_per_round: env_u32(
            "SIMON_INPUT_SECONDS_PER_ROUND",
            defaults.input_seconds_per_round,
        ),
        input_floor_seconds: env_u32("SIMON_INPUT_FLOOR_SECONDS", defaults.input_floor_seconds),
        reward_per_round: env_u32("SIMON_REWARD_PER_ROUND", defaults.reward_per_round),
        max_players: env_usize("SIMON_MAX_PLAYERS", defaults.max_players),
        ..defaults
    }
}
