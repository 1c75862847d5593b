// Gameplay policy constants, kept tunable rather than baked into the rules.

use std::time::Duration;

/// Round timing and scoring policy for a room.
///
/// Reveal timings track the board animation (800 ms lit + 300 ms gap per
/// color) so the input window never opens mid-reveal.
#[derive(Debug, Clone)]
pub struct GameTuning {
    /// Base seconds of the input allowance formula.
    pub input_base_seconds: u32,
    /// Extra seconds granted per round number.
    pub input_seconds_per_round: u32,
    /// Minimum input allowance regardless of round.
    pub input_floor_seconds: u32,
    /// Reveal time spent per color in the sequence.
    pub reveal_per_color: Duration,
    /// Fixed lead-in before the first color lights up.
    pub reveal_lead: Duration,
    /// Points awarded for a fully correct round.
    pub reward_per_round: u32,
    /// Maximum players per room.
    pub max_players: usize,
    /// Pre-game countdown starting value.
    pub countdown_from: u8,
}

impl GameTuning {
    /// Input allowance for a round; monotonically non-decreasing in `round`.
    pub fn input_seconds(&self, round: u32) -> u32 {
        (self.input_base_seconds + round * self.input_seconds_per_round)
            .max(self.input_floor_seconds)
    }

    /// How long the reveal phase lasts for a sequence of `len` colors.
    pub fn reveal_duration(&self, len: usize) -> Duration {
        self.reveal_lead + self.reveal_per_color * len as u32
    }

    /// Score delta for a correct submission in `round`.
    pub fn reward(&self, _round: u32) -> u32 {
        self.reward_per_round
    }
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            input_base_seconds: 5,
            input_seconds_per_round: 2,
            input_floor_seconds: 10,
            reveal_per_color: Duration::from_millis(1100),
            reveal_lead: Duration::from_millis(500),
            reward_per_round: 10,
            max_players: 8,
            countdown_from: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_allowance_has_floor_and_grows() {
        let tuning = GameTuning::default();
        assert_eq!(tuning.input_seconds(1), 10);
        assert_eq!(tuning.input_seconds(2), 10);
        assert_eq!(tuning.input_seconds(3), 11);
        let mut previous = 0;
        for round in 1..=30 {
            let seconds = tuning.input_seconds(round);
            assert!(seconds >= previous);
            previous = seconds;
        }
    }

    #[test]
    fn reveal_scales_with_sequence_length() {
        let tuning = GameTuning::default();
        assert!(tuning.reveal_duration(5) > tuning.reveal_duration(1));
        assert_eq!(
            tuning.reveal_duration(1),
            Duration::from_millis(500 + 1100)
        );
    }
}
