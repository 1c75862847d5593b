// One reveal-then-reproduce cycle: per-player submissions and the round
// decision. Validation for a player touches only that player's submission.

use std::collections::HashMap;

use crate::domain::{Color, PlayerId, RoundTimer};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    Correct,
    Incorrect,
    Timeout,
}

impl RoundOutcome {
    pub fn is_failure(self) -> bool {
        !matches!(self, RoundOutcome::Correct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Showing,
    Input,
}

/// What a single color press did to the presser's submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressResult {
    /// Press matched the expected position.
    Accepted { can_submit: bool },
    /// Wrong color; the submission is now terminally incorrect.
    Failed,
    /// Stale or out-of-place press; dropped without side effects.
    Ignored,
}

#[derive(Debug, Default)]
struct Submission {
    presses: Vec<Color>,
    outcome: Option<RoundOutcome>,
}

/// Live state of the round in progress. Created at round start, dropped
/// once the round resolves; a dropped round ignores everything.
#[derive(Debug)]
pub struct RoundState {
    pub round: u32,
    pub sequence: Vec<Color>,
    pub phase: RoundPhase,
    /// Countdown for the input window; absent while showing.
    pub timer: Option<RoundTimer>,
    submissions: HashMap<PlayerId, Submission>,
}

impl RoundState {
    /// Starts the showing phase for the given participants. Only these
    /// players can submit this round.
    pub fn new(round: u32, sequence: Vec<Color>, participants: &[PlayerId]) -> Self {
        let submissions = participants
            .iter()
            .map(|&id| (id, Submission::default()))
            .collect();
        Self {
            round,
            sequence,
            phase: RoundPhase::Showing,
            timer: None,
            submissions,
        }
    }

    pub fn open_input(&mut self, timer: RoundTimer) {
        self.phase = RoundPhase::Input;
        self.timer = Some(timer);
    }

    /// Incremental validation of one press against the expected position.
    pub fn press(&mut self, player: PlayerId, color: Color) -> PressResult {
        if self.phase != RoundPhase::Input {
            return PressResult::Ignored;
        }
        let Some(submission) = self.submissions.get_mut(&player) else {
            return PressResult::Ignored;
        };
        if submission.outcome.is_some() || submission.presses.len() >= self.sequence.len() {
            return PressResult::Ignored;
        }

        let position = submission.presses.len();
        if self.sequence[position] == color {
            submission.presses.push(color);
            PressResult::Accepted {
                can_submit: submission.presses.len() == self.sequence.len(),
            }
        } else {
            submission.outcome = Some(RoundOutcome::Incorrect);
            PressResult::Failed
        }
    }

    /// Explicit submit once the full sequence has been matched. Returns
    /// false when the submission is not complete (or already terminal).
    pub fn finalize(&mut self, player: PlayerId) -> bool {
        if self.phase != RoundPhase::Input {
            return false;
        }
        let Some(submission) = self.submissions.get_mut(&player) else {
            return false;
        };
        if submission.outcome.is_some() || submission.presses.len() != self.sequence.len() {
            return false;
        }
        submission.outcome = Some(RoundOutcome::Correct);
        true
    }

    /// Folds a mid-round disconnect into the round: the player counts as
    /// failed and no longer blocks resolution.
    pub fn mark_failed(&mut self, player: PlayerId) -> bool {
        match self.submissions.get_mut(&player) {
            Some(submission) if submission.outcome.is_none() => {
                submission.outcome = Some(RoundOutcome::Incorrect);
                true
            }
            _ => false,
        }
    }

    /// Timer expiry: every submission still pending becomes a timeout.
    pub fn expire_pending(&mut self) -> Vec<PlayerId> {
        let mut expired: Vec<PlayerId> = self
            .submissions
            .iter_mut()
            .filter(|(_, s)| s.outcome.is_none())
            .map(|(&id, s)| {
                s.outcome = Some(RoundOutcome::Timeout);
                id
            })
            .collect();
        expired.sort_unstable();
        expired
    }

    /// True once every participant has a terminal outcome.
    pub fn all_terminal(&self) -> bool {
        self.submissions.values().all(|s| s.outcome.is_some())
    }

    pub fn participant_count(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_participant(&self, player: PlayerId) -> bool {
        self.submissions.contains_key(&player)
    }

    pub fn outcome_of(&self, player: PlayerId) -> Option<RoundOutcome> {
        self.submissions.get(&player).and_then(|s| s.outcome)
    }

    /// Terminal outcomes in stable participant order.
    pub fn outcomes(&self) -> Vec<(PlayerId, RoundOutcome)> {
        let mut outcomes: Vec<(PlayerId, RoundOutcome)> = self
            .submissions
            .iter()
            .filter_map(|(&id, s)| s.outcome.map(|o| (id, o)))
            .collect();
        outcomes.sort_unstable_by_key(|&(id, _)| id);
        outcomes
    }
}
