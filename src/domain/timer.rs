// Per-round countdown state with the urgency thresholds the board renders.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerColor {
    Green,
    Yellow,
    Red,
}

/// Countdown for one input window.
///
/// Pure state; the room actor owns the once-per-second scheduling.
#[derive(Debug, Clone)]
pub struct RoundTimer {
    total_seconds: u32,
    seconds_remaining: u32,
}

impl RoundTimer {
    pub fn new(total_seconds: u32) -> Self {
        Self {
            total_seconds,
            seconds_remaining: total_seconds,
        }
    }

    /// Decrements by one second and returns the new remaining value.
    /// Saturates at zero so a late tick after expiry stays harmless.
    pub fn tick(&mut self) -> u32 {
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        self.seconds_remaining
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    pub fn is_expired(&self) -> bool {
        self.seconds_remaining == 0
    }

    pub fn color(&self) -> TimerColor {
        match self.seconds_remaining {
            s if s > 10 => TimerColor::Green,
            s if s > 5 => TimerColor::Yellow,
            _ => TimerColor::Red,
        }
    }

    pub fn is_pulsing(&self) -> bool {
        self.color() == TimerColor::Red
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_match_board_styling() {
        assert_eq!(RoundTimer::new(11).color(), TimerColor::Green);
        assert_eq!(RoundTimer::new(10).color(), TimerColor::Yellow);
        assert_eq!(RoundTimer::new(6).color(), TimerColor::Yellow);
        assert_eq!(RoundTimer::new(5).color(), TimerColor::Red);
        assert!(RoundTimer::new(5).is_pulsing());
        assert!(!RoundTimer::new(6).is_pulsing());
    }

    #[test]
    fn tick_saturates_at_zero() {
        let mut timer = RoundTimer::new(2);
        assert_eq!(timer.tick(), 1);
        assert_eq!(timer.tick(), 0);
        assert!(timer.is_expired());
        assert_eq!(timer.tick(), 0);
    }
}
