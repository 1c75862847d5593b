// Domain layer: game rules and room-local state, no IO.

pub mod color;
pub mod player;
pub mod round;
pub mod sequence;
pub mod timer;
pub mod tuning;

pub use color::Color;
pub use player::{GameResult, JoinError, Player, PlayerId, PlayerProfile, PlayerRegistry};
pub use round::{PressResult, RoundOutcome, RoundPhase, RoundState};
pub use sequence::SequenceGenerator;
pub use timer::{RoundTimer, TimerColor};
pub use tuning::GameTuning;
