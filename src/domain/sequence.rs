// Server-side sequence growth: repeat the previous sequence, add one color.

use crate::domain::Color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces the growing color sequence for each round.
///
/// The RNG lives server-side only; clients never supply sequence data.
pub struct SequenceGenerator {
    rng: StdRng,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns `previous` extended with one uniformly random color.
    pub fn extend(&mut self, previous: &[Color]) -> Vec<Color> {
        let mut next = Vec::with_capacity(previous.len() + 1);
        next.extend_from_slice(previous);
        next.push(self.rng.r#gen());
        next
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extends_by_exactly_one() {
        let mut generator = SequenceGenerator::with_seed(7);
        let mut sequence = Vec::new();
        for round in 1..=20 {
            let next = generator.extend(&sequence);
            assert_eq!(next.len(), round);
            assert_eq!(&next[..sequence.len()], &sequence[..]);
            sequence = next;
        }
    }

    #[test]
    fn covers_all_colors_eventually() {
        let mut generator = SequenceGenerator::with_seed(1);
        let mut sequence = Vec::new();
        for _ in 0..64 {
            sequence = generator.extend(&sequence);
        }
        for color in Color::ALL {
            assert!(sequence.contains(&color), "{color:?} never generated");
        }
    }
}
