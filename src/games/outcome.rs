use crate::games::types::{Color, Outcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random round outcome source
///
/// The number is uniform over 0-9 and fixes the color, except for 0 and 5
/// which split evenly with violet.
pub struct OutcomeGenerator<R: Rng = StdRng> {
    rng: R,
}

impl OutcomeGenerator<StdRng> {
    /// Generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible generator for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> OutcomeGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self) -> Outcome {
        let number: u8 = self.rng.gen_range(0..10);
        let violet = self.rng.gen_bool(0.5);
        Outcome {
            color: color_for(number, violet),
            number,
        }
    }
}

/// Where the round engine draws outcomes from
pub trait OutcomeSource: Send {
    fn next_outcome(&mut self) -> Outcome;
}

impl<R: Rng + Send> OutcomeSource for OutcomeGenerator<R> {
    fn next_outcome(&mut self) -> Outcome {
        self.generate()
    }
}

/// Fixed number-to-color mapping. `violet` is the coin flip consulted for 0 and 5.
pub fn color_for(number: u8, violet: bool) -> Color {
    match number {
        0 if violet => Color::Violet,
        0 => Color::Red,
        5 if violet => Color::Violet,
        5 => Color::Green,
        n if n % 2 == 1 => Color::Green,
        _ => Color::Red,
    }
}
