//! The colored signals of the game.

use rand::Rng;
use rand::distributions::{Distribution, Standard};
use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter};

/// One of the colors the machine flashes and the player must repeat.
///
/// Signals are addressed by index (0-3) at the presentation boundary, in
/// declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumCount,
)]
pub enum Signal {
    /// Red (index 0)
    Red,
    /// Green (index 1)
    Green,
    /// Blue (index 2)
    Blue,
    /// Yellow (index 3)
    Yellow,
}

impl Signal {
    /// All signals in index order.
    pub const ALL: [Signal; Signal::COUNT] =
        [Signal::Red, Signal::Green, Signal::Blue, Signal::Yellow];

    /// Looks up a signal by its index. Returns `None` when out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Returns the index of this signal (0-3).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Signal::Red => "Red",
            Signal::Green => "Green",
            Signal::Blue => "Blue",
            Signal::Yellow => "Yellow",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// Uniform over all signals; consecutive repeats are expected.
impl Distribution<Signal> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Signal {
        Signal::ALL[rng.gen_range(0..Signal::COUNT)]
    }
}
