//! Sources of the next signal appended to a round's sequence.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::Signal;

/// Produces the signal appended to the sequence at the start of each round.
///
/// The engine owns exactly one source and asks it once per round. Inject a
/// [`ScriptedSignals`] to make a game deterministic.
pub trait SignalSource: Send {
    /// Returns the next signal.
    fn next_signal(&mut self) -> Signal;
}

/// Uniformly random signals, independent across calls.
#[derive(Debug, Clone)]
pub struct RandomSignals<R = ChaCha8Rng> {
    rng: R,
}

impl<R: Rng> RandomSignals<R> {
    /// Wraps an existing random number generator.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomSignals<ChaCha8Rng> {
    /// Seeds from operating-system entropy.
    #[instrument]
    pub fn from_entropy() -> Self {
        debug!("Seeding signal source from entropy");
        Self::new(ChaCha8Rng::from_entropy())
    }

    /// Seeds from a fixed value, producing a reproducible stream.
    #[instrument]
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> SignalSource for RandomSignals<R> {
    fn next_signal(&mut self) -> Signal {
        self.rng.sample(rand::distributions::Standard)
    }
}

/// Replays a fixed script of signals, starting over when it runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedSignals {
    script: Vec<Signal>,
    cursor: usize,
}

impl ScriptedSignals {
    /// Creates a source from a script. Returns `None` for an empty script.
    pub fn new(script: impl IntoIterator<Item = Signal>) -> Option<Self> {
        let script: Vec<Signal> = script.into_iter().collect();
        if script.is_empty() {
            return None;
        }
        Some(Self { script, cursor: 0 })
    }

    /// Creates a source from signal indices.
    ///
    /// Returns `None` if the script is empty or any index is out of range.
    pub fn from_indices(indices: &[usize]) -> Option<Self> {
        let script = indices
            .iter()
            .map(|&i| Signal::from_index(i))
            .collect::<Option<Vec<_>>>()?;
        Self::new(script)
    }

    /// The full script, in playback order.
    pub fn script(&self) -> &[Signal] {
        &self.script
    }
}

impl SignalSource for ScriptedSignals {
    fn next_signal(&mut self) -> Signal {
        let signal = self.script[self.cursor];
        self.cursor = (self.cursor + 1) % self.script.len();
        signal
    }
}
