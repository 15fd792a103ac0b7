//! Phases of the round state machine.

use serde::{Deserialize, Serialize};

/// Where the game currently is in its round cycle.
///
/// ```text
/// Idle ──start──▶ ShowingSequence ──playback done──▶ AwaitingInput
///                        ▲                              │      │
///                        └──── RoundComplete ◀──all ok──┘      └──miss──▶ GameOver
/// ```
///
/// `start()` is accepted from every phase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
pub enum Phase {
    /// Before the first game.
    #[default]
    #[display("idle")]
    Idle,
    /// The machine is playing the sequence back; input is disabled.
    #[display("showing sequence")]
    ShowingSequence,
    /// The player may press colors.
    #[display("awaiting input")]
    AwaitingInput,
    /// The whole sequence was repeated; a short pause precedes the next round.
    #[display("round complete")]
    RoundComplete,
    /// The player pressed a wrong color.
    #[display("game over")]
    GameOver,
}

impl Phase {
    /// Returns true if player presses are accepted in this phase.
    pub fn accepts_input(self) -> bool {
        matches!(self, Phase::AwaitingInput)
    }
}
