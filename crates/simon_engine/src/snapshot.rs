//! What the presentation surface sees.

use derive_new::new;
use simon_rules::{Phase, Record, Signal};

/// Observable view of the engine, republished on every state change.
///
/// The surface renders from this and enables color controls strictly from
/// `input_enabled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current round (equal to the sequence length once a game started).
    pub round: u32,
    /// Status text for the player.
    pub message: String,
    /// Color currently lit, by playback or as press feedback.
    pub active_signal: Option<Signal>,
    /// Whether presses are accepted.
    pub input_enabled: bool,
    /// State machine phase.
    pub phase: Phase,
    /// Length of the sequence being played or repeated.
    pub sequence_len: usize,
    /// How many signals of this round the player has repeated correctly.
    pub player_index: usize,
    /// Best record known to the engine.
    pub current_record: Option<Record>,
    /// Last failure talking to the record store, cleared by the next success.
    pub record_fault: Option<RecordFault>,
}

impl Snapshot {
    pub(crate) fn idle(message: &str) -> Self {
        Self {
            round: 0,
            message: message.to_string(),
            active_signal: None,
            input_enabled: false,
            phase: Phase::Idle,
            sequence_len: 0,
            player_index: 0,
            current_record: None,
            record_fault: None,
        }
    }
}

/// Store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RecordOperation {
    /// Reading the stored record.
    #[display("read")]
    Read,
    /// Writing a new record.
    #[display("write")]
    Write,
    /// Clearing the stored record.
    #[display("clear")]
    Clear,
}

/// A non-fatal record store failure, distinct from "no record exists".
#[derive(Debug, Clone, PartialEq, Eq, new, derive_more::Display)]
#[display("record {} failed: {}", operation, message)]
pub struct RecordFault {
    /// What was being attempted.
    pub operation: RecordOperation,
    /// Error reported by the store.
    pub message: String,
}

/// Result of a player press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum InputOutcome {
    /// The press was dropped: wrong phase or unknown color.
    #[display("ignored")]
    Ignored,
    /// Correct, more signals to go this round.
    #[display("correct")]
    Correct,
    /// Correct, and the whole sequence has been repeated.
    #[display("round complete")]
    RoundComplete,
    /// Wrong color; the game is over.
    #[display("game over")]
    GameOver,
}
