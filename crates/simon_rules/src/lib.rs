//! Simon rules - the pure vocabulary of the memory game
//!
//! Everything in this crate is synchronous and free of I/O, so it can be
//! reasoned about (and tested) without a runtime.
//!
//! # Architecture
//!
//! - **Signal**: the four colors the machine flashes and the player repeats
//! - **Sources**: where the next signal of a round comes from (random or scripted)
//! - **Phase**: the states of the round state machine
//! - **Record**: the best round ever reached, and the policy that replaces it
//!
//! # Example
//!
//! ```
//! use simon_rules::{RecordPolicy, ScriptedSignals, Signal, SignalSource};
//!
//! let mut source = ScriptedSignals::new([Signal::Blue, Signal::Red]).expect("non-empty script");
//! assert_eq!(source.next_signal(), Signal::Blue);
//!
//! let record = RecordPolicy::evaluate(5, None).expect("first game always sets a record");
//! assert_eq!(record.max_round(), 5);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod phase;
mod policy;
mod record;
mod signal;
mod source;

pub use phase::Phase;
pub use policy::RecordPolicy;
pub use record::Record;
pub use signal::Signal;
pub use source::{RandomSignals, ScriptedSignals, SignalSource};
