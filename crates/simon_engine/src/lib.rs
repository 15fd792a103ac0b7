//! Simon engine - the running game behind a presentation surface
//!
//! The engine owns the round state machine, plays sequences back on timers,
//! validates presses and keeps the best-score record up to date. A surface
//! (terminal, window, test harness) subscribes to [`Snapshot`]s and forwards
//! presses; it never touches game state directly.
//!
//! # Architecture
//!
//! - **Engine**: [`GameEngine`], single owner of round, sequence and phase
//! - **Playback**: [`PlaybackScheduler`], cancellable timed highlighting
//! - **Store**: [`RecordStore`] with in-memory and SQLite implementations
//! - **Config**: [`EngineConfig`], pacing delays and the record database path
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use simon_engine::{EngineConfig, GameEngine, MemoryRecordStore, RandomSignals};
//!
//! # async fn example() {
//! let engine = GameEngine::new(
//!     EngineConfig::default(),
//!     RandomSignals::from_entropy(),
//!     Arc::new(MemoryRecordStore::new()),
//! );
//! let mut updates = engine.subscribe();
//! engine.start();
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow_and_update().clone();
//!     if snapshot.input_enabled {
//!         engine.handle_input(0);
//!     }
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod engine;
mod playback;
mod snapshot;
mod store;
mod telemetry;

// Crate-level exports - Configuration
pub use config::{ConfigError, EngineConfig};

// Crate-level exports - Engine
pub use engine::GameEngine;

// Crate-level exports - Playback
pub use playback::{PlaybackHandle, PlaybackScheduler, PlaybackTiming};

// Crate-level exports - Observable state
pub use snapshot::{InputOutcome, RecordFault, RecordOperation, Snapshot};

// Crate-level exports - Record persistence
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore, StoreError};

// Crate-level exports - Tracing
pub use telemetry::init_tracing;

// Re-exported so surfaces only need one dependency.
pub use simon_rules::{
    Phase, RandomSignals, Record, RecordPolicy, ScriptedSignals, Signal, SignalSource,
};
