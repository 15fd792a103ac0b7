//! The round state machine.
//!
//! [`GameEngine`] is the single owner of the game state. Every mutation goes
//! through one of its entry points or through a timer callback it scheduled,
//! always under the state lock, and every mutation is republished as a
//! [`Snapshot`] before the lock is released.
//!
//! Timers (playback, press feedback, the pause after a completed round) carry
//! the epoch they were scheduled in. `start()` and every new round bump the
//! epoch and abort outstanding timers, so a superseded timer that still
//! manages to fire finds a newer epoch and does nothing.
//!
//! Record evaluation after a lost game runs on a blocking worker and only
//! ever touches the record fields of the snapshot.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use simon_rules::{Phase, RandomSignals, Record, RecordPolicy, Signal, SignalSource};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::{
    EngineConfig, InputOutcome, PlaybackHandle, PlaybackScheduler, RecordFault, RecordOperation,
    RecordStore, Snapshot, SqliteRecordStore, StoreError,
};

const MSG_IDLE: &str = "Press Start";
const MSG_MACHINE_SHOWS: &str = "Machine shows";
const MSG_YOUR_TURN: &str = "Your turn";
const MSG_CORRECT: &str = "Correct!";

/// Handle to a running Simon game.
///
/// Cheap to clone; all clones drive the same game. Entry points that schedule
/// timers must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct GameEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    scheduler: PlaybackScheduler,
    state: Mutex<GameState>,
    store: Arc<dyn RecordStore>,
    // Held across read-evaluate-write so overlapping evaluations cannot regress the record.
    record_lock: Mutex<()>,
    record_tasks: Mutex<Vec<JoinHandle<()>>>,
    snapshot: watch::Sender<Snapshot>,
}

struct GameState {
    round: u32,
    sequence: Vec<Signal>,
    player_index: usize,
    phase: Phase,
    active_signal: Option<Signal>,
    message: String,
    epoch: u64,
    feedback_token: u64,
    timers: Timers,
    source: Box<dyn SignalSource>,
}

#[derive(Default)]
struct Timers {
    playback: Option<PlaybackHandle>,
    feedback: Option<AbortHandle>,
    advance: Option<AbortHandle>,
}

impl Timers {
    fn cancel_all(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.cancel();
        }
        if let Some(feedback) = self.feedback.take() {
            feedback.abort();
        }
        if let Some(advance) = self.advance.take() {
            advance.abort();
        }
    }
}

impl GameEngine {
    /// Creates an idle engine.
    #[instrument(skip_all)]
    pub fn new(
        config: EngineConfig,
        source: impl SignalSource + 'static,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        info!("Creating GameEngine");
        let (snapshot, _) = watch::channel(Snapshot::idle(MSG_IDLE));
        let state = GameState {
            round: 0,
            sequence: Vec::new(),
            player_index: 0,
            phase: Phase::Idle,
            active_signal: None,
            message: MSG_IDLE.to_string(),
            epoch: 0,
            feedback_token: 0,
            timers: Timers::default(),
            source: Box::new(source),
        };
        Self {
            inner: Arc::new(EngineInner {
                scheduler: PlaybackScheduler::new(config.playback_timing()),
                config,
                state: Mutex::new(state),
                store,
                record_lock: Mutex::new(()),
                record_tasks: Mutex::new(Vec::new()),
                snapshot,
            }),
        }
    }

    /// Creates an engine with random signals and the SQLite record store named
    /// in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record database cannot be opened.
    #[instrument(skip_all, fields(db_path = %config.record_db_path()))]
    pub fn open(config: EngineConfig) -> Result<Self, StoreError> {
        let store = SqliteRecordStore::open(config.record_db_path())?;
        Ok(Self::new(config, RandomSignals::from_entropy(), Arc::new(store)))
    }

    /// The configuration this engine runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// The latest published state.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Starts a new game, discarding any game in progress.
    ///
    /// An abandoned game is never evaluated for a record.
    #[instrument(skip(self))]
    pub fn start(&self) {
        let mut state = self.inner.lock_state();
        if matches!(
            state.phase,
            Phase::ShowingSequence | Phase::AwaitingInput | Phase::RoundComplete
        ) {
            info!(round = state.round, "Abandoning game in progress");
        }

        state.timers.cancel_all();
        state.round = 0;
        state.sequence.clear();
        state.player_index = 0;
        state.active_signal = None;
        state.message = MSG_MACHINE_SHOWS.to_string();
        info!("Starting new game");

        self.inner.advance_round(&mut state);
    }

    /// Handles a press of the color at `index` (0-3).
    ///
    /// Out-of-range indices and presses outside [`Phase::AwaitingInput`] are
    /// dropped without touching any state.
    #[instrument(skip(self))]
    pub fn handle_input(&self, index: usize) -> InputOutcome {
        match Signal::from_index(index) {
            Some(signal) => self.inner.press(signal),
            None => {
                debug!(index, "Ignoring out-of-range signal");
                InputOutcome::Ignored
            }
        }
    }

    /// Handles a press of `signal`. See [`GameEngine::handle_input`].
    #[instrument(skip(self))]
    pub fn press(&self, signal: Signal) -> InputOutcome {
        self.inner.press(signal)
    }

    /// Reads the stored record and publishes it.
    ///
    /// A read failure is published as a [`RecordFault`] and returned; the
    /// record already known in memory stays in place.
    #[instrument(skip(self))]
    pub async fn load_record(&self) -> Result<Option<Record>, StoreError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.load_record_blocking()).await?
    }

    /// Clears the stored record and forgets it in memory.
    #[instrument(skip(self))]
    pub async fn reset_record(&self) -> Result<(), StoreError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.clear_record_blocking()).await?
    }

    /// Waits for every record evaluation started so far to finish.
    #[instrument(skip(self))]
    pub async fn flush_records(&self) {
        let tasks = std::mem::take(&mut *self.inner.lock_record_tasks());
        debug!(pending = tasks.len(), "Flushing record evaluations");
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "Record evaluation task failed");
            }
        }
    }
}

impl fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("config", &self.inner.config)
            .field("snapshot", &*self.inner.snapshot.borrow())
            .finish_non_exhaustive()
    }
}

impl EngineInner {
    fn lock_state(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_record_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.record_tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Republishes the game fields, leaving the record fields alone.
    fn publish(&self, state: &GameState) {
        self.snapshot.send_modify(|snap| {
            snap.round = state.round;
            snap.message.clone_from(&state.message);
            snap.active_signal = state.active_signal;
            snap.input_enabled = state.phase.accepts_input();
            snap.phase = state.phase;
            snap.sequence_len = state.sequence.len();
            snap.player_index = state.player_index;
        });
    }

    /// Republishes the record fields, leaving the game fields alone.
    fn publish_record(&self, record: Option<Record>, fault: Option<RecordFault>) {
        self.snapshot.send_modify(|snap| {
            snap.current_record = record;
            snap.record_fault = fault;
        });
    }

    fn known_record(&self) -> Option<Record> {
        self.snapshot.borrow().current_record
    }

    #[instrument(skip(self, state), fields(round = state.round + 1))]
    fn advance_round(self: &Arc<Self>, state: &mut GameState) {
        state.timers.cancel_all();
        state.epoch += 1;
        let epoch = state.epoch;

        state.round += 1;
        state.player_index = 0;
        state.active_signal = None;
        let signal = state.source.next_signal();
        state.sequence.push(signal);
        state.phase = Phase::ShowingSequence;
        state.message = MSG_MACHINE_SHOWS.to_string();
        debug_assert_eq!(state.sequence.len(), state.round as usize);
        info!(round = state.round, %signal, "Round started");

        let on = Arc::downgrade(self);
        let off = on.clone();
        let done = on.clone();
        state.timers.playback = Some(self.scheduler.play(
            state.sequence.clone(),
            move |signal| {
                if let Some(inner) = on.upgrade() {
                    inner.show_step(epoch, Some(signal));
                }
            },
            move || {
                if let Some(inner) = off.upgrade() {
                    inner.show_step(epoch, None);
                }
            },
            move || {
                if let Some(inner) = done.upgrade() {
                    inner.finish_playback(epoch);
                }
            },
        ));

        self.publish(state);
    }

    #[instrument(level = "debug", skip(self))]
    fn show_step(&self, epoch: u64, signal: Option<Signal>) {
        let mut state = self.lock_state();
        if state.epoch != epoch || state.phase != Phase::ShowingSequence {
            debug!(epoch, current = state.epoch, "Dropping stale playback step");
            return;
        }
        state.active_signal = signal;
        self.publish(&state);
    }

    #[instrument(skip(self))]
    fn finish_playback(&self, epoch: u64) {
        let mut state = self.lock_state();
        if state.epoch != epoch || state.phase != Phase::ShowingSequence {
            debug!(epoch, current = state.epoch, "Dropping stale playback completion");
            return;
        }
        state.timers.playback = None;
        state.active_signal = None;
        state.phase = Phase::AwaitingInput;
        state.message = MSG_YOUR_TURN.to_string();
        debug!(round = state.round, "Awaiting input");
        self.publish(&state);
    }

    #[instrument(skip(self))]
    fn press(self: &Arc<Self>, signal: Signal) -> InputOutcome {
        let mut state = self.lock_state();
        if !state.phase.accepts_input() {
            debug!(phase = %state.phase, %signal, "Ignoring input outside player turn");
            return InputOutcome::Ignored;
        }
        let Some(&expected) = state.sequence.get(state.player_index) else {
            warn!(
                player_index = state.player_index,
                len = state.sequence.len(),
                "Player index past end of sequence"
            );
            return InputOutcome::Ignored;
        };

        state.active_signal = Some(signal);
        state.feedback_token += 1;
        if let Some(previous) = state.timers.feedback.take() {
            previous.abort();
        }
        let feedback = self.spawn_feedback_clear(state.epoch, state.feedback_token);
        state.timers.feedback = Some(feedback);

        if signal != expected {
            debug!(%signal, %expected, position = state.player_index, "Wrong signal");
            self.game_over(&mut state);
            return InputOutcome::GameOver;
        }

        state.player_index += 1;
        if state.player_index < state.sequence.len() {
            debug!(position = state.player_index, "Correct signal");
            self.publish(&state);
            return InputOutcome::Correct;
        }

        state.phase = Phase::RoundComplete;
        state.message = MSG_CORRECT.to_string();
        let advance = self.spawn_advance(state.epoch);
        state.timers.advance = Some(advance);
        info!(round = state.round, "Round complete");
        self.publish(&state);
        InputOutcome::RoundComplete
    }

    #[instrument(level = "debug", skip(self))]
    fn spawn_feedback_clear(self: &Arc<Self>, epoch: u64, token: u64) -> AbortHandle {
        let weak = Arc::downgrade(self);
        let delay = self.config.feedback();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.clear_feedback(epoch, token);
            }
        })
        .abort_handle()
    }

    #[instrument(level = "debug", skip(self))]
    fn clear_feedback(&self, epoch: u64, token: u64) {
        let mut state = self.lock_state();
        if state.epoch != epoch || state.feedback_token != token {
            return;
        }
        state.timers.feedback = None;
        if state.active_signal.take().is_some() {
            self.publish(&state);
        }
    }

    #[instrument(level = "debug", skip(self))]
    fn spawn_advance(self: &Arc<Self>, epoch: u64) -> AbortHandle {
        let weak = Arc::downgrade(self);
        let delay = self.config.celebration();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.finish_celebration(epoch);
            }
        })
        .abort_handle()
    }

    #[instrument(skip(self))]
    fn finish_celebration(self: &Arc<Self>, epoch: u64) {
        let mut state = self.lock_state();
        if state.epoch != epoch || state.phase != Phase::RoundComplete {
            debug!(epoch, current = state.epoch, "Dropping stale round advance");
            return;
        }
        state.timers.advance = None;
        self.advance_round(&mut state);
    }

    #[instrument(skip(self, state), fields(round = state.round))]
    fn game_over(self: &Arc<Self>, state: &mut GameState) {
        if let Some(advance) = state.timers.advance.take() {
            advance.abort();
        }
        state.phase = Phase::GameOver;
        state.message = format!("You lost! Level: {}", state.round);
        info!(round = state.round, "Game over");
        self.publish(state);

        let inner = Arc::clone(self);
        let completed_round = state.round;
        let task = tokio::task::spawn_blocking(move || inner.settle_record(completed_round));
        let mut tasks = self.lock_record_tasks();
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }

    /// Compares a finished game against the best known record and persists a
    /// better one. Runs on a blocking worker.
    #[instrument(skip(self))]
    fn settle_record(&self, completed_round: u32) {
        let _guard = self.record_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let known = self.known_record();

        let (current, carried_fault) = match self.store.get() {
            Ok(stored) => (better_of(stored, known), self.unsaved_fault(stored, known)),
            Err(err) => {
                warn!(error = %err, "Record read failed, using last known record");
                let fault = RecordFault::new(RecordOperation::Read, err.message);
                (known, Some(fault))
            }
        };

        let Some(record) = RecordPolicy::evaluate(completed_round, current.as_ref()) else {
            debug!(completed_round, "No new record");
            self.publish_record(current, carried_fault);
            return;
        };

        let fault = match self.store.put(&record) {
            Ok(()) => {
                info!(max_round = record.max_round(), "New record stored");
                None
            }
            Err(err) => {
                warn!(error = %err, "Record write failed, keeping new record in memory");
                Some(RecordFault::new(RecordOperation::Write, err.message))
            }
        };
        self.publish_record(Some(record), fault);
    }

    /// The fault to keep publishing after a successful read of `stored`.
    ///
    /// A known record that beats the stored one was never written, so the
    /// fault explaining that stays until a later write lands.
    fn unsaved_fault(
        &self,
        stored: Option<Record>,
        known: Option<Record>,
    ) -> Option<RecordFault> {
        let unsaved = known.is_some_and(|known| {
            stored.is_none_or(|stored| known.max_round() > stored.max_round())
        });
        if unsaved {
            self.snapshot.borrow().record_fault.clone()
        } else {
            None
        }
    }

    #[instrument(skip(self))]
    fn load_record_blocking(&self) -> Result<Option<Record>, StoreError> {
        let _guard = self.record_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let known = self.known_record();
        match self.store.get() {
            Ok(stored) => {
                let best = better_of(stored, known);
                info!(max_round = ?best.map(|r| r.max_round()), "Record loaded");
                self.publish_record(best, self.unsaved_fault(stored, known));
                Ok(best)
            }
            Err(err) => {
                warn!(error = %err, "Record read failed");
                let fault = RecordFault::new(RecordOperation::Read, err.message.clone());
                self.publish_record(known, Some(fault));
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    fn clear_record_blocking(&self) -> Result<(), StoreError> {
        let _guard = self.record_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.store.clear() {
            Ok(()) => {
                info!("Record reset");
                self.publish_record(None, None);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Record clear failed");
                let fault = RecordFault::new(RecordOperation::Clear, err.message.clone());
                self.publish_record(self.known_record(), Some(fault));
                Err(err)
            }
        }
    }
}

/// The higher of two optional records.
fn better_of(a: Option<Record>, b: Option<Record>) -> Option<Record> {
    match (a, b) {
        (Some(a), Some(b)) if b.max_round() > a.max_round() => Some(b),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(round: i64) -> Record {
        Record::from_parts(round, 1_700_000_000_000).expect("valid record")
    }

    #[test]
    fn test_better_of_prefers_higher_round() {
        assert_eq!(better_of(Some(record(3)), Some(record(5))), Some(record(5)));
        assert_eq!(better_of(Some(record(5)), Some(record(3))), Some(record(5)));
    }

    #[test]
    fn test_better_of_fills_absence() {
        assert_eq!(better_of(None, Some(record(2))), Some(record(2)));
        assert_eq!(better_of(Some(record(2)), None), Some(record(2)));
        assert_eq!(better_of(None, None), None);
    }
}
