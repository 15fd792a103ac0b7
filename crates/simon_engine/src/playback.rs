//! Timed, cancellable playback of a signal sequence.

use std::time::Duration;

use derive_new::new;
use simon_rules::Signal;
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::{Instrument, debug, debug_span, instrument};

/// How long each signal is lit, and the gap that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct PlaybackTiming {
    /// Time a signal stays lit.
    pub on: Duration,
    /// Dark gap after each signal.
    pub off: Duration,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(250))
    }
}

/// Plays sequences back as a spawned Tokio task of timed suspensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackScheduler {
    timing: PlaybackTiming,
}

impl PlaybackScheduler {
    /// Creates a scheduler with the given timing.
    pub fn new(timing: PlaybackTiming) -> Self {
        Self { timing }
    }

    /// The timing used for every playback.
    pub fn timing(&self) -> PlaybackTiming {
        self.timing
    }

    /// Plays `sequence` in order.
    ///
    /// For every signal: `on_active(signal)`, wait `on`, `on_inactive()`, wait
    /// `off`. After the last step `on_complete()` runs exactly once. Once
    /// [`PlaybackHandle::cancel`] is called no callback starts again.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip_all, fields(steps = sequence.len()))]
    pub fn play<A, I, C>(
        &self,
        sequence: Vec<Signal>,
        mut on_active: A,
        mut on_inactive: I,
        on_complete: C,
    ) -> PlaybackHandle
    where
        A: FnMut(Signal) + Send + 'static,
        I: FnMut() + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let timing = self.timing;
        let span = debug_span!("playback", steps = sequence.len());
        let task = tokio::spawn(
            async move {
                for (step, signal) in sequence.into_iter().enumerate() {
                    debug!(step, %signal, "Signal on");
                    on_active(signal);
                    sleep(timing.on).await;
                    on_inactive();
                    sleep(timing.off).await;
                }
                debug!("Playback complete");
                on_complete();
            }
            .instrument(span),
        );
        PlaybackHandle {
            task: task.abort_handle(),
        }
    }
}

/// Handle to an in-flight playback.
///
/// Dropping the handle leaves the playback running.
#[derive(Debug)]
pub struct PlaybackHandle {
    task: AbortHandle,
}

impl PlaybackHandle {
    /// Stops the playback at its next suspension point.
    pub fn cancel(&self) {
        if !self.task.is_finished() {
            debug!("Cancelling playback");
        }
        self.task.abort();
    }

    /// Returns true once the playback has completed or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
