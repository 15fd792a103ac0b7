//! Tests for the round state machine: progression, input gating and timers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use simon_engine::{
    EngineConfig, GameEngine, InputOutcome, MemoryRecordStore, Phase, ScriptedSignals, Signal,
    Snapshot,
};
use tokio::sync::watch;
use tokio::time::sleep;

fn engine_with_script(script: &[usize]) -> GameEngine {
    simon_engine::init_tracing();
    let source = ScriptedSignals::from_indices(script).expect("valid script");
    GameEngine::new(
        EngineConfig::default(),
        source,
        Arc::new(MemoryRecordStore::new()),
    )
}

async fn wait_for(
    rx: &mut watch::Receiver<Snapshot>,
    condition: impl FnMut(&Snapshot) -> bool,
) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(60), rx.wait_for(condition))
        .await
        .expect("timed out waiting for engine state")
        .expect("engine dropped")
        .clone()
}

async fn awaiting_round(rx: &mut watch::Receiver<Snapshot>, round: u32) -> Snapshot {
    wait_for(rx, |s| s.phase == Phase::AwaitingInput && s.round == round).await
}

#[tokio::test(start_paused = true)]
async fn test_first_round_shows_then_awaits_then_advances() {
    let engine = engine_with_script(&[2]);
    let mut rx = engine.subscribe();

    engine.start();
    let snap = engine.snapshot();
    assert_eq!(snap.phase, Phase::ShowingSequence);
    assert_eq!(snap.round, 1);
    assert_eq!(snap.sequence_len, 1);
    assert_eq!(snap.message, "Machine shows");
    assert!(!snap.input_enabled);

    wait_for(&mut rx, |s| s.active_signal == Some(Signal::Blue)).await;

    let snap = awaiting_round(&mut rx, 1).await;
    assert_eq!(snap.message, "Your turn");
    assert_eq!(snap.active_signal, None);
    assert!(snap.input_enabled);

    assert_eq!(engine.handle_input(2), InputOutcome::RoundComplete);
    let snap = engine.snapshot();
    assert_eq!(snap.phase, Phase::RoundComplete);
    assert_eq!(snap.message, "Correct!");
    assert_eq!(snap.player_index, 1);
    assert!(!snap.input_enabled);

    let snap = wait_for(&mut rx, |s| s.round == 2).await;
    assert_eq!(snap.phase, Phase::ShowingSequence);
    assert_eq!(snap.sequence_len, 2);
    assert_eq!(snap.player_index, 0);
}

#[tokio::test(start_paused = true)]
async fn test_correct_replay_keeps_climbing() {
    let script = [1, 3, 0, 2, 1, 1, 3, 2];
    let engine = engine_with_script(&script);
    let mut rx = engine.subscribe();
    engine.start();

    for round in 1..=6u32 {
        let snap = awaiting_round(&mut rx, round).await;
        assert_eq!(snap.sequence_len, round as usize);

        let len = round as usize;
        for (position, &index) in script[..len].iter().enumerate() {
            let expected = if position + 1 == len {
                InputOutcome::RoundComplete
            } else {
                InputOutcome::Correct
            };
            assert_eq!(engine.handle_input(index), expected, "round {round} position {position}");
        }

        let snap = engine.snapshot();
        assert_eq!(snap.phase, Phase::RoundComplete);
        assert_eq!(snap.sequence_len, round as usize);
    }

    let snap = wait_for(&mut rx, |s| s.round == 7).await;
    assert_ne!(snap.phase, Phase::GameOver);
    assert_eq!(snap.sequence_len, 7);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_signal_ends_game_at_current_round() {
    let script = [1, 3, 0, 2];
    let engine = engine_with_script(&script);
    let mut rx = engine.subscribe();
    engine.start();

    for round in 1..=2u32 {
        awaiting_round(&mut rx, round).await;
        for &index in &script[..round as usize] {
            engine.handle_input(index);
        }
    }

    awaiting_round(&mut rx, 3).await;
    assert_eq!(engine.handle_input(script[0]), InputOutcome::Correct);
    let wrong = (script[1] + 1) % 4;
    assert_eq!(engine.handle_input(wrong), InputOutcome::GameOver);

    let snap = engine.snapshot();
    assert_eq!(snap.phase, Phase::GameOver);
    assert_eq!(snap.message, "You lost! Level: 3");
    assert_eq!(snap.round, 3);
    assert_eq!(snap.sequence_len, 3);
    assert!(!snap.input_enabled);
}

#[tokio::test(start_paused = true)]
async fn test_input_outside_player_turn_changes_nothing() {
    let engine = engine_with_script(&[0, 1, 2, 3]);
    let mut rx = engine.subscribe();

    // Idle
    let before = engine.snapshot();
    assert_eq!(engine.handle_input(0), InputOutcome::Ignored);
    assert_eq!(engine.snapshot(), before);

    // Showing the sequence
    engine.start();
    let before = engine.snapshot();
    assert_eq!(engine.press(Signal::Red), InputOutcome::Ignored);
    assert_eq!(engine.snapshot(), before);

    // Round complete
    awaiting_round(&mut rx, 1).await;
    assert_eq!(engine.handle_input(0), InputOutcome::RoundComplete);
    let before = engine.snapshot();
    assert_eq!(engine.handle_input(0), InputOutcome::Ignored);
    assert_eq!(engine.snapshot(), before);

    // Game over
    awaiting_round(&mut rx, 2).await;
    assert_eq!(engine.handle_input(3), InputOutcome::GameOver);
    engine.flush_records().await;
    let before = engine.snapshot();
    assert_eq!(engine.handle_input(0), InputOutcome::Ignored);
    assert_eq!(engine.snapshot(), before);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_index_is_ignored() {
    let engine = engine_with_script(&[1]);
    let mut rx = engine.subscribe();
    engine.start();
    awaiting_round(&mut rx, 1).await;

    let before = engine.snapshot();
    assert_eq!(engine.handle_input(4), InputOutcome::Ignored);
    assert_eq!(engine.handle_input(usize::MAX), InputOutcome::Ignored);
    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.snapshot().player_index, 0);
}

#[tokio::test(start_paused = true)]
async fn test_press_feedback_lights_then_clears() {
    let engine = engine_with_script(&[0, 1]);
    let mut rx = engine.subscribe();
    engine.start();
    awaiting_round(&mut rx, 1).await;

    assert_eq!(engine.handle_input(0), InputOutcome::RoundComplete);
    assert_eq!(engine.snapshot().active_signal, Some(Signal::Red));

    sleep(Duration::from_millis(350)).await;
    let snap = engine.snapshot();
    assert_eq!(snap.active_signal, None);
    assert_eq!(snap.phase, Phase::RoundComplete);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_presses_keep_latest_highlight() {
    let engine = engine_with_script(&[0, 1, 2]);
    let mut rx = engine.subscribe();
    engine.start();
    awaiting_round(&mut rx, 1).await;
    engine.handle_input(0);
    awaiting_round(&mut rx, 2).await;

    assert_eq!(engine.handle_input(0), InputOutcome::Correct);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.handle_input(1), InputOutcome::RoundComplete);

    // The first press's highlight timer would have fired here.
    sleep(Duration::from_millis(150)).await;
    assert_eq!(engine.snapshot().active_signal, Some(Signal::Green));

    sleep(Duration::from_millis(200)).await;
    let snap = engine.snapshot();
    assert_eq!(snap.active_signal, None);
    assert_eq!(snap.phase, Phase::RoundComplete);
}

#[tokio::test(start_paused = true)]
async fn test_restart_mid_playback_leaves_no_stale_highlight() {
    // First game opens with Yellow, the restarted one with Red.
    let engine = engine_with_script(&[3, 0]);
    engine.start();

    sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.snapshot().active_signal, Some(Signal::Yellow));

    let mut rx = engine.subscribe();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let collector = {
        let observed = Arc::clone(&observed);
        let mut rx = rx.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snap = rx.borrow_and_update().clone();
                observed.lock().unwrap().push(snap.active_signal);
                if snap.phase == Phase::AwaitingInput {
                    break;
                }
            }
        })
    };

    engine.start();

    // The old playback would have gone dark at 500ms and completed at 750ms.
    sleep(Duration::from_millis(400)).await;
    let snap = engine.snapshot();
    assert_eq!(snap.round, 1);
    assert_eq!(snap.phase, Phase::ShowingSequence);
    assert_eq!(snap.active_signal, Some(Signal::Red));

    sleep(Duration::from_millis(200)).await;
    let snap = engine.snapshot();
    assert_eq!(snap.phase, Phase::ShowingSequence);
    assert_eq!(snap.active_signal, None);

    let snap = awaiting_round(&mut rx, 1).await;
    assert_eq!(snap.sequence_len, 1);
    collector.await.expect("collector panicked");

    let observed = observed.lock().unwrap();
    assert!(
        !observed.contains(&Some(Signal::Yellow)),
        "superseded playback leaked: {observed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_restart_during_celebration_discards_pending_advance() {
    let engine = engine_with_script(&[0, 1, 2, 3]);
    let mut rx = engine.subscribe();
    engine.start();
    awaiting_round(&mut rx, 1).await;

    assert_eq!(engine.handle_input(0), InputOutcome::RoundComplete);
    engine.start();

    awaiting_round(&mut rx, 1).await;
    sleep(Duration::from_secs(2)).await;

    let snap = engine.snapshot();
    assert_eq!(snap.round, 1);
    assert_eq!(snap.sequence_len, 1);
    assert_eq!(snap.phase, Phase::AwaitingInput);

    engine.flush_records().await;
    assert_eq!(engine.snapshot().current_record, None);
}

#[tokio::test(start_paused = true)]
async fn test_custom_timing_is_honoured() {
    simon_engine::init_tracing();
    let config = EngineConfig::default()
        .with_signal_on_ms(40)
        .with_signal_off_ms(10);
    let source = ScriptedSignals::from_indices(&[1]).expect("valid script");
    let engine = GameEngine::new(config, source, Arc::new(MemoryRecordStore::new()));

    engine.start();
    sleep(Duration::from_millis(60)).await;
    assert_eq!(engine.snapshot().phase, Phase::AwaitingInput);
}
