//! Integration test: spectator and real-time modes.
//!
//! The stub's "human" taps the first button on every even episode tic
//! whenever the mode is a spectator one.

use std::time::{Duration, Instant};

use ticlink_core::{GameVariable, Mode};
use ticlink_engine::{EngineConfig, Session};
use ticlink_replay::Recording;
use ticlink_test_utils::{basic_config, scratch_dir, ScratchDir, ThreadLauncher};

const FORWARD: [f64; 2] = [1.0, 0.0];
const ATTACK: [f64; 2] = [0.0, 1.0];
const IDLE: [f64; 2] = [0.0, 0.0];

/// The human's input on `episode_tic` (counted from 1).
fn human(episode_tic: u64) -> Vec<f64> {
    if episode_tic % 2 == 0 {
        FORWARD.to_vec()
    } else {
        IDLE.to_vec()
    }
}

fn running(dir: &ScratchDir, mode: Mode, timeout: Duration) -> Session {
    let engine = EngineConfig {
        region_dir: dir.path().to_path_buf(),
        timeout,
        ..EngineConfig::default()
    };
    let mut session = Session::with_engine_config(ThreadLauncher::new(), engine);
    session.set_config(basic_config()).unwrap();
    session.set_mode(mode).unwrap();
    session.set_living_reward(0.5).unwrap();
    session.init().unwrap();
    session
}

// ── Spectator ──────────────────────────────────────────────────────

#[test]
fn spectator_ignores_submitted_actions() {
    let dir = scratch_dir("spectator");
    let mut session = running(&dir, Mode::Spectator, Duration::from_secs(10));
    for tic in 1..=4 {
        assert_eq!(session.make_action(&ATTACK, 1).unwrap(), 0.5);
        assert_eq!(session.last_action().unwrap(), human(tic));
    }
    assert_eq!(session.episode_time(), 4);
    assert_eq!(session.total_reward(), 2.0);
    assert_eq!(session.game_variable(GameVariable::PositionX).unwrap(), Some(2.0));
    assert_eq!(session.game_variable(GameVariable::KillCount).unwrap(), Some(0.0));
}

#[test]
fn spectator_recording_follows_the_human() {
    let dir = scratch_dir("specrecord");
    let path = dir.join("spectator.tlr");
    let mut session = running(&dir, Mode::Spectator, Duration::from_secs(10));
    session.new_episode(Some(&path)).unwrap();
    for _ in 0..4 {
        session.advance_action(1, true).unwrap();
    }
    // Unpublished and multi-tic: the human still changes input every tic.
    session.advance_action(3, false).unwrap();
    session.new_episode(None).unwrap();

    let recording = Recording::open(&path).unwrap();
    assert_eq!(recording.end_tic(), Some(7));
    for t in 0..7 {
        let segment = recording.segment_at(t);
        assert_eq!(segment.values, Some(human(t + 1).as_slice()), "episode tic {t}");
        assert_eq!(segment.tics, 1);
    }

    session.replay_episode(&path, None).unwrap();
    let mut applied = Vec::new();
    for _ in 0..7 {
        // The recorded input wins over both the submitted one and the human.
        session.set_action(&ATTACK).unwrap();
        session.advance_action(1, true).unwrap();
        applied.push(session.last_action().unwrap());
    }
    assert_eq!(session.episode_time(), 7);
    assert_eq!(applied, (1..=7).map(human).collect::<Vec<_>>());
    assert_eq!(session.game_variable(GameVariable::PositionX).unwrap(), Some(3.0));
}

// ── Real time ──────────────────────────────────────────────────────

#[test]
fn async_player_waits_for_paced_tics() {
    let dir = scratch_dir("asyncplayer");
    // Fourteen tics at 35 per second outlast the channel timeout alone.
    let mut session = running(&dir, Mode::AsyncPlayer, Duration::from_millis(250));
    let started = Instant::now();
    assert_eq!(session.make_action(&FORWARD, 14).unwrap(), 7.0);
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert_eq!(session.episode_time(), 14);
    assert_eq!(session.last_action().unwrap(), FORWARD.to_vec());
    assert_eq!(session.game_variable(GameVariable::PositionX).unwrap(), Some(14.0));
}

#[test]
fn async_spectator_reports_the_human() {
    let dir = scratch_dir("asyncspec");
    let mut session = running(&dir, Mode::AsyncSpectator, Duration::from_secs(10));
    assert_eq!(session.make_action(&ATTACK, 3).unwrap(), 1.5);
    assert_eq!(session.episode_time(), 3);
    assert_eq!(session.last_action().unwrap(), human(3));
    assert_eq!(session.game_variable(GameVariable::KillCount).unwrap(), Some(0.0));
    assert!(!session.is_episode_finished());
}
