//! Integration test: episode recording, replay and saved states.
//!
//! A recorded episode replayed on the same configuration must reproduce
//! the game variables tic for tic, in the recording session and in a
//! fresh one.

use std::path::Path;

use ticlink_core::{Button, GameVariable};
use ticlink_engine::{Session, SessionError};
use ticlink_replay::{RecordError, Recording};
use ticlink_test_utils::{basic_config, scratch_dir, thread_session, ScratchDir, ThreadLauncher};

/// A mixed script: moves and attacks in runs of different lengths.
fn script() -> Vec<[f64; 2]> {
    let mut actions = Vec::new();
    for round in 0..6 {
        actions.extend(std::iter::repeat([1.0, 0.0]).take(round + 1));
        actions.extend(std::iter::repeat([1.0, 1.0]).take(2));
        actions.push([0.0, 0.0]);
        actions.push([0.0, 1.0]);
    }
    actions
}

fn observe(session: &mut Session) -> (u64, f64, f64, f64) {
    let vars = [
        GameVariable::PositionX,
        GameVariable::KillCount,
        GameVariable::Health,
    ]
    .map(|v| session.game_variable(v).unwrap().unwrap());
    (session.episode_time(), vars[0], vars[1], vars[2])
}

fn started(dir: &ScratchDir) -> Session {
    let mut session = thread_session(ThreadLauncher::new(), dir, basic_config());
    session.init().unwrap();
    session
}

/// Record the script into `path`; returns observations after every tic.
fn record(session: &mut Session, path: &Path) -> Vec<(u64, f64, f64, f64)> {
    session.new_episode(Some(path)).unwrap();
    let mut trace = Vec::new();
    for action in script() {
        if session.is_episode_finished() {
            break;
        }
        session.make_action(&action, 1).unwrap();
        trace.push(observe(session));
    }
    session.new_episode(None).unwrap();
    trace
}

fn replay(session: &mut Session, path: &Path, ticks: usize) -> Vec<(u64, f64, f64, f64)> {
    session.replay_episode(path, None).unwrap();
    assert!(session.is_replaying());
    (0..ticks)
        .map(|_| {
            // Submitted actions are ignored while replaying.
            session.set_action(&[0.0, 0.0]).unwrap();
            session.advance_action(1, true).unwrap();
            observe(session)
        })
        .collect()
}

#[test]
fn replay_reproduces_recorded_episode() {
    let dir = scratch_dir("replay");
    let path = dir.join("episode.tlr");
    let mut session = started(&dir);
    let recorded = record(&mut session, &path);
    assert!(!recorded.is_empty());

    let recording = Recording::open(&path).unwrap();
    assert_eq!(recording.end_tic(), Some(recorded.len() as u64));
    assert_eq!(recording.header().button_count, 2);

    let replayed = replay(&mut session, &path, recorded.len());
    assert_eq!(replayed, recorded);
}

#[test]
fn replay_in_fresh_session_matches() {
    let dir = scratch_dir("fresh");
    let path = dir.join("episode.tlr");
    let recorded = {
        let mut session = started(&dir);
        record(&mut session, &path)
    };
    let mut other = started(&dir);
    let replayed = replay(&mut other, &path, recorded.len());
    assert_eq!(replayed, recorded);
}

#[test]
fn replay_finishes_at_end_of_record() {
    let dir = scratch_dir("replayend");
    let path = dir.join("short.tlr");
    let mut session = started(&dir);
    session.new_episode(Some(&path)).unwrap();
    session.make_action(&[1.0, 0.0], 3).unwrap();
    session.new_episode(None).unwrap();

    session.replay_episode(&path, Some(0)).unwrap();
    session.advance_action(10, true).unwrap();
    assert_eq!(session.episode_time(), 3);
    assert!(session.is_episode_finished());
    assert!(matches!(
        session.advance_action(1, true).unwrap_err(),
        SessionError::EpisodeFinished
    ));

    // A new episode leaves replay mode.
    session.new_episode(None).unwrap();
    assert!(!session.is_replaying());
}

#[test]
fn replay_checks_configuration_and_player() {
    let dir = scratch_dir("mismatch");
    let path = dir.join("episode.tlr");
    let mut session = started(&dir);
    record(&mut session, &path);

    let err = session.replay_episode(&path, Some(1)).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Record(RecordError::PlayerMismatch {
            recorded: 0,
            requested: 1
        })
    ));
    assert!(!session.is_replaying());
    session.close();

    let mut config = basic_config();
    config.buttons.insert(Button::TurnLeft, 0.0);
    let mut other = thread_session(ThreadLauncher::new(), &dir, config);
    other.init().unwrap();
    let err = other.replay_episode(&path, None).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Record(RecordError::ConfigMismatch { .. })
    ));

    let err = other
        .replay_episode(&dir.join("absent.tlr"), None)
        .unwrap_err();
    assert!(matches!(err, SessionError::ConfigurationMissing { .. }));
}

#[test]
fn recording_ends_with_episode() {
    let dir = scratch_dir("autoend");
    let path = dir.join("timeout.tlr");
    let mut session = thread_session(ThreadLauncher::new(), &dir, basic_config());
    session.set_episode_timeout(5).unwrap();
    session.init().unwrap();
    session.new_episode(Some(&path)).unwrap();
    session.make_action(&[1.0, 0.0], 8).unwrap();
    assert!(session.is_episode_finished());

    let recording = Recording::open(&path).unwrap();
    assert_eq!(recording.end_tic(), Some(5));
}

#[test]
fn save_and_load_restore_the_game() {
    let dir = scratch_dir("save");
    let save = dir.join("slot1.sav");
    let mut session = started(&dir);
    session.make_action(&[1.0, 0.0], 5).unwrap();
    let saved = observe(&mut session);
    session.save(&save).unwrap();

    session.make_action(&[1.0, 1.0], 7).unwrap();
    assert_ne!(observe(&mut session), saved);

    session.load(&save).unwrap();
    assert_eq!(observe(&mut session), saved);

    let err = session.load(&dir.join("slot2.sav")).unwrap_err();
    assert!(matches!(err, SessionError::ConfigurationMissing { .. }));
    let err = session.save(&dir.join("no/such/dir.sav")).unwrap_err();
    assert!(matches!(err, SessionError::EngineInternal { .. }));
    assert!(session.is_running());
}
