//! Integration test: stepping a stub engine and accounting rewards.
//!
//! Runs a full session against the in-process stub engine and checks the
//! reward arithmetic, episode timeouts and the running-state guards.

use ticlink_core::{ConfigError, GameVariable};
use ticlink_engine::{LifecycleState, Session, SessionError};
use ticlink_test_utils::{basic_config, scratch_dir, thread_session, ScratchDir, ThreadLauncher};

const FORWARD: [f64; 2] = [1.0, 0.0];
const ATTACK: [f64; 2] = [0.0, 1.0];

fn running(dir: &ScratchDir, adjust: impl FnOnce(&mut Session)) -> Session {
    let mut session = thread_session(ThreadLauncher::new(), dir, basic_config());
    adjust(&mut session);
    session.init().unwrap();
    session
}

// ── Rewards ─────────────────────────────────────────────────────────

#[test]
fn living_reward_counts_every_tic() {
    let dir = scratch_dir("living");
    let mut session = running(&dir, |s| s.set_living_reward(0.5).unwrap());
    assert_eq!(session.state_kind(), LifecycleState::Running);
    assert_eq!(session.episode_time(), 0);

    let reward = session.make_action(&FORWARD, 4).unwrap();
    assert_eq!(reward, 2.0);
    assert_eq!(session.last_reward(), 2.0);
    assert!(!session.is_episode_finished());
    assert_eq!(session.episode_time(), 4);
    assert_eq!(session.game_variable(GameVariable::PositionX).unwrap(), Some(4.0));
}

#[test]
fn total_reward_sums_steps_and_resets_per_episode() {
    let dir = scratch_dir("total");
    let mut session = running(&dir, |s| s.set_living_reward(-0.25).unwrap());
    let mut sum = 0.0;
    let mut steps = 0;
    while !session.is_episode_finished() && steps < 400 {
        sum += session.make_action(&ATTACK, 1).unwrap();
        steps += 1;
    }
    assert!((session.total_reward() - sum).abs() < 1e-9);
    // Every monster killed pays out and ends the single-player episode.
    assert!(session.is_episode_finished());
    assert!(session.state().unwrap().is_none());
    let kills = session.game_variable(GameVariable::KillCount).unwrap();
    assert!(kills.is_some_and(|k| k >= 3.0));

    session.new_episode(None).unwrap();
    assert_eq!(session.total_reward(), 0.0);
    assert_eq!(session.episode_time(), 0);
    assert!(!session.is_episode_finished());
}

#[test]
fn update_state_false_still_accrues_rewards() {
    let dir = scratch_dir("nostate");
    let mut session = running(&dir, |s| s.set_living_reward(1.0).unwrap());
    session.make_action(&FORWARD, 1).unwrap();
    let number = session.state().unwrap().unwrap().number;

    session.advance_action(3, false).unwrap();
    assert_eq!(session.last_reward(), 3.0);
    assert_eq!(session.total_reward(), 4.0);
    assert_eq!(session.episode_time(), 4);
    // The published state was not refreshed.
    assert_eq!(session.state().unwrap().unwrap().number, number);
}

#[test]
fn zero_tic_advance_is_a_no_op() {
    let dir = scratch_dir("zero");
    let mut session = running(&dir, |s| s.set_living_reward(1.0).unwrap());
    session.make_action(&FORWARD, 2).unwrap();
    assert_eq!(session.make_action(&FORWARD, 0).unwrap(), 0.0);
    assert_eq!(session.episode_time(), 2);
    assert_eq!(session.total_reward(), 2.0);
}

#[test]
fn death_penalty_applies_once() {
    let dir = scratch_dir("death");
    let mut session = running(&dir, |s| {
        s.set_death_penalty(100.0).unwrap();
        s.add_game_args("+stub_hazard 1").unwrap();
    });
    // Four hazard hits of 25 kill the player.
    let reward = session.make_action(&FORWARD, 10).unwrap();
    assert_eq!(reward, -100.0);
    assert!(session.is_player_dead());
    assert!(session.is_episode_finished());
    assert_eq!(session.episode_time(), 4);
}

// ── Episode boundaries ─────────────────────────────────────────────

#[test]
fn timeout_finishes_episode_mid_step() {
    let dir = scratch_dir("timeout");
    let mut session = running(&dir, |s| {
        s.set_living_reward(1.0).unwrap();
        s.set_episode_timeout(10).unwrap();
    });
    assert_eq!(session.make_action(&FORWARD, 4).unwrap(), 4.0);
    assert_eq!(session.make_action(&FORWARD, 4).unwrap(), 4.0);
    assert_eq!(session.make_action(&FORWARD, 4).unwrap(), 2.0);
    assert!(session.is_episode_finished());
    assert_eq!(session.episode_time(), 10);
    assert!(session.state().unwrap().is_none());

    let err = session.make_action(&FORWARD, 1).unwrap_err();
    assert!(matches!(err, SessionError::EpisodeFinished));
    assert!(!err.is_fatal());
    // The failed step earned nothing and the session is still usable.
    assert_eq!(session.total_reward(), 10.0);
    session.new_episode(None).unwrap();
    session.make_action(&FORWARD, 1).unwrap();
}

#[test]
fn episode_start_time_is_not_handed_over() {
    let dir = scratch_dir("start");
    let session = running(&dir, |s| s.set_episode_start_time(7).unwrap());
    assert_eq!(session.episode_time(), 7);
    assert_eq!(session.total_reward(), 0.0);
}

#[test]
fn same_seed_same_episodes() {
    let dir = scratch_dir("seeded");
    let trace = |seed| {
        let mut session = running(&dir, |s| s.set_seed(seed).unwrap());
        let mut rewards = Vec::new();
        for _ in 0..2 {
            for _ in 0..12 {
                if session.is_episode_finished() {
                    break;
                }
                rewards.push(session.make_action(&ATTACK, 1).unwrap());
            }
            session.new_episode(None).unwrap();
        }
        (session.seed(), rewards)
    };
    let (seed, a) = trace(99);
    let (_, b) = trace(99);
    assert_eq!(seed, Some(99));
    assert_eq!(a, b);
}

// ── Guards ─────────────────────────────────────────────────────────

#[test]
fn configuration_is_frozen_while_running() {
    let dir = scratch_dir("frozen");
    let mut session = running(&dir, |_| {});
    let ticrate = session.config().ticrate;
    let err = session.set_ticrate(70).unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidState {
            operation: "set_ticrate",
            state: LifecycleState::Running
        }
    ));
    assert_eq!(session.config().ticrate, ticrate);
    assert!(matches!(
        session.init().unwrap_err(),
        SessionError::InvalidState { operation: "init", .. }
    ));
}

#[test]
fn malformed_action_is_rejected() {
    let dir = scratch_dir("badaction");
    let mut session = running(&dir, |_| {});
    let err = session.make_action(&[1.0], 1).unwrap_err();
    assert!(matches!(err, SessionError::InvalidAction { .. }));
    assert_eq!(session.episode_time(), 0);
    assert!(session.is_running());
}

#[test]
fn invalid_config_is_rejected_whole() {
    let mut session = Session::new(ThreadLauncher::new());
    let mut config = basic_config();
    config.skill = 9;
    let err = session.set_config(config).unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidConfig(ConfigError::InvalidSkill { skill: 9 })
    ));
    assert!(session.config().buttons.is_empty());
}

#[test]
fn engine_commands_round_trip() {
    let dir = scratch_dir("command");
    let mut session = running(&dir, |_| {});
    let err = session.send_game_command("  ").unwrap_err();
    assert!(matches!(err, SessionError::EngineInternal { .. }));
    assert!(!err.is_fatal());

    session.send_game_command("kill").unwrap();
    session.advance_action(1, true).unwrap();
    assert!(session.is_player_dead());
    assert!(session.is_episode_finished());
}

#[test]
fn state_exposes_configured_sections() {
    let dir = scratch_dir("sections");
    let mut session = running(&dir, |s| {
        s.set_objects_info_enabled(true).unwrap();
        s.set_notifications_buffer_enabled(true).unwrap();
    });
    session.make_action(&FORWARD, 1).unwrap();
    assert_eq!(session.last_action().unwrap(), vec![1.0, 0.0]);
    let state = session.state().unwrap().unwrap().to_owned_state();
    assert_eq!(state.episode_tic, 1);
    assert_eq!(state.game_variables.get(), Some(&vec![1.0, 0.0, 100.0]));
    assert!(state.depth.get().is_none());
    let objects = state.objects.get().unwrap();
    assert_eq!(objects[0].name, "DoomPlayer");
    assert_eq!(session.game_variable(GameVariable::DeathCount).unwrap(), None);
    assert_eq!(session.player_count(), Some(1));
    assert!(session.server_state().unwrap().is_none());
}

#[test]
fn state_without_variables_has_no_variable_section() {
    let dir = scratch_dir("novars");
    let mut session = running(&dir, |s| s.clear_available_game_variables().unwrap());
    session.make_action(&FORWARD, 1).unwrap();
    let state = session.state().unwrap().unwrap().to_owned_state();
    assert!(!state.game_variables.is_enabled());
    assert_eq!(session.game_variable(GameVariable::PositionX).unwrap(), None);
}
