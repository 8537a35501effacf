//! Criterion benchmarks for stepping a session against the stub engine.
//!
//! Measures the controller's per-step cost: the request round trips over
//! an in-process channel plus reading the published state back.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use ticlink_bench::{action_script, full_profile, reference_profile};
use ticlink_core::GameConfig;
use ticlink_engine::Session;
use ticlink_test_utils::{scratch_dir, thread_session, ScratchDir, ThreadLauncher};

const SCRIPT_LEN: usize = 64;

fn running(dir: &ScratchDir, config: GameConfig) -> Session {
    let mut session = thread_session(ThreadLauncher::new(), dir, config);
    session.init().unwrap();
    session
}

fn step_loop(session: &mut Session, script: &[Vec<f64>], i: &mut usize) {
    if session.is_episode_finished() {
        session.new_episode(None).unwrap();
    }
    let reward = session.make_action(&script[*i % script.len()], 4).unwrap();
    *i += 1;
    black_box(reward);
}

/// Benchmark: `make_action` with 4 tics per step, reference profile.
fn bench_make_action_reference(c: &mut Criterion) {
    let dir = scratch_dir("bench-ref");
    let mut session = running(&dir, reference_profile(42));
    let script = action_script(SCRIPT_LEN);
    let mut i = 0;
    c.bench_function("make_action_reference", |b| {
        b.iter(|| step_loop(&mut session, &script, &mut i));
    });
}

/// Benchmark: `make_action` plus an owned copy of the full state, with
/// every section enabled.
fn bench_make_action_full_state(c: &mut Criterion) {
    let dir = scratch_dir("bench-full");
    let mut session = running(&dir, full_profile(42));
    let script = action_script(SCRIPT_LEN);
    let mut i = 0;
    c.bench_function("make_action_full_state", |b| {
        b.iter(|| {
            step_loop(&mut session, &script, &mut i);
            if let Some(state) = session.state().unwrap() {
                black_box(state.to_owned_state());
            }
        });
    });
}

/// Benchmark: tic batches without state updates.
fn bench_advance_without_update(c: &mut Criterion) {
    let dir = scratch_dir("bench-skip");
    let mut session = running(&dir, reference_profile(7));
    session.set_action(&action_script(1)[0]).unwrap();
    c.bench_function("advance_no_update_8_tics", |b| {
        b.iter(|| {
            if session.is_episode_finished() {
                session.new_episode(None).unwrap();
            }
            session.advance_action(8, false).unwrap();
            black_box(session.last_reward());
        });
    });
}

criterion_group!(
    benches,
    bench_make_action_reference,
    bench_make_action_full_state,
    bench_advance_without_update
);
criterion_main!(benches);
