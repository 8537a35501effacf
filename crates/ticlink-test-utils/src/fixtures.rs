//! Ready-made configurations and scratch directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ticlink_core::{Button, GameConfig, GameVariable};
use ticlink_engine::{EngineConfig, Session};

use crate::launcher::ThreadLauncher;

/// Two buttons (`MoveForward`, `Attack`), position and kill variables,
/// a small screen and a fixed seed.
pub fn basic_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.buttons.insert(Button::MoveForward, 0.0);
    config.buttons.insert(Button::Attack, 0.0);
    config.variables.insert(GameVariable::PositionX);
    config.variables.insert(GameVariable::KillCount);
    config.variables.insert(GameVariable::Health);
    config.resolution.width = 64;
    config.resolution.height = 48;
    config.seed = Some(42);
    config
}

/// A directory under the system temp dir, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Fresh scratch directory whose name starts with `tag`.
pub fn scratch_dir(tag: &str) -> ScratchDir {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!("ticlink-{tag}-{}-{n}", std::process::id()));
    fs::create_dir_all(&path).expect("create scratch dir");
    ScratchDir { path }
}

/// Uninitialized session driving a stub engine thread, with its shared
/// buffers placed in `dir` and `config` applied.
pub fn thread_session(launcher: ThreadLauncher, dir: &ScratchDir, config: GameConfig) -> Session {
    let engine = EngineConfig {
        region_dir: dir.path().to_path_buf(),
        ..EngineConfig::default()
    };
    let mut session = Session::with_engine_config(launcher, engine);
    session.set_config(config).expect("valid test config");
    session
}
