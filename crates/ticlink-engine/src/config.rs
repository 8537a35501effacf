//! How the controller waits on and tears down its engine.
//!
//! [`EngineConfig`] holds the controller-side knobs that are not part of
//! the game configuration: bounded waits, the shutdown grace period and
//! where shared buffers live. Where the engine comes from is the
//! launcher's business.

use std::path::PathBuf;
use std::time::Duration;

use ticlink_ipc::default_region_dir;

/// Controller-side engine settings.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Bound on every command round trip. Default: 10 s.
    pub timeout: Duration,
    /// Bound on the readiness handshake. A multiplayer host waits here for
    /// every participant to join. Default: 60 s.
    pub init_timeout: Duration,
    /// How long `close()` lets the engine exit on its own before killing
    /// it. Default: 1 s.
    pub shutdown_grace: Duration,
    /// Directory holding the shared buffer files. Default: `/dev/shm` when
    /// present, otherwise the system temp directory.
    pub region_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            init_timeout: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(1),
            region_dir: default_region_dir(),
        }
    }
}

impl EngineConfig {
    /// Extra wait granted to an advance of `tics` in a real-time mode,
    /// where the engine paces tics at `ticrate` per second.
    pub(crate) fn pacing_allowance(tics: u32, ticrate: u32) -> Duration {
        Duration::from_secs_f64(tics as f64 / ticrate.max(1) as f64)
    }
}
