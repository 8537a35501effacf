//! Session control for an external tic-driven game engine.
//!
//! A [`Session`] owns one engine process, the command channel to it and the
//! shared state buffer it publishes observations into. The session walks
//! the lifecycle `Uninitialized → Initializing → Running → Closed`, steps
//! the engine a tic batch at a time while accounting rewards, records and
//! replays episodes, and relays multiplayer server state.
//!
//! How the engine is reached is pluggable through [`EngineLauncher`]:
//! [`ProcessLauncher`] spawns an executable and talks over its stdio,
//! [`AttachLauncher`] connects to an engine already listening on a Unix
//! socket.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod launcher;
pub mod session;

mod episode;
mod multiplayer;
mod step;

pub use config::EngineConfig;
pub use error::{LifecycleState, SessionError};
#[cfg(unix)]
pub use launcher::AttachLauncher;
pub use launcher::{
    EngineHandle, EngineLauncher, EngineProcess, LaunchSpec, ProcessLauncher, ProcessStatus,
    REGION_ARG,
};
pub use session::Session;
pub use step::RewardLedger;
