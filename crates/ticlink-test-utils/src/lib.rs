//! Stub engine and fixtures for ticlink tests.
//!
//! [`StubWorld`] is a small deterministic scenario that speaks the real
//! protocol through [`serve`]. [`ThreadLauncher`] runs it on a thread of the
//! test process; the `ticlink-stub-engine` binary runs it as a child process
//! for [`ProcessLauncher`](ticlink_engine::ProcessLauncher).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod launcher;
pub mod lobby;
pub mod server;
pub mod world;

pub use fixtures::{basic_config, scratch_dir, thread_session, ScratchDir};
pub use launcher::ThreadLauncher;
pub use lobby::{Lobby, Seat};
pub use server::{serve, KillSwitch, ServeOptions, ENGINE_VERSION};
pub use world::{StubWorld, TicOutcome, KILL_REWARD};
