//! Ticlink: drive an external tic-driven game engine as an RL environment.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the ticlink sub-crates. For most users, adding `ticlink` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```no_run
//! use ticlink::prelude::*;
//!
//! # fn main() -> Result<(), SessionError> {
//! let mut session = Session::new(ProcessLauncher::new("/opt/engine/bin/engine"));
//! session.set_scenario_path("scenarios/basic.wad")?;
//! session.set_available_buttons(&[Button::MoveLeft, Button::MoveRight, Button::Attack])?;
//! session.add_available_game_variable(GameVariable::Ammo(2))?;
//! session.set_episode_timeout(300)?;
//! session.set_living_reward(-1.0)?;
//! session.init()?;
//!
//! for _ in 0..10 {
//!     session.new_episode(None)?;
//!     while !session.is_episode_finished() {
//!         if let Some(state) = session.state()? {
//!             let _pixels = state.screen.len();
//!         }
//!         session.make_action(&[0.0, 0.0, 1.0], 4)?;
//!     }
//!     println!("episode reward {}", session.total_reward());
//! }
//! session.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `ticlink-core` | Configuration, buttons, variables, states, errors |
//! | [`ipc`] | `ticlink-ipc` | Wire protocol, transports, shared state buffer |
//! | [`replay`] | `ticlink-replay` | Episode records and their replay |
//! | [`engine`] | `ticlink-engine` | Sessions, launchers, lifecycle |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Configuration, actions, observations and error types (`ticlink-core`).
pub use ticlink_core as types;

/// Request/reply protocol, transports and the shared state buffer
/// (`ticlink-ipc`).
///
/// Engine implementations use [`ipc::EngineEndpoint`] and
/// [`ipc::SharedRegion`] to serve a session.
pub use ticlink_ipc as ipc;

/// Episode recording and replay (`ticlink-replay`).
pub use ticlink_replay as replay;

/// Session control (`ticlink-engine`).
///
/// [`engine::Session`] with [`engine::ProcessLauncher`] for spawned
/// engines, or any custom [`engine::EngineLauncher`].
pub use ticlink_engine as engine;

/// Common imports for typical ticlink usage.
///
/// ```rust
/// use ticlink::prelude::*;
/// ```
pub mod prelude {
    // Configuration
    pub use ticlink_core::{
        Button, GameConfig, GameVariable, Mode, MultiplayerRole, Resolution, ScreenFormat,
    };

    // Observations
    pub use ticlink_core::{BufferSlot, GameState, OwnedGameState, ServerState};

    // Errors
    pub use ticlink_core::{ChannelError, ConfigError, SharedBufferError};
    pub use ticlink_engine::{LifecycleState, SessionError};

    // Session
    pub use ticlink_engine::{EngineConfig, EngineLauncher, ProcessLauncher, Session};
}
