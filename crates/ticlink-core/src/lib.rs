//! Core types for the ticlink engine controller.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! vocabulary shared by the controller and the engine side of the
//! protocol: identifiers, buttons and game variables, action vectors,
//! the compiled session configuration, observation value types, and the
//! transport-level error kinds.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action;
pub mod button;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod state;
pub mod variable;

pub use action::{ActionError, ActionVector};
pub use button::Button;
pub use config::{
    AudioConfig, BufferToggles, ConfigError, GameConfig, Mode, MultiplayerRole, Resolution,
    SamplingRate, ScreenFormat, DEFAULT_TICRATE,
};
pub use error::{ChannelError, SharedBufferError};
pub use hash::Fnv1a;
pub use id::{PlayerIndex, StateNumber, Tic};
pub use state::{
    BufferSlot, GameState, Label, Line, Object, OwnedGameState, PlayerInfo, ScreenShape, Sector,
    ServerState,
};
pub use variable::{GameVariable, MAX_PLAYERS};
