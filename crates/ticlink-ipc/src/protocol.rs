//! Command and acknowledgment messages exchanged with the engine.
//!
//! The controller sends one [`Request`] and blocks until the matching
//! [`Reply`] arrives. Each message travels inside an [`Envelope`] whose
//! sequence number lets the controller discard a reply that arrives after
//! its wait already timed out.

use std::path::PathBuf;

use ticlink_core::{GameConfig, StateNumber, Tic};

/// Wire protocol revision. Bumped on any incompatible message change.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest frame body accepted on the channel.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// A message with its sequence number.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope<T> {
    /// Sequence number; a reply echoes its request's number.
    pub seq: u32,
    /// The message.
    pub body: T,
}

/// Controller-to-engine commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// First message of a session: the engine maps the shared region,
    /// applies the configuration and starts the first episode.
    Hello {
        /// Controller's [`PROTOCOL_VERSION`].
        protocol_version: u32,
        /// Backing file of the shared state buffer.
        region_path: PathBuf,
        /// Resolved seed of the first episode.
        episode_seed: u64,
        /// Compiled session configuration.
        config: GameConfig,
    },
    /// Action to apply on subsequent tics.
    SetAction {
        /// One value per configured button.
        values: Vec<f64>,
    },
    /// Advance the simulation.
    Advance {
        /// Tics to run. Always at least 1.
        tics: u32,
        /// Whether to publish a new state when done.
        update_state: bool,
        /// Apply the controller's action even in spectator modes, where
        /// the human's input normally wins. Set while replaying a record.
        replaying: bool,
    },
    /// Discard the running episode and start a fresh one.
    NewEpisode {
        /// Seed of the new episode.
        seed: u64,
    },
    /// Respawn a dead player (multiplayer).
    Respawn,
    /// Persist the engine's game state.
    SaveState {
        /// Destination file.
        path: PathBuf,
    },
    /// Restore a previously saved game state.
    LoadState {
        /// Source file.
        path: PathBuf,
    },
    /// Pass a console command to the engine.
    GameCommand {
        /// Command text.
        command: String,
    },
    /// Orderly teardown.
    Shutdown,
}

impl Request {
    /// Short name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::SetAction { .. } => "set_action",
            Self::Advance { .. } => "advance",
            Self::NewEpisode { .. } => "new_episode",
            Self::Respawn => "respawn",
            Self::SaveState { .. } => "save_state",
            Self::LoadState { .. } => "load_state",
            Self::GameCommand { .. } => "game_command",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Where the engine stands after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineStatus {
    /// Engine tic.
    pub tic: Tic,
    /// Tics since the episode started.
    pub episode_tic: u64,
    /// Number of the state currently published in the shared region.
    pub state_number: StateNumber,
    /// Whether the player is dead.
    pub dead: bool,
    /// Whether the episode has ended.
    pub episode_finished: bool,
}

/// A run of consecutive tics that applied the same input.
#[derive(Clone, Debug, PartialEq)]
pub struct InputSpan {
    /// Tics in the run.
    pub tics: u32,
    /// Input applied on each of them, one value per button.
    pub values: Vec<f64>,
}

/// Outcome of an [`Request::Advance`] or [`Request::Respawn`].
#[derive(Clone, Debug, PartialEq)]
pub struct AdvanceReport {
    /// Status after the advance.
    pub status: EngineStatus,
    /// Tics actually run; fewer than requested when the episode ended.
    pub tics_advanced: u32,
    /// Reward produced by the scenario itself over the advanced tics.
    pub scenario_reward: f64,
    /// Whether the player died during this advance.
    pub died: bool,
    /// Input the engine applied, tic by tic, in run-length form. Only
    /// spectator modes fill it; otherwise the engine applied exactly the
    /// controller's action and the list is empty.
    pub applied: Vec<InputSpan>,
}

/// Engine-to-controller acknowledgments.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Answer to [`Request::Hello`].
    Ready {
        /// Engine build identifier.
        engine_version: String,
        /// This controller's player slot.
        player_index: u8,
        /// Players in the game when the session became ready.
        player_count: u8,
        /// Status at the start of the first episode.
        status: EngineStatus,
    },
    /// Plain success.
    Ack,
    /// The engine repositioned (new episode, loaded state).
    Status(EngineStatus),
    /// The engine ran tics.
    Advanced(AdvanceReport),
    /// The engine rejected or failed the command.
    Error {
        /// Engine-provided message.
        message: String,
    },
}

impl Reply {
    /// Short name used in log events and protocol errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::Ack => "ack",
            Self::Status(_) => "status",
            Self::Advanced(_) => "advanced",
            Self::Error { .. } => "error",
        }
    }
}
