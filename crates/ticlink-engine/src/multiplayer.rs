//! Multiplayer queries.
//!
//! Frags, AFK flags and player slots are derived by the engine and only
//! relayed here; the controller never writes them.

use ticlink_core::{PlayerIndex, ServerState};

use crate::error::{LifecycleState, SessionError};
use crate::session::Session;

impl Session {
    /// Whether the configured role takes part in a multiplayer game.
    pub fn is_multiplayer(&self) -> bool {
        self.config.multiplayer.is_multiplayer()
    }

    /// Snapshot of the multiplayer game, as last published by the engine.
    ///
    /// `None` unless the session is multiplayer and running.
    pub fn server_state(&mut self) -> Result<Option<ServerState>, SessionError> {
        self.check_lost()?;
        if !self.is_multiplayer() || self.state != LifecycleState::Running {
            return Ok(None);
        }
        Ok(self.touch("server_state")?.region.server_state())
    }

    /// This session's player slot, once running.
    pub fn player_index(&self) -> Option<PlayerIndex> {
        self.live.as_ref().map(|l| l.player_index)
    }

    /// Players in the game: from the latest server state in multiplayer,
    /// `1` in a single-player game, `None` when not running.
    pub fn player_count(&self) -> Option<u8> {
        let live = self.live.as_ref()?;
        if !self.is_multiplayer() {
            return Some(1);
        }
        Some(
            live.region
                .server_state()
                .map_or(live.player_count, |s| s.player_count),
        )
    }
}
