//! Episode boundaries, recording and replay, saved states.

use std::path::Path;
use std::time::Duration;

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ticlink_ipc::{Reply, Request};
use ticlink_replay::{config_hash, RecordHeader, RecordWriter, Recording};

use crate::error::SessionError;
use crate::session::{unexpected_reply, Session};

/// Deterministic stream of episode seeds derived from the session seed.
///
/// The first value seeds the episode started at init; each new episode
/// draws the next one. Two sessions with the same seed play the same
/// sequence of episodes.
#[derive(Clone, Debug)]
pub(crate) struct SeedSequence {
    rng: ChaCha8Rng,
}

impl SeedSequence {
    pub(crate) fn new(session_seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(session_seed),
        }
    }

    pub(crate) fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

impl Session {
    /// End the current episode and start the next one.
    ///
    /// Closes any active recording (END at the current tic) and any
    /// replay, and zeroes the episode rewards. With `record_to`, every
    /// action of the new episode is written to that file.
    pub fn new_episode(&mut self, record_to: Option<&Path>) -> Result<(), SessionError> {
        let live = self.live_mut("new_episode")?;
        live.stop_recording()?;
        live.replay = None;
        let seed = live.seeds.next_seed();
        self.start_episode("new_episode", seed)?;
        if let Some(path) = record_to {
            self.start_recording(path)?;
        }
        Ok(())
    }

    /// Replay the episode recorded at `path`.
    ///
    /// Restarts the engine on the recorded episode seed; subsequent
    /// advances apply the recorded actions tic for tic and ignore actions
    /// submitted through [`set_action`](Self::set_action). The record must
    /// match the running configuration's fingerprint and this session's
    /// player slot; `player`, when given, must also match the record.
    pub fn replay_episode(&mut self, path: &Path, player: Option<u8>) -> Result<(), SessionError> {
        self.ensure_running("replay_episode")?;
        if !path.exists() {
            return Err(SessionError::ConfigurationMissing {
                path: path.to_path_buf(),
            });
        }
        let recording = Recording::open(path)?;
        let fingerprint = config_hash(&self.config);
        let live = self.live_mut("replay_episode")?;
        if let Some(requested) = player {
            recording.verify(fingerprint, requested)?;
        }
        recording.verify(fingerprint, live.player_index.0)?;
        live.stop_recording()?;
        live.replay = None;

        let seed = recording.header().episode_seed;
        self.start_episode("replay_episode", seed)?;
        tracing::info!(
            path = %path.display(),
            spans = recording.span_count(),
            end_tic = recording.end_tic(),
            "replay started"
        );
        self.live_mut("replay_episode")?.replay = Some(recording);
        Ok(())
    }

    /// Whether advances are driven by a loaded record.
    pub fn is_replaying(&self) -> bool {
        self.live.as_ref().is_some_and(|l| l.replay.is_some())
    }

    /// Respawn a dead player. Deaths only end single-player episodes;
    /// in multiplayer the player waits dead until respawned.
    pub fn respawn_player(&mut self) -> Result<(), SessionError> {
        if self.live_mut("respawn_player")?.status.episode_finished {
            return Err(SessionError::EpisodeFinished);
        }
        let report = match self.call("respawn_player", Request::Respawn, Duration::ZERO)? {
            Reply::Advanced(report) => report,
            other => return Err(unexpected_reply("advanced", &other)),
        };
        self.absorb(report, false)
    }

    /// Ask the engine to save its game state to `path`.
    pub fn save(&mut self, path: &Path) -> Result<(), SessionError> {
        let request = Request::SaveState {
            path: path.to_path_buf(),
        };
        match self.call("save", request, Duration::ZERO)? {
            Reply::Ack => Ok(()),
            other => Err(unexpected_reply("ack", &other)),
        }
    }

    /// Restore a game state saved by [`save`](Self::save).
    ///
    /// Ends any active recording and replay, since the restored state
    /// breaks the recorded tic sequence.
    pub fn load(&mut self, path: &Path) -> Result<(), SessionError> {
        self.ensure_running("load")?;
        if !path.exists() {
            return Err(SessionError::ConfigurationMissing {
                path: path.to_path_buf(),
            });
        }
        let live = self.live_mut("load")?;
        live.stop_recording()?;
        live.replay = None;
        let request = Request::LoadState {
            path: path.to_path_buf(),
        };
        let status = match self.call("load", request, Duration::ZERO)? {
            Reply::Status(status) => status,
            other => return Err(unexpected_reply("status", &other)),
        };
        let live = self.live_mut("load")?;
        live.region.check_published(status.state_number)?;
        live.status = status;
        live.action_sent = false;
        tracing::info!(path = %path.display(), tic = status.tic.0, "state loaded");
        Ok(())
    }

    /// Pass a console command to the engine verbatim.
    pub fn send_game_command(&mut self, command: &str) -> Result<(), SessionError> {
        let request = Request::GameCommand {
            command: command.to_owned(),
        };
        match self.call("send_game_command", request, Duration::ZERO)? {
            Reply::Ack => Ok(()),
            other => Err(unexpected_reply("ack", &other)),
        }
    }

    /// Restart the engine on a fresh episode seeded with `seed`.
    fn start_episode(&mut self, operation: &'static str, seed: u64) -> Result<(), SessionError> {
        let status = match self.call(operation, Request::NewEpisode { seed }, Duration::ZERO)? {
            Reply::Status(status) => status,
            other => return Err(unexpected_reply("status", &other)),
        };
        let live = self.live_mut(operation)?;
        live.region.check_published(status.state_number)?;
        live.status = status;
        live.episode_seed = seed;
        live.ledger.reset();
        // The engine clears its input at an episode boundary.
        live.action_sent = false;
        tracing::info!(seed, tic = status.tic.0, "episode started");
        Ok(())
    }

    fn start_recording(&mut self, path: &Path) -> Result<(), SessionError> {
        let config_hash = config_hash(&self.config);
        let button_count = self.config.buttons.len() as u32;
        let live = self.live_mut("new_episode")?;
        let header = RecordHeader {
            engine_version: live.engine_version.clone(),
            library_version: env!("CARGO_PKG_VERSION").to_owned(),
            episode_seed: live.episode_seed,
            config_hash,
            player_index: live.player_index.0,
            button_count,
        };
        live.recorder = Some(RecordWriter::create(path, &header)?);
        tracing::info!(path = %path.display(), "recording episode");
        Ok(())
    }
}
