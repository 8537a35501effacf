//! The session object: configuration, lifecycle and the engine link.
//!
//! A [`Session`] is configured while `Uninitialized`, brought up by
//! [`init()`](Session::init), driven while `Running` and torn down by
//! [`close()`](Session::close). Stepping, episode control and multiplayer
//! queries live in sibling modules as further `impl Session` blocks.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use ticlink_core::{
    ActionVector, Button, ChannelError, ConfigError, GameConfig, GameVariable, Mode,
    MultiplayerRole, PlayerIndex, Resolution, SamplingRate, ScreenFormat,
};
use ticlink_ipc::{
    unique_region_path, BufferLayout, EngineStatus, Reply, Request, SharedRegion, Transport,
    PROTOCOL_VERSION,
};
use ticlink_replay::{RecordWriter, Recording};

use crate::config::EngineConfig;
use crate::episode::SeedSequence;
use crate::error::{LifecycleState, SessionError};
use crate::launcher::{EngineHandle, EngineLauncher, EngineProcess, LaunchSpec, ProcessStatus};
use crate::step::RewardLedger;

/// How long to wait for an exit code once the channel reports peer loss.
const PEER_LOSS_GRACE: Duration = Duration::from_millis(200);

/// Episode recorder writing to a file.
pub(crate) type Recorder = RecordWriter<BufWriter<File>>;

/// Everything that exists only while the engine is up.
pub(crate) struct Live {
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) process: Box<dyn EngineProcess>,
    pub(crate) region: SharedRegion,
    pub(crate) engine_version: String,
    pub(crate) player_index: PlayerIndex,
    pub(crate) player_count: u8,
    pub(crate) status: EngineStatus,
    /// Action the engine applies on the next advance.
    pub(crate) action: ActionVector,
    /// Whether `action` has been sent since it last changed.
    pub(crate) action_sent: bool,
    pub(crate) ledger: RewardLedger,
    pub(crate) seeds: SeedSequence,
    pub(crate) episode_seed: u64,
    pub(crate) recorder: Option<Recorder>,
    pub(crate) replay: Option<Recording>,
}

impl Live {
    /// Close the active recording, if any, with an END frame at the
    /// current episode tic.
    pub(crate) fn stop_recording(&mut self) -> Result<(), SessionError> {
        match self.recorder.take() {
            Some(mut recorder) => {
                let frames = recorder.frames_written();
                recorder.finish(self.status.episode_tic)?;
                tracing::debug!(
                    frames,
                    end_tic = self.status.episode_tic,
                    "episode record closed"
                );
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Reply to the readiness handshake.
struct Ready {
    engine_version: String,
    player_index: PlayerIndex,
    player_count: u8,
    status: EngineStatus,
}

/// One controlled engine instance.
///
/// Owns the engine process handle, the command channel and the shared
/// state buffer exclusively. Not shared between threads; callers needing
/// parallel environments run one session per engine.
///
/// # Example
///
/// ```no_run
/// use ticlink_core::Button;
/// use ticlink_engine::{ProcessLauncher, Session};
///
/// # fn main() -> Result<(), ticlink_engine::SessionError> {
/// let mut session = Session::new(ProcessLauncher::new("/usr/local/bin/engine"));
/// session.set_available_buttons(&[Button::MoveForward, Button::Attack])?;
/// session.set_living_reward(-0.01)?;
/// session.init()?;
/// while !session.is_episode_finished() {
///     let reward = session.make_action(&[1.0, 0.0], 4)?;
///     println!("reward {reward}");
/// }
/// session.close();
/// # Ok(())
/// # }
/// ```
pub struct Session {
    pub(crate) config: GameConfig,
    pub(crate) engine: EngineConfig,
    launcher: Box<dyn EngineLauncher>,
    pub(crate) state: LifecycleState,
    /// Exit code of an engine that died underneath the session; every
    /// operation reports it until `close()`.
    lost: Option<Option<i32>>,
    session_seed: Option<u64>,
    pub(crate) live: Option<Live>,
}

// Compile-time assertion: a session can move to a worker thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Session>();
    }
};

impl Session {
    /// Unconfigured session using `launcher` and default engine settings.
    pub fn new(launcher: impl EngineLauncher + 'static) -> Self {
        Self::with_engine_config(launcher, EngineConfig::default())
    }

    /// Unconfigured session with explicit engine settings.
    pub fn with_engine_config(launcher: impl EngineLauncher + 'static, engine: EngineConfig) -> Self {
        Self {
            config: GameConfig::default(),
            engine,
            launcher: Box::new(launcher),
            state: LifecycleState::Uninitialized,
            lost: None,
            session_seed: None,
            live: None,
        }
    }

    /// The game configuration (as sent, once initialized).
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Controller-side engine settings.
    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    /// Current lifecycle state.
    pub fn state_kind(&self) -> LifecycleState {
        self.state
    }

    /// Whether the session is `Running`.
    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    /// Engine build identifier reported at init.
    pub fn engine_version(&self) -> Option<&str> {
        self.live.as_ref().map(|l| l.engine_version.as_str())
    }

    /// OS process id of a spawned engine.
    pub fn engine_pid(&self) -> Option<u32> {
        self.live.as_ref().and_then(|l| l.process.id())
    }

    /// Resolved session seed (random unless configured), once initialized.
    pub fn seed(&self) -> Option<u64> {
        self.session_seed
    }

    /// Seed of the running episode.
    pub fn episode_seed(&self) -> Option<u64> {
        self.live.as_ref().map(|l| l.episode_seed)
    }

    // ── Configuration ──────────────────────────────────────────────

    fn try_configure(
        &mut self,
        operation: &'static str,
        apply: impl FnOnce(&mut GameConfig) -> Result<(), ConfigError>,
    ) -> Result<(), SessionError> {
        self.check_lost()?;
        if self.state != LifecycleState::Uninitialized {
            return Err(self.invalid(operation));
        }
        let mut next = self.config.clone();
        apply(&mut next)?;
        next.validate()?;
        self.config = next;
        Ok(())
    }

    fn configure(
        &mut self,
        operation: &'static str,
        apply: impl FnOnce(&mut GameConfig),
    ) -> Result<(), SessionError> {
        self.try_configure(operation, |c| {
            apply(c);
            Ok(())
        })
    }

    /// Replace the whole configuration.
    pub fn set_config(&mut self, config: GameConfig) -> Result<(), SessionError> {
        self.configure("set_config", |c| *c = config)
    }

    /// Scenario file handed to the engine. Checked for existence at init.
    pub fn set_scenario_path(&mut self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        let path = path.into();
        self.configure("set_scenario_path", |c| c.scenario_path = Some(path))
    }

    /// Replace the available buttons, in action-vector order, unbounded.
    pub fn set_available_buttons(&mut self, buttons: &[Button]) -> Result<(), SessionError> {
        self.configure("set_available_buttons", |c| {
            c.buttons = buttons.iter().map(|&b| (b, 0.0)).collect();
        })
    }

    /// Append a button (or update its maximum if already available).
    pub fn add_available_button(
        &mut self,
        button: Button,
        max_value: f64,
    ) -> Result<(), SessionError> {
        self.configure("add_available_button", |c| {
            c.buttons.insert(button, max_value);
        })
    }

    /// Set the maximum magnitude of an available delta button.
    pub fn set_button_max_value(
        &mut self,
        button: Button,
        max_value: f64,
    ) -> Result<(), SessionError> {
        self.try_configure("set_button_max_value", |c| {
            match c.buttons.get_mut(&button) {
                Some(max) => *max = max_value,
                None => return Err(ConfigError::UnknownButton { button }),
            }
            Ok(())
        })
    }

    /// Remove every available button.
    pub fn clear_available_buttons(&mut self) -> Result<(), SessionError> {
        self.configure("clear_available_buttons", |c| c.buttons.clear())
    }

    /// Replace the observed game variables, in observation order.
    pub fn set_available_game_variables(
        &mut self,
        variables: &[GameVariable],
    ) -> Result<(), SessionError> {
        self.configure("set_available_game_variables", |c| {
            c.variables = variables.iter().copied().collect();
        })
    }

    /// Append an observed game variable.
    pub fn add_available_game_variable(
        &mut self,
        variable: GameVariable,
    ) -> Result<(), SessionError> {
        self.configure("add_available_game_variable", |c| {
            c.variables.insert(variable);
        })
    }

    /// Remove every observed game variable.
    pub fn clear_available_game_variables(&mut self) -> Result<(), SessionError> {
        self.configure("clear_available_game_variables", |c| c.variables.clear())
    }

    /// Screen pixel format.
    pub fn set_screen_format(&mut self, format: ScreenFormat) -> Result<(), SessionError> {
        self.configure("set_screen_format", |c| c.screen_format = format)
    }

    /// Screen size.
    pub fn set_screen_resolution(&mut self, resolution: Resolution) -> Result<(), SessionError> {
        self.configure("set_screen_resolution", |c| c.resolution = resolution)
    }

    /// Publish the depth buffer.
    pub fn set_depth_buffer_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.configure("set_depth_buffer_enabled", |c| c.buffers.depth = enabled)
    }

    /// Publish the labels buffer and label list.
    pub fn set_labels_buffer_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.configure("set_labels_buffer_enabled", |c| c.buffers.labels = enabled)
    }

    /// Publish the automap buffer.
    pub fn set_automap_buffer_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.configure("set_automap_buffer_enabled", |c| c.buffers.automap = enabled)
    }

    /// Publish audio samples.
    pub fn set_audio_buffer_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.configure("set_audio_buffer_enabled", |c| c.buffers.audio = enabled)
    }

    /// Audio sampling rate.
    pub fn set_audio_sampling_rate(&mut self, rate: SamplingRate) -> Result<(), SessionError> {
        self.configure("set_audio_sampling_rate", |c| c.audio.sampling_rate = rate)
    }

    /// Tics of audio each state carries.
    pub fn set_audio_buffer_size(&mut self, tics: u32) -> Result<(), SessionError> {
        self.configure("set_audio_buffer_size", |c| c.audio.buffer_tics = tics)
    }

    /// Publish the object list.
    pub fn set_objects_info_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.configure("set_objects_info_enabled", |c| {
            c.buffers.objects_info = enabled
        })
    }

    /// Publish sector and line geometry.
    pub fn set_sectors_info_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.configure("set_sectors_info_enabled", |c| {
            c.buffers.sectors_info = enabled
        })
    }

    /// Publish console notifications.
    pub fn set_notifications_buffer_enabled(
        &mut self,
        enabled: bool,
    ) -> Result<(), SessionError> {
        self.configure("set_notifications_buffer_enabled", |c| {
            c.buffers.notifications = enabled
        })
    }

    /// Pacing and input ownership.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SessionError> {
        self.configure("set_mode", |c| c.mode = mode)
    }

    /// Tics per second.
    pub fn set_ticrate(&mut self, ticrate: u32) -> Result<(), SessionError> {
        self.configure("set_ticrate", |c| c.ticrate = ticrate)
    }

    /// Episode length in tics; `0` disables the timeout.
    pub fn set_episode_timeout(&mut self, tics: u64) -> Result<(), SessionError> {
        self.configure("set_episode_timeout", |c| {
            c.episode_timeout = (tics > 0).then_some(tics)
        })
    }

    /// Tics the engine runs on its own before each episode hands over.
    pub fn set_episode_start_time(&mut self, tics: u64) -> Result<(), SessionError> {
        self.configure("set_episode_start_time", |c| c.episode_start_time = tics)
    }

    /// Reward added every tic.
    pub fn set_living_reward(&mut self, reward: f64) -> Result<(), SessionError> {
        self.configure("set_living_reward", |c| c.living_reward = reward)
    }

    /// Penalty subtracted once at death.
    pub fn set_death_penalty(&mut self, penalty: f64) -> Result<(), SessionError> {
        self.configure("set_death_penalty", |c| c.death_penalty = penalty)
    }

    /// Difficulty `1..=5`.
    pub fn set_doom_skill(&mut self, skill: u8) -> Result<(), SessionError> {
        self.configure("set_doom_skill", |c| c.skill = skill)
    }

    /// Session seed. Episode seeds derive from it.
    pub fn set_seed(&mut self, seed: u64) -> Result<(), SessionError> {
        self.configure("set_seed", |c| c.seed = Some(seed))
    }

    /// Multiplayer role.
    pub fn set_multiplayer(&mut self, role: MultiplayerRole) -> Result<(), SessionError> {
        self.configure("set_multiplayer", |c| c.multiplayer = role)
    }

    /// Append whitespace-separated engine arguments.
    pub fn add_game_args(&mut self, args: &str) -> Result<(), SessionError> {
        self.configure("add_game_args", |c| {
            c.game_args.extend(args.split_whitespace().map(str::to_owned))
        })
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Launch the engine and wait for it to report ready.
    ///
    /// Legal only while `Uninitialized`. On failure everything launched is
    /// torn down and the session returns to `Uninitialized`.
    pub fn init(&mut self) -> Result<(), SessionError> {
        self.check_lost()?;
        if self.state != LifecycleState::Uninitialized {
            return Err(self.invalid("init"));
        }
        if let Some(path) = &self.config.scenario_path {
            if !path.exists() {
                return Err(SessionError::ConfigurationMissing { path: path.clone() });
            }
        }
        self.config.validate()?;

        self.state = LifecycleState::Initializing;
        match self.start() {
            Ok(live) => {
                tracing::info!(
                    engine = %live.engine_version,
                    player = live.player_index.0,
                    players = live.player_count,
                    seed = self.session_seed,
                    "session running"
                );
                self.live = Some(live);
                self.state = LifecycleState::Running;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "init failed");
                self.session_seed = None;
                self.state = LifecycleState::Uninitialized;
                Err(e)
            }
        }
    }

    fn start(&mut self) -> Result<Live, SessionError> {
        let session_seed = self.config.seed.unwrap_or_else(rand::random::<u64>);
        self.session_seed = Some(session_seed);
        let mut seeds = SeedSequence::new(session_seed);
        let episode_seed = seeds.next_seed();

        let layout = BufferLayout::for_config(&self.config);
        let region_path = unique_region_path(&self.engine.region_dir);
        let region = SharedRegion::create(&region_path, layout)?;

        let EngineHandle {
            mut transport,
            mut process,
        } = self.launcher.launch(&LaunchSpec {
            region_path: &region_path,
            config: &self.config,
        })?;
        let hello = Request::Hello {
            protocol_version: PROTOCOL_VERSION,
            region_path: region_path.clone(),
            episode_seed,
            config: self.config.clone(),
        };
        let ready = match handshake(
            transport.as_mut(),
            process.as_mut(),
            &region,
            hello,
            self.engine.init_timeout,
        ) {
            Ok(ready) => ready,
            Err(e) => {
                // Closing the channel first lets a well-behaved engine exit.
                drop(transport);
                process.terminate(self.engine.shutdown_grace);
                return Err(e);
            }
        };

        Ok(Live {
            transport,
            process,
            region,
            engine_version: ready.engine_version,
            player_index: ready.player_index,
            player_count: ready.player_count,
            status: ready.status,
            action: ActionVector::idle(self.config.buttons.len()),
            action_sent: true,
            ledger: RewardLedger::new(),
            seeds,
            episode_seed,
            recorder: None,
            replay: None,
        })
    }

    /// Shut the engine down and release every resource.
    ///
    /// Idempotent and infallible: teardown problems are logged. An active
    /// recording is closed with an END frame first. Afterwards the session
    /// is `Closed` and every operation fails with `InvalidState`.
    pub fn close(&mut self) {
        self.lost = None;
        let previous = std::mem::replace(&mut self.state, LifecycleState::Closed);
        let Some(mut live) = self.live.take() else {
            if previous != LifecycleState::Closed {
                tracing::debug!(%previous, "session closed without an engine");
            }
            return;
        };
        if let Err(e) = live.stop_recording() {
            tracing::warn!(error = %e, "cannot finish episode record");
        }
        let wait = self.engine.timeout.min(self.engine.shutdown_grace);
        match live.transport.request(Request::Shutdown, wait) {
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "engine did not acknowledge shutdown"),
        }
        live.process.terminate(self.engine.shutdown_grace);
        tracing::info!(
            total_reward = live.ledger.total(),
            tic = live.status.tic.0,
            "session closed"
        );
    }

    // ── Internal plumbing ──────────────────────────────────────────

    pub(crate) fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            state: self.state,
        }
    }

    pub(crate) fn check_lost(&self) -> Result<(), SessionError> {
        match self.lost {
            Some(exit_code) => Err(SessionError::EngineTerminated { exit_code }),
            None => Ok(()),
        }
    }

    /// Fail unless the session is running with its engine attached.
    pub(crate) fn ensure_running(&self, operation: &'static str) -> Result<&Live, SessionError> {
        self.check_lost()?;
        match (&self.live, self.state) {
            (Some(live), LifecycleState::Running) => Ok(live),
            _ => Err(self.invalid(operation)),
        }
    }

    /// Mutable access to the live engine after a liveness check, for
    /// operations that touch the channel or the shared buffer.
    pub(crate) fn touch(&mut self, operation: &'static str) -> Result<&mut Live, SessionError> {
        self.ensure_running(operation)?;
        let exited = match self.live.as_mut() {
            Some(live) => live.process.status(),
            None => return Err(self.invalid(operation)),
        };
        if let ProcessStatus::Exited(code) = exited {
            return Err(self.engine_lost(code));
        }
        match self.live.as_mut() {
            Some(live) => Ok(live),
            None => Err(SessionError::InvalidState {
                operation,
                state: LifecycleState::Closed,
            }),
        }
    }

    /// Mutable access to the live engine without a liveness check.
    pub(crate) fn live_mut(&mut self, operation: &'static str) -> Result<&mut Live, SessionError> {
        self.ensure_running(operation)?;
        let state = self.state;
        self.live
            .as_mut()
            .ok_or(SessionError::InvalidState { operation, state })
    }

    /// One request/reply round trip. Engine rejections become
    /// `EngineInternal`; a vanished peer closes the session.
    pub(crate) fn call(
        &mut self,
        operation: &'static str,
        request: Request,
        extra_wait: Duration,
    ) -> Result<Reply, SessionError> {
        let timeout = self.engine.timeout + extra_wait;
        let live = self.touch(operation)?;
        let name = request.name();
        match live.transport.request(request, timeout) {
            Ok(Reply::Error { message }) => {
                tracing::debug!(request = name, %message, "engine rejected request");
                Err(SessionError::EngineInternal { message })
            }
            Ok(reply) => {
                tracing::trace!(request = name, reply = reply.name(), "round trip");
                Ok(reply)
            }
            Err(e) if e.is_peer_loss() => {
                let code = match live.process.wait_exit(PEER_LOSS_GRACE) {
                    ProcessStatus::Exited(code) => code,
                    ProcessStatus::Running => None,
                };
                Err(self.engine_lost(code))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Tear down after the engine vanished and remember why.
    fn engine_lost(&mut self, exit_code: Option<i32>) -> SessionError {
        tracing::warn!(?exit_code, "engine terminated underneath the session");
        if let Some(mut live) = self.live.take() {
            // The record stays without END; it still replays up to here.
            if let Some(recorder) = live.recorder.as_mut() {
                if let Err(e) = recorder.flush() {
                    tracing::warn!(error = %e, "cannot flush episode record");
                }
            }
            live.process.terminate(Duration::ZERO);
        }
        self.state = LifecycleState::Closed;
        self.lost = Some(exit_code);
        SessionError::EngineTerminated { exit_code }
    }
}

/// Send the hello and validate the engine's readiness and first state.
fn handshake(
    transport: &mut dyn Transport,
    process: &mut dyn EngineProcess,
    region: &SharedRegion,
    hello: Request,
    timeout: Duration,
) -> Result<Ready, SessionError> {
    let reply = match transport.request(hello, timeout) {
        Ok(reply) => reply,
        Err(e) if e.is_peer_loss() => {
            let exit_code = match process.wait_exit(PEER_LOSS_GRACE) {
                ProcessStatus::Exited(code) => code,
                ProcessStatus::Running => None,
            };
            return Err(SessionError::EngineTerminated { exit_code });
        }
        Err(e) => return Err(e.into()),
    };
    let ready = match reply {
        Reply::Ready {
            engine_version,
            player_index,
            player_count,
            status,
        } => Ready {
            engine_version,
            player_index: PlayerIndex(player_index),
            player_count,
            status,
        },
        Reply::Error { message } => return Err(SessionError::EngineInternal { message }),
        other => return Err(unexpected_reply("ready", &other)),
    };
    region.validate(true)?;
    region.check_published(ready.status.state_number)?;
    Ok(ready)
}

/// Protocol error for a reply of the wrong kind.
pub(crate) fn unexpected_reply(expected: &str, got: &Reply) -> SessionError {
    SessionError::Channel(ChannelError::Protocol {
        detail: format!("expected {expected} reply, got {}", got.name()),
    })
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("engine", &self.engine_version())
            .field("pid", &self.engine_pid())
            .field("tic", &self.live.as_ref().map(|l| l.status.tic))
            .field("seed", &self.session_seed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Launcher whose engine never comes up.
    struct RefusingLauncher;

    impl EngineLauncher for RefusingLauncher {
        fn launch(&mut self, _spec: &LaunchSpec<'_>) -> Result<EngineHandle, SessionError> {
            Err(ChannelError::Open {
                reason: "refused".into(),
            }
            .into())
        }
    }

    fn session() -> Session {
        let engine = EngineConfig {
            region_dir: std::env::temp_dir(),
            ..EngineConfig::default()
        };
        Session::with_engine_config(RefusingLauncher, engine)
    }

    #[test]
    fn setters_apply_while_uninitialized() {
        let mut s = session();
        s.set_available_buttons(&[Button::MoveForward, Button::TurnLeftRightDelta])
            .unwrap();
        s.set_button_max_value(Button::TurnLeftRightDelta, 10.0)
            .unwrap();
        s.set_episode_timeout(300).unwrap();
        s.add_game_args("+sv_cheats 1").unwrap();
        assert_eq!(s.config().buttons.len(), 2);
        assert_eq!(s.config().buttons[&Button::TurnLeftRightDelta], 10.0);
        assert_eq!(s.config().episode_timeout, Some(300));
        assert_eq!(s.config().game_args, vec!["+sv_cheats", "1"]);
        s.set_episode_timeout(0).unwrap();
        assert_eq!(s.config().episode_timeout, None);
    }

    #[test]
    fn rejected_setter_leaves_config_untouched() {
        let mut s = session();
        s.set_ticrate(70).unwrap();
        let before = s.config().clone();
        let err = s.set_ticrate(0).unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig(ConfigError::InvalidTicrate)));
        let err = s.set_button_max_value(Button::Attack, 1.0).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidConfig(ConfigError::UnknownButton { .. })
        ));
        assert_eq!(s.config(), &before);
    }

    #[test]
    fn missing_scenario_fails_init_before_launch() {
        let mut s = session();
        s.set_scenario_path("/nonexistent/scenario.wad").unwrap();
        let err = s.init().unwrap_err();
        assert!(matches!(err, SessionError::ConfigurationMissing { .. }));
        assert_eq!(s.state_kind(), LifecycleState::Uninitialized);
    }

    #[test]
    fn failed_launch_returns_to_uninitialized() {
        let mut s = session();
        let err = s.init().unwrap_err();
        assert!(matches!(err, SessionError::Channel(ChannelError::Open { .. })));
        assert_eq!(s.state_kind(), LifecycleState::Uninitialized);
        assert_eq!(s.seed(), None);
        // Still configurable.
        s.set_doom_skill(5).unwrap();
    }

    #[test]
    fn stepping_before_init_is_invalid_state() {
        let mut s = session();
        let err = s.advance_action(1, true).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                operation: "advance_action",
                state: LifecycleState::Uninitialized
            }
        ));
        assert!(s.server_state().unwrap().is_none());
        assert_eq!(s.player_count(), None);
    }

    #[test]
    fn close_is_idempotent_and_terminal() {
        let mut s = session();
        s.close();
        s.close();
        assert_eq!(s.state_kind(), LifecycleState::Closed);
        let err = s.init().unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                operation: "init",
                state: LifecycleState::Closed
            }
        ));
        let err = s.set_mode(Mode::Spectator).unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
    }
}
