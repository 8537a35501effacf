//! Compiled session configuration and its validation.
//!
//! [`GameConfig`] is what the scenario/config loader hands over: a fully
//! resolved description of buttons, variables, buffers, timing and
//! multiplayer role. The engine consumes it verbatim at init time. Nothing
//! here parses configuration files.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};

use crate::button::Button;
use crate::variable::{GameVariable, MAX_PLAYERS};

/// Default engine tic rate (tics per second).
pub const DEFAULT_TICRATE: u32 = 35;

/// Largest accepted screen dimension in pixels.
pub const MAX_SCREEN_DIMENSION: u32 = 4096;

// ── Mode ───────────────────────────────────────────────────────────

/// How the engine paces tics and whose input drives the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Engine waits for the controller each step; controller actions apply.
    #[default]
    Player,
    /// Engine waits for the controller; a human drives the player and the
    /// controller only observes.
    Spectator,
    /// Engine runs in real time at the tic rate; controller actions apply.
    AsyncPlayer,
    /// Engine runs in real time; a human drives the player.
    AsyncSpectator,
}

impl Mode {
    /// Whether the engine paces tics against wall-clock time.
    pub fn is_async(self) -> bool {
        matches!(self, Self::AsyncPlayer | Self::AsyncSpectator)
    }

    /// Whether controller-submitted actions are ignored by the engine.
    pub fn is_spectator(self) -> bool {
        matches!(self, Self::Spectator | Self::AsyncSpectator)
    }

    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::Player => 0,
            Self::Spectator => 1,
            Self::AsyncPlayer => 2,
            Self::AsyncSpectator => 3,
        }
    }

    /// Decode a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Player),
            1 => Some(Self::Spectator),
            2 => Some(Self::AsyncPlayer),
            3 => Some(Self::AsyncSpectator),
            _ => None,
        }
    }
}

// ── Screen ─────────────────────────────────────────────────────────

/// Pixel format of the screen and automap buffers.
///
/// Only the channel count matters to the controller; the byte order within
/// a pixel is the rendering collaborator's concern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ScreenFormat {
    /// Planar red, green, blue.
    #[default]
    Crcgcb,
    Rgb24,
    Rgba32,
    Argb32,
    /// Planar blue, green, red.
    Cbcgcr,
    Bgr24,
    Bgra32,
    Abgr32,
    Gray8,
    /// Raw engine palette indices.
    DoomBuffer8,
}

impl ScreenFormat {
    const ALL: [ScreenFormat; 10] = [
        Self::Crcgcb,
        Self::Rgb24,
        Self::Rgba32,
        Self::Argb32,
        Self::Cbcgcr,
        Self::Bgr24,
        Self::Bgra32,
        Self::Abgr32,
        Self::Gray8,
        Self::DoomBuffer8,
    ];

    /// Bytes per pixel.
    pub fn channels(self) -> u32 {
        match self {
            Self::Crcgcb | Self::Rgb24 | Self::Cbcgcr | Self::Bgr24 => 3,
            Self::Rgba32 | Self::Argb32 | Self::Bgra32 | Self::Abgr32 => 4,
            Self::Gray8 | Self::DoomBuffer8 => 1,
        }
    }

    /// Wire code.
    pub fn code(self) -> u8 {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0) as u8
    }

    /// Decode a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// Screen size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Construct a resolution.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixels per frame.
    pub fn pixels(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(320, 240)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ── Buffers ────────────────────────────────────────────────────────

/// Which optional observation sections the engine publishes.
///
/// The screen buffer and game variables are always present. Every flag
/// here changes the shared buffer layout, so they are fixed at init.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferToggles {
    /// Per-pixel depth.
    pub depth: bool,
    /// Per-pixel object labels plus the label list.
    pub labels: bool,
    /// Top-down map rendering.
    pub automap: bool,
    /// Audio samples covering the last `audio.buffer_tics` tics.
    pub audio: bool,
    /// Object list with positions and velocities.
    pub objects_info: bool,
    /// Sector and line geometry.
    pub sectors_info: bool,
    /// Console notification text.
    pub notifications: bool,
}

impl BufferToggles {
    /// Pack the flags into a bit set (wire and fingerprint encoding).
    pub fn bits(self) -> u8 {
        (self.depth as u8)
            | (self.labels as u8) << 1
            | (self.automap as u8) << 2
            | (self.audio as u8) << 3
            | (self.objects_info as u8) << 4
            | (self.sectors_info as u8) << 5
            | (self.notifications as u8) << 6
    }

    /// Unpack a bit set produced by [`bits`](Self::bits).
    pub fn from_bits(bits: u8) -> Self {
        Self {
            depth: bits & 1 != 0,
            labels: bits & 1 << 1 != 0,
            automap: bits & 1 << 2 != 0,
            audio: bits & 1 << 3 != 0,
            objects_info: bits & 1 << 4 != 0,
            sectors_info: bits & 1 << 5 != 0,
            notifications: bits & 1 << 6 != 0,
        }
    }
}

/// Audio sampling rates the engine supports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SamplingRate {
    /// 11025 Hz.
    Hz11025,
    /// 22050 Hz.
    Hz22050,
    /// 44100 Hz.
    #[default]
    Hz44100,
}

impl SamplingRate {
    /// Samples per second.
    pub fn hz(self) -> u32 {
        match self {
            Self::Hz11025 => 11025,
            Self::Hz22050 => 22050,
            Self::Hz44100 => 44100,
        }
    }

    /// Parse a rate in Hz.
    pub fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            11025 => Some(Self::Hz11025),
            22050 => Some(Self::Hz22050),
            44100 => Some(Self::Hz44100),
            _ => None,
        }
    }
}

/// Audio capture parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AudioConfig {
    /// Sampling rate.
    pub sampling_rate: SamplingRate,
    /// How many tics of audio each observation carries. Default: 4.
    pub buffer_tics: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sampling_rate: SamplingRate::default(),
            buffer_tics: 4,
        }
    }
}

// ── Multiplayer ────────────────────────────────────────────────────

/// This session's role in a multiplayer game.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MultiplayerRole {
    /// Single-player game.
    #[default]
    Solo,
    /// Authoritative host: owns the tic clock and waits for `players`
    /// participants (itself included) before reporting ready.
    Host {
        /// Total participants, host included.
        players: u8,
        /// Port the host engine listens on.
        port: u16,
    },
    /// Participant joining a host's engine.
    Client {
        /// Host address.
        address: String,
        /// Host port.
        port: u16,
    },
}

impl MultiplayerRole {
    /// Whether this role takes part in a multiplayer game.
    pub fn is_multiplayer(&self) -> bool {
        !matches!(self, Self::Solo)
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`GameConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Width or height is zero or above [`MAX_SCREEN_DIMENSION`].
    InvalidResolution {
        /// The rejected resolution.
        resolution: Resolution,
    },
    /// Tic rate is zero.
    InvalidTicrate,
    /// Skill level outside `1..=5`.
    InvalidSkill {
        /// The rejected level.
        skill: u8,
    },
    /// A button maximum is negative or not finite.
    InvalidButtonMax {
        /// The button.
        button: Button,
        /// The rejected maximum.
        value: f64,
    },
    /// A per-button setting names a button that is not available.
    UnknownButton {
        /// The button.
        button: Button,
    },
    /// An indexed game variable is out of range.
    InvalidVariable {
        /// The rejected variable.
        variable: GameVariable,
    },
    /// Living reward or death penalty is not finite.
    InvalidReward {
        /// Which reward setting.
        which: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// Audio buffer length is zero or longer than a second of tics.
    InvalidAudioBuffer {
        /// The rejected length in tics.
        tics: u32,
    },
    /// Host player count outside `1..=16`.
    InvalidPlayerCount {
        /// The rejected count.
        players: u8,
    },
    /// Client role without a host address.
    MissingHostAddress,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidResolution { resolution } => write!(
                f,
                "resolution {resolution} must be non-zero and at most {MAX_SCREEN_DIMENSION} per side"
            ),
            Self::InvalidTicrate => write!(f, "ticrate must be at least 1"),
            Self::InvalidSkill { skill } => write!(f, "skill {skill} outside 1..=5"),
            Self::InvalidButtonMax { button, value } => {
                write!(f, "max value {value} for {button} must be finite and >= 0")
            }
            Self::UnknownButton { button } => {
                write!(f, "{button} is not among the available buttons")
            }
            Self::InvalidVariable { variable } => {
                write!(f, "game variable {variable} index out of range")
            }
            Self::InvalidReward { which, value } => {
                write!(f, "{which} must be finite, got {value}")
            }
            Self::InvalidAudioBuffer { tics } => {
                write!(f, "audio buffer of {tics} tics outside 1..=ticrate")
            }
            Self::InvalidPlayerCount { players } => {
                write!(f, "player count {players} outside 1..={MAX_PLAYERS}")
            }
            Self::MissingHostAddress => write!(f, "client role requires a host address"),
        }
    }
}

impl Error for ConfigError {}

// ── GameConfig ─────────────────────────────────────────────────────

/// Complete compiled configuration for one engine session.
///
/// Built by the caller (or a config loader), adjusted through the
/// session's setters while uninitialized, and sent to the engine verbatim
/// at init. `validate()` checks every structural invariant.
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    /// Resolved scenario file. Must exist at init when set.
    pub scenario_path: Option<PathBuf>,
    /// Available buttons in action-vector order, each with its maximum
    /// magnitude (`0.0` = unbounded; only meaningful for delta buttons).
    pub buttons: IndexMap<Button, f64>,
    /// Game variables in observation order.
    pub variables: IndexSet<GameVariable>,
    /// Screen pixel format.
    pub screen_format: ScreenFormat,
    /// Screen size.
    pub resolution: Resolution,
    /// Optional observation sections.
    pub buffers: BufferToggles,
    /// Audio capture parameters (used only when `buffers.audio`).
    pub audio: AudioConfig,
    /// Pacing and input ownership.
    pub mode: Mode,
    /// Tics per second. Default: 35.
    pub ticrate: u32,
    /// Episode length in tics; `None` runs until a scenario terminal.
    pub episode_timeout: Option<u64>,
    /// Tics the engine runs on its own at the start of every episode.
    pub episode_start_time: u64,
    /// Reward added for every tic advanced.
    pub living_reward: f64,
    /// Penalty subtracted once when the player dies.
    pub death_penalty: f64,
    /// Difficulty `1..=5`. Default: 3.
    pub skill: u8,
    /// Session seed; `None` picks a random seed at init.
    pub seed: Option<u64>,
    /// Multiplayer role.
    pub multiplayer: MultiplayerRole,
    /// Extra engine command-line arguments, passed through untouched.
    pub game_args: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            scenario_path: None,
            buttons: IndexMap::new(),
            variables: IndexSet::new(),
            screen_format: ScreenFormat::default(),
            resolution: Resolution::default(),
            buffers: BufferToggles::default(),
            audio: AudioConfig::default(),
            mode: Mode::default(),
            ticrate: DEFAULT_TICRATE,
            episode_timeout: None,
            episode_start_time: 0,
            living_reward: 0.0,
            death_penalty: 0.0,
            skill: 3,
            seed: None,
            multiplayer: MultiplayerRole::default(),
            game_args: Vec::new(),
        }
    }
}

impl GameConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = self.resolution;
        if r.width == 0
            || r.height == 0
            || r.width > MAX_SCREEN_DIMENSION
            || r.height > MAX_SCREEN_DIMENSION
        {
            return Err(ConfigError::InvalidResolution { resolution: r });
        }
        if self.ticrate == 0 {
            return Err(ConfigError::InvalidTicrate);
        }
        if !(1..=5).contains(&self.skill) {
            return Err(ConfigError::InvalidSkill { skill: self.skill });
        }
        for (&button, &value) in &self.buttons {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidButtonMax { button, value });
            }
        }
        if let Some(&variable) = self.variables.iter().find(|v| !v.is_valid()) {
            return Err(ConfigError::InvalidVariable { variable });
        }
        if !self.living_reward.is_finite() {
            return Err(ConfigError::InvalidReward {
                which: "living reward",
                value: self.living_reward,
            });
        }
        if !self.death_penalty.is_finite() {
            return Err(ConfigError::InvalidReward {
                which: "death penalty",
                value: self.death_penalty,
            });
        }
        if self.buffers.audio
            && (self.audio.buffer_tics == 0 || self.audio.buffer_tics > self.ticrate)
        {
            return Err(ConfigError::InvalidAudioBuffer {
                tics: self.audio.buffer_tics,
            });
        }
        match &self.multiplayer {
            MultiplayerRole::Solo => {}
            MultiplayerRole::Host { players, .. } => {
                if !(1..=MAX_PLAYERS).contains(players) {
                    return Err(ConfigError::InvalidPlayerCount { players: *players });
                }
            }
            MultiplayerRole::Client { address, .. } => {
                if address.trim().is_empty() {
                    return Err(ConfigError::MissingHostAddress);
                }
            }
        }
        Ok(())
    }

    /// Number of audio samples per channel carried by one observation.
    pub fn audio_samples_per_channel(&self) -> u64 {
        let per_tic = self.audio.sampling_rate.hz() as u64 / self.ticrate.max(1) as u64;
        per_tic * self.audio.buffer_tics as u64
    }
}
