//! Observation and server-state value types.
//!
//! A [`GameState`] borrows its pixel and audio buffers straight from the
//! shared state buffer, so it cannot outlive the session borrow that
//! produced it: the next step needs `&mut` access to the session, and the
//! borrow checker refuses it while a state is alive. Callers that need to
//! keep a state across steps copy it with [`GameState::to_owned_state`].

use crate::id::{PlayerIndex, StateNumber, Tic};

/// An optional observation section, fixed at configuration time.
///
/// A section configured off is `Disabled` in every state of the session;
/// there is no "enabled but missing" case.
#[derive(Clone, Debug, PartialEq)]
pub enum BufferSlot<T> {
    /// The section is not part of this session's layout.
    Disabled,
    /// The section's contents.
    Enabled(T),
}

impl<T> BufferSlot<T> {
    /// Whether the section is configured on.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    /// Borrow the contents, if enabled.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Enabled(v) => Some(v),
            Self::Disabled => None,
        }
    }

    /// Map the contents, preserving `Disabled`.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BufferSlot<U> {
        match self {
            Self::Enabled(v) => BufferSlot::Enabled(f(v)),
            Self::Disabled => BufferSlot::Disabled,
        }
    }

    /// Borrowing view of the slot.
    pub fn as_ref(&self) -> BufferSlot<&T> {
        match self {
            Self::Enabled(v) => BufferSlot::Enabled(v),
            Self::Disabled => BufferSlot::Disabled,
        }
    }

    /// Build a slot from a configuration flag and a lazily produced value.
    pub fn when(enabled: bool, f: impl FnOnce() -> T) -> Self {
        if enabled {
            Self::Enabled(f())
        } else {
            Self::Disabled
        }
    }
}

/// Dimensions of the screen-shaped buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenShape {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per pixel of the screen and automap buffers.
    pub channels: u32,
}

/// An object visible in the labels buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    /// Value of this object's pixels in the labels buffer.
    pub value: u8,
    /// Bounding box left edge.
    pub x: u32,
    /// Bounding box top edge.
    pub y: u32,
    /// Bounding box width.
    pub width: u32,
    /// Bounding box height.
    pub height: u32,
    /// Engine id of the labelled object.
    pub object_id: u64,
    /// Class name of the labelled object.
    pub object_name: String,
    /// Object position `[x, y, z]`.
    pub object_position: [f64; 3],
    /// Object facing angle in degrees.
    pub object_angle: f64,
}

/// A live object in the level.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    /// Engine id.
    pub id: u64,
    /// Class name.
    pub name: String,
    /// Position `[x, y, z]`.
    pub position: [f64; 3],
    /// Angle, pitch and roll in degrees.
    pub orientation: [f64; 3],
    /// Velocity `[x, y, z]`.
    pub velocity: [f64; 3],
}

/// A wall segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    /// Start point.
    pub start: [f64; 2],
    /// End point.
    pub end: [f64; 2],
    /// Whether the line blocks movement.
    pub is_blocking: bool,
}

/// A sector with its bounding lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    /// Floor height.
    pub floor_height: f64,
    /// Ceiling height.
    pub ceiling_height: f64,
    /// Lines bounding the sector.
    pub lines: Vec<Line>,
}

/// One published observation, borrowing its buffers from the session.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState<'a> {
    /// Publication number of this state.
    pub number: StateNumber,
    /// Engine tic the state describes.
    pub tic: Tic,
    /// Tics since the episode started.
    pub episode_tic: u64,
    /// Screen and automap dimensions.
    pub shape: ScreenShape,
    /// Screen pixels, `width * height * channels` bytes.
    pub screen: &'a [u8],
    /// Depth, one byte per pixel.
    pub depth: BufferSlot<&'a [u8]>,
    /// Object labels, one byte per pixel.
    pub labels_buffer: BufferSlot<&'a [u8]>,
    /// Automap pixels in the screen format.
    pub automap: BufferSlot<&'a [u8]>,
    /// Interleaved stereo samples, little-endian `i16`.
    pub audio: BufferSlot<&'a [u8]>,
    /// Configured game variables in configuration order; `Disabled` when
    /// none are configured.
    pub game_variables: BufferSlot<Vec<f64>>,
    /// Console notifications since the previous state.
    pub notifications: BufferSlot<String>,
    /// Objects visible in the labels buffer.
    pub labels: BufferSlot<Vec<Label>>,
    /// Every live object in the level.
    pub objects: BufferSlot<Vec<Object>>,
    /// Level geometry.
    pub sectors: BufferSlot<Vec<Sector>>,
}

impl GameState<'_> {
    /// Decode the audio buffer into samples.
    pub fn audio_samples(&self) -> BufferSlot<Vec<i16>> {
        self.audio.as_ref().map(|bytes| decode_samples(bytes))
    }

    /// Copy every buffer so the state can outlive the session borrow.
    pub fn to_owned_state(&self) -> OwnedGameState {
        OwnedGameState {
            number: self.number,
            tic: self.tic,
            episode_tic: self.episode_tic,
            shape: self.shape,
            screen: self.screen.to_vec(),
            depth: self.depth.as_ref().map(|b| b.to_vec()),
            labels_buffer: self.labels_buffer.as_ref().map(|b| b.to_vec()),
            automap: self.automap.as_ref().map(|b| b.to_vec()),
            audio: self.audio_samples(),
            game_variables: self.game_variables.clone(),
            notifications: self.notifications.clone(),
            labels: self.labels.clone(),
            objects: self.objects.clone(),
            sectors: self.sectors.clone(),
        }
    }
}

/// A [`GameState`] with owned buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedGameState {
    /// Publication number of this state.
    pub number: StateNumber,
    /// Engine tic the state describes.
    pub tic: Tic,
    /// Tics since the episode started.
    pub episode_tic: u64,
    /// Screen and automap dimensions.
    pub shape: ScreenShape,
    /// Screen pixels.
    pub screen: Vec<u8>,
    /// Depth buffer.
    pub depth: BufferSlot<Vec<u8>>,
    /// Labels buffer.
    pub labels_buffer: BufferSlot<Vec<u8>>,
    /// Automap buffer.
    pub automap: BufferSlot<Vec<u8>>,
    /// Interleaved stereo samples.
    pub audio: BufferSlot<Vec<i16>>,
    /// Configured game variables.
    pub game_variables: BufferSlot<Vec<f64>>,
    /// Console notifications.
    pub notifications: BufferSlot<String>,
    /// Label list.
    pub labels: BufferSlot<Vec<Label>>,
    /// Object list.
    pub objects: BufferSlot<Vec<Object>>,
    /// Sector list.
    pub sectors: BufferSlot<Vec<Sector>>,
}

fn decode_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// One player's entry in the [`ServerState`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerInfo {
    /// Player slot.
    pub index: PlayerIndex,
    /// Whether the slot is occupied.
    pub in_game: bool,
    /// Whether the engine considers the player idle.
    pub afk: bool,
    /// Frags scored.
    pub frag_count: i32,
    /// Player name.
    pub name: String,
    /// Tic of the player's last non-idle action.
    pub last_action_tic: Tic,
    /// Tic of the player's last kill.
    pub last_kill_tic: Tic,
}

/// Snapshot of multiplayer session attributes, as derived by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerState {
    /// Host tic.
    pub tic: Tic,
    /// Players currently in the game.
    pub player_count: u8,
    /// One entry per slot in the game (occupied or not).
    pub players: Vec<PlayerInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_map_preserves_disabled() {
        let slot: BufferSlot<u8> = BufferSlot::Disabled;
        assert_eq!(slot.map(|v| v as u32), BufferSlot::Disabled);
        assert_eq!(BufferSlot::Enabled(2u8).map(|v| v as u32 * 2).get(), Some(&4));
    }

    #[test]
    fn audio_decodes_little_endian() {
        let bytes = [0x01, 0x00, 0xFF, 0xFF];
        let state = GameState {
            number: StateNumber(1),
            tic: Tic(1),
            episode_tic: 1,
            shape: ScreenShape {
                width: 1,
                height: 1,
                channels: 1,
            },
            screen: &[0],
            depth: BufferSlot::Disabled,
            labels_buffer: BufferSlot::Disabled,
            automap: BufferSlot::Disabled,
            audio: BufferSlot::Enabled(&bytes),
            game_variables: BufferSlot::Disabled,
            notifications: BufferSlot::Disabled,
            labels: BufferSlot::Disabled,
            objects: BufferSlot::Disabled,
            sectors: BufferSlot::Disabled,
        };
        assert_eq!(state.audio_samples(), BufferSlot::Enabled(vec![1, -1]));
        let owned = state.to_owned_state();
        assert_eq!(owned.audio, BufferSlot::Enabled(vec![1, -1]));
        assert_eq!(owned.screen, vec![0]);
    }
}
