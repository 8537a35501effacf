//! Shared state buffer layout.
//!
//! The region is one contiguous block: a 64-byte header followed by
//! 64-byte-aligned sections. Which sections exist, and how large they
//! are, is a pure function of the [`GameConfig`]; both sides compute the
//! same [`BufferLayout`] and the header carries its fingerprint so a
//! disagreement is caught at attach time.
//!
//! ```text
//! [header 64B] [screen] [depth?] [labels?] [automap?] [audio?]
//! [variables] [last action] [notifications?] [label list?]
//! [object list?] [sector list?] [line list?] [server state?]
//! ```
//!
//! List sections start with a `u32` record count followed by fixed-size
//! records. Names are stored in fixed [`NAME_LEN`]-byte fields, zero
//! padded.

use ticlink_core::{Fnv1a, GameConfig, ScreenShape, MAX_PLAYERS};

/// Magic bytes at the start of the region.
pub const MAGIC: [u8; 4] = *b"TLSB";

/// Layout revision. Bumped on any incompatible change.
pub const LAYOUT_VERSION: u32 = 1;

/// Size of the region header.
pub const HEADER_SIZE: usize = 64;

/// Alignment of every section.
pub const SECTION_ALIGN: usize = 64;

/// Capacity of the label list.
pub const MAX_LABELS: usize = 256;
/// Capacity of the object list.
pub const MAX_OBJECTS: usize = 512;
/// Capacity of the sector list.
pub const MAX_SECTORS: usize = 512;
/// Capacity of the line list.
pub const MAX_LINES: usize = 2048;
/// Capacity of the notifications text in bytes.
pub const NOTIFICATIONS_CAPACITY: usize = 4096;
/// Fixed width of stored names.
pub const NAME_LEN: usize = 32;

/// value, x, y, width, height, object id, name, position, angle.
pub const LABEL_RECORD: usize = 1 + 4 * 4 + 8 + NAME_LEN + 4 * 8;
/// id, name, position, orientation, velocity.
pub const OBJECT_RECORD: usize = 8 + NAME_LEN + 9 * 8;
/// floor and ceiling height.
pub const SECTOR_RECORD: usize = 2 * 8;
/// owning sector, start, end, blocking flag.
pub const LINE_RECORD: usize = 4 + 4 * 8 + 1;
/// in game, afk, frags, name, last action tic, last kill tic.
pub const PLAYER_RECORD: usize = 1 + 1 + 4 + NAME_LEN + 8 + 8;
/// tic, players in game, slot count.
pub const SERVER_HEADER: usize = 8 + 1 + 1;

/// Byte offsets of the header fields.
pub mod header {
    /// `[u8; 4]` magic.
    pub const MAGIC: usize = 0;
    /// `u32` layout version.
    pub const VERSION: usize = 4;
    /// `u64` layout fingerprint.
    pub const FINGERPRINT: usize = 8;
    /// `u64` total region size.
    pub const TOTAL_SIZE: usize = 16;
    /// `u32` non-zero once the engine has attached.
    pub const READY: usize = 24;
    /// `u32` status flags.
    pub const FLAGS: usize = 28;
    /// `u64` published state number, written last.
    pub const STATE_NUMBER: usize = 32;
    /// `u64` engine tic.
    pub const TIC: usize = 40;
    /// `u64` episode tic.
    pub const EPISODE_TIC: usize = 48;

    /// Flag bit: the player is dead.
    pub const FLAG_DEAD: u32 = 1;
    /// Flag bit: the episode has finished.
    pub const FLAG_FINISHED: u32 = 1 << 1;
}

/// A byte range within the region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Section {
    /// Offset from the start of the region.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Section {
    /// One past the last byte.
    pub fn end(self) -> usize {
        self.offset + self.len
    }
}

/// Every section's position, derived from a configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferLayout {
    /// Screen-shaped buffer dimensions.
    pub shape: ScreenShape,
    /// Screen pixels.
    pub screen: Section,
    /// Depth buffer.
    pub depth: Option<Section>,
    /// Labels buffer.
    pub labels_buffer: Option<Section>,
    /// Automap buffer.
    pub automap: Option<Section>,
    /// Interleaved stereo `i16` audio.
    pub audio: Option<Section>,
    /// Game variables as `f64`.
    pub variables: Section,
    /// Number of configured game variables.
    pub variable_count: usize,
    /// Last applied action as `f64`.
    pub last_action: Section,
    /// Number of configured buttons.
    pub button_count: usize,
    /// `u32` length plus notification text.
    pub notifications: Option<Section>,
    /// Label records.
    pub label_list: Option<Section>,
    /// Object records.
    pub object_list: Option<Section>,
    /// Sector records.
    pub sector_list: Option<Section>,
    /// Line records.
    pub line_list: Option<Section>,
    /// Server state: header then one record per slot.
    pub server: Option<Section>,
    /// Total region size.
    pub total_size: usize,
}

/// Sequential section allocator.
struct Cursor {
    next: usize,
}

impl Cursor {
    fn take(&mut self, len: usize) -> Section {
        let section = Section {
            offset: self.next,
            len,
        };
        self.next = align_up(self.next + len);
        section
    }

    fn take_if(&mut self, enabled: bool, len: usize) -> Option<Section> {
        enabled.then(|| self.take(len))
    }
}

fn align_up(n: usize) -> usize {
    n.div_ceil(SECTION_ALIGN) * SECTION_ALIGN
}

fn list_len(capacity: usize, record: usize) -> usize {
    4 + capacity * record
}

impl BufferLayout {
    /// Compute the layout for `config`.
    pub fn for_config(config: &GameConfig) -> Self {
        let shape = ScreenShape {
            width: config.resolution.width,
            height: config.resolution.height,
            channels: config.screen_format.channels(),
        };
        let pixels = config.resolution.pixels() as usize;
        let color = pixels * shape.channels as usize;
        let buffers = config.buffers;
        let variable_count = config.variables.len();
        let button_count = config.buttons.len();

        let mut cursor = Cursor { next: HEADER_SIZE };
        let screen = cursor.take(color);
        let depth = cursor.take_if(buffers.depth, pixels);
        let labels_buffer = cursor.take_if(buffers.labels, pixels);
        let automap = cursor.take_if(buffers.automap, color);
        let audio_bytes = config.audio_samples_per_channel() as usize * 2 * 2;
        let audio = cursor.take_if(buffers.audio, audio_bytes);
        let variables = cursor.take(variable_count * 8);
        let last_action = cursor.take(button_count * 8);
        let notifications = cursor.take_if(buffers.notifications, 4 + NOTIFICATIONS_CAPACITY);
        let label_list = cursor.take_if(buffers.labels, list_len(MAX_LABELS, LABEL_RECORD));
        let object_list = cursor.take_if(buffers.objects_info, list_len(MAX_OBJECTS, OBJECT_RECORD));
        let sector_list = cursor.take_if(buffers.sectors_info, list_len(MAX_SECTORS, SECTOR_RECORD));
        let line_list = cursor.take_if(buffers.sectors_info, list_len(MAX_LINES, LINE_RECORD));
        let server = cursor.take_if(
            config.multiplayer.is_multiplayer(),
            SERVER_HEADER + MAX_PLAYERS as usize * PLAYER_RECORD,
        );

        Self {
            shape,
            screen,
            depth,
            labels_buffer,
            automap,
            audio,
            variables,
            variable_count,
            last_action,
            button_count,
            notifications,
            label_list,
            object_list,
            sector_list,
            line_list,
            server,
            total_size: cursor.next,
        }
    }

    /// Fingerprint of every section position, written into the header.
    pub fn fingerprint(&self) -> u64 {
        let sections = [
            Some(self.screen),
            self.depth,
            self.labels_buffer,
            self.automap,
            self.audio,
            Some(self.variables),
            Some(self.last_action),
            self.notifications,
            self.label_list,
            self.object_list,
            self.sector_list,
            self.line_list,
            self.server,
        ];
        let mut h = Fnv1a::new()
            .u32(LAYOUT_VERSION)
            .u32(self.shape.width)
            .u32(self.shape.height)
            .u32(self.shape.channels);
        for section in sections {
            h = match section {
                Some(s) => h.u8(1).u64(s.offset as u64).u64(s.len as u64),
                None => h.u8(0),
            };
        }
        h.u64(self.total_size as u64).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticlink_core::{Button, GameVariable, MultiplayerRole, Resolution, ScreenFormat};

    #[test]
    fn sections_are_aligned_and_disjoint() {
        let mut config = GameConfig {
            resolution: Resolution::new(160, 120),
            ..Default::default()
        };
        config.buffers.depth = true;
        config.buffers.labels = true;
        config.buffers.audio = true;
        config.buffers.sectors_info = true;
        config.variables.insert(GameVariable::Health);
        config.buttons.insert(Button::Attack, 0.0);
        let layout = BufferLayout::for_config(&config);

        let mut sections: Vec<Section> = [
            Some(layout.screen),
            layout.depth,
            layout.labels_buffer,
            layout.audio,
            Some(layout.variables),
            Some(layout.last_action),
            layout.label_list,
            layout.sector_list,
            layout.line_list,
        ]
        .into_iter()
        .flatten()
        .collect();
        sections.sort_by_key(|s| s.offset);
        assert!(sections[0].offset >= HEADER_SIZE);
        for pair in sections.windows(2) {
            assert_eq!(pair[0].offset % SECTION_ALIGN, 0);
            assert!(pair[0].end() <= pair[1].offset);
        }
        assert!(sections.last().unwrap().end() <= layout.total_size);
        assert_eq!(layout.screen.len, 160 * 120 * 3);
        assert!(layout.automap.is_none());
        assert!(layout.server.is_none());
    }

    #[test]
    fn fingerprint_tracks_layout() {
        let base = GameConfig::default();
        let gray = GameConfig {
            screen_format: ScreenFormat::Gray8,
            ..Default::default()
        };
        let host = GameConfig {
            multiplayer: MultiplayerRole::Host {
                players: 2,
                port: 5029,
            },
            ..Default::default()
        };
        let a = BufferLayout::for_config(&base).fingerprint();
        assert_eq!(a, BufferLayout::for_config(&base.clone()).fingerprint());
        assert_ne!(a, BufferLayout::for_config(&gray).fingerprint());
        assert_ne!(a, BufferLayout::for_config(&host).fingerprint());
    }

    #[test]
    fn audio_section_holds_stereo_samples() {
        let mut config = GameConfig::default();
        config.buffers.audio = true;
        let layout = BufferLayout::for_config(&config);
        let samples = config.audio_samples_per_channel() as usize;
        assert_eq!(layout.audio.unwrap().len, samples * 4);
    }
}
