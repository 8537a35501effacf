//! Memory-mapped shared state buffer.
//!
//! The controller creates the backing file and writes the header; the
//! engine opens it, validates the header against its own layout, and marks
//! it ready. After that the engine writes observation sections and
//! publishes a state number; the controller only reads. Writes happen only
//! while the engine is handling a command, so a state number that matches
//! the acknowledgment means the sections are consistent.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use memmap2::MmapMut;
use ticlink_core::{
    BufferSlot, GameState, Label, Line, Object, PlayerIndex, PlayerInfo, Sector,
    ServerState, SharedBufferError, StateNumber, Tic, MAX_PLAYERS,
};

use crate::layout::{
    header, BufferLayout, Section, LABEL_RECORD, LAYOUT_VERSION, LINE_RECORD, MAGIC, MAX_LABELS,
    MAX_LINES, MAX_OBJECTS, MAX_SECTORS, NAME_LEN, NOTIFICATIONS_CAPACITY, OBJECT_RECORD,
    SECTOR_RECORD,
};

/// Header fields describing the published state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionStatus {
    /// Published state number.
    pub state_number: StateNumber,
    /// Engine tic.
    pub tic: Tic,
    /// Tics since the episode started.
    pub episode_tic: u64,
    /// Whether the player is dead.
    pub dead: bool,
    /// Whether the episode has finished.
    pub finished: bool,
}

/// Directory for backing files: `/dev/shm` when available, the system
/// temporary directory otherwise.
pub fn default_region_dir() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

/// A backing file name unique to this process and call.
pub fn unique_region_path(dir: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    dir.join(format!("ticlink-{}-{n}-{nanos:08x}", std::process::id()))
}

#[allow(unsafe_code)]
fn map_file(file: &File, path: &Path) -> Result<MmapMut, SharedBufferError> {
    // SAFETY: the file is private to one controller and one engine. Only the
    // engine writes section data, and only while the controller is blocked
    // waiting for the acknowledgment of the command that caused the write.
    unsafe { MmapMut::map_mut(file) }.map_err(|source| SharedBufferError::Map {
        path: path.display().to_string(),
        source,
    })
}

/// A mapped shared state buffer.
pub struct SharedRegion {
    path: PathBuf,
    map: MmapMut,
    layout: BufferLayout,
    owner: bool,
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("path", &self.path)
            .field("size", &self.layout.total_size)
            .field("owner", &self.owner)
            .finish()
    }
}

impl SharedRegion {
    /// Create, size and map a new backing file (controller side).
    ///
    /// The file is removed again when the region is dropped.
    pub fn create(path: &Path, layout: BufferLayout) -> Result<Self, SharedBufferError> {
        let allocate = |source: io::Error| SharedBufferError::Allocate {
            path: path.display().to_string(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(allocate)?;
        if let Err(e) = file.set_len(layout.total_size as u64) {
            let _ = std::fs::remove_file(path);
            return Err(allocate(e));
        }
        let map = match map_file(&file, path) {
            Ok(map) => map,
            Err(e) => {
                let _ = std::fs::remove_file(path);
                return Err(e);
            }
        };
        let mut region = Self {
            path: path.to_path_buf(),
            map,
            layout,
            owner: true,
        };
        let fingerprint = region.layout.fingerprint();
        let total = region.layout.total_size as u64;
        let bytes = &mut region.map[..];
        bytes[header::MAGIC..header::MAGIC + 4].copy_from_slice(&MAGIC);
        put_u32(bytes, header::VERSION, LAYOUT_VERSION);
        put_u64(bytes, header::FINGERPRINT, fingerprint);
        put_u64(bytes, header::TOTAL_SIZE, total);
        tracing::debug!(path = %path.display(), size = total, "shared buffer created");
        Ok(region)
    }

    /// Map an existing backing file and check its header (engine side).
    pub fn open(path: &Path, layout: BufferLayout) -> Result<Self, SharedBufferError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| SharedBufferError::Map {
                path: path.display().to_string(),
                source,
            })?;
        let len = file
            .metadata()
            .map_err(|source| SharedBufferError::Map {
                path: path.display().to_string(),
                source,
            })?
            .len();
        if len < layout.total_size as u64 {
            return Err(SharedBufferError::LayoutMismatch {
                detail: format!(
                    "backing file is {len} bytes, layout needs {}",
                    layout.total_size
                ),
            });
        }
        let map = map_file(&file, path)?;
        let region = Self {
            path: path.to_path_buf(),
            map,
            layout,
            owner: false,
        };
        region.validate(false)?;
        Ok(region)
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Section positions.
    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    /// Check the header against this side's layout. With `require_ready`,
    /// also require that the engine has attached.
    pub fn validate(&self, require_ready: bool) -> Result<(), SharedBufferError> {
        let bytes = &self.map[..];
        let mismatch = |detail: String| Err(SharedBufferError::LayoutMismatch { detail });
        if bytes.len() < self.layout.total_size {
            return mismatch(format!(
                "mapping is {} bytes, layout needs {}",
                bytes.len(),
                self.layout.total_size
            ));
        }
        if bytes[header::MAGIC..header::MAGIC + 4] != MAGIC {
            return mismatch("bad magic".into());
        }
        let version = get_u32(bytes, header::VERSION);
        if version != LAYOUT_VERSION {
            return mismatch(format!(
                "layout version {version}, expected {LAYOUT_VERSION}"
            ));
        }
        let fingerprint = get_u64(bytes, header::FINGERPRINT);
        let expected = self.layout.fingerprint();
        if fingerprint != expected {
            return mismatch(format!(
                "fingerprint {fingerprint:#018x}, expected {expected:#018x}"
            ));
        }
        let total = get_u64(bytes, header::TOTAL_SIZE);
        if total != self.layout.total_size as u64 {
            return mismatch(format!(
                "total size {total}, expected {}",
                self.layout.total_size
            ));
        }
        if require_ready && get_u32(bytes, header::READY) == 0 {
            return mismatch("engine never attached".into());
        }
        Ok(())
    }

    // ── Reader side ─────────────────────────────────────────────

    /// Header status fields.
    pub fn status(&self) -> RegionStatus {
        let bytes = &self.map[..];
        let flags = get_u32(bytes, header::FLAGS);
        RegionStatus {
            state_number: StateNumber(get_u64(bytes, header::STATE_NUMBER)),
            tic: Tic(get_u64(bytes, header::TIC)),
            episode_tic: get_u64(bytes, header::EPISODE_TIC),
            dead: flags & header::FLAG_DEAD != 0,
            finished: flags & header::FLAG_FINISHED != 0,
        }
    }

    /// Fail with [`SharedBufferError::Torn`] unless the published state
    /// number equals the acknowledged one.
    pub fn check_published(&self, expected: StateNumber) -> Result<(), SharedBufferError> {
        let found = self.status().state_number;
        if found == expected {
            Ok(())
        } else {
            Err(SharedBufferError::Torn {
                expected: expected.0,
                found: found.0,
            })
        }
    }

    /// View of the published state. Pixel and audio buffers borrow from the
    /// mapping.
    pub fn game_state(&self) -> GameState<'_> {
        let bytes = &self.map[..];
        let layout = &self.layout;
        let status = self.status();
        let slice = |s: Option<Section>| match s {
            Some(s) => BufferSlot::Enabled(&bytes[s.offset..s.end()]),
            None => BufferSlot::Disabled,
        };
        GameState {
            number: status.state_number,
            tic: status.tic,
            episode_tic: status.episode_tic,
            shape: layout.shape,
            screen: &bytes[layout.screen.offset..layout.screen.end()],
            depth: slice(layout.depth),
            labels_buffer: slice(layout.labels_buffer),
            automap: slice(layout.automap),
            audio: slice(layout.audio),
            game_variables: BufferSlot::when(layout.variable_count > 0, || {
                read_f64s(bytes, layout.variables, layout.variable_count)
            }),
            notifications: match layout.notifications {
                Some(s) => BufferSlot::Enabled(read_notifications(bytes, s)),
                None => BufferSlot::Disabled,
            },
            labels: match layout.label_list {
                Some(s) => BufferSlot::Enabled(read_labels(bytes, s)),
                None => BufferSlot::Disabled,
            },
            objects: match layout.object_list {
                Some(s) => BufferSlot::Enabled(read_objects(bytes, s)),
                None => BufferSlot::Disabled,
            },
            sectors: match (layout.sector_list, layout.line_list) {
                (Some(s), Some(l)) => BufferSlot::Enabled(read_sectors(bytes, s, l)),
                _ => BufferSlot::Disabled,
            },
        }
    }

    /// Multiplayer server state, if this layout carries one.
    pub fn server_state(&self) -> Option<ServerState> {
        let s = self.layout.server?;
        let mut r = Get::at(&self.map[..], s.offset);
        let tic = Tic(r.u64());
        let player_count = r.u8();
        let slots = r.u8().min(MAX_PLAYERS);
        let players = (0..slots)
            .map(|i| PlayerInfo {
                index: PlayerIndex(i),
                in_game: r.u8() != 0,
                afk: r.u8() != 0,
                frag_count: r.i32(),
                name: r.name(),
                last_action_tic: Tic(r.u64()),
                last_kill_tic: Tic(r.u64()),
            })
            .collect();
        Some(ServerState {
            tic,
            player_count,
            players,
        })
    }

    /// Action the engine last applied, one value per button.
    pub fn last_action(&self) -> Vec<f64> {
        read_f64s(&self.map[..], self.layout.last_action, self.layout.button_count)
    }

    // ── Writer side ─────────────────────────────────────────────

    /// Mark the region as attached.
    pub fn mark_ready(&mut self) {
        put_u32(&mut self.map[..], header::READY, 1);
    }

    /// Screen pixels for writing.
    pub fn screen_mut(&mut self) -> &mut [u8] {
        let s = self.layout.screen;
        &mut self.map[s.offset..s.end()]
    }

    /// Depth buffer for writing, if configured.
    pub fn depth_mut(&mut self) -> Option<&mut [u8]> {
        let s = self.layout.depth?;
        Some(&mut self.map[s.offset..s.end()])
    }

    /// Labels buffer for writing, if configured.
    pub fn labels_buffer_mut(&mut self) -> Option<&mut [u8]> {
        let s = self.layout.labels_buffer?;
        Some(&mut self.map[s.offset..s.end()])
    }

    /// Automap buffer for writing, if configured.
    pub fn automap_mut(&mut self) -> Option<&mut [u8]> {
        let s = self.layout.automap?;
        Some(&mut self.map[s.offset..s.end()])
    }

    /// Write interleaved stereo samples; extra samples are dropped and a
    /// short buffer leaves the tail silent.
    pub fn write_audio(&mut self, samples: &[i16]) {
        let Some(s) = self.layout.audio else { return };
        let out = &mut self.map[s.offset..s.end()];
        out.fill(0);
        for (chunk, v) in out.chunks_exact_mut(2).zip(samples) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
    }

    /// Write the game variables in configuration order.
    pub fn write_variables(&mut self, values: &[f64]) {
        let (s, n) = (self.layout.variables, self.layout.variable_count);
        write_f64s(&mut self.map[..], s, n, values);
    }

    /// Write the action applied on the last tic.
    pub fn write_last_action(&mut self, values: &[f64]) {
        let (s, n) = (self.layout.last_action, self.layout.button_count);
        write_f64s(&mut self.map[..], s, n, values);
    }

    /// Write the notification text, truncated to capacity.
    pub fn write_notifications(&mut self, text: &str) {
        let Some(s) = self.layout.notifications else { return };
        let text = truncate_utf8(text, NOTIFICATIONS_CAPACITY);
        let mut w = Put::at(&mut self.map[..], s.offset);
        w.u32(text.len() as u32);
        w.bytes(text.as_bytes());
    }

    /// Write the label list, truncated to capacity.
    pub fn write_labels(&mut self, labels: &[Label]) {
        let Some(s) = self.layout.label_list else { return };
        let labels = &labels[..labels.len().min(MAX_LABELS)];
        let mut w = Put::at(&mut self.map[..], s.offset);
        w.u32(labels.len() as u32);
        for label in labels {
            w.u8(label.value);
            w.u32(label.x);
            w.u32(label.y);
            w.u32(label.width);
            w.u32(label.height);
            w.u64(label.object_id);
            w.name(&label.object_name);
            w.f64s(&label.object_position);
            w.f64(label.object_angle);
        }
    }

    /// Write the object list, truncated to capacity.
    pub fn write_objects(&mut self, objects: &[Object]) {
        let Some(s) = self.layout.object_list else { return };
        let objects = &objects[..objects.len().min(MAX_OBJECTS)];
        let mut w = Put::at(&mut self.map[..], s.offset);
        w.u32(objects.len() as u32);
        for object in objects {
            w.u64(object.id);
            w.name(&object.name);
            w.f64s(&object.position);
            w.f64s(&object.orientation);
            w.f64s(&object.velocity);
        }
    }

    /// Write sectors and their lines, truncated to capacity.
    pub fn write_sectors(&mut self, sectors: &[Sector]) {
        let (Some(s), Some(l)) = (self.layout.sector_list, self.layout.line_list) else {
            return;
        };
        let sectors = &sectors[..sectors.len().min(MAX_SECTORS)];
        let bytes = &mut self.map[..];
        let mut w = Put::at(bytes, s.offset);
        w.u32(sectors.len() as u32);
        for sector in sectors {
            w.f64(sector.floor_height);
            w.f64(sector.ceiling_height);
        }
        let mut w = Put::at(bytes, l.offset);
        let lines: Vec<(usize, &Line)> = sectors
            .iter()
            .enumerate()
            .flat_map(|(i, sector)| sector.lines.iter().map(move |line| (i, line)))
            .take(MAX_LINES)
            .collect();
        w.u32(lines.len() as u32);
        for (sector, line) in lines {
            w.u32(sector as u32);
            w.f64s(&line.start);
            w.f64s(&line.end);
            w.u8(line.is_blocking as u8);
        }
    }

    /// Write the multiplayer server state.
    pub fn write_server_state(&mut self, state: &ServerState) {
        let Some(s) = self.layout.server else { return };
        let players = &state.players[..state.players.len().min(MAX_PLAYERS as usize)];
        let mut w = Put::at(&mut self.map[..], s.offset);
        w.u64(state.tic.0);
        w.u8(state.player_count);
        w.u8(players.len() as u8);
        for p in players {
            w.u8(p.in_game as u8);
            w.u8(p.afk as u8);
            w.i32(p.frag_count);
            w.name(&p.name);
            w.u64(p.last_action_tic.0);
            w.u64(p.last_kill_tic.0);
        }
    }

    /// Write the status fields, then the state number.
    pub fn publish(&mut self, status: RegionStatus) {
        let bytes = &mut self.map[..];
        put_u64(bytes, header::TIC, status.tic.0);
        put_u64(bytes, header::EPISODE_TIC, status.episode_tic);
        let mut flags = 0;
        if status.dead {
            flags |= header::FLAG_DEAD;
        }
        if status.finished {
            flags |= header::FLAG_FINISHED;
        }
        put_u32(bytes, header::FLAGS, flags);
        put_u64(bytes, header::STATE_NUMBER, status.state_number.0);
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        if !self.owner {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "shared buffer removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove shared buffer"
            ),
        }
    }
}

// ── Byte helpers ────────────────────────────────────────────────

fn get_u32(bytes: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(b)
}

fn get_u64(bytes: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(b)
}

fn put_u32(bytes: &mut [u8], at: usize, v: u32) {
    bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_u64(bytes: &mut [u8], at: usize, v: u64) {
    bytes[at..at + 8].copy_from_slice(&v.to_le_bytes());
}

fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Sequential little-endian reader.
struct Get<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Get<'a> {
    fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut b = [0u8; N];
        b.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        b
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn f64(&mut self) -> f64 {
        f64::from_le_bytes(self.take())
    }

    fn f64s<const N: usize>(&mut self) -> [f64; N] {
        std::array::from_fn(|_| self.f64())
    }

    fn name(&mut self) -> String {
        let raw = self.take::<NAME_LEN>();
        let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }
}

/// Sequential little-endian writer.
struct Put<'a> {
    bytes: &'a mut [u8],
    pos: usize,
}

impl<'a> Put<'a> {
    fn at(bytes: &'a mut [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn bytes(&mut self, data: &[u8]) {
        self.bytes[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    fn u8(&mut self, v: u8) {
        self.bytes(&[v]);
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.bytes(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.bytes(&v.to_le_bytes());
    }

    fn f64s(&mut self, vs: &[f64]) {
        for &v in vs {
            self.f64(v);
        }
    }

    fn name(&mut self, s: &str) {
        let mut raw = [0u8; NAME_LEN];
        let s = truncate_utf8(s, NAME_LEN);
        raw[..s.len()].copy_from_slice(s.as_bytes());
        self.bytes(&raw);
    }
}

fn read_f64s(bytes: &[u8], s: Section, n: usize) -> Vec<f64> {
    let mut r = Get::at(bytes, s.offset);
    (0..n).map(|_| r.f64()).collect()
}

fn write_f64s(bytes: &mut [u8], s: Section, n: usize, values: &[f64]) {
    let mut w = Put::at(bytes, s.offset);
    for i in 0..n {
        w.f64(values.get(i).copied().unwrap_or(0.0));
    }
}

fn read_notifications(bytes: &[u8], s: Section) -> String {
    let mut r = Get::at(bytes, s.offset);
    let len = (r.u32() as usize).min(NOTIFICATIONS_CAPACITY);
    String::from_utf8_lossy(&bytes[r.pos..r.pos + len]).into_owned()
}

fn read_labels(bytes: &[u8], s: Section) -> Vec<Label> {
    let mut r = Get::at(bytes, s.offset);
    let count = (r.u32() as usize).min(MAX_LABELS);
    debug_assert!(4 + count * LABEL_RECORD <= s.len);
    (0..count)
        .map(|_| Label {
            value: r.u8(),
            x: r.u32(),
            y: r.u32(),
            width: r.u32(),
            height: r.u32(),
            object_id: r.u64(),
            object_name: r.name(),
            object_position: r.f64s(),
            object_angle: r.f64(),
        })
        .collect()
}

fn read_objects(bytes: &[u8], s: Section) -> Vec<Object> {
    let mut r = Get::at(bytes, s.offset);
    let count = (r.u32() as usize).min(MAX_OBJECTS);
    debug_assert!(4 + count * OBJECT_RECORD <= s.len);
    (0..count)
        .map(|_| Object {
            id: r.u64(),
            name: r.name(),
            position: r.f64s(),
            orientation: r.f64s(),
            velocity: r.f64s(),
        })
        .collect()
}

fn read_sectors(bytes: &[u8], s: Section, l: Section) -> Vec<Sector> {
    let mut r = Get::at(bytes, s.offset);
    let count = (r.u32() as usize).min(MAX_SECTORS);
    debug_assert!(4 + count * SECTOR_RECORD <= s.len);
    let mut sectors: Vec<Sector> = (0..count)
        .map(|_| Sector {
            floor_height: r.f64(),
            ceiling_height: r.f64(),
            lines: Vec::new(),
        })
        .collect();

    let mut r = Get::at(bytes, l.offset);
    let line_count = (r.u32() as usize).min(MAX_LINES);
    debug_assert!(4 + line_count * LINE_RECORD <= l.len);
    for _ in 0..line_count {
        let owner = r.u32() as usize;
        let line = Line {
            start: r.f64s(),
            end: r.f64s(),
            is_blocking: r.u8() != 0,
        };
        if let Some(sector) = sectors.get_mut(owner) {
            sector.lines.push(line);
        }
    }
    sectors
}
