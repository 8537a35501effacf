//! Binary encode/decode for channel frames.
//!
//! All integers are little-endian. Strings are length-prefixed with a
//! `u32`. A frame on the wire is a `u32` body length followed by the body;
//! the body starts with the envelope sequence number and a message tag.

use std::error::Error;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use ticlink_core::{
    AudioConfig, Button, BufferToggles, GameConfig, GameVariable, Mode, MultiplayerRole,
    Resolution, SamplingRate, ScreenFormat, StateNumber, Tic,
};

use crate::protocol::{
    AdvanceReport, EngineStatus, Envelope, InputSpan, Reply, Request, MAX_FRAME_LEN,
};

// ── Tags ────────────────────────────────────────────────────────

const REQ_HELLO: u8 = 1;
const REQ_SET_ACTION: u8 = 2;
const REQ_ADVANCE: u8 = 3;
const REQ_NEW_EPISODE: u8 = 4;
const REQ_RESPAWN: u8 = 5;
const REQ_SAVE_STATE: u8 = 6;
const REQ_LOAD_STATE: u8 = 7;
const REQ_GAME_COMMAND: u8 = 8;
const REQ_SHUTDOWN: u8 = 9;

const REP_READY: u8 = 0x81;
const REP_ACK: u8 = 0x82;
const REP_STATUS: u8 = 0x83;
const REP_ADVANCED: u8 = 0x84;
const REP_ERROR: u8 = 0x85;

const ROLE_SOLO: u8 = 0;
const ROLE_HOST: u8 = 1;
const ROLE_CLIENT: u8 = 2;

// ── WireError ───────────────────────────────────────────────────

/// Errors raised while reading or writing frames.
#[derive(Debug)]
pub enum WireError {
    /// The underlying stream failed.
    Io(io::Error),
    /// The bytes do not form a valid message.
    Malformed {
        /// What was wrong.
        detail: String,
    },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Malformed { detail } => write!(f, "malformed frame: {detail}"),
        }
    }
}

impl Error for WireError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Malformed { .. } => None,
        }
    }
}

impl From<io::Error> for WireError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::Malformed {
                detail: "message truncated".into(),
            }
        } else {
            Self::Io(e)
        }
    }
}

fn malformed(detail: impl Into<String>) -> WireError {
    WireError::Malformed {
        detail: detail.into(),
    }
}

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), WireError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u16.
pub fn write_u16_le(w: &mut dyn Write, v: u16) -> Result<(), WireError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), WireError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), WireError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), WireError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a bool as one byte.
pub fn write_bool(w: &mut dyn Write, v: bool) -> Result<(), WireError> {
    write_u8(w, v as u8)
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_str(w: &mut dyn Write, s: &str) -> Result<(), WireError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

/// Write an optional u64 as a presence flag plus value.
pub fn write_opt_u64(w: &mut dyn Write, v: Option<u64>) -> Result<(), WireError> {
    match v {
        Some(v) => {
            write_u8(w, 1)?;
            write_u64_le(w, v)
        }
        None => write_u8(w, 0),
    }
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, WireError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u16.
pub fn read_u16_le(r: &mut dyn Read) -> Result<u16, WireError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, WireError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, WireError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, WireError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read a bool byte, rejecting anything but 0 or 1.
pub fn read_bool(r: &mut dyn Read) -> Result<bool, WireError> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        b => Err(malformed(format!("invalid bool byte {b}"))),
    }
}

/// Read a length-prefixed UTF-8 string.
pub fn read_str(r: &mut dyn Read) -> Result<String, WireError> {
    let len = read_u32_le(r)? as usize;
    if len > MAX_FRAME_LEN {
        return Err(malformed(format!("string length {len} exceeds frame limit")));
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| malformed(format!("invalid UTF-8 string: {e}")))
}

/// Read an optional u64 written by [`write_opt_u64`].
pub fn read_opt_u64(r: &mut dyn Read) -> Result<Option<u64>, WireError> {
    match read_u8(r)? {
        0 => Ok(None),
        1 => Ok(Some(read_u64_le(r)?)),
        flag => Err(malformed(format!("invalid presence flag {flag}"))),
    }
}

fn read_count(r: &mut dyn Read, what: &str) -> Result<usize, WireError> {
    let n = read_u32_le(r)? as usize;
    if n > MAX_FRAME_LEN / 2 {
        return Err(malformed(format!("{what} count {n} exceeds frame limit")));
    }
    Ok(n)
}

fn write_path(w: &mut dyn Write, p: &std::path::Path) -> Result<(), WireError> {
    write_str(w, &p.to_string_lossy())
}

fn read_path(r: &mut dyn Read) -> Result<PathBuf, WireError> {
    Ok(PathBuf::from(read_str(r)?))
}

// ── Framing ─────────────────────────────────────────────────────

/// Write one frame (u32 length + body) and flush.
pub fn write_frame(w: &mut dyn Write, body: &[u8]) -> Result<(), WireError> {
    if body.len() > MAX_FRAME_LEN {
        return Err(malformed(format!(
            "frame of {} bytes exceeds limit {MAX_FRAME_LEN}",
            body.len()
        )));
    }
    write_u32_le(w, body.len() as u32)?;
    w.write_all(body)?;
    w.flush()?;
    Ok(())
}

/// Read one frame body.
///
/// Returns `Ok(None)` on clean EOF (no bytes available), `Ok(Some(body))`
/// on success, or an error on a truncated or oversized frame.
pub fn read_frame(r: &mut dyn Read) -> Result<Option<Vec<u8>>, WireError> {
    // Read the length prefix byte-by-byte to tell a closed stream from a
    // frame cut short.
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        match r.read(&mut len_buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(malformed(format!(
                    "truncated frame header: got {filled} of 4 bytes"
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(malformed(format!(
            "frame of {len} bytes exceeds limit {MAX_FRAME_LEN}"
        )));
    }
    let mut body = vec![0u8; len];
    r.read_exact(&mut body)?;
    Ok(Some(body))
}

// ── GameConfig ──────────────────────────────────────────────────

/// Encode a full session configuration.
pub fn encode_config(w: &mut dyn Write, config: &GameConfig) -> Result<(), WireError> {
    match &config.scenario_path {
        Some(p) => {
            write_u8(w, 1)?;
            write_path(w, p)?;
        }
        None => write_u8(w, 0)?,
    }

    write_u32_le(w, config.buttons.len() as u32)?;
    for (button, max) in &config.buttons {
        write_u8(w, button.code())?;
        write_f64_le(w, *max)?;
    }
    write_u32_le(w, config.variables.len() as u32)?;
    for variable in &config.variables {
        write_u16_le(w, variable.code())?;
    }

    write_u8(w, config.screen_format.code())?;
    write_u32_le(w, config.resolution.width)?;
    write_u32_le(w, config.resolution.height)?;
    write_u8(w, config.buffers.bits())?;
    write_u32_le(w, config.audio.sampling_rate.hz())?;
    write_u32_le(w, config.audio.buffer_tics)?;
    write_u8(w, config.mode.code())?;
    write_u32_le(w, config.ticrate)?;
    write_opt_u64(w, config.episode_timeout)?;
    write_u64_le(w, config.episode_start_time)?;
    write_f64_le(w, config.living_reward)?;
    write_f64_le(w, config.death_penalty)?;
    write_u8(w, config.skill)?;
    write_opt_u64(w, config.seed)?;

    match &config.multiplayer {
        MultiplayerRole::Solo => write_u8(w, ROLE_SOLO)?,
        MultiplayerRole::Host { players, port } => {
            write_u8(w, ROLE_HOST)?;
            write_u8(w, *players)?;
            write_u16_le(w, *port)?;
        }
        MultiplayerRole::Client { address, port } => {
            write_u8(w, ROLE_CLIENT)?;
            write_str(w, address)?;
            write_u16_le(w, *port)?;
        }
    }

    write_u32_le(w, config.game_args.len() as u32)?;
    for arg in &config.game_args {
        write_str(w, arg)?;
    }
    Ok(())
}

/// Decode a configuration written by [`encode_config`].
pub fn decode_config(r: &mut dyn Read) -> Result<GameConfig, WireError> {
    let scenario_path = match read_u8(r)? {
        0 => None,
        1 => Some(read_path(r)?),
        flag => return Err(malformed(format!("invalid scenario flag {flag}"))),
    };

    let button_count = read_count(r, "button")?;
    let mut buttons = IndexMap::with_capacity(button_count.min(64));
    for _ in 0..button_count {
        let code = read_u8(r)?;
        let button =
            Button::from_code(code).ok_or_else(|| malformed(format!("unknown button {code}")))?;
        buttons.insert(button, read_f64_le(r)?);
    }
    let variable_count = read_count(r, "variable")?;
    let mut variables = IndexSet::with_capacity(variable_count.min(64));
    for _ in 0..variable_count {
        let code = read_u16_le(r)?;
        let variable = GameVariable::from_code(code)
            .ok_or_else(|| malformed(format!("unknown game variable {code:#06x}")))?;
        variables.insert(variable);
    }

    let format_code = read_u8(r)?;
    let screen_format = ScreenFormat::from_code(format_code)
        .ok_or_else(|| malformed(format!("unknown screen format {format_code}")))?;
    let resolution = Resolution::new(read_u32_le(r)?, read_u32_le(r)?);
    let buffers = BufferToggles::from_bits(read_u8(r)?);
    let hz = read_u32_le(r)?;
    let sampling_rate = SamplingRate::from_hz(hz)
        .ok_or_else(|| malformed(format!("unsupported sampling rate {hz}")))?;
    let audio = AudioConfig {
        sampling_rate,
        buffer_tics: read_u32_le(r)?,
    };
    let mode_code = read_u8(r)?;
    let mode =
        Mode::from_code(mode_code).ok_or_else(|| malformed(format!("unknown mode {mode_code}")))?;
    let ticrate = read_u32_le(r)?;
    let episode_timeout = read_opt_u64(r)?;
    let episode_start_time = read_u64_le(r)?;
    let living_reward = read_f64_le(r)?;
    let death_penalty = read_f64_le(r)?;
    let skill = read_u8(r)?;
    let seed = read_opt_u64(r)?;

    let multiplayer = match read_u8(r)? {
        ROLE_SOLO => MultiplayerRole::Solo,
        ROLE_HOST => MultiplayerRole::Host {
            players: read_u8(r)?,
            port: read_u16_le(r)?,
        },
        ROLE_CLIENT => MultiplayerRole::Client {
            address: read_str(r)?,
            port: read_u16_le(r)?,
        },
        tag => return Err(malformed(format!("unknown multiplayer role {tag}"))),
    };

    let arg_count = read_count(r, "argument")?;
    let mut game_args = Vec::with_capacity(arg_count.min(64));
    for _ in 0..arg_count {
        game_args.push(read_str(r)?);
    }

    Ok(GameConfig {
        scenario_path,
        buttons,
        variables,
        screen_format,
        resolution,
        buffers,
        audio,
        mode,
        ticrate,
        episode_timeout,
        episode_start_time,
        living_reward,
        death_penalty,
        skill,
        seed,
        multiplayer,
        game_args,
    })
}

// ── Messages ────────────────────────────────────────────────────

fn write_status(w: &mut dyn Write, status: &EngineStatus) -> Result<(), WireError> {
    write_u64_le(w, status.tic.0)?;
    write_u64_le(w, status.episode_tic)?;
    write_u64_le(w, status.state_number.0)?;
    write_bool(w, status.dead)?;
    write_bool(w, status.episode_finished)
}

fn read_status(r: &mut dyn Read) -> Result<EngineStatus, WireError> {
    Ok(EngineStatus {
        tic: Tic(read_u64_le(r)?),
        episode_tic: read_u64_le(r)?,
        state_number: StateNumber(read_u64_le(r)?),
        dead: read_bool(r)?,
        episode_finished: read_bool(r)?,
    })
}

/// Encode a request envelope into a frame body.
pub fn encode_request(envelope: &Envelope<Request>) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    let w: &mut dyn Write = &mut buf;
    write_u32_le(w, envelope.seq)?;
    match &envelope.body {
        Request::Hello {
            protocol_version,
            region_path,
            episode_seed,
            config,
        } => {
            write_u8(w, REQ_HELLO)?;
            write_u32_le(w, *protocol_version)?;
            write_path(w, region_path)?;
            write_u64_le(w, *episode_seed)?;
            encode_config(w, config)?;
        }
        Request::SetAction { values } => {
            write_u8(w, REQ_SET_ACTION)?;
            write_u32_le(w, values.len() as u32)?;
            for v in values {
                write_f64_le(w, *v)?;
            }
        }
        Request::Advance {
            tics,
            update_state,
            replaying,
        } => {
            write_u8(w, REQ_ADVANCE)?;
            write_u32_le(w, *tics)?;
            write_bool(w, *update_state)?;
            write_bool(w, *replaying)?;
        }
        Request::NewEpisode { seed } => {
            write_u8(w, REQ_NEW_EPISODE)?;
            write_u64_le(w, *seed)?;
        }
        Request::Respawn => write_u8(w, REQ_RESPAWN)?,
        Request::SaveState { path } => {
            write_u8(w, REQ_SAVE_STATE)?;
            write_path(w, path)?;
        }
        Request::LoadState { path } => {
            write_u8(w, REQ_LOAD_STATE)?;
            write_path(w, path)?;
        }
        Request::GameCommand { command } => {
            write_u8(w, REQ_GAME_COMMAND)?;
            write_str(w, command)?;
        }
        Request::Shutdown => write_u8(w, REQ_SHUTDOWN)?,
    }
    Ok(buf)
}

/// Decode a request envelope from a frame body.
pub fn decode_request(body: &[u8]) -> Result<Envelope<Request>, WireError> {
    let mut cursor = body;
    let r: &mut dyn Read = &mut cursor;
    let seq = read_u32_le(r)?;
    let request = match read_u8(r)? {
        REQ_HELLO => Request::Hello {
            protocol_version: read_u32_le(r)?,
            region_path: read_path(r)?,
            episode_seed: read_u64_le(r)?,
            config: decode_config(r)?,
        },
        REQ_SET_ACTION => {
            let n = read_count(r, "action value")?;
            let mut values = Vec::with_capacity(n.min(64));
            for _ in 0..n {
                values.push(read_f64_le(r)?);
            }
            Request::SetAction { values }
        }
        REQ_ADVANCE => Request::Advance {
            tics: read_u32_le(r)?,
            update_state: read_bool(r)?,
            replaying: read_bool(r)?,
        },
        REQ_NEW_EPISODE => Request::NewEpisode {
            seed: read_u64_le(r)?,
        },
        REQ_RESPAWN => Request::Respawn,
        REQ_SAVE_STATE => Request::SaveState {
            path: read_path(r)?,
        },
        REQ_LOAD_STATE => Request::LoadState {
            path: read_path(r)?,
        },
        REQ_GAME_COMMAND => Request::GameCommand {
            command: read_str(r)?,
        },
        REQ_SHUTDOWN => Request::Shutdown,
        tag => return Err(malformed(format!("unknown request tag {tag:#04x}"))),
    };
    expect_consumed(cursor)?;
    Ok(Envelope { seq, body: request })
}

/// Encode a reply envelope into a frame body.
pub fn encode_reply(envelope: &Envelope<Reply>) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    let w: &mut dyn Write = &mut buf;
    write_u32_le(w, envelope.seq)?;
    match &envelope.body {
        Reply::Ready {
            engine_version,
            player_index,
            player_count,
            status,
        } => {
            write_u8(w, REP_READY)?;
            write_str(w, engine_version)?;
            write_u8(w, *player_index)?;
            write_u8(w, *player_count)?;
            write_status(w, status)?;
        }
        Reply::Ack => write_u8(w, REP_ACK)?,
        Reply::Status(status) => {
            write_u8(w, REP_STATUS)?;
            write_status(w, status)?;
        }
        Reply::Advanced(report) => {
            write_u8(w, REP_ADVANCED)?;
            write_status(w, &report.status)?;
            write_u32_le(w, report.tics_advanced)?;
            write_f64_le(w, report.scenario_reward)?;
            write_bool(w, report.died)?;
            write_u32_le(w, report.applied.len() as u32)?;
            for span in &report.applied {
                write_u32_le(w, span.tics)?;
                write_u32_le(w, span.values.len() as u32)?;
                for v in &span.values {
                    write_f64_le(w, *v)?;
                }
            }
        }
        Reply::Error { message } => {
            write_u8(w, REP_ERROR)?;
            write_str(w, message)?;
        }
    }
    Ok(buf)
}

/// Decode a reply envelope from a frame body.
pub fn decode_reply(body: &[u8]) -> Result<Envelope<Reply>, WireError> {
    let mut cursor = body;
    let r: &mut dyn Read = &mut cursor;
    let seq = read_u32_le(r)?;
    let reply = match read_u8(r)? {
        REP_READY => Reply::Ready {
            engine_version: read_str(r)?,
            player_index: read_u8(r)?,
            player_count: read_u8(r)?,
            status: read_status(r)?,
        },
        REP_ACK => Reply::Ack,
        REP_STATUS => Reply::Status(read_status(r)?),
        REP_ADVANCED => Reply::Advanced(AdvanceReport {
            status: read_status(r)?,
            tics_advanced: read_u32_le(r)?,
            scenario_reward: read_f64_le(r)?,
            died: read_bool(r)?,
            applied: read_input_spans(r)?,
        }),
        REP_ERROR => Reply::Error {
            message: read_str(r)?,
        },
        tag => return Err(malformed(format!("unknown reply tag {tag:#04x}"))),
    };
    expect_consumed(cursor)?;
    Ok(Envelope { seq, body: reply })
}

fn read_input_spans(r: &mut dyn Read) -> Result<Vec<InputSpan>, WireError> {
    let n = read_count(r, "input span")?;
    let mut spans = Vec::with_capacity(n.min(64));
    for _ in 0..n {
        let tics = read_u32_le(r)?;
        let len = read_count(r, "input value")?;
        let mut values = Vec::with_capacity(len.min(64));
        for _ in 0..len {
            values.push(read_f64_le(r)?);
        }
        spans.push(InputSpan { tics, values });
    }
    Ok(spans)
}

fn expect_consumed(rest: &[u8]) -> Result<(), WireError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(malformed(format!("{} trailing bytes after message", rest.len())))
    }
}
