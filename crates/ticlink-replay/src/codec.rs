//! Binary encode/decode for the episode record format.
//!
//! All integers are little-endian. Strings are length-prefixed with a
//! `u32` length. No compression, no alignment padding.

use std::io::{Read, Write};

use crate::error::RecordError;
use crate::types::{Frame, RecordHeader, FRAME_ACTION, FRAME_END};
use crate::{FORMAT_VERSION, MAGIC};

/// Longest accepted string in a header.
const MAX_STR_LEN: usize = 4096;

/// Longest accepted action vector.
const MAX_ACTION_LEN: usize = 256;

// ── Primitives ──────────────────────────────────────────────────

fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), RecordError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), RecordError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), RecordError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_str(w: &mut dyn Write, s: &str) -> Result<(), RecordError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_u8(r: &mut dyn Read) -> Result<u8, RecordError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32_le(r: &mut dyn Read) -> Result<u32, RecordError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(r: &mut dyn Read) -> Result<u64, RecordError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64_le(r: &mut dyn Read) -> Result<f64, RecordError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_str(r: &mut dyn Read) -> Result<String, RecordError> {
    let len = read_u32_le(r)? as usize;
    if len > MAX_STR_LEN {
        return Err(RecordError::MalformedFrame {
            detail: format!("string length {len} exceeds {MAX_STR_LEN}"),
        });
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| RecordError::MalformedFrame {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

// ── Header ──────────────────────────────────────────────────────

/// Encode the record header (magic, version, header fields).
pub fn encode_header(w: &mut dyn Write, header: &RecordHeader) -> Result<(), RecordError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_str(w, &header.engine_version)?;
    write_str(w, &header.library_version)?;
    write_u64_le(w, header.episode_seed)?;
    write_u64_le(w, header.config_hash)?;
    write_u8(w, header.player_index)?;
    write_u32_le(w, header.button_count)?;
    Ok(())
}

/// Decode and validate the record header.
pub fn decode_header(r: &mut dyn Read) -> Result<RecordHeader, RecordError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(RecordError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(RecordError::UnsupportedVersion { found: version });
    }
    let header = RecordHeader {
        engine_version: read_str(r)?,
        library_version: read_str(r)?,
        episode_seed: read_u64_le(r)?,
        config_hash: read_u64_le(r)?,
        player_index: read_u8(r)?,
        button_count: read_u32_le(r)?,
    };
    if header.button_count as usize > MAX_ACTION_LEN {
        return Err(RecordError::MalformedFrame {
            detail: format!("button count {} exceeds {MAX_ACTION_LEN}", header.button_count),
        });
    }
    Ok(header)
}

// ── Frames ──────────────────────────────────────────────────────

/// Encode a single frame.
pub fn encode_frame(w: &mut dyn Write, frame: &Frame) -> Result<(), RecordError> {
    match frame {
        Frame::Action {
            episode_tic,
            tics,
            values,
        } => {
            write_u8(w, FRAME_ACTION)?;
            write_u64_le(w, *episode_tic)?;
            write_u32_le(w, *tics)?;
            write_u32_le(w, values.len() as u32)?;
            for v in values {
                w.write_all(&v.to_le_bytes())?;
            }
        }
        Frame::End { episode_tic } => {
            write_u8(w, FRAME_END)?;
            write_u64_le(w, *episode_tic)?;
        }
    }
    Ok(())
}

/// Decode a single frame.
///
/// Returns `Ok(None)` on clean EOF (no bytes available), `Ok(Some(frame))`
/// on success, or an error on truncated/corrupt data.
pub fn decode_frame(r: &mut dyn Read) -> Result<Option<Frame>, RecordError> {
    // The tag is a single byte, so EOF before it is always a clean end.
    let mut tag = [0u8; 1];
    loop {
        match r.read(&mut tag) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RecordError::Io(e)),
        }
    }
    let frame = match tag[0] {
        FRAME_ACTION => {
            let episode_tic = read_u64_le(r)?;
            let tics = read_u32_le(r)?;
            let len = read_u32_le(r)? as usize;
            if len > MAX_ACTION_LEN {
                return Err(RecordError::MalformedFrame {
                    detail: format!("action length {len} exceeds {MAX_ACTION_LEN}"),
                });
            }
            let mut values = Vec::with_capacity(len);
            for _ in 0..len {
                values.push(read_f64_le(r)?);
            }
            Frame::Action {
                episode_tic,
                tics,
                values,
            }
        }
        FRAME_END => Frame::End {
            episode_tic: read_u64_le(r)?,
        },
        other => return Err(RecordError::UnknownFrameTag { tag: other }),
    };
    Ok(Some(frame))
}
