//! Error types for episode records.

use std::fmt;
use std::io;

/// Errors that can occur while writing, reading or applying a record.
#[derive(Debug)]
pub enum RecordError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The file does not start with the expected `b"TLEP"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// A frame could not be decoded (truncated or corrupt data).
    MalformedFrame {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A frame tag is not recognized.
    UnknownFrameTag {
        /// The unrecognized tag.
        tag: u8,
    },
    /// The record was made under a different configuration.
    ConfigMismatch {
        /// Fingerprint from the record header.
        recorded: u64,
        /// Fingerprint of the running configuration.
        current: u64,
    },
    /// The record belongs to a different player slot.
    PlayerMismatch {
        /// Slot stored in the record.
        recorded: u8,
        /// Slot the caller asked to replay.
        requested: u8,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"TLEP\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::MalformedFrame { detail } => write!(f, "malformed frame: {detail}"),
            Self::UnknownFrameTag { tag } => write!(f, "unknown frame tag {tag}"),
            Self::ConfigMismatch { recorded, current } => write!(
                f,
                "config hash mismatch: recorded={recorded:#018x}, current={current:#018x}"
            ),
            Self::PlayerMismatch {
                recorded,
                requested,
            } => write!(
                f,
                "record belongs to player {recorded}, replay requested player {requested}"
            ),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RecordError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
