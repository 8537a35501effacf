//! Transport-level error kinds shared by the controller and engine sides.
//!
//! The two are kept disjoint: a [`ChannelError`] means the command link is
//! unusable (environment, permissions, a silent peer), a
//! [`SharedBufferError`] means the shared observation region is unusable
//! (OS limits, permissions, layout disagreement). The session-level
//! taxonomy wraps both.

use std::error::Error;
use std::fmt;
use std::io;
use std::time::Duration;

/// Failures of the command/acknowledgment channel.
#[derive(Debug)]
pub enum ChannelError {
    /// The channel could not be established.
    Open {
        /// What failed.
        reason: String,
    },
    /// Writing a command failed.
    Write(io::Error),
    /// Reading an acknowledgment failed.
    Read(io::Error),
    /// No acknowledgment arrived within the bounded wait.
    Timeout {
        /// How long the controller waited.
        waited: Duration,
    },
    /// The peer closed its end of the channel.
    Disconnected,
    /// A frame arrived that does not fit the protocol.
    Protocol {
        /// Description of the violation.
        detail: String,
    },
}

impl ChannelError {
    /// Whether the failure is consistent with the peer having gone away
    /// (as opposed to a timeout or a malformed frame).
    pub fn is_peer_loss(&self) -> bool {
        match self {
            Self::Disconnected => true,
            Self::Write(e) | Self::Read(e) => matches!(
                e.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { reason } => write!(f, "channel could not be opened: {reason}"),
            Self::Write(e) => write!(f, "channel write failed: {e}"),
            Self::Read(e) => write!(f, "channel read failed: {e}"),
            Self::Timeout { waited } => {
                write!(f, "no acknowledgment within {}ms", waited.as_millis())
            }
            Self::Disconnected => write!(f, "channel peer disconnected"),
            Self::Protocol { detail } => write!(f, "protocol violation: {detail}"),
        }
    }
}

impl Error for ChannelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Write(e) | Self::Read(e) => Some(e),
            _ => None,
        }
    }
}

/// Failures of the shared state buffer.
#[derive(Debug)]
pub enum SharedBufferError {
    /// The backing region could not be created or sized.
    Allocate {
        /// Backing file path.
        path: String,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The region could not be mapped into this process.
    Map {
        /// Backing file path.
        path: String,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The region's header disagrees with the expected layout.
    LayoutMismatch {
        /// Which header check failed.
        detail: String,
    },
    /// The published state number differs from the acknowledged one.
    Torn {
        /// Number carried by the acknowledgment.
        expected: u64,
        /// Number found in the region header.
        found: u64,
    },
}

impl fmt::Display for SharedBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocate { path, source } => {
                write!(f, "cannot allocate shared buffer at {path}: {source}")
            }
            Self::Map { path, source } => {
                write!(f, "cannot map shared buffer at {path}: {source}")
            }
            Self::LayoutMismatch { detail } => write!(f, "shared buffer layout mismatch: {detail}"),
            Self::Torn { expected, found } => write!(
                f,
                "shared buffer holds state {found}, acknowledgment announced {expected}"
            ),
        }
    }
}

impl Error for SharedBufferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Allocate { source, .. } | Self::Map { source, .. } => Some(source),
            _ => None,
        }
    }
}
