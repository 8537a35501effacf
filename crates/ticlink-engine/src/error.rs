//! Session lifecycle states and the session error taxonomy.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use ticlink_core::{ActionError, ChannelError, ConfigError, SharedBufferError};
use ticlink_replay::RecordError;

// ── LifecycleState ─────────────────────────────────────────────────

/// Where a [`Session`](crate::Session) is in its lifecycle.
///
/// Transitions only move forward: `Uninitialized → Initializing →
/// Running → Closed`. A failed init falls back to `Uninitialized` so the
/// configuration can be corrected; `Closed` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Configurable; no engine attached.
    #[default]
    Uninitialized,
    /// Engine launched, waiting for its readiness acknowledgment.
    Initializing,
    /// Engine ready; stepping is legal.
    Running,
    /// Engine gone; only `close()` and getters are meaningful.
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Initializing => "INITIALIZING",
            Self::Running => "RUNNING",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

// ── SessionError ───────────────────────────────────────────────────

/// Everything a session operation can fail with.
///
/// No variant is retried internally. After a fatal error
/// ([`is_fatal`](Self::is_fatal)) the caller is expected to close the
/// session and build a new one.
#[derive(Debug)]
pub enum SessionError {
    /// A scenario, recording or saved-state path does not exist.
    ConfigurationMissing {
        /// The missing path.
        path: PathBuf,
    },
    /// The command channel failed.
    Channel(ChannelError),
    /// The shared state buffer failed.
    SharedBuffer(SharedBufferError),
    /// The engine rejected a command.
    EngineInternal {
        /// Engine-provided message.
        message: String,
    },
    /// The operation is not legal in the current lifecycle state.
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the session was in.
        state: LifecycleState,
    },
    /// The engine process exited underneath a running session.
    EngineTerminated {
        /// Exit code when the process reported one.
        exit_code: Option<i32>,
    },
    /// The current episode has ended; start a new one first.
    EpisodeFinished,
    /// A setter value or the composed configuration is invalid.
    InvalidConfig(ConfigError),
    /// The submitted action does not fit the configured buttons.
    InvalidAction {
        /// What was wrong with it.
        reason: ActionError,
    },
    /// An episode record could not be written, read or applied.
    Record(RecordError),
}

impl SessionError {
    /// Whether the session's engine link is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Channel(_) | Self::SharedBuffer(_) | Self::EngineTerminated { .. }
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationMissing { path } => {
                write!(f, "configuration path missing: {}", path.display())
            }
            Self::Channel(e) => write!(f, "channel error: {e}"),
            Self::SharedBuffer(e) => write!(f, "shared buffer error: {e}"),
            Self::EngineInternal { message } => write!(f, "engine error: {message}"),
            Self::InvalidState { operation, state } => {
                write!(f, "{operation} is not allowed while {state}")
            }
            Self::EngineTerminated {
                exit_code: Some(code),
            } => write!(f, "engine terminated with exit code {code}"),
            Self::EngineTerminated { exit_code: None } => write!(f, "engine terminated"),
            Self::EpisodeFinished => write!(f, "episode is finished"),
            Self::InvalidConfig(e) => write!(f, "invalid configuration: {e}"),
            Self::InvalidAction { reason } => write!(f, "invalid action: {reason}"),
            Self::Record(e) => write!(f, "episode record error: {e}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Channel(e) => Some(e),
            Self::SharedBuffer(e) => Some(e),
            Self::InvalidConfig(e) => Some(e),
            Self::InvalidAction { reason } => Some(reason),
            Self::Record(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChannelError> for SessionError {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

impl From<SharedBufferError> for SessionError {
    fn from(e: SharedBufferError) -> Self {
        Self::SharedBuffer(e)
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e)
    }
}

impl From<ActionError> for SessionError {
    fn from(reason: ActionError) -> Self {
        Self::InvalidAction { reason }
    }
}

impl From<RecordError> for SessionError {
    fn from(e: RecordError) -> Self {
        Self::Record(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fatal_kinds() {
        assert!(SessionError::from(ChannelError::Disconnected).is_fatal());
        assert!(SessionError::EngineTerminated { exit_code: None }.is_fatal());
        assert!(SessionError::from(SharedBufferError::Torn {
            expected: 2,
            found: 1
        })
        .is_fatal());
        assert!(!SessionError::EpisodeFinished.is_fatal());
        assert!(!SessionError::InvalidState {
            operation: "init",
            state: LifecycleState::Running
        }
        .is_fatal());
    }

    #[test]
    fn display_names_operation_and_state() {
        let e = SessionError::InvalidState {
            operation: "set_ticrate",
            state: LifecycleState::Running,
        };
        assert_eq!(e.to_string(), "set_ticrate is not allowed while RUNNING");
        let e = SessionError::EngineTerminated {
            exit_code: Some(137),
        };
        assert_eq!(e.to_string(), "engine terminated with exit code 137");
    }

    #[test]
    fn source_chains_to_channel_error() {
        let e = SessionError::from(ChannelError::Timeout {
            waited: Duration::from_millis(5),
        });
        let source = e.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("no acknowledgment within 5ms"));
    }
}
