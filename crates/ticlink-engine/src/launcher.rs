//! Starting engines and watching their processes.
//!
//! A launcher turns a [`LaunchSpec`] into a live [`EngineHandle`]: a
//! command transport plus something that can report whether the engine is
//! still alive and tear it down. The session never knows which kind of
//! engine it is talking to.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use ticlink_core::{ChannelError, GameConfig};
use ticlink_ipc::{StreamTransport, Transport};

use crate::error::SessionError;

/// Poll interval while waiting for a process to exit.
const EXIT_POLL: Duration = Duration::from_millis(5);

/// Command-line flag carrying the shared buffer path to a spawned engine.
pub const REGION_ARG: &str = "--ticlink-region";

/// What a launcher needs to know to start an engine.
#[derive(Clone, Copy, Debug)]
pub struct LaunchSpec<'a> {
    /// Shared buffer the engine must map.
    pub region_path: &'a Path,
    /// The configuration the session will send in its handshake.
    pub config: &'a GameConfig,
}

/// Liveness of an engine process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Still running (or not observable, for attached engines).
    Running,
    /// Exited, with its exit code when the platform reported one.
    Exited(Option<i32>),
}

/// Handle on a running engine's process (or thread, or remote peer).
pub trait EngineProcess: Send {
    /// Non-blocking liveness check.
    fn status(&mut self) -> ProcessStatus;

    /// Wait up to `timeout` for the engine to exit on its own.
    fn wait_exit(&mut self, timeout: Duration) -> ProcessStatus {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status();
            if matches!(status, ProcessStatus::Exited(_)) || Instant::now() >= deadline {
                return status;
            }
            thread::sleep(EXIT_POLL);
        }
    }

    /// Stop the engine, giving it `grace` to exit on its own first. Must
    /// not fail; teardown problems are logged.
    fn terminate(&mut self, grace: Duration);

    /// OS process id, when there is one.
    fn id(&self) -> Option<u32> {
        None
    }
}

/// A started engine.
pub struct EngineHandle {
    /// Command channel to the engine.
    pub transport: Box<dyn Transport>,
    /// The engine's process handle.
    pub process: Box<dyn EngineProcess>,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("pid", &self.process.id())
            .finish_non_exhaustive()
    }
}

/// Starts engines for a session.
pub trait EngineLauncher: Send {
    /// Start an engine that will map `spec.region_path`.
    fn launch(&mut self, spec: &LaunchSpec<'_>) -> Result<EngineHandle, SessionError>;
}

// ── ProcessLauncher ────────────────────────────────────────────────

/// Spawns the engine as a child process and talks to it over its stdio.
///
/// The child gets `args`, then `--ticlink-region <path>`. Its stdin
/// carries requests, its stdout replies; stderr is inherited so engine
/// logs reach the terminal.
#[derive(Clone, Debug)]
pub struct ProcessLauncher {
    executable: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    /// Launcher for `executable` with no extra arguments.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
        }
    }

    /// Append a command-line argument passed before the region flag.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The executable this launcher spawns.
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl EngineLauncher for ProcessLauncher {
    fn launch(&mut self, spec: &LaunchSpec<'_>) -> Result<EngineHandle, SessionError> {
        let mut child = Command::new(&self.executable)
            .args(&self.args)
            .arg(REGION_ARG)
            .arg(spec.region_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SessionError::ConfigurationMissing {
                    path: self.executable.clone(),
                },
                _ => SessionError::Channel(ChannelError::Open {
                    reason: format!("cannot spawn {}: {e}", self.executable.display()),
                }),
            })?;

        let pipes = child.stdin.take().zip(child.stdout.take());
        let Some((stdin, stdout)) = pipes else {
            kill_and_reap(&mut child);
            return Err(ChannelError::Open {
                reason: "child stdio pipes unavailable".into(),
            }
            .into());
        };
        let transport = match StreamTransport::spawn(stdout, stdin) {
            Ok(t) => t,
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(e.into());
            }
        };
        tracing::info!(
            pid = child.id(),
            executable = %self.executable.display(),
            "engine process spawned"
        );
        Ok(EngineHandle {
            transport: Box::new(transport),
            process: Box::new(ChildProcess { child }),
        })
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "engine kill failed");
    }
    if let Err(e) = child.wait() {
        tracing::warn!(error = %e, "cannot reap engine process");
    }
}

/// A spawned engine process.
#[derive(Debug)]
struct ChildProcess {
    child: Child,
}

impl EngineProcess for ChildProcess {
    fn status(&mut self) -> ProcessStatus {
        match self.child.try_wait() {
            Ok(Some(status)) => ProcessStatus::Exited(status.code()),
            Ok(None) => ProcessStatus::Running,
            Err(e) => {
                tracing::warn!(error = %e, "cannot poll engine process");
                ProcessStatus::Exited(None)
            }
        }
    }

    fn terminate(&mut self, grace: Duration) {
        if let ProcessStatus::Exited(code) = self.wait_exit(grace) {
            tracing::debug!(?code, "engine exited");
            return;
        }
        tracing::warn!(pid = self.child.id(), "engine ignored shutdown, killing");
        kill_and_reap(&mut self.child);
    }

    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }
}

// ── AttachLauncher ─────────────────────────────────────────────────

/// Connects to an engine already listening on a Unix socket.
///
/// The engine's process is not ours: liveness is only observable through
/// the socket, and termination closes the connection.
#[cfg(unix)]
#[derive(Clone, Debug)]
pub struct AttachLauncher {
    socket: PathBuf,
}

#[cfg(unix)]
impl AttachLauncher {
    /// Launcher connecting to the socket at `socket`.
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
        }
    }
}

#[cfg(unix)]
impl EngineLauncher for AttachLauncher {
    fn launch(&mut self, _spec: &LaunchSpec<'_>) -> Result<EngineHandle, SessionError> {
        use std::os::unix::net::UnixStream;

        if !self.socket.exists() {
            return Err(SessionError::ConfigurationMissing {
                path: self.socket.clone(),
            });
        }
        let open_err = |e: io::Error| ChannelError::Open {
            reason: format!("cannot attach to {}: {e}", self.socket.display()),
        };
        let stream = UnixStream::connect(&self.socket).map_err(open_err)?;
        let reader = stream.try_clone().map_err(open_err)?;
        let control = stream.try_clone().map_err(open_err)?;
        let transport = StreamTransport::spawn(reader, stream)?;
        tracing::info!(socket = %self.socket.display(), "attached to engine");
        Ok(EngineHandle {
            transport: Box::new(transport),
            process: Box::new(AttachedEngine {
                stream: Some(control),
            }),
        })
    }
}

/// An engine reached through a socket we do not own the process of.
#[cfg(unix)]
#[derive(Debug)]
struct AttachedEngine {
    stream: Option<std::os::unix::net::UnixStream>,
}

#[cfg(unix)]
impl EngineProcess for AttachedEngine {
    fn status(&mut self) -> ProcessStatus {
        match self.stream {
            Some(_) => ProcessStatus::Running,
            None => ProcessStatus::Exited(None),
        }
    }

    fn terminate(&mut self, _grace: Duration) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(std::net::Shutdown::Both) {
                tracing::debug!(error = %e, "socket shutdown failed");
            }
        }
    }
}
