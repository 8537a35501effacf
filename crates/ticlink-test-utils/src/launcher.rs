//! Running the stub engine on a thread of the test process.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use ticlink_core::ChannelError;
use ticlink_engine::{
    EngineHandle, EngineLauncher, EngineProcess, LaunchSpec, ProcessStatus, SessionError,
};
use ticlink_ipc::memory_pair;

use crate::lobby::Lobby;
use crate::server::{serve, KillSwitch, ServeOptions};

/// Launches a [`StubWorld`](crate::StubWorld) engine on a thread, talking
/// over an in-memory channel and a real shared buffer file.
#[derive(Clone, Debug, Default)]
pub struct ThreadLauncher {
    options: ServeOptions,
}

impl ThreadLauncher {
    /// Launcher with a private lobby and kill switch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher whose engines join matches in `lobby`.
    pub fn with_lobby(lobby: Lobby) -> Self {
        Self {
            options: ServeOptions {
                lobby,
                ..ServeOptions::default()
            },
        }
    }

    /// Launcher whose engine rejects the handshake with `message`.
    pub fn refusing(message: &str) -> Self {
        Self {
            options: ServeOptions {
                refuse_hello: Some(message.into()),
                ..ServeOptions::default()
            },
        }
    }

    /// Switch that kills engines started by this launcher.
    pub fn kill_switch(&self) -> KillSwitch {
        self.options.kill.clone()
    }
}

impl EngineLauncher for ThreadLauncher {
    fn launch(&mut self, _spec: &LaunchSpec<'_>) -> Result<EngineHandle, SessionError> {
        let (transport, mut endpoint) = memory_pair();
        let options = self.options.clone();
        let handle = thread::Builder::new()
            .name("ticlink-stub-engine".into())
            .spawn(move || serve(&mut endpoint, &options))
            .map_err(|e| ChannelError::Open {
                reason: format!("cannot start stub engine thread: {e}"),
            })?;
        Ok(EngineHandle {
            transport: Box::new(transport),
            process: Box::new(EngineThread {
                handle: Some(handle),
                exit_code: None,
            }),
        })
    }
}

/// The engine thread standing in for a process.
#[derive(Debug)]
struct EngineThread {
    handle: Option<JoinHandle<i32>>,
    exit_code: Option<Option<i32>>,
}

impl EngineProcess for EngineThread {
    fn status(&mut self) -> ProcessStatus {
        if let Some(code) = self.exit_code {
            return ProcessStatus::Exited(code);
        }
        match self.handle.take_if(|h| h.is_finished()) {
            Some(handle) => {
                // A panicking engine thread has no exit code.
                let code = handle.join().ok();
                self.exit_code = Some(code);
                ProcessStatus::Exited(code)
            }
            None => ProcessStatus::Running,
        }
    }

    fn terminate(&mut self, grace: Duration) {
        // The thread exits once the transport is dropped; threads cannot
        // be killed, so a wedged one is left detached.
        if let ProcessStatus::Running = self.wait_exit(grace) {
            tracing::warn!("stub engine thread still running after shutdown");
        }
    }
}
