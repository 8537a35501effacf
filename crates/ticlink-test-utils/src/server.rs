//! The engine side of the protocol, driving a [`StubWorld`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ticlink_core::{GameConfig, MultiplayerRole};
use ticlink_ipc::{
    AdvanceReport, BufferLayout, EngineEndpoint, Reply, Request, SharedRegion, PROTOCOL_VERSION,
};

use crate::lobby::{Lobby, Seat};
use crate::world::StubWorld;

/// Build identifier the stub reports at handshake.
pub const ENGINE_VERSION: &str = "ticlink-stub 0.1";

/// Exit code after an orderly shutdown or controller disconnect.
pub const EXIT_OK: i32 = 0;
/// Exit code when the channel broke.
pub const EXIT_CHANNEL: i32 = 2;
/// Exit code when the kill switch fired (mirrors SIGKILL's shell status).
pub const EXIT_KILLED: i32 = 137;

/// Shared flag simulating an external kill of the engine.
///
/// Once triggered, the engine exits without replying to the next request.
#[derive(Clone, Debug, Default)]
pub struct KillSwitch(Arc<AtomicBool>);

impl KillSwitch {
    /// Fresh, untriggered switch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the engine.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the switch has fired.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a stub engine behaves.
#[derive(Clone, Debug)]
pub struct ServeOptions {
    /// Simulated external kill.
    pub kill: KillSwitch,
    /// Where multiplayer matches are found.
    pub lobby: Lobby,
    /// How long a host waits for its players and a client for its host.
    pub match_timeout: Duration,
    /// Reply to the handshake with this error instead of readiness.
    pub refuse_hello: Option<String>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            kill: KillSwitch::new(),
            lobby: Lobby::new(),
            match_timeout: Duration::from_secs(30),
            refuse_hello: None,
        }
    }
}

struct Attached {
    world: StubWorld,
    region: SharedRegion,
}

/// Serve requests from `endpoint` until shutdown, disconnect or kill.
/// Returns the engine's exit code.
pub fn serve(endpoint: &mut dyn EngineEndpoint, options: &ServeOptions) -> i32 {
    let mut attached: Option<Attached> = None;
    loop {
        let envelope = match endpoint.recv() {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                tracing::debug!("controller disconnected");
                return EXIT_OK;
            }
            Err(e) => {
                tracing::warn!(error = %e, "request channel failed");
                return EXIT_CHANNEL;
            }
        };
        if options.kill.is_triggered() {
            tracing::warn!("killed");
            return EXIT_KILLED;
        }
        let shutdown = matches!(envelope.body, Request::Shutdown);
        let reply = handle(&mut attached, envelope.body, options).unwrap_or_else(|message| {
            tracing::debug!(%message, "request failed");
            Reply::Error { message }
        });
        if let Err(e) = endpoint.send(envelope.seq, reply) {
            tracing::warn!(error = %e, "reply channel failed");
            return EXIT_CHANNEL;
        }
        if shutdown {
            tracing::debug!("shutdown requested");
            return EXIT_OK;
        }
    }
}

fn handle(
    attached: &mut Option<Attached>,
    request: Request,
    options: &ServeOptions,
) -> Result<Reply, String> {
    let Some(Attached { world, region }) = attached.as_mut() else {
        return match request {
            Request::Hello {
                protocol_version,
                region_path,
                episode_seed,
                config,
            } => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(format!(
                        "protocol version {protocol_version} unsupported, expected {PROTOCOL_VERSION}"
                    ));
                }
                if let Some(message) = &options.refuse_hello {
                    return Err(message.clone());
                }
                let layout = BufferLayout::for_config(&config);
                let mut region =
                    SharedRegion::open(&region_path, layout).map_err(|e| e.to_string())?;
                let seat = join_match(&config, options)?;
                let mut world = StubWorld::new(config, seat);
                world.start_episode(episode_seed);
                region.mark_ready();
                world.publish(&mut region);
                let reply = Reply::Ready {
                    engine_version: ENGINE_VERSION.into(),
                    player_index: world.player_index(),
                    player_count: world.player_count(),
                    status: world.status(),
                };
                *attached = Some(Attached { world, region });
                Ok(reply)
            }
            other => Err(format!("{} before hello", other.name())),
        };
    };
    match request {
        Request::Hello { .. } => Err("session already established".into()),
        Request::SetAction { values } => {
            world.set_action(&values)?;
            Ok(Reply::Ack)
        }
        Request::Advance {
            tics,
            update_state,
            replaying,
        } => {
            world.set_replaying(replaying);
            let outcome = world.advance(tics);
            thread::sleep(world.real_time(outcome.tics));
            if update_state || world.status().episode_finished {
                world.publish(region);
            }
            Ok(Reply::Advanced(AdvanceReport {
                status: world.status(),
                tics_advanced: outcome.tics,
                scenario_reward: outcome.reward,
                died: outcome.died,
                applied: outcome.applied,
            }))
        }
        Request::NewEpisode { seed } => {
            world.start_episode(seed);
            world.publish(region);
            Ok(Reply::Status(world.status()))
        }
        Request::Respawn => {
            let outcome = world.respawn();
            world.publish(region);
            Ok(Reply::Advanced(AdvanceReport {
                status: world.status(),
                tics_advanced: outcome.tics,
                scenario_reward: outcome.reward,
                died: outcome.died,
                applied: outcome.applied,
            }))
        }
        Request::SaveState { path } => {
            let file = File::create(&path).map_err(|e| format!("{}: {e}", path.display()))?;
            let mut out = BufWriter::new(file);
            world.save(&mut out).map_err(|e| e.to_string())?;
            out.flush().map_err(|e| e.to_string())?;
            Ok(Reply::Ack)
        }
        Request::LoadState { path } => {
            let file = File::open(&path).map_err(|e| format!("{}: {e}", path.display()))?;
            world
                .load(&mut BufReader::new(file))
                .map_err(|e| e.to_string())?;
            world.publish(region);
            Ok(Reply::Status(world.status()))
        }
        Request::GameCommand { command } => {
            world.command(&command)?;
            Ok(Reply::Ack)
        }
        Request::Shutdown => Ok(Reply::Ack),
    }
}

fn join_match(config: &GameConfig, options: &ServeOptions) -> Result<Option<Seat>, String> {
    match &config.multiplayer {
        MultiplayerRole::Solo => Ok(None),
        MultiplayerRole::Host { players, port } => options
            .lobby
            .host(*port, *players, options.match_timeout)
            .map(Some),
        MultiplayerRole::Client { port, .. } => {
            options.lobby.join(*port, options.match_timeout).map(Some)
        }
    }
}
