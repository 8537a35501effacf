//! Multiplayer matches shared between stub engines of one process.
//!
//! A host opens a match on a port and blocks until every participant has
//! joined; clients join by port. Each participant keeps its own clock;
//! the match only shares the scoreboard, pending deaths and the host tic.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ticlink_core::{PlayerIndex, PlayerInfo, ServerState, Tic};

#[derive(Debug, Default)]
struct Participant {
    name: String,
    in_game: bool,
    frags: i32,
    pending_death: bool,
    last_action_tic: u64,
    last_kill_tic: u64,
}

#[derive(Debug)]
struct Match {
    capacity: u8,
    host_tic: u64,
    seats: Vec<Participant>,
}

#[derive(Debug, Default)]
struct Shared {
    matches: Mutex<HashMap<u16, Match>>,
    changed: Condvar,
}

/// Registry of open matches, cloned into every engine that may take part.
#[derive(Clone, Debug, Default)]
pub struct Lobby {
    shared: Arc<Shared>,
}

impl Lobby {
    /// Empty lobby.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u16, Match>> {
        self.shared
            .matches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a match for `players` participants on `port` and wait for all
    /// of them to join.
    pub fn host(&self, port: u16, players: u8, timeout: Duration) -> Result<Seat, String> {
        {
            let mut matches = self.lock();
            if matches.contains_key(&port) {
                return Err(format!("port {port} already hosts a match"));
            }
            matches.insert(
                port,
                Match {
                    capacity: players,
                    host_tic: 0,
                    seats: vec![Participant {
                        name: "Player1".into(),
                        in_game: true,
                        ..Participant::default()
                    }],
                },
            );
            self.shared.changed.notify_all();
        }
        let deadline = Instant::now() + timeout;
        let mut matches = self.lock();
        loop {
            let full = matches
                .get(&port)
                .is_some_and(|m| m.seats.len() >= m.capacity as usize);
            if full {
                return Ok(Seat {
                    lobby: self.clone(),
                    port,
                    index: 0,
                });
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                matches.remove(&port);
                return Err(format!("timed out waiting for {players} players"));
            }
            matches = self
                .shared
                .changed
                .wait_timeout(matches, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Join the match hosted on `port`, waiting for the host to open it.
    pub fn join(&self, port: u16, timeout: Duration) -> Result<Seat, String> {
        let deadline = Instant::now() + timeout;
        let mut matches = self.lock();
        loop {
            if let Some(m) = matches.get_mut(&port) {
                if m.seats.len() >= m.capacity as usize {
                    return Err(format!("match on port {port} is full"));
                }
                let index = m.seats.len() as u8;
                m.seats.push(Participant {
                    name: format!("Player{}", index + 1),
                    in_game: true,
                    ..Participant::default()
                });
                self.shared.changed.notify_all();
                return Ok(Seat {
                    lobby: self.clone(),
                    port,
                    index,
                });
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(format!("no match hosted on port {port}"));
            }
            matches = self
                .shared
                .changed
                .wait_timeout(matches, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// One participant's place in a match. Leaving the match on drop.
#[derive(Debug)]
pub struct Seat {
    lobby: Lobby,
    port: u16,
    index: u8,
}

impl Seat {
    fn with<T>(&self, f: impl FnOnce(&mut Match) -> T) -> Option<T> {
        self.lobby.lock().get_mut(&self.port).map(f)
    }

    /// This participant's slot.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Participants currently in the game.
    pub fn player_count(&self) -> u8 {
        self.with(|m| m.seats.iter().filter(|p| p.in_game).count() as u8)
            .unwrap_or(1)
    }

    /// Note a tic in which this participant acted. The host's tic also
    /// becomes the match clock.
    pub fn acted(&self, tic: u64, active: bool) {
        let index = self.index as usize;
        self.with(|m| {
            if index == 0 {
                m.host_tic = tic;
            }
            if active {
                if let Some(p) = m.seats.get_mut(index) {
                    p.last_action_tic = tic;
                }
            }
        });
    }

    /// Credit this participant with a frag on the next other player in the
    /// game, who dies on their next tic. Returns the victim's slot.
    pub fn frag(&self, tic: u64) -> Option<u8> {
        let index = self.index as usize;
        self.with(|m| {
            let n = m.seats.len();
            let victim = (1..n)
                .map(|k| (index + k) % n)
                .find(|&i| m.seats[i].in_game && !m.seats[i].pending_death)?;
            m.seats[victim].pending_death = true;
            let me = &mut m.seats[index];
            me.frags += 1;
            me.last_kill_tic = tic;
            Some(victim as u8)
        })
        .flatten()
    }

    /// Consume a death inflicted by another participant.
    pub fn take_pending_death(&self) -> bool {
        let index = self.index as usize;
        self.with(|m| {
            m.seats
                .get_mut(index)
                .is_some_and(|p| std::mem::take(&mut p.pending_death))
        })
        .unwrap_or(false)
    }

    /// This participant's frag count.
    pub fn frags(&self) -> i32 {
        let index = self.index as usize;
        self.with(|m| m.seats.get(index).map_or(0, |p| p.frags))
            .unwrap_or(0)
    }

    /// The match as the engine publishes it.
    pub fn server_state(&self) -> ServerState {
        self.with(|m| ServerState {
            tic: Tic(m.host_tic),
            player_count: m.seats.iter().filter(|p| p.in_game).count() as u8,
            players: m
                .seats
                .iter()
                .enumerate()
                .map(|(i, p)| PlayerInfo {
                    index: PlayerIndex(i as u8),
                    in_game: p.in_game,
                    afk: m.host_tic.saturating_sub(p.last_action_tic) > AFK_TICS,
                    frag_count: p.frags,
                    name: p.name.clone(),
                    last_action_tic: Tic(p.last_action_tic),
                    last_kill_tic: Tic(p.last_kill_tic),
                })
                .collect(),
        })
        .unwrap_or(ServerState {
            tic: Tic(0),
            player_count: 0,
            players: Vec::new(),
        })
    }
}

/// Idle tics after which a participant counts as away from keyboard.
pub const AFK_TICS: u64 = 35 * 10;

impl Drop for Seat {
    fn drop(&mut self) {
        let index = self.index as usize;
        let mut matches = self.lobby.lock();
        let empty = match matches.get_mut(&self.port) {
            Some(m) => {
                if let Some(p) = m.seats.get_mut(index) {
                    p.in_game = false;
                }
                m.seats.iter().all(|p| !p.in_game)
            }
            None => false,
        };
        if empty {
            matches.remove(&self.port);
        }
        self.lobby.shared.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn host_waits_for_clients() {
        let lobby = Lobby::new();
        let client_lobby = lobby.clone();
        let client = thread::spawn(move || client_lobby.join(5029, Duration::from_secs(5)));
        let host = lobby.host(5029, 2, Duration::from_secs(5)).unwrap();
        let client = client.join().unwrap().unwrap();
        assert_eq!(host.index(), 0);
        assert_eq!(client.index(), 1);
        assert_eq!(host.player_count(), 2);

        assert_eq!(host.frag(7), Some(1));
        assert!(client.take_pending_death());
        assert!(!client.take_pending_death());
        let state = client.server_state();
        assert_eq!(state.players[0].frag_count, 1);
        assert_eq!(state.players[0].last_kill_tic, Tic(7));

        drop(client);
        assert_eq!(host.player_count(), 1);
    }

    #[test]
    fn host_times_out_without_players() {
        let lobby = Lobby::new();
        let err = lobby.host(6000, 3, Duration::from_millis(20)).unwrap_err();
        assert!(err.contains("timed out"));
        // The port is free again.
        let solo = lobby.host(6000, 1, Duration::from_millis(20)).unwrap();
        assert_eq!(solo.player_count(), 1);
    }
}
