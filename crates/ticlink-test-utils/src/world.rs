//! Deterministic stand-in for a game engine's simulation.
//!
//! The scenario is a single square room with a handful of monsters. Moving
//! changes the player's position, attacking may kill a monster (paying
//! [`KILL_REWARD`]) and, in multiplayer, may frag another participant.
//! Killing every monster ends a single-player episode. Environmental
//! damage is off unless enabled with the `+stub_hazard <n>` game argument
//! (one hit per `n` tics on average).
//!
//! Everything random is drawn from a ChaCha8 generator seeded with the
//! episode seed, and only on tics whose input asks for it, so the same
//! seed and the same actions always produce the same episode.

use std::io::{Read, Write};
use std::time::Duration;

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ticlink_core::{
    Button, GameConfig, GameVariable, Label, Line, Object, Sector, ServerState, StateNumber, Tic,
};
use ticlink_ipc::codec::{
    read_bool, read_f64_le, read_u32_le, read_u64_le, write_bool, write_f64_le, write_u32_le,
    write_u64_le, WireError,
};
use ticlink_ipc::{EngineStatus, InputSpan, RegionStatus, SharedRegion};

use crate::lobby::Seat;

/// Scenario reward for killing a monster.
pub const KILL_REWARD: f64 = 1.0;

/// Player health at spawn.
pub const START_HEALTH: f64 = 100.0;

/// Health lost per environmental hit.
pub const HAZARD_DAMAGE: f64 = 25.0;

/// Half the side length of the room.
const ROOM_HALF: f64 = 256.0;

const SAVE_MAGIC: [u8; 4] = *b"TLSS";

/// Result of running one or more tics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TicOutcome {
    /// Tics actually run.
    pub tics: u32,
    /// Scenario reward over those tics.
    pub reward: f64,
    /// Whether the player died.
    pub died: bool,
    /// Input applied tic by tic, run-length encoded. Filled in spectator
    /// modes only.
    pub applied: Vec<InputSpan>,
}

/// The stub scenario's full state.
#[derive(Debug)]
pub struct StubWorld {
    config: GameConfig,
    seat: Option<Seat>,
    player_index: u8,
    hazard: Option<u32>,
    rng: ChaCha8Rng,
    tic: u64,
    episode_tic: u64,
    action: Vec<f64>,
    applied: Vec<f64>,
    replaying: bool,
    position: [f64; 2],
    angle: f64,
    health: f64,
    kills: u32,
    monsters: u32,
    deaths: u32,
    hits_taken: u32,
    damage_taken: f64,
    dead: bool,
    finished: bool,
    state_number: StateNumber,
    notifications: Vec<String>,
}

fn parse_hazard(args: &[String]) -> Option<u32> {
    let at = args.iter().position(|a| a == "+stub_hazard")?;
    args.get(at + 1)?.parse().ok().filter(|&n| n > 0)
}

impl StubWorld {
    /// A world for `config`, optionally seated in a multiplayer match.
    /// No episode is running until [`start_episode`](Self::start_episode).
    pub fn new(config: GameConfig, seat: Option<Seat>) -> Self {
        let buttons = config.buttons.len();
        Self {
            hazard: parse_hazard(&config.game_args),
            player_index: seat.as_ref().map_or(0, Seat::index),
            seat,
            config,
            rng: ChaCha8Rng::seed_from_u64(0),
            tic: 0,
            episode_tic: 0,
            action: vec![0.0; buttons],
            applied: vec![0.0; buttons],
            replaying: false,
            position: [0.0; 2],
            angle: 0.0,
            health: START_HEALTH,
            kills: 0,
            monsters: 0,
            deaths: 0,
            hits_taken: 0,
            damage_taken: 0.0,
            dead: false,
            finished: true,
            state_number: StateNumber::default(),
            notifications: Vec::new(),
        }
    }

    /// This player's slot.
    pub fn player_index(&self) -> u8 {
        self.player_index
    }

    /// Participants in the game.
    pub fn player_count(&self) -> u8 {
        self.seat.as_ref().map_or(1, Seat::player_count)
    }

    fn is_multiplayer(&self) -> bool {
        self.seat.is_some()
    }

    /// Reset for a fresh episode and run the configured start time.
    pub fn start_episode(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.episode_tic = 0;
        self.action.iter_mut().for_each(|v| *v = 0.0);
        self.position = [0.0; 2];
        self.angle = 0.0;
        self.health = START_HEALTH;
        self.kills = 0;
        self.monsters = 3 + self.rng.next_u32() % 3;
        self.hits_taken = 0;
        self.damage_taken = 0.0;
        self.dead = false;
        self.finished = false;
        self.notifications.clear();
        for _ in 0..self.config.episode_start_time {
            if self.finished {
                break;
            }
            self.tick();
        }
    }

    /// Action applied from the next tic on.
    pub fn set_action(&mut self, values: &[f64]) -> Result<(), String> {
        if values.len() != self.action.len() {
            return Err(format!(
                "action has {} values, {} buttons configured",
                values.len(),
                self.action.len()
            ));
        }
        self.action.copy_from_slice(values);
        Ok(())
    }

    /// Wall-clock time `tics` tics take: nothing in synchronous modes,
    /// `tics / ticrate` seconds in real-time ones.
    pub fn real_time(&self, tics: u32) -> Duration {
        if self.config.mode.is_async() {
            Duration::from_secs_f64(tics as f64 / self.config.ticrate.max(1) as f64)
        } else {
            Duration::ZERO
        }
    }

    /// While set, spectator modes apply the controller's action instead
    /// of the human's.
    pub fn set_replaying(&mut self, replaying: bool) {
        self.replaying = replaying;
    }

    /// Run up to `tics` tics, stopping early when the episode ends.
    pub fn advance(&mut self, tics: u32) -> TicOutcome {
        let mut outcome = TicOutcome::default();
        let spectator = self.config.mode.is_spectator();
        for _ in 0..tics {
            if self.finished {
                break;
            }
            let (reward, died) = self.tick();
            outcome.tics += 1;
            outcome.reward += reward;
            outcome.died |= died;
            if spectator {
                match outcome.applied.last_mut() {
                    Some(span) if span.values == self.applied => span.tics += 1,
                    _ => outcome.applied.push(InputSpan {
                        tics: 1,
                        values: self.applied.clone(),
                    }),
                }
            }
        }
        outcome
    }

    /// Bring a dead player back; takes one tic. Does nothing for the
    /// living.
    pub fn respawn(&mut self) -> TicOutcome {
        if !self.dead || self.finished {
            return TicOutcome::default();
        }
        self.dead = false;
        self.health = START_HEALTH;
        self.position = [0.0; 2];
        self.notifications.push("Player respawned.".into());
        self.advance(1)
    }

    /// Handle a console command.
    pub fn command(&mut self, command: &str) -> Result<(), String> {
        match command.trim() {
            "" => Err("empty command".into()),
            "kill" => {
                if !self.dead && !self.finished {
                    self.die();
                    if !self.is_multiplayer() {
                        self.finished = true;
                    }
                }
                Ok(())
            }
            "give health" => {
                self.health = START_HEALTH;
                Ok(())
            }
            other => {
                self.notifications.push(format!("Unknown command \"{other}\""));
                Ok(())
            }
        }
    }

    fn die(&mut self) {
        self.dead = true;
        self.health = 0.0;
        self.deaths += 1;
        self.notifications.push("Player died.".into());
    }

    /// The input applied this tic: the controller's, or in spectator modes
    /// a scripted "human" tapping the first button on even tics.
    fn input(&self) -> Vec<f64> {
        if self.config.mode.is_spectator() && !self.replaying {
            let mut v = vec![0.0; self.action.len()];
            if let Some(first) = v.first_mut() {
                *first = (self.episode_tic % 2 == 0) as u8 as f64;
            }
            v
        } else {
            self.action.clone()
        }
    }

    fn tick(&mut self) -> (f64, bool) {
        self.tic += 1;
        self.episode_tic += 1;
        let mut reward = 0.0;
        let mut died = false;

        if self.seat.as_ref().is_some_and(Seat::take_pending_death) && !self.dead {
            self.die();
            died = true;
        }

        let input = self.input();
        let active = input.iter().any(|&v| v != 0.0);
        if let Some(seat) = &self.seat {
            seat.acted(self.tic, active && !self.dead);
        }
        if !self.dead {
            let buttons: Vec<Button> = self.config.buttons.keys().copied().collect();
            for (button, &v) in buttons.into_iter().zip(&input) {
                if v == 0.0 {
                    continue;
                }
                match button {
                    Button::MoveForward => self.position[0] += v,
                    Button::MoveBackward => self.position[0] -= v,
                    Button::MoveRight => self.position[1] += v,
                    Button::MoveLeft => self.position[1] -= v,
                    Button::MoveForwardBackwardDelta => self.position[0] += v,
                    Button::MoveLeftRightDelta => self.position[1] += v,
                    Button::TurnLeft => self.angle += v,
                    Button::TurnRight => self.angle -= v,
                    Button::TurnLeftRightDelta => self.angle += v,
                    Button::Attack => reward += self.attack(),
                    _ => {}
                }
            }
            self.position = self.position.map(|c| c.clamp(-ROOM_HALF, ROOM_HALF));
            self.angle = self.angle.rem_euclid(360.0);

            if let Some(n) = self.hazard {
                if self.rng.next_u32() % n == 0 {
                    self.hits_taken += 1;
                    self.damage_taken += HAZARD_DAMAGE;
                    self.health -= HAZARD_DAMAGE;
                    if self.health <= 0.0 {
                        self.die();
                        died = true;
                    }
                }
            }
        }
        self.applied = input;

        if died && !self.is_multiplayer() {
            self.finished = true;
        }
        if !self.is_multiplayer() && self.monsters == 0 {
            self.finished = true;
        }
        if let Some(timeout) = self.config.episode_timeout {
            if self.episode_tic >= timeout {
                self.finished = true;
            }
        }
        (reward, died)
    }

    fn attack(&mut self) -> f64 {
        let roll = self.rng.next_u32();
        if self.monsters > 0 && roll % 4 == 0 {
            self.monsters -= 1;
            self.kills += 1;
            self.notifications.push("Monster killed.".into());
            return KILL_REWARD;
        }
        if roll % 8 == 1 {
            if let Some(victim) = self.seat.as_ref().and_then(|s| s.frag(self.tic)) {
                self.notifications.push(format!("Fragged Player{}.", victim + 1));
            }
        }
        0.0
    }

    /// Value of one game variable.
    pub fn variable(&self, variable: GameVariable) -> f64 {
        match variable {
            GameVariable::KillCount => self.kills as f64,
            GameVariable::DeathCount => self.deaths as f64,
            GameVariable::FragCount => self.seat.as_ref().map_or(0, Seat::frags) as f64,
            GameVariable::HitsTaken => self.hits_taken as f64,
            GameVariable::DamageTaken => self.damage_taken,
            GameVariable::Health => self.health,
            GameVariable::Dead => self.dead as u8 as f64,
            GameVariable::AttackReady => (!self.dead) as u8 as f64,
            GameVariable::SelectedWeapon => 2.0,
            GameVariable::SelectedWeaponAmmo => 50.0,
            GameVariable::PositionX => self.position[0],
            GameVariable::PositionY => self.position[1],
            GameVariable::Angle => self.angle,
            GameVariable::PlayerNumber => self.player_index as f64,
            GameVariable::PlayerCount => self.player_count() as f64,
            _ => 0.0,
        }
    }

    /// Current status; `state_number` is the last published one.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            tic: Tic(self.tic),
            episode_tic: self.episode_tic,
            state_number: self.state_number,
            dead: self.dead,
            episode_finished: self.finished,
        }
    }

    /// Write a complete observation into `region` and publish it.
    pub fn publish(&mut self, region: &mut SharedRegion) {
        let shape = region.layout().shape;
        let shade = (self.position[0] as i64 + self.episode_tic as i64) as u8;
        region.screen_mut().fill(shade);
        if let Some(depth) = region.depth_mut() {
            depth.fill((self.angle / 360.0 * 255.0) as u8);
        }
        if let Some(labels) = region.labels_buffer_mut() {
            labels.fill(0);
        }
        if let Some(automap) = region.automap_mut() {
            automap.fill(0x20);
        }
        let samples = self.config.audio_samples_per_channel() as usize * 2;
        region.write_audio(&vec![0i16; samples]);

        let values: Vec<f64> = self
            .config
            .variables
            .iter()
            .map(|&v| self.variable(v))
            .collect();
        region.write_variables(&values);
        region.write_last_action(&self.applied);
        region.write_notifications(&self.notifications.join("\n"));
        self.notifications.clear();

        let monsters = self.monster_objects();
        let labels: Vec<Label> = monsters
            .iter()
            .enumerate()
            .map(|(i, m)| Label {
                value: (i + 1) as u8,
                x: (i as u32 * 40) % shape.width.max(1),
                y: shape.height / 2,
                width: 16,
                height: 24,
                object_id: m.id,
                object_name: m.name.clone(),
                object_position: m.position,
                object_angle: m.orientation[0],
            })
            .collect();
        region.write_labels(&labels);
        let mut objects = vec![Object {
            id: 0,
            name: "DoomPlayer".into(),
            position: [self.position[0], self.position[1], 0.0],
            orientation: [self.angle, 0.0, 0.0],
            velocity: [0.0; 3],
        }];
        objects.extend(monsters);
        region.write_objects(&objects);
        region.write_sectors(&[room()]);
        if let Some(seat) = &self.seat {
            let state: ServerState = seat.server_state();
            region.write_server_state(&state);
        }

        self.state_number = self.state_number.next();
        region.publish(RegionStatus {
            state_number: self.state_number,
            tic: Tic(self.tic),
            episode_tic: self.episode_tic,
            dead: self.dead,
            finished: self.finished,
        });
    }

    fn monster_objects(&self) -> Vec<Object> {
        (0..self.monsters)
            .map(|i| Object {
                id: 100 + i as u64,
                name: "Zombieman".into(),
                position: [ROOM_HALF / 2.0, i as f64 * 64.0 - 64.0, 0.0],
                orientation: [180.0, 0.0, 0.0],
                velocity: [0.0; 3],
            })
            .collect()
    }

    // ── Save / load ────────────────────────────────────────────────

    /// Serialize the simulation state.
    pub fn save(&self, w: &mut dyn Write) -> Result<(), WireError> {
        w.write_all(&SAVE_MAGIC)?;
        w.write_all(&self.rng.get_seed())?;
        let pos = self.rng.get_word_pos();
        write_u64_le(w, (pos >> 64) as u64)?;
        write_u64_le(w, pos as u64)?;
        write_u64_le(w, self.tic)?;
        write_u64_le(w, self.episode_tic)?;
        write_f64_le(w, self.position[0])?;
        write_f64_le(w, self.position[1])?;
        write_f64_le(w, self.angle)?;
        write_f64_le(w, self.health)?;
        write_u32_le(w, self.kills)?;
        write_u32_le(w, self.monsters)?;
        write_u32_le(w, self.deaths)?;
        write_u32_le(w, self.hits_taken)?;
        write_f64_le(w, self.damage_taken)?;
        write_bool(w, self.dead)?;
        write_bool(w, self.finished)?;
        Ok(())
    }

    /// Restore a state written by [`save`](Self::save).
    pub fn load(&mut self, r: &mut dyn Read) -> Result<(), WireError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != SAVE_MAGIC {
            return Err(WireError::Malformed {
                detail: "not a stub save file".into(),
            });
        }
        let mut seed = [0u8; 32];
        r.read_exact(&mut seed)?;
        let hi = read_u64_le(r)? as u128;
        let lo = read_u64_le(r)? as u128;
        let mut rng = ChaCha8Rng::from_seed(seed);
        rng.set_word_pos(hi << 64 | lo);
        self.rng = rng;
        self.tic = read_u64_le(r)?;
        self.episode_tic = read_u64_le(r)?;
        self.position = [read_f64_le(r)?, read_f64_le(r)?];
        self.angle = read_f64_le(r)?;
        self.health = read_f64_le(r)?;
        self.kills = read_u32_le(r)?;
        self.monsters = read_u32_le(r)?;
        self.deaths = read_u32_le(r)?;
        self.hits_taken = read_u32_le(r)?;
        self.damage_taken = read_f64_le(r)?;
        self.dead = read_bool(r)?;
        self.finished = read_bool(r)?;
        self.action.iter_mut().for_each(|v| *v = 0.0);
        self.notifications.clear();
        Ok(())
    }
}

fn room() -> Sector {
    let h = ROOM_HALF;
    let corners = [[-h, -h], [h, -h], [h, h], [-h, h]];
    Sector {
        floor_height: 0.0,
        ceiling_height: 128.0,
        lines: (0..4)
            .map(|i| Line {
                start: corners[i],
                end: corners[(i + 1) % 4],
                is_blocking: true,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(buttons: &[Button]) -> GameConfig {
        let mut c = GameConfig::default();
        for &b in buttons {
            c.buttons.insert(b, 0.0);
        }
        c
    }

    fn run(seed: u64, actions: &[[f64; 2]]) -> Vec<(f64, f64)> {
        let mut world = StubWorld::new(config(&[Button::MoveForward, Button::Attack]), None);
        world.start_episode(seed);
        actions
            .iter()
            .map(|a| {
                world.set_action(a).unwrap();
                world.advance(1);
                (
                    world.variable(GameVariable::PositionX),
                    world.variable(GameVariable::KillCount),
                )
            })
            .collect()
    }

    #[test]
    fn same_seed_and_actions_replay_identically() {
        let actions = [[1.0, 1.0], [0.0, 1.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        assert_eq!(run(11, &actions), run(11, &actions));
    }

    #[test]
    fn moving_forward_earns_nothing() {
        let mut world = StubWorld::new(config(&[Button::MoveForward, Button::Attack]), None);
        world.start_episode(3);
        world.set_action(&[1.0, 0.0]).unwrap();
        let outcome = world.advance(4);
        assert_eq!(
            outcome,
            TicOutcome {
                tics: 4,
                reward: 0.0,
                died: false,
                applied: Vec::new(),
            }
        );
        assert_eq!(world.variable(GameVariable::PositionX), 4.0);
        assert_eq!(world.status().episode_tic, 4);
    }

    #[test]
    fn timeout_finishes_and_stops_advancing() {
        let mut c = config(&[Button::MoveForward]);
        c.episode_timeout = Some(10);
        let mut world = StubWorld::new(c, None);
        world.start_episode(1);
        assert_eq!(world.advance(25).tics, 10);
        assert!(world.status().episode_finished);
        assert_eq!(world.advance(1).tics, 0);
    }

    #[test]
    fn start_time_runs_before_handover() {
        let mut c = config(&[Button::MoveForward]);
        c.episode_start_time = 5;
        let mut world = StubWorld::new(c, None);
        world.start_episode(1);
        assert_eq!(world.status().episode_tic, 5);
    }

    #[test]
    fn hazard_eventually_kills_single_player() {
        let mut c = config(&[Button::MoveForward]);
        c.game_args = vec!["+stub_hazard".into(), "1".into()];
        let mut world = StubWorld::new(c, None);
        world.start_episode(9);
        let outcome = world.advance(10);
        assert!(outcome.died);
        assert_eq!(outcome.tics, 4);
        assert!(world.status().dead);
        assert!(world.status().episode_finished);
    }

    #[test]
    fn save_load_restores_rng_and_state() {
        let mut world = StubWorld::new(config(&[Button::MoveForward, Button::Attack]), None);
        world.start_episode(21);
        world.set_action(&[1.0, 1.0]).unwrap();
        world.advance(2);
        let mut saved = Vec::new();
        world.save(&mut saved).unwrap();
        let after_save = world.advance(6);
        let x = world.variable(GameVariable::PositionX);

        world.load(&mut saved.as_slice()).unwrap();
        world.set_action(&[1.0, 1.0]).unwrap();
        assert_eq!(world.advance(6), after_save);
        assert_eq!(world.variable(GameVariable::PositionX), x);
    }

    #[test]
    fn spectator_reports_the_human_input_per_tic() {
        let mut c = config(&[Button::MoveForward, Button::Attack]);
        c.mode = ticlink_core::Mode::Spectator;
        let mut world = StubWorld::new(c, None);
        world.start_episode(5);
        world.set_action(&[0.0, 1.0]).unwrap();
        let outcome = world.advance(3);
        let inputs: Vec<(u32, Vec<f64>)> = outcome
            .applied
            .into_iter()
            .map(|s| (s.tics, s.values))
            .collect();
        assert_eq!(
            inputs,
            vec![(1, vec![0.0, 0.0]), (1, vec![1.0, 0.0]), (1, vec![0.0, 0.0])]
        );

        world.set_replaying(true);
        let outcome = world.advance(2);
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].tics, 2);
        assert_eq!(outcome.applied[0].values, vec![0.0, 1.0]);
    }

    #[test]
    fn wrong_action_length_rejected() {
        let mut world = StubWorld::new(config(&[Button::MoveForward]), None);
        assert!(world.set_action(&[1.0, 0.0]).is_err());
    }
}
