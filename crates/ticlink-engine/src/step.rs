//! Tic stepping and reward accounting.
//!
//! Every advance earns the living reward once per tic actually run, plus
//! whatever the scenario paid out, minus the death penalty on the advance
//! that killed the player. Rewards accrue whether or not the advance
//! refreshed the published state.

use std::time::Duration;

use ticlink_core::{ActionVector, ChannelError, GameState, GameVariable, Tic};
use ticlink_ipc::{AdvanceReport, Reply, Request};

use crate::config::EngineConfig;
use crate::error::SessionError;
use crate::session::{unexpected_reply, Session};

// ── RewardLedger ───────────────────────────────────────────────────

/// Per-episode reward totals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RewardLedger {
    last: f64,
    total: f64,
}

impl RewardLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reward of one engine advance.
    pub fn advance_reward(
        tics: u32,
        scenario_reward: f64,
        died: bool,
        living_reward: f64,
        death_penalty: f64,
    ) -> f64 {
        let penalty = if died { death_penalty } else { 0.0 };
        living_reward * tics as f64 + scenario_reward - penalty
    }

    /// Start a new step: the last reward restarts from zero.
    pub fn begin_step(&mut self) {
        self.last = 0.0;
    }

    /// Add `reward` to the current step and the episode total.
    pub fn accrue(&mut self, reward: f64) {
        self.last += reward;
        self.total += reward;
    }

    /// Reward of the most recent step.
    pub fn last(&self) -> f64 {
        self.last
    }

    /// Reward accumulated since the episode started.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Forget everything (new episode).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ── Stepping ───────────────────────────────────────────────────────

impl Session {
    /// Set the action applied by subsequent advances.
    ///
    /// Values are normalized against the configured buttons: binary
    /// buttons press on any non-zero value, delta buttons clamp to their
    /// maximum. While replaying, submitted actions are validated and then
    /// ignored in favour of the recorded ones.
    pub fn set_action(&mut self, values: &[f64]) -> Result<(), SessionError> {
        self.ensure_running("set_action")?;
        let action = ActionVector::new(&self.config.buttons, values)?;
        let live = self.live_mut("set_action")?;
        if live.replay.is_some() {
            tracing::trace!("replaying; submitted action ignored");
            return Ok(());
        }
        if live.action != action {
            live.action = action;
            live.action_sent = false;
        }
        Ok(())
    }

    /// Run `tics` tics with the current action.
    ///
    /// With `update_state` false the engine skips publishing a new state;
    /// rewards still accrue for every tic. A zero-tic advance sends nothing
    /// and leaves a last reward of zero.
    pub fn advance_action(&mut self, tics: u32, update_state: bool) -> Result<(), SessionError> {
        let live = self.live_mut("advance_action")?;
        if live.status.episode_finished {
            return Err(SessionError::EpisodeFinished);
        }
        live.ledger.begin_step();
        if tics == 0 {
            return Ok(());
        }
        if live.replay.is_some() {
            return self.advance_replay(tics, update_state);
        }
        self.push_action()?;
        self.advance_tics(tics, update_state, false)?;
        Ok(())
    }

    /// Set `values`, advance `tics` tics with a state update and return
    /// the reward earned.
    pub fn make_action(&mut self, values: &[f64], tics: u32) -> Result<f64, SessionError> {
        self.set_action(values)?;
        self.advance_action(tics, true)?;
        Ok(self.last_reward())
    }

    /// Drive the engine from the loaded record.
    fn advance_replay(&mut self, tics: u32, update_state: bool) -> Result<(), SessionError> {
        let button_count = self.config.buttons.len();
        let mut remaining = tics as u64;
        while remaining > 0 {
            let live = self.live_mut("advance_action")?;
            if live.status.episode_finished {
                break;
            }
            let Some(recording) = live.replay.as_ref() else {
                break;
            };
            let segment = recording.segment_at(live.status.episode_tic);
            if segment.tics == 0 {
                tracing::debug!(
                    episode_tic = live.status.episode_tic,
                    "replay reached the end of its record"
                );
                live.status.episode_finished = true;
                break;
            }
            let action = match segment.values {
                Some(values) => ActionVector::from_normalized(values),
                None => ActionVector::idle(button_count),
            };
            let chunk = segment.tics.min(remaining) as u32;
            if live.action != action {
                live.action = action;
                live.action_sent = false;
            }
            self.push_action()?;
            let advanced = self.advance_tics(chunk, update_state, true)?;
            if advanced == 0 {
                break;
            }
            remaining -= advanced as u64;
        }
        Ok(())
    }

    /// Send the pending action if the engine does not have it yet.
    pub(crate) fn push_action(&mut self) -> Result<(), SessionError> {
        let live = self.live_mut("set_action")?;
        if live.action_sent {
            return Ok(());
        }
        let values = live.action.values().to_vec();
        match self.call("set_action", Request::SetAction { values }, Duration::ZERO)? {
            Reply::Ack => {}
            other => return Err(unexpected_reply("ack", &other)),
        }
        self.live_mut("set_action")?.action_sent = true;
        Ok(())
    }

    /// One `Advance` round trip; returns the tics actually run.
    fn advance_tics(
        &mut self,
        tics: u32,
        update_state: bool,
        replaying: bool,
    ) -> Result<u32, SessionError> {
        let pacing = if self.config.mode.is_async() {
            EngineConfig::pacing_allowance(tics, self.config.ticrate)
        } else {
            Duration::ZERO
        };
        let request = Request::Advance {
            tics,
            update_state,
            replaying,
        };
        let report = match self.call("advance_action", request, pacing)? {
            Reply::Advanced(report) => report,
            other => return Err(unexpected_reply("advanced", &other)),
        };
        let advanced = report.tics_advanced;
        self.absorb(report, true)?;
        Ok(advanced)
    }

    /// Account for an engine advance: check the published state, book the
    /// reward and extend the active recording.
    pub(crate) fn absorb(&mut self, report: AdvanceReport, record: bool) -> Result<(), SessionError> {
        let living = self.config.living_reward;
        let penalty = self.config.death_penalty;
        let spectator = self.config.mode.is_spectator();
        let live = self.live_mut("advance_action")?;
        live.region.check_published(report.status.state_number)?;

        let reward = RewardLedger::advance_reward(
            report.tics_advanced,
            report.scenario_reward,
            report.died,
            living,
            penalty,
        );
        live.ledger.accrue(reward);

        let mut start = live.status.episode_tic;
        live.status = report.status;
        if record && report.tics_advanced > 0 {
            if let Some(recorder) = live.recorder.as_mut() {
                if spectator {
                    // What the human did, tic by tic, not what was sent.
                    let covered: u64 = report.applied.iter().map(|s| s.tics as u64).sum();
                    if covered != report.tics_advanced as u64 {
                        return Err(SessionError::Channel(ChannelError::Protocol {
                            detail: format!(
                                "engine reported input for {covered} of {} tics",
                                report.tics_advanced
                            ),
                        }));
                    }
                    for span in &report.applied {
                        recorder.record_action(start, span.tics, &span.values)?;
                        start += span.tics as u64;
                    }
                } else {
                    recorder.record_action(start, report.tics_advanced, live.action.values())?;
                }
            }
        }
        if report.status.episode_finished {
            tracing::debug!(
                episode_tic = report.status.episode_tic,
                total_reward = live.ledger.total(),
                "episode finished"
            );
            live.stop_recording()?;
        }
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Reward of the most recent step (`0.0` before the first).
    pub fn last_reward(&self) -> f64 {
        self.live.as_ref().map_or(0.0, |l| l.ledger.last())
    }

    /// Reward accumulated since the current episode started.
    pub fn total_reward(&self) -> f64 {
        self.live.as_ref().map_or(0.0, |l| l.ledger.total())
    }

    /// Whether the current episode has ended. `false` when not running.
    pub fn is_episode_finished(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|l| l.status.episode_finished)
    }

    /// Whether the player is dead.
    pub fn is_player_dead(&self) -> bool {
        self.live.as_ref().is_some_and(|l| l.status.dead)
    }

    /// Tics since the current episode started.
    pub fn episode_time(&self) -> u64 {
        self.live.as_ref().map_or(0, |l| l.status.episode_tic)
    }

    /// Engine tic.
    pub fn tic(&self) -> Tic {
        self.live.as_ref().map_or(Tic::default(), |l| l.status.tic)
    }

    /// The action the engine last applied (the human's input in spectator
    /// modes).
    pub fn last_action(&mut self) -> Result<Vec<f64>, SessionError> {
        Ok(self.touch("last_action")?.region.last_action())
    }

    /// The most recently published state, borrowed from the shared buffer.
    ///
    /// `None` once the episode has finished. The borrow ends before the
    /// next step can run, so a state never changes underneath its reader;
    /// use [`GameState::to_owned_state`] to keep one.
    pub fn state(&mut self) -> Result<Option<GameState<'_>>, SessionError> {
        let live = self.touch("state")?;
        if live.status.episode_finished {
            return Ok(None);
        }
        Ok(Some(live.region.game_state()))
    }

    /// Current value of one configured game variable; `None` when
    /// `variable` is not among the available ones.
    pub fn game_variable(&mut self, variable: GameVariable) -> Result<Option<f64>, SessionError> {
        let index = self.config.variables.get_index_of(&variable);
        let live = self.touch("game_variable")?;
        let state = live.region.game_state();
        Ok(index.and_then(|i| state.game_variables.get()?.get(i).copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn advance_reward_combines_living_scenario_and_death() {
        assert_eq!(RewardLedger::advance_reward(4, 0.0, false, -0.5, 100.0), -2.0);
        assert_eq!(RewardLedger::advance_reward(1, 10.0, false, 1.0, 100.0), 11.0);
        assert_eq!(RewardLedger::advance_reward(2, 0.0, true, 1.0, 100.0), -98.0);
        assert_eq!(RewardLedger::advance_reward(0, 3.0, false, 1.0, 0.0), 3.0);
    }

    #[test]
    fn ledger_tracks_last_step_and_total() {
        let mut ledger = RewardLedger::new();
        ledger.begin_step();
        ledger.accrue(1.5);
        ledger.accrue(0.5);
        assert_eq!(ledger.last(), 2.0);
        ledger.begin_step();
        ledger.accrue(-1.0);
        assert_eq!(ledger.last(), -1.0);
        assert_eq!(ledger.total(), 1.0);
        ledger.reset();
        assert_eq!(ledger, RewardLedger::default());
    }

    proptest! {
        #[test]
        fn total_is_sum_of_step_rewards(
            steps in prop::collection::vec((0u32..64, -5.0f64..5.0, any::<bool>()), 1..40),
            living in -1.0f64..1.0,
            penalty in 0.0f64..200.0,
        ) {
            let mut ledger = RewardLedger::new();
            let mut sum = 0.0;
            for &(tics, scenario, died) in &steps {
                let reward = RewardLedger::advance_reward(tics, scenario, died, living, penalty);
                ledger.begin_step();
                ledger.accrue(reward);
                prop_assert_eq!(ledger.last(), reward);
                sum += reward;
            }
            prop_assert!((ledger.total() - sum).abs() <= 1e-9 * (1.0 + sum.abs()));
        }
    }
}
