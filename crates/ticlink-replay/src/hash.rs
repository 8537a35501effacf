//! Configuration fingerprinting for episode records.
//!
//! Only settings that change what the simulation does are hashed. Output
//! settings (resolution, screen format, buffer toggles, game variables,
//! rewards) are left out, so an episode recorded at one resolution can be
//! replayed at another.

use ticlink_core::{Fnv1a, GameConfig, MultiplayerRole};

/// Compute the fingerprint of `config`'s simulation-relevant settings.
///
/// Hashes the scenario path, the ordered button list with maxima, mode,
/// ticrate, episode timeout and start time, skill, multiplayer role and
/// extra engine arguments using FNV-1a.
pub fn config_hash(config: &GameConfig) -> u64 {
    let mut h = Fnv1a::new();
    h = match &config.scenario_path {
        Some(p) => h.u8(1).str(&p.to_string_lossy()),
        None => h.u8(0),
    };
    h = h.u32(config.buttons.len() as u32);
    for (button, max) in &config.buttons {
        h = h.u8(button.code()).f64(*max);
    }
    h = h
        .u8(config.mode.code())
        .u32(config.ticrate)
        .u64(config.episode_timeout.unwrap_or(0))
        .u64(config.episode_start_time)
        .u8(config.skill);
    h = match &config.multiplayer {
        MultiplayerRole::Solo => h.u8(0),
        MultiplayerRole::Host { players, .. } => h.u8(1).u8(*players),
        MultiplayerRole::Client { .. } => h.u8(2),
    };
    h = h.u32(config.game_args.len() as u32);
    for arg in &config.game_args {
        h = h.str(arg);
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticlink_core::{Button, GameVariable, Resolution};

    fn base() -> GameConfig {
        let mut config = GameConfig::default();
        config.buttons.insert(Button::MoveLeft, 0.0);
        config.buttons.insert(Button::MoveRight, 0.0);
        config.buttons.insert(Button::Attack, 0.0);
        config
    }

    #[test]
    fn output_settings_do_not_change_hash() {
        let a = base();
        let mut b = base();
        b.resolution = Resolution::new(640, 480);
        b.buffers.depth = true;
        b.variables.insert(GameVariable::Health);
        b.living_reward = -1.0;
        assert_eq!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn button_order_changes_hash() {
        let a = base();
        let mut b = GameConfig::default();
        b.buttons.insert(Button::Attack, 0.0);
        b.buttons.insert(Button::MoveLeft, 0.0);
        b.buttons.insert(Button::MoveRight, 0.0);
        assert_ne!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn skill_and_timeout_change_hash() {
        let a = base();
        let mut b = base();
        b.skill = 5;
        assert_ne!(config_hash(&a), config_hash(&b));
        let mut c = base();
        c.episode_timeout = Some(300);
        assert_ne!(config_hash(&a), config_hash(&c));
    }
}
