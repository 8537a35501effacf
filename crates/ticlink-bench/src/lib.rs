//! Benchmark profiles for the ticlink controller.
//!
//! - [`reference_profile`]: 320x240 RGB, two buttons, a few variables
//! - [`full_profile`]: 640x480 with every optional section enabled

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use ticlink_core::{Button, GameConfig, GameVariable, Resolution};

/// Buttons every profile exposes, in action order.
pub const PROFILE_BUTTONS: [Button; 4] = [
    Button::MoveForward,
    Button::TurnLeft,
    Button::TurnRight,
    Button::Attack,
];

/// A typical training configuration: 320x240, four buttons, position and
/// health observed, fixed seed.
pub fn reference_profile(seed: u64) -> GameConfig {
    let mut config = GameConfig::default();
    for button in PROFILE_BUTTONS {
        config.buttons.insert(button, 0.0);
    }
    for variable in [
        GameVariable::PositionX,
        GameVariable::PositionY,
        GameVariable::Angle,
        GameVariable::Health,
        GameVariable::KillCount,
    ] {
        config.variables.insert(variable);
    }
    config.resolution = Resolution::new(320, 240);
    config.seed = Some(seed);
    config
}

/// [`reference_profile`] at 640x480 with every optional buffer, list and
/// the audio section turned on.
pub fn full_profile(seed: u64) -> GameConfig {
    let mut config = reference_profile(seed);
    config.resolution = Resolution::new(640, 480);
    let b = &mut config.buffers;
    b.depth = true;
    b.labels = true;
    b.automap = true;
    b.audio = true;
    b.objects_info = true;
    b.sectors_info = true;
    b.notifications = true;
    config
}

/// Deterministic action script cycling through the profile buttons.
pub fn action_script(len: usize) -> Vec<Vec<f64>> {
    (0..len)
        .map(|i| {
            let mut action = vec![0.0; PROFILE_BUTTONS.len()];
            action[i % PROFILE_BUTTONS.len()] = 1.0;
            if i % 3 == 0 {
                action[0] = 1.0;
            }
            action
        })
        .collect()
}
