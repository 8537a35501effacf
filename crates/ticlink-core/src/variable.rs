//! Game variables: scalar engine state exposed in every observation.
//!
//! The controller configures an ordered list of variables before init;
//! each observation carries one `f64` per configured variable in that
//! order.

use std::fmt;

/// Number of user-defined script variables (`User(1)` ..= `User(60)`).
pub const USER_VARIABLE_COUNT: u8 = 60;

/// Maximum players in a multiplayer game.
pub const MAX_PLAYERS: u8 = 16;

/// A scalar engine variable.
///
/// Encoded on the wire as a `u16`: plain variables use codes below 256,
/// indexed families occupy their own 256-code blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameVariable {
    /// Monsters killed this episode.
    KillCount,
    /// Items picked up this episode.
    ItemCount,
    /// Secrets found this episode.
    SecretCount,
    /// Frags scored by this player.
    FragCount,
    /// Deaths of this player.
    DeathCount,
    /// Hits landed.
    HitCount,
    /// Hits taken.
    HitsTaken,
    /// Damage dealt.
    DamageCount,
    /// Damage taken.
    DamageTaken,
    /// Current health.
    Health,
    /// Current armor.
    Armor,
    /// 1.0 while the player is dead.
    Dead,
    /// 1.0 while standing on the ground.
    OnGround,
    /// 1.0 when the weapon can fire.
    AttackReady,
    /// 1.0 when the alternate fire can be used.
    AltAttackReady,
    /// Slot of the selected weapon.
    SelectedWeapon,
    /// Ammo of the selected weapon.
    SelectedWeaponAmmo,
    /// Position on the X axis.
    PositionX,
    /// Position on the Y axis.
    PositionY,
    /// Position on the Z axis.
    PositionZ,
    /// Facing angle in degrees.
    Angle,
    /// View pitch in degrees.
    Pitch,
    /// View roll in degrees.
    Roll,
    /// Eye height above the floor.
    ViewHeight,
    /// Velocity on the X axis.
    VelocityX,
    /// Velocity on the Y axis.
    VelocityY,
    /// Velocity on the Z axis.
    VelocityZ,
    /// This player's slot number.
    PlayerNumber,
    /// Players currently in the game.
    PlayerCount,
    /// Ammo count for ammo slot `0..=9`.
    Ammo(u8),
    /// Weapon availability for weapon slot `0..=9`.
    Weapon(u8),
    /// Script-defined variable `1..=60`.
    User(u8),
    /// Frag count of player `1..=16`.
    PlayerFragCount(u8),
}

const PLAIN: [GameVariable; 29] = [
    GameVariable::KillCount,
    GameVariable::ItemCount,
    GameVariable::SecretCount,
    GameVariable::FragCount,
    GameVariable::DeathCount,
    GameVariable::HitCount,
    GameVariable::HitsTaken,
    GameVariable::DamageCount,
    GameVariable::DamageTaken,
    GameVariable::Health,
    GameVariable::Armor,
    GameVariable::Dead,
    GameVariable::OnGround,
    GameVariable::AttackReady,
    GameVariable::AltAttackReady,
    GameVariable::SelectedWeapon,
    GameVariable::SelectedWeaponAmmo,
    GameVariable::PositionX,
    GameVariable::PositionY,
    GameVariable::PositionZ,
    GameVariable::Angle,
    GameVariable::Pitch,
    GameVariable::Roll,
    GameVariable::ViewHeight,
    GameVariable::VelocityX,
    GameVariable::VelocityY,
    GameVariable::VelocityZ,
    GameVariable::PlayerNumber,
    GameVariable::PlayerCount,
];

const AMMO_BLOCK: u16 = 0x100;
const WEAPON_BLOCK: u16 = 0x200;
const USER_BLOCK: u16 = 0x300;
const FRAG_BLOCK: u16 = 0x400;

impl GameVariable {
    /// Wire code of this variable.
    pub fn code(self) -> u16 {
        match self {
            Self::Ammo(i) => AMMO_BLOCK | i as u16,
            Self::Weapon(i) => WEAPON_BLOCK | i as u16,
            Self::User(i) => USER_BLOCK | i as u16,
            Self::PlayerFragCount(i) => FRAG_BLOCK | i as u16,
            plain => PLAIN
                .iter()
                .position(|v| *v == plain)
                .map(|p| p as u16)
                .unwrap_or(u16::MAX),
        }
    }

    /// Decode a wire code. Returns `None` for unknown codes and for
    /// indexed variables outside their valid range.
    pub fn from_code(code: u16) -> Option<Self> {
        let index = (code & 0xFF) as u8;
        let var = match code & 0xFF00 {
            0 => return PLAIN.get(code as usize).copied(),
            AMMO_BLOCK => Self::Ammo(index),
            WEAPON_BLOCK => Self::Weapon(index),
            USER_BLOCK => Self::User(index),
            FRAG_BLOCK => Self::PlayerFragCount(index),
            _ => return None,
        };
        var.is_valid().then_some(var)
    }

    /// Whether an indexed variable's index lies in its valid range.
    pub fn is_valid(self) -> bool {
        match self {
            Self::Ammo(i) | Self::Weapon(i) => i <= 9,
            Self::User(i) => (1..=USER_VARIABLE_COUNT).contains(&i),
            Self::PlayerFragCount(i) => (1..=MAX_PLAYERS).contains(&i),
            _ => true,
        }
    }
}

impl fmt::Display for GameVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ammo(i) => write!(f, "Ammo{i}"),
            Self::Weapon(i) => write!(f, "Weapon{i}"),
            Self::User(i) => write!(f, "User{i}"),
            Self::PlayerFragCount(i) => write!(f, "Player{i}FragCount"),
            plain => write!(f, "{plain:?}"),
        }
    }
}
