//! Engine input buttons.
//!
//! The vocabulary is fixed by the engine. Binary buttons are pressed or
//! released each tic; delta buttons carry a signed magnitude (degrees for
//! turning, map units for movement) bounded by a per-button maximum.

use std::fmt;

/// An engine input button.
///
/// The discriminant is the button's wire code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Button {
    Attack = 0,
    Use,
    Jump,
    Crouch,
    Turn180,
    AltAttack,
    Reload,
    Zoom,
    Speed,
    Strafe,
    MoveRight,
    MoveLeft,
    MoveBackward,
    MoveForward,
    TurnRight,
    TurnLeft,
    LookUp,
    LookDown,
    MoveUp,
    MoveDown,
    Land,
    SelectWeapon1,
    SelectWeapon2,
    SelectWeapon3,
    SelectWeapon4,
    SelectWeapon5,
    SelectWeapon6,
    SelectWeapon7,
    SelectWeapon8,
    SelectWeapon9,
    SelectWeapon0,
    SelectNextWeapon,
    SelectPrevWeapon,
    DropSelectedWeapon,
    ActivateSelectedItem,
    SelectNextItem,
    SelectPrevItem,
    DropSelectedItem,
    LookUpDownDelta,
    TurnLeftRightDelta,
    MoveForwardBackwardDelta,
    MoveLeftRightDelta,
    MoveUpDownDelta,
}

impl Button {
    /// Every button in wire-code order.
    pub const ALL: [Button; 43] = [
        Self::Attack,
        Self::Use,
        Self::Jump,
        Self::Crouch,
        Self::Turn180,
        Self::AltAttack,
        Self::Reload,
        Self::Zoom,
        Self::Speed,
        Self::Strafe,
        Self::MoveRight,
        Self::MoveLeft,
        Self::MoveBackward,
        Self::MoveForward,
        Self::TurnRight,
        Self::TurnLeft,
        Self::LookUp,
        Self::LookDown,
        Self::MoveUp,
        Self::MoveDown,
        Self::Land,
        Self::SelectWeapon1,
        Self::SelectWeapon2,
        Self::SelectWeapon3,
        Self::SelectWeapon4,
        Self::SelectWeapon5,
        Self::SelectWeapon6,
        Self::SelectWeapon7,
        Self::SelectWeapon8,
        Self::SelectWeapon9,
        Self::SelectWeapon0,
        Self::SelectNextWeapon,
        Self::SelectPrevWeapon,
        Self::DropSelectedWeapon,
        Self::ActivateSelectedItem,
        Self::SelectNextItem,
        Self::SelectPrevItem,
        Self::DropSelectedItem,
        Self::LookUpDownDelta,
        Self::TurnLeftRightDelta,
        Self::MoveForwardBackwardDelta,
        Self::MoveLeftRightDelta,
        Self::MoveUpDownDelta,
    ];

    /// Wire code of this button.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a button by wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Whether the button takes a signed magnitude rather than a press.
    pub fn is_delta(self) -> bool {
        matches!(
            self,
            Self::LookUpDownDelta
                | Self::TurnLeftRightDelta
                | Self::MoveForwardBackwardDelta
                | Self::MoveLeftRightDelta
                | Self::MoveUpDownDelta
        )
    }

    /// Whether the button is a plain press/release button.
    pub fn is_binary(self) -> bool {
        !self.is_delta()
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
