//! Action vectors: one value per configured button.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::button::Button;

/// Inline capacity covering every common button layout without spilling.
type Values = SmallVec<[f64; 16]>;

/// A normalized action, ready to submit to the engine.
///
/// Built from raw caller values against the configured button set:
/// binary buttons collapse to `0.0`/`1.0` (any non-zero value presses),
/// delta buttons are clamped to `±max` when their maximum is non-zero.
/// The length always equals the number of configured buttons, so a vector
/// built for one button layout cannot be submitted under another.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionVector {
    values: Values,
}

/// Why raw values could not be turned into an [`ActionVector`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionError {
    /// No buttons are configured.
    NoButtons,
    /// Value count differs from the configured button count.
    LengthMismatch {
        /// Configured buttons.
        expected: usize,
        /// Values supplied.
        got: usize,
    },
    /// A value is NaN or infinite.
    NotFinite {
        /// Position of the offending value.
        index: usize,
    },
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoButtons => write!(f, "no available buttons configured"),
            Self::LengthMismatch { expected, got } => {
                write!(f, "action has {got} values, {expected} buttons configured")
            }
            Self::NotFinite { index } => write!(f, "action value {index} is not finite"),
        }
    }
}

impl std::error::Error for ActionError {}

impl ActionVector {
    /// Normalize `values` against the configured buttons.
    pub fn new(buttons: &IndexMap<Button, f64>, values: &[f64]) -> Result<Self, ActionError> {
        if buttons.is_empty() {
            return Err(ActionError::NoButtons);
        }
        if values.len() != buttons.len() {
            return Err(ActionError::LengthMismatch {
                expected: buttons.len(),
                got: values.len(),
            });
        }
        let mut out = Values::with_capacity(values.len());
        for (index, ((&button, &max), &raw)) in buttons.iter().zip(values).enumerate() {
            if !raw.is_finite() {
                return Err(ActionError::NotFinite { index });
            }
            out.push(normalize(button, max, raw));
        }
        Ok(Self { values: out })
    }

    /// All-released action for `len` buttons.
    pub fn idle(len: usize) -> Self {
        Self {
            values: std::iter::repeat_n(0.0, len).collect(),
        }
    }

    /// Wrap values that are already normalized (e.g. read back from a
    /// recording or the shared buffer).
    pub fn from_normalized(values: &[f64]) -> Self {
        Self {
            values: values.iter().copied().collect(),
        }
    }

    /// The normalized values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of buttons covered.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector covers no buttons.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn normalize(button: Button, max: f64, raw: f64) -> f64 {
    if button.is_binary() {
        return if raw != 0.0 { 1.0 } else { 0.0 };
    }
    if max > 0.0 {
        raw.clamp(-max, max)
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn layout() -> IndexMap<Button, f64> {
        let mut buttons = IndexMap::new();
        buttons.insert(Button::MoveForward, 0.0);
        buttons.insert(Button::Attack, 0.0);
        buttons.insert(Button::TurnLeftRightDelta, 10.0);
        buttons.insert(Button::LookUpDownDelta, 0.0);
        buttons
    }

    #[test]
    fn binary_buttons_collapse_to_unit() {
        let a = ActionVector::new(&layout(), &[0.3, -2.0, 0.0, 0.0]).unwrap();
        assert_eq!(&a.values()[..2], &[1.0, 1.0]);
    }

    #[test]
    fn delta_buttons_clamped_only_with_max() {
        let a = ActionVector::new(&layout(), &[0.0, 0.0, -45.0, 900.0]).unwrap();
        assert_eq!(a.values()[2], -10.0);
        assert_eq!(a.values()[3], 900.0);
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = ActionVector::new(&layout(), &[1.0, 0.0]).unwrap_err();
        assert_eq!(
            err,
            ActionError::LengthMismatch {
                expected: 4,
                got: 2
            }
        );
    }

    #[test]
    fn empty_layout_rejected() {
        assert_eq!(
            ActionVector::new(&IndexMap::new(), &[]).unwrap_err(),
            ActionError::NoButtons
        );
    }

    #[test]
    fn nan_rejected() {
        let err = ActionVector::new(&layout(), &[0.0, 0.0, f64::NAN, 0.0]).unwrap_err();
        assert_eq!(err, ActionError::NotFinite { index: 2 });
    }

    proptest! {
        #[test]
        fn normalized_values_respect_bounds(
            fwd in -5.0f64..5.0,
            attack in -5.0f64..5.0,
            turn in -1000.0f64..1000.0,
            look in -1000.0f64..1000.0,
        ) {
            let a = ActionVector::new(&layout(), &[fwd, attack, turn, look]).unwrap();
            let v = a.values();
            prop_assert_eq!(v.len(), 4);
            prop_assert!(v[0] == 0.0 || v[0] == 1.0);
            prop_assert!(v[1] == 0.0 || v[1] == 1.0);
            prop_assert!(v[2].abs() <= 10.0);
            prop_assert_eq!(v[3], look);
        }
    }
}
