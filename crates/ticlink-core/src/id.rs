//! Strongly-typed identifiers for tics, players and published states.

use std::fmt;

/// Monotonically increasing simulation tic counter.
///
/// One tic is the engine's fixed simulation time step (35 per second by
/// default). Counted from engine start; episode-relative time is reported
/// separately as a plain `u64`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tic(pub u64);

impl Tic {
    /// Tic `n` steps after this one.
    pub fn after(self, n: u64) -> Self {
        Self(self.0.saturating_add(n))
    }
}

impl fmt::Display for Tic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Tic {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Zero-based player slot within an engine session.
///
/// Single-player sessions always control slot 0. In multiplayer games
/// the engine assigns slots in join order; the host is slot 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerIndex(pub u8);

impl fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for PlayerIndex {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

/// Identity of one published observation in the shared state buffer.
///
/// The engine bumps this each time it refreshes the buffer. The
/// acknowledgment for a refreshing step carries the number it wrote, so
/// the controller can tell a complete publication from a torn one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateNumber(pub u64);

impl StateNumber {
    /// The number the engine will publish next.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for StateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StateNumber {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
