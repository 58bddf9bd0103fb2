#![warn(missing_docs)]
//! Core primitives shared across the gridstone workspace.

/// Block-kind catalog and kind predicates.
pub mod block;
/// Grid coordinates and cardinal directions.
pub mod direction;
/// Namespaced block-name identifiers for the external boundary.
pub mod name;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use block::{BlockKind, SolidKind};
pub use direction::{Direction, GridPos};
pub use name::{BlockName, BlockNameError, NAMESPACE};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Stable handle to a placed block.
///
/// Handles are assigned monotonically and never reused within a simulator's
/// lifetime, so a stale handle can always be detected as dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);
