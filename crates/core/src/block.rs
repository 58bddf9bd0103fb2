//! The closed catalog of block kinds the engine simulates.

use serde::{Deserialize, Serialize};

/// Varieties of inert solid block.
///
/// Solids carry no logic; the variety only matters to piston movability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolidKind {
    /// Ordinary movable solid.
    Stone,
    /// Immovable.
    Obsidian,
    /// Immovable.
    Bedrock,
}

impl SolidKind {
    /// Whether a piston can never displace this solid.
    pub fn is_immovable(self) -> bool {
        !matches!(self, SolidKind::Stone)
    }
}

/// Kind tag for every simulated block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// Signal-carrying dust; attenuates 1 level per wire-to-wire hop.
    Wire,
    /// Inverts the signal of the block it is attached to, with a 2-tick lag.
    Torch,
    /// Toggleable constant source.
    Lever,
    /// Momentary source; releases 20 ticks after a press.
    Button,
    /// Directional diode with a configurable 1-4 redstone-tick delay.
    Repeater,
    /// Compares or subtracts its side inputs from its rear input.
    Comparator,
    /// Emits a short pulse when its watched cell changes.
    Observer,
    /// Pushes blocks when powered.
    Piston,
    /// Pushes when powered, pulls one block back on retraction.
    StickyPiston,
    /// The extended arm of a piston. Passive.
    PistonHead,
    /// Constant 15 on all sides.
    PowerSource,
    /// Inert filler.
    Solid(SolidKind),
}

impl BlockKind {
    /// Kinds that drive power into neighbors via their output contract.
    ///
    /// Wires are excluded: wire-to-wire transfer goes through the
    /// attenuation rule instead.
    pub fn emits_power(self) -> bool {
        matches!(
            self,
            BlockKind::Torch
                | BlockKind::Lever
                | BlockKind::Button
                | BlockKind::Repeater
                | BlockKind::Comparator
                | BlockKind::Observer
                | BlockKind::PowerSource
        )
    }

    /// Kinds whose rotation field carries meaning.
    pub fn is_directional(self) -> bool {
        matches!(
            self,
            BlockKind::Torch
                | BlockKind::Repeater
                | BlockKind::Comparator
                | BlockKind::Observer
                | BlockKind::Piston
                | BlockKind::StickyPiston
                | BlockKind::PistonHead
        )
    }

    /// Piston bases, sticky or not.
    pub fn is_piston_base(self) -> bool {
        matches!(self, BlockKind::Piston | BlockKind::StickyPiston)
    }
}
