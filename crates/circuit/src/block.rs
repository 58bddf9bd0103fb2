//! Block records and their kind-tagged logic state.

use gridstone_core::{BlockId, BlockKind, BlockName, Direction, GridPos, SolidKind};

/// Maximum redstone power level.
pub const MAX_POWER: u8 = 15;

/// Operating mode of a comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparatorMode {
    /// Output the rear signal unless a side signal exceeds it.
    Compare,
    /// Output rear minus the strongest side signal.
    Subtract,
}

impl ComparatorMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            ComparatorMode::Compare => ComparatorMode::Subtract,
            ComparatorMode::Subtract => ComparatorMode::Compare,
        }
    }
}

/// Where an observer is in its two-tick pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverPhase {
    /// Quiet, waiting for the watched cell to change.
    Idle,
    /// Emitting 15 out of the back face; turn-off is already scheduled.
    PulseOn,
}

/// Kind-tagged logic state. This is the source of truth for power decisions;
/// [`VisualState`] is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    /// Signal-carrying dust.
    Wire {
        /// Current level, `0..=15`.
        power: u8,
    },
    /// Inverting torch.
    Torch {
        /// Lit torches emit 15 everywhere except toward their support.
        lit: bool,
    },
    /// Toggleable source.
    Lever {
        /// Whether the lever is on.
        on: bool,
    },
    /// Momentary source.
    Button {
        /// Set on press; cleared by the scheduled release.
        pressed: bool,
    },
    /// Directional diode with delay.
    Repeater {
        /// Configured delay in redstone ticks, `1..=4`.
        delay: u8,
        /// Current output state.
        powered: bool,
        /// Frozen by a powered repeater/comparator on a side.
        locked: bool,
    },
    /// Compare/subtract device.
    Comparator {
        /// Current operating mode.
        mode: ComparatorMode,
        /// Current output level, `0..=15`.
        output: u8,
    },
    /// Update detector.
    Observer {
        /// Pulse phase.
        phase: ObserverPhase,
    },
    /// Piston base, sticky or not.
    Piston {
        /// Pulls one block back on retraction when set.
        sticky: bool,
        /// Whether the arm is out.
        extended: bool,
        /// The owned head entity while extended. Weak: verify before use.
        head: Option<BlockId>,
    },
    /// Extended piston arm. Passive.
    PistonHead {
        /// The owning piston base. `None` for a manually placed head.
        piston: Option<BlockId>,
        /// Mirrors the owning piston's variety.
        sticky: bool,
    },
    /// Constant 15 on all sides.
    PowerSource,
    /// Inert solid.
    Solid,
}

impl Logic {
    /// Fresh state for a newly placed block of `kind`.
    pub fn initial(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Wire => Logic::Wire { power: 0 },
            BlockKind::Torch => Logic::Torch { lit: false },
            BlockKind::Lever => Logic::Lever { on: false },
            BlockKind::Button => Logic::Button { pressed: false },
            BlockKind::Repeater => Logic::Repeater {
                delay: 1,
                powered: false,
                locked: false,
            },
            BlockKind::Comparator => Logic::Comparator {
                mode: ComparatorMode::Compare,
                output: 0,
            },
            BlockKind::Observer => Logic::Observer {
                phase: ObserverPhase::Idle,
            },
            BlockKind::Piston => Logic::Piston {
                sticky: false,
                extended: false,
                head: None,
            },
            BlockKind::StickyPiston => Logic::Piston {
                sticky: true,
                extended: false,
                head: None,
            },
            BlockKind::PistonHead => Logic::PistonHead {
                piston: None,
                sticky: false,
            },
            BlockKind::PowerSource => Logic::PowerSource,
            BlockKind::Solid(_) => Logic::Solid,
        }
    }

    /// The power level this state publishes, before directional masking.
    pub fn power_level(&self) -> u8 {
        match *self {
            Logic::Wire { power } => power,
            Logic::Torch { lit } => on_off(lit),
            Logic::Lever { on } => on_off(on),
            Logic::Button { pressed } => on_off(pressed),
            Logic::Repeater { powered, .. } => on_off(powered),
            Logic::Comparator { output, .. } => output,
            Logic::Observer { phase } => on_off(phase == ObserverPhase::PulseOn),
            Logic::PowerSource => MAX_POWER,
            Logic::Piston { .. } | Logic::PistonHead { .. } | Logic::Solid => 0,
        }
    }
}

fn on_off(on: bool) -> u8 {
    if on {
        MAX_POWER
    } else {
        0
    }
}

/// Externally observable state, kept in sync with [`Logic`] after every
/// committed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualState {
    /// Whether the block currently reads as active.
    pub powered: bool,
    /// Published power level, `0..=15`.
    pub power_level: u8,
    /// Display identifier (on/off variants resolved).
    pub name: BlockName,
    /// Whether a piston base currently shows its arm out.
    pub extended: bool,
}

/// A block placed on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Stable handle.
    pub id: BlockId,
    /// Current cell. Only piston motion and the grid mutate this.
    pub pos: GridPos,
    /// Kind tag.
    pub kind: BlockKind,
    /// Facing; meaning depends on the kind.
    pub rotation: Direction,
    /// Derived observable state.
    pub visual: VisualState,
    /// Authoritative logic state.
    pub logic: Logic,
}

impl Block {
    /// Build a freshly placed block with default state.
    pub fn new(id: BlockId, kind: BlockKind, pos: GridPos) -> Self {
        let logic = Logic::initial(kind);
        let mut block = Self {
            id,
            pos,
            kind,
            rotation: Direction::North,
            visual: VisualState {
                powered: false,
                power_level: 0,
                name: BlockName::Stone,
                extended: false,
            },
            logic,
        };
        block.refresh_visual();
        block
    }

    /// Recompute [`VisualState`] from the current logic state.
    pub fn refresh_visual(&mut self) {
        let level = self.logic.power_level();
        let extended = matches!(self.logic, Logic::Piston { extended: true, .. });
        self.visual = VisualState {
            powered: level > 0,
            power_level: level,
            name: self.display_name(),
            extended,
        };
    }

    /// Display identifier for the current state.
    pub fn display_name(&self) -> BlockName {
        match (&self.kind, &self.logic) {
            (BlockKind::Wire, _) => BlockName::RedstoneDust,
            (BlockKind::Torch, Logic::Torch { lit: true }) => BlockName::RedstoneTorch,
            (BlockKind::Torch, _) => BlockName::RedstoneTorchOff,
            (BlockKind::Lever, _) => BlockName::Lever,
            (BlockKind::Button, _) => BlockName::Button,
            (BlockKind::Repeater, Logic::Repeater { powered: true, .. }) => BlockName::RepeaterOn,
            (BlockKind::Repeater, _) => BlockName::Repeater,
            (BlockKind::Comparator, Logic::Comparator { output, .. }) if *output > 0 => {
                BlockName::ComparatorOn
            }
            (BlockKind::Comparator, _) => BlockName::Comparator,
            (
                BlockKind::Observer,
                Logic::Observer {
                    phase: ObserverPhase::PulseOn,
                },
            ) => BlockName::ObserverOn,
            (BlockKind::Observer, _) => BlockName::Observer,
            (BlockKind::Piston | BlockKind::StickyPiston, Logic::Piston { extended: true, .. }) => {
                BlockName::PistonInner
            }
            (BlockKind::Piston, _) => BlockName::Piston,
            (BlockKind::StickyPiston, _) => BlockName::StickyPiston,
            (BlockKind::PistonHead, _) => BlockName::PistonHead,
            (BlockKind::PowerSource, _) => BlockName::RedstoneBlock,
            (BlockKind::Solid(SolidKind::Stone), _) => BlockName::Stone,
            (BlockKind::Solid(SolidKind::Obsidian), _) => BlockName::Obsidian,
            (BlockKind::Solid(SolidKind::Bedrock), _) => BlockName::Bedrock,
        }
    }

    /// Whether a piston may displace this block.
    pub fn is_movable(&self) -> bool {
        match (&self.kind, &self.logic) {
            (BlockKind::Solid(kind), _) => !kind.is_immovable(),
            (BlockKind::PistonHead, _) => false,
            (_, Logic::Piston { extended, .. }) => !extended,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_blocks_start_dark() {
        let block = Block::new(BlockId(1), BlockKind::Wire, GridPos::new(0, 0));
        assert_eq!(block.visual.power_level, 0);
        assert!(!block.visual.powered);
        assert_eq!(block.visual.name, BlockName::RedstoneDust);
        assert_eq!(block.rotation, Direction::North);
    }

    #[test]
    fn visual_tracks_logic() {
        let mut torch = Block::new(BlockId(2), BlockKind::Torch, GridPos::new(0, 0));
        assert_eq!(torch.visual.name, BlockName::RedstoneTorchOff);

        torch.logic = Logic::Torch { lit: true };
        torch.refresh_visual();
        assert_eq!(torch.visual.name, BlockName::RedstoneTorch);
        assert_eq!(torch.visual.power_level, MAX_POWER);
        assert!(torch.visual.powered);
    }

    #[test]
    fn extended_piston_shows_inner_base() {
        let mut piston = Block::new(BlockId(3), BlockKind::StickyPiston, GridPos::new(0, 0));
        assert_eq!(piston.visual.name, BlockName::StickyPiston);

        piston.logic = Logic::Piston {
            sticky: true,
            extended: true,
            head: Some(BlockId(4)),
        };
        piston.refresh_visual();
        assert_eq!(piston.visual.name, BlockName::PistonInner);
        assert!(piston.visual.extended);
        assert!(!piston.is_movable());
    }

    #[test]
    fn movability_follows_piston_rules() {
        let stone = Block::new(BlockId(1), BlockKind::Solid(SolidKind::Stone), GridPos::new(0, 0));
        let obsidian =
            Block::new(BlockId(2), BlockKind::Solid(SolidKind::Obsidian), GridPos::new(1, 0));
        let head = Block::new(BlockId(3), BlockKind::PistonHead, GridPos::new(2, 0));
        let wire = Block::new(BlockId(4), BlockKind::Wire, GridPos::new(3, 0));
        let piston = Block::new(BlockId(5), BlockKind::Piston, GridPos::new(4, 0));

        assert!(stone.is_movable());
        assert!(!obsidian.is_movable());
        assert!(!head.is_movable());
        assert!(wire.is_movable());
        assert!(piston.is_movable());
    }

    #[test]
    fn comparator_mode_toggles() {
        assert_eq!(ComparatorMode::Compare.toggled(), ComparatorMode::Subtract);
        assert_eq!(ComparatorMode::Subtract.toggled(), ComparatorMode::Compare);
    }
}
