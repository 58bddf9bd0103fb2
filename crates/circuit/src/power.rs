//! Power-output contracts and inbound-power queries.

use crate::block::{Block, Logic, ObserverPhase, MAX_POWER};
use crate::sim::CircuitSim;
use gridstone_core::{Direction, GridPos};

/// The power `block` drives toward direction `to`.
///
/// Directional emitters (torch, repeater, comparator, observer) mask their
/// output. Solids, piston bases, and piston heads never emit: power does
/// not re-transmit through conductors here.
pub fn power_output(block: &Block, to: Direction) -> u8 {
    match block.logic {
        Logic::Wire { power } => power,
        Logic::Torch { lit } => {
            // Never back toward the support, or the supporting block would
            // oscillate with the torch that it powers.
            if to == block.rotation {
                0
            } else if lit {
                MAX_POWER
            } else {
                0
            }
        }
        Logic::Lever { on } => {
            if on {
                MAX_POWER
            } else {
                0
            }
        }
        Logic::Button { pressed } => {
            if pressed {
                MAX_POWER
            } else {
                0
            }
        }
        Logic::Repeater { powered, .. } => {
            if powered && to == block.rotation {
                MAX_POWER
            } else {
                0
            }
        }
        Logic::Comparator { output, .. } => {
            if to == block.rotation {
                output
            } else {
                0
            }
        }
        Logic::Observer { phase } => {
            if phase == ObserverPhase::PulseOn && to == block.rotation.opposite() {
                MAX_POWER
            } else {
                0
            }
        }
        Logic::PowerSource => MAX_POWER,
        Logic::Piston { .. } | Logic::PistonHead { .. } | Logic::Solid => 0,
    }
}

impl CircuitSim {
    /// Power entering `target` from the neighbor in direction `from`.
    pub(crate) fn power_into(&self, target: GridPos, from: Direction) -> u8 {
        match self.grid.block_at(target.step(from)) {
            Some(source) => power_output(source, from.opposite()),
            None => 0,
        }
    }

    /// Strongest power entering `pos` from any cardinal neighbor.
    pub(crate) fn max_neighbor_power(&self, pos: GridPos) -> u8 {
        Direction::CARDINALS
            .into_iter()
            .map(|dir| self.power_into(pos, dir))
            .max()
            .unwrap_or(0)
    }
}
