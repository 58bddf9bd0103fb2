//! Piston motion: push-chain resolution, head lifecycle, and the sticky
//! pull on retraction.

use crate::block::Logic;
use crate::sim::CircuitSim;
use gridstone_core::{BlockId, BlockKind, Direction, GridPos};

/// A push fails once this many movable blocks are in front of the arm.
pub const PISTON_PUSH_LIMIT: usize = 12;

/// Lag between the power decision and the mechanical transition
/// (2 game ticks = 1 redstone tick).
const PISTON_TRANSITION_TICKS: u64 = 2;

impl CircuitSim {
    /// Power-side half of the piston machine: compare the wanted state with
    /// the current one and schedule a transition on mismatch.
    pub(crate) fn update_piston_trigger(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let Logic::Piston { extended, .. } = block.logic else {
            return;
        };

        if self.piston_should_extend(pos) != extended {
            self.schedule_block(id, PISTON_TRANSITION_TICKS);
        }
    }

    /// Mechanical half: re-check the wanted state at fire time, then extend
    /// or retract.
    pub(crate) fn scheduled_piston(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let Logic::Piston { extended, .. } = block.logic else {
            return;
        };

        let should_extend = self.piston_should_extend(pos);
        if should_extend && !extended {
            self.extend_piston(id);
        } else if !should_extend && extended {
            self.retract_piston(id);
        }
    }

    fn piston_should_extend(&self, pos: GridPos) -> bool {
        self.max_neighbor_power(pos) > 0 || self.quasi_connectivity(pos)
    }

    /// Legacy rule where power one cell above can activate a piston. Not
    /// modeled on a 2D grid; kept as an explicit hook so both halves of the
    /// piston machine share one predicate.
    fn quasi_connectivity(&self, _pos: GridPos) -> bool {
        false
    }

    fn extend_piston(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let push = block.rotation;
        let Logic::Piston { sticky, .. } = block.logic else {
            return;
        };

        let head_cell = pos.step(push);
        let Some(run) = self.push_run(head_cell, push) else {
            self.metrics.piston_push_failures += 1;
            return;
        };
        self.metrics.piston_pushes += 1;

        // Displace the run one cell, tail first so nothing is overwritten.
        // All moves commit before any notification fires; moved blocks carry
        // their logic state unchanged.
        let mut moves: Vec<(GridPos, GridPos)> = Vec::with_capacity(run.len());
        for &moved_id in run.iter().rev() {
            let Some(moved) = self.grid.block(moved_id) else {
                continue;
            };
            let old = moved.pos;
            let new = old.step(push);
            self.grid.relocate(moved_id, new);
            moves.push((old, new));
        }
        moves.reverse();

        let head_id = self.grid.allocate(BlockKind::PistonHead, head_cell);
        if let Some(head) = self.grid.block_mut(head_id) {
            head.rotation = push;
            head.logic = Logic::PistonHead {
                piston: Some(id),
                sticky,
            };
            head.refresh_visual();
        }

        if let Some(block) = self.grid.block_mut(id) {
            block.logic = Logic::Piston {
                sticky,
                extended: true,
                head: Some(head_id),
            };
            block.refresh_visual();
        }

        for (old, new) in moves {
            self.notify_neighbors(old);
            self.notify_neighbors(new);
        }
        self.notify_neighbors(head_cell);
    }

    /// Walk the cells in front of the arm. Returns the contiguous run of
    /// blocks to displace, or `None` when an immovable block, the grid
    /// edge, or the push limit stops the extension.
    fn push_run(&self, start: GridPos, push: Direction) -> Option<Vec<BlockId>> {
        let mut run = Vec::new();
        let mut cell = start;
        loop {
            if !self.grid.in_bounds(cell) {
                return None;
            }
            match self.grid.block_at(cell) {
                None => return Some(run),
                Some(block) if !block.is_movable() => return None,
                Some(block) => {
                    run.push(block.id);
                    if run.len() >= PISTON_PUSH_LIMIT {
                        return None;
                    }
                    cell = cell.step(push);
                }
            }
        }
    }

    fn retract_piston(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let push = block.rotation;
        let Logic::Piston { sticky, head, .. } = block.logic else {
            return;
        };
        let head_cell = pos.step(push);

        if let Some(block) = self.grid.block_mut(id) {
            block.logic = Logic::Piston {
                sticky,
                extended: false,
                head: None,
            };
            block.refresh_visual();
        }

        // The head link is weak; confirm it still points at our arm before
        // deleting anything.
        if let Some(head_id) = head {
            let head_matches = self
                .grid
                .block(head_id)
                .is_some_and(|h| h.kind == BlockKind::PistonHead && h.pos == head_cell);
            if head_matches {
                let _ = self.grid.remove(head_id);
            }
        }
        self.notify_neighbors(head_cell);

        if sticky {
            self.pull_block(head_cell, push);
        }
    }

    /// Sticky retraction drags one movable block into the cell the arm
    /// vacated.
    fn pull_block(&mut self, into: GridPos, push: Direction) {
        let target = into.step(push);
        let Some(candidate) = self.grid.block_at(target) else {
            return;
        };
        if !candidate.is_movable() || self.grid.occupant(into).is_some() {
            return;
        }
        let candidate_id = candidate.id;
        self.grid.relocate(candidate_id, into);
        self.notify_neighbors(target);
        self.notify_neighbors(into);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::CircuitSim;
    use gridstone_core::SolidKind;

    /// Piston at (1, 1) facing east with a lever at (0, 1).
    fn piston_rig(kind: BlockKind) -> CircuitSim {
        let mut sim = CircuitSim::new(20, 6);
        let piston = sim.create_block(kind, 1, 1).unwrap();
        if let Some(block) = sim.grid.block_mut(piston) {
            block.rotation = Direction::East;
        }
        sim.create_block(BlockKind::Lever, 0, 1).unwrap();
        sim
    }

    fn kind_at(sim: &CircuitSim, x: i32, y: i32) -> Option<BlockKind> {
        sim.query(x, y).map(|b| b.kind)
    }

    #[test]
    fn extension_takes_two_ticks_and_spawns_a_head() {
        let mut sim = piston_rig(BlockKind::Piston);
        sim.interact(0, 1);
        assert_eq!(kind_at(&sim, 2, 1), None);

        sim.tick();
        assert_eq!(kind_at(&sim, 2, 1), None);
        sim.tick();

        assert_eq!(kind_at(&sim, 2, 1), Some(BlockKind::PistonHead));
        let piston = sim.query(1, 1).unwrap();
        assert!(piston.visual.extended);
        let head = sim.query(2, 1).unwrap();
        assert_eq!(head.rotation, Direction::East);
        assert!(matches!(
            head.logic,
            Logic::PistonHead {
                piston: Some(_),
                sticky: false
            }
        ));
    }

    #[test]
    fn extension_pushes_a_block_ahead() {
        let mut sim = piston_rig(BlockKind::Piston);
        sim.create_block(BlockKind::Solid(SolidKind::Stone), 2, 1)
            .unwrap();

        sim.interact(0, 1);
        sim.tick();
        sim.tick();

        assert_eq!(kind_at(&sim, 2, 1), Some(BlockKind::PistonHead));
        assert_eq!(kind_at(&sim, 3, 1), Some(BlockKind::Solid(SolidKind::Stone)));
    }

    #[test]
    fn moved_blocks_keep_their_logic() {
        let mut sim = piston_rig(BlockKind::Piston);
        let repeater = sim.create_block(BlockKind::Repeater, 2, 1).unwrap();
        if let Some(block) = sim.grid.block_mut(repeater) {
            block.rotation = Direction::North;
            if let Logic::Repeater { delay, .. } = &mut block.logic {
                *delay = 3;
            }
        }

        sim.interact(0, 1);
        sim.tick();
        sim.tick();

        let moved = sim.query(3, 1).unwrap();
        assert_eq!(moved.id, repeater);
        assert_eq!(moved.rotation, Direction::North);
        assert!(matches!(moved.logic, Logic::Repeater { delay: 3, .. }));
    }

    #[test]
    fn obsidian_blocks_the_push() {
        let mut sim = piston_rig(BlockKind::Piston);
        sim.create_block(BlockKind::Solid(SolidKind::Stone), 2, 1)
            .unwrap();
        sim.create_block(BlockKind::Solid(SolidKind::Obsidian), 3, 1)
            .unwrap();

        sim.interact(0, 1);
        sim.tick();
        sim.tick();

        assert_eq!(kind_at(&sim, 2, 1), Some(BlockKind::Solid(SolidKind::Stone)));
        assert!(!sim.query(1, 1).unwrap().visual.extended);
        assert_eq!(sim.metrics().piston_push_failures, 1);
    }

    #[test]
    fn push_fails_at_the_grid_edge() {
        let mut sim = CircuitSim::new(6, 4);
        let piston = sim.create_block(BlockKind::Piston, 4, 1).unwrap();
        if let Some(block) = sim.grid.block_mut(piston) {
            block.rotation = Direction::East;
        }
        sim.create_block(BlockKind::Solid(SolidKind::Stone), 5, 1)
            .unwrap();
        sim.create_block(BlockKind::Lever, 3, 1).unwrap();

        sim.interact(3, 1);
        sim.tick();
        sim.tick();

        // The stone cannot leave the grid, so nothing moves.
        assert_eq!(kind_at(&sim, 5, 1), Some(BlockKind::Solid(SolidKind::Stone)));
        assert!(!sim.query(4, 1).unwrap().visual.extended);
    }

    #[test]
    fn retraction_removes_the_head() {
        let mut sim = piston_rig(BlockKind::Piston);
        sim.interact(0, 1);
        sim.tick();
        sim.tick();
        assert_eq!(kind_at(&sim, 2, 1), Some(BlockKind::PistonHead));

        sim.interact(0, 1);
        sim.tick();
        sim.tick();

        assert_eq!(kind_at(&sim, 2, 1), None);
        assert!(!sim.query(1, 1).unwrap().visual.extended);
    }

    #[test]
    fn plain_piston_leaves_pushed_blocks_behind() {
        let mut sim = piston_rig(BlockKind::Piston);
        sim.create_block(BlockKind::Solid(SolidKind::Stone), 2, 1)
            .unwrap();

        sim.interact(0, 1);
        sim.tick();
        sim.tick();
        sim.interact(0, 1);
        sim.tick();
        sim.tick();

        // Not sticky: the stone stays where it was pushed.
        assert_eq!(kind_at(&sim, 2, 1), None);
        assert_eq!(kind_at(&sim, 3, 1), Some(BlockKind::Solid(SolidKind::Stone)));
    }

    #[test]
    fn rotation_is_refused_while_extended() {
        let mut sim = piston_rig(BlockKind::Piston);
        sim.interact(0, 1);
        sim.tick();
        sim.tick();

        sim.rotate_block(1, 1);
        assert_eq!(sim.query(1, 1).unwrap().rotation, Direction::East);

        // After retraction the piston rotates again.
        sim.interact(0, 1);
        sim.tick();
        sim.tick();
        sim.rotate_block(1, 1);
        assert_eq!(sim.query(1, 1).unwrap().rotation, Direction::South);
    }
}
