//! Per-kind block state machines.
//!
//! Every machine guards its commits behind a strict equality check against
//! the previous state, so neighbor-update chains converge: no change means
//! no further notification.

use crate::block::{ComparatorMode, Logic, ObserverPhase};
use crate::power::power_output;
use crate::sim::CircuitSim;
use gridstone_core::{BlockId, BlockKind, Direction, GridPos};

/// One redstone tick in game ticks. Repeater delays are configured in
/// redstone ticks and converted here.
pub(crate) const GAME_TICKS_PER_REDSTONE_TICK: u64 = 2;

/// Lag between a torch's input changing and its output flipping.
const TORCH_UPDATE_DELAY: u64 = 2;

/// How long a pressed button stays on.
const BUTTON_PULSE_TICKS: u64 = 20;

/// Length of each half of an observer pulse.
const OBSERVER_PULSE_TICKS: u64 = 2;

impl CircuitSim {
    /// Kind-specific initial evaluation for a freshly placed block. The
    /// facade notifies the neighbors afterward.
    pub(crate) fn on_placed(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        match block.kind {
            BlockKind::Wire => self.update_wire(id),
            BlockKind::Torch => self.schedule_block(id, TORCH_UPDATE_DELAY),
            BlockKind::Repeater => self.update_repeater(id),
            BlockKind::Comparator => self.schedule_block(id, 0),
            BlockKind::Piston | BlockKind::StickyPiston => self.update_piston_trigger(id),
            _ => {}
        }
    }

    /// React to a change at a neighboring cell.
    pub(crate) fn on_neighbor_update(&mut self, id: BlockId, from: GridPos) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        match block.kind {
            BlockKind::Wire => self.update_wire(id),
            BlockKind::Torch => {
                // One pending re-evaluation is enough: it reads the live
                // input when it fires. Stacked duplicates would make a
                // torch that feeds its own support flip several times
                // inside a single tick.
                if !self.scheduler.has_pending(block.pos, id) {
                    self.schedule_block(id, TORCH_UPDATE_DELAY);
                }
            }
            BlockKind::Repeater => self.update_repeater(id),
            BlockKind::Comparator => self.schedule_block(id, 0),
            BlockKind::Observer => {
                // Only changes at the watched cell matter, and a pulse that
                // is already in flight absorbs further triggers. Piston
                // motion notifies the watched cell twice in one transition;
                // without the guard the doubled pulse would cancel itself.
                if from == block.pos.step(block.rotation)
                    && matches!(
                        block.logic,
                        Logic::Observer {
                            phase: ObserverPhase::Idle
                        }
                    )
                    && !self.scheduler.has_pending(block.pos, id)
                {
                    self.schedule_block(id, OBSERVER_PULSE_TICKS);
                }
            }
            BlockKind::Piston | BlockKind::StickyPiston => self.update_piston_trigger(id),
            BlockKind::Lever
            | BlockKind::Button
            | BlockKind::PistonHead
            | BlockKind::PowerSource
            | BlockKind::Solid(_) => {}
        }
    }

    /// Run the delayed half of a state machine when its entry comes due.
    pub(crate) fn on_scheduled_tick(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        match block.kind {
            BlockKind::Torch => self.scheduled_torch(id),
            BlockKind::Button => self.scheduled_button(id),
            BlockKind::Repeater => self.scheduled_repeater(id),
            BlockKind::Comparator => self.scheduled_comparator(id),
            BlockKind::Observer => self.scheduled_observer(id),
            BlockKind::Piston | BlockKind::StickyPiston => self.scheduled_piston(id),
            _ => {}
        }
    }

    // ---- wire ----

    /// Recompute a wire's level from its neighbors: emitters drive at full
    /// strength, adjacent wire loses one level per hop.
    pub(crate) fn update_wire(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let Logic::Wire { power: current } = block.logic else {
            return;
        };

        let mut level = 0u8;
        for dir in Direction::CARDINALS {
            let Some(neighbor) = self.grid.block_at(pos.step(dir)) else {
                continue;
            };
            let feed = match neighbor.kind {
                BlockKind::Wire => neighbor.logic.power_level().saturating_sub(1),
                kind if kind.emits_power() => power_output(neighbor, dir.opposite()),
                _ => 0,
            };
            level = level.max(feed);
        }

        if level == current {
            return;
        }
        if let Some(block) = self.grid.block_mut(id) {
            block.logic = Logic::Wire { power: level };
            block.refresh_visual();
        }
        self.notify_neighbors(pos);
    }

    // ---- torch ----

    fn scheduled_torch(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let attach = block.rotation;
        let Logic::Torch { lit } = block.logic else {
            return;
        };

        // The torch inverts the power its support feeds it.
        let want_lit = self.power_into(pos, attach) == 0;
        if want_lit == lit {
            return;
        }
        if let Some(block) = self.grid.block_mut(id) {
            block.logic = Logic::Torch { lit: want_lit };
            block.refresh_visual();
        }
        self.notify_neighbors(pos);
    }

    // ---- lever & button ----

    pub(crate) fn toggle_lever(&mut self, id: BlockId) {
        let Some(block) = self.grid.block_mut(id) else {
            return;
        };
        let Logic::Lever { on } = block.logic else {
            return;
        };
        block.logic = Logic::Lever { on: !on };
        block.refresh_visual();
        let pos = block.pos;
        self.notify_neighbors(pos);
    }

    pub(crate) fn press_button(&mut self, id: BlockId) {
        let Some(block) = self.grid.block_mut(id) else {
            return;
        };
        let Logic::Button { pressed } = block.logic else {
            return;
        };
        if pressed {
            return;
        }
        block.logic = Logic::Button { pressed: true };
        block.refresh_visual();
        let pos = block.pos;
        self.notify_neighbors(pos);
        self.schedule_block(id, BUTTON_PULSE_TICKS);
    }

    fn scheduled_button(&mut self, id: BlockId) {
        let Some(block) = self.grid.block_mut(id) else {
            return;
        };
        let Logic::Button { pressed: true } = block.logic else {
            return;
        };
        block.logic = Logic::Button { pressed: false };
        block.refresh_visual();
        let pos = block.pos;
        self.notify_neighbors(pos);
    }

    // ---- repeater ----

    /// Re-evaluate side locking, then (if unlocked) compare rear input with
    /// the current output and schedule a transition after the configured
    /// delay.
    fn update_repeater(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let facing = block.rotation;
        let Logic::Repeater { delay, powered, .. } = block.logic else {
            return;
        };

        let locked = self.repeater_side_locked(pos, facing);
        if let Some(block) = self.grid.block_mut(id) {
            if let Logic::Repeater { locked: slot, .. } = &mut block.logic {
                *slot = locked;
            }
        }
        if locked {
            return;
        }

        let want = self.power_into(pos, facing.opposite()) > 0;
        if want != powered {
            self.schedule_block(id, u64::from(delay) * GAME_TICKS_PER_REDSTONE_TICK);
        }
    }

    /// A repeater is locked while a repeater or comparator on either side
    /// drives nonzero power at it.
    fn repeater_side_locked(&self, pos: GridPos, facing: Direction) -> bool {
        [facing.left(), facing.right()].into_iter().any(|side| {
            self.grid.block_at(pos.step(side)).is_some_and(|neighbor| {
                matches!(
                    neighbor.kind,
                    BlockKind::Repeater | BlockKind::Comparator
                ) && power_output(neighbor, side.opposite()) > 0
            })
        })
    }

    fn scheduled_repeater(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let facing = block.rotation;
        let Logic::Repeater {
            powered, locked, ..
        } = block.logic
        else {
            return;
        };
        if locked {
            return;
        }

        // Inputs may have flipped again while the transition was pending.
        let want = self.power_into(pos, facing.opposite()) > 0;
        if want == powered {
            return;
        }
        if let Some(block) = self.grid.block_mut(id) {
            if let Logic::Repeater { powered: slot, .. } = &mut block.logic {
                *slot = want;
            }
            block.refresh_visual();
        }
        self.notify_neighbors(pos);
    }

    // ---- comparator ----

    fn scheduled_comparator(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let facing = block.rotation;
        let Logic::Comparator { mode, output } = block.logic else {
            return;
        };

        let rear = self.power_into(pos, facing.opposite());
        let side = self
            .power_into(pos, facing.left())
            .max(self.power_into(pos, facing.right()));
        let out = match mode {
            ComparatorMode::Compare => {
                if rear >= side {
                    rear
                } else {
                    0
                }
            }
            ComparatorMode::Subtract => rear.saturating_sub(side),
        };

        if out == output {
            return;
        }
        if let Some(block) = self.grid.block_mut(id) {
            if let Logic::Comparator { output: slot, .. } = &mut block.logic {
                *slot = out;
            }
            block.refresh_visual();
        }
        self.notify_neighbors(pos);
    }

    // ---- observer ----

    fn scheduled_observer(&mut self, id: BlockId) {
        let Some(block) = self.grid.block(id) else {
            return;
        };
        let pos = block.pos;
        let Logic::Observer { phase } = block.logic else {
            return;
        };

        match phase {
            ObserverPhase::Idle => {
                if let Some(block) = self.grid.block_mut(id) {
                    block.logic = Logic::Observer {
                        phase: ObserverPhase::PulseOn,
                    };
                    block.refresh_visual();
                }
                self.notify_neighbors(pos);
                self.schedule_block(id, OBSERVER_PULSE_TICKS);
            }
            ObserverPhase::PulseOn => {
                if let Some(block) = self.grid.block_mut(id) {
                    block.logic = Logic::Observer {
                        phase: ObserverPhase::Idle,
                    };
                    block.refresh_visual();
                }
                self.notify_neighbors(pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MAX_POWER;
    use gridstone_core::SolidKind;

    fn wire_level(sim: &CircuitSim, x: i32, y: i32) -> u8 {
        match sim.query(x, y).map(|b| &b.logic) {
            Some(Logic::Wire { power }) => *power,
            other => panic!("expected wire at ({x}, {y}), found {other:?}"),
        }
    }

    #[test]
    fn wire_attenuates_one_level_per_hop() {
        let mut sim = CircuitSim::new(20, 4);
        sim.create_block(BlockKind::PowerSource, 0, 1).unwrap();
        for x in 1..=16 {
            sim.create_block(BlockKind::Wire, x, 1).unwrap();
        }

        // Adjacent to the source the wire carries full strength; each
        // wire-to-wire hop loses one level.
        assert_eq!(wire_level(&sim, 1, 1), MAX_POWER);
        assert_eq!(wire_level(&sim, 2, 1), 14);
        assert_eq!(wire_level(&sim, 15, 1), 1);
        assert_eq!(wire_level(&sim, 16, 1), 0);
    }

    #[test]
    fn torch_ignites_two_ticks_after_placement() {
        let mut sim = CircuitSim::new(8, 8);
        sim.create_block(BlockKind::Torch, 2, 2).unwrap();
        assert_eq!(sim.query(2, 2).unwrap().visual.power_level, 0);

        sim.tick();
        assert_eq!(sim.query(2, 2).unwrap().visual.power_level, 0);
        sim.tick();
        assert_eq!(sim.query(2, 2).unwrap().visual.power_level, MAX_POWER);
    }

    #[test]
    fn torch_inverts_its_support_with_lag() {
        let mut sim = CircuitSim::new(8, 8);
        // Torch attached to the wire east of it.
        let torch = sim.create_block(BlockKind::Torch, 2, 2).unwrap();
        if let Some(block) = sim.grid.block_mut(torch) {
            block.rotation = Direction::East;
        }
        sim.create_block(BlockKind::Wire, 3, 2).unwrap();
        sim.create_block(BlockKind::Lever, 4, 2).unwrap();

        sim.tick();
        sim.tick();
        assert!(matches!(
            sim.query(2, 2).unwrap().logic,
            Logic::Torch { lit: true }
        ));

        sim.interact(4, 2);
        // The wire is hot immediately, the torch follows two ticks later.
        assert_eq!(wire_level(&sim, 3, 2), MAX_POWER);
        assert!(matches!(
            sim.query(2, 2).unwrap().logic,
            Logic::Torch { lit: true }
        ));
        sim.tick();
        sim.tick();
        assert!(matches!(
            sim.query(2, 2).unwrap().logic,
            Logic::Torch { lit: false }
        ));
    }

    #[test]
    fn torch_does_not_backfeed_its_support() {
        let mut sim = CircuitSim::new(8, 8);
        let torch = sim.create_block(BlockKind::Torch, 2, 2).unwrap();
        if let Some(block) = sim.grid.block_mut(torch) {
            block.rotation = Direction::East;
        }
        sim.create_block(BlockKind::Wire, 3, 2).unwrap();
        sim.tick();
        sim.tick();

        // Lit torch, but the supporting wire sees nothing from it.
        assert!(matches!(
            sim.query(2, 2).unwrap().logic,
            Logic::Torch { lit: true }
        ));
        assert_eq!(wire_level(&sim, 3, 2), 0);
    }

    #[test]
    fn button_releases_after_twenty_ticks() {
        let mut sim = CircuitSim::new(8, 8);
        sim.create_block(BlockKind::Button, 1, 1).unwrap();
        sim.create_block(BlockKind::Wire, 2, 1).unwrap();

        sim.interact(1, 1);
        assert_eq!(wire_level(&sim, 2, 1), MAX_POWER);

        // Re-pressing does not stretch the pulse.
        for _ in 0..10 {
            sim.tick();
        }
        sim.interact(1, 1);
        for _ in 0..9 {
            sim.tick();
        }
        assert_eq!(wire_level(&sim, 2, 1), MAX_POWER);
        sim.tick();
        assert_eq!(wire_level(&sim, 2, 1), 0);
    }

    #[test]
    fn repeater_stays_off_with_dead_rear_input() {
        let mut sim = CircuitSim::new(8, 8);
        let repeater = sim.create_block(BlockKind::Repeater, 2, 2).unwrap();
        if let Some(block) = sim.grid.block_mut(repeater) {
            block.rotation = Direction::East;
        }
        sim.create_block(BlockKind::Wire, 1, 2).unwrap();
        sim.create_block(BlockKind::Wire, 3, 2).unwrap();

        for _ in 0..20 {
            sim.tick();
        }
        assert!(matches!(
            sim.query(2, 2).unwrap().logic,
            Logic::Repeater { powered: false, .. }
        ));
        assert_eq!(wire_level(&sim, 3, 2), 0);
    }

    #[test]
    fn repeater_emits_forward_only() {
        let mut sim = CircuitSim::new(8, 8);
        let repeater = sim.create_block(BlockKind::Repeater, 2, 2).unwrap();
        if let Some(block) = sim.grid.block_mut(repeater) {
            block.rotation = Direction::East;
        }
        sim.create_block(BlockKind::PowerSource, 1, 2).unwrap();
        sim.create_block(BlockKind::Wire, 3, 2).unwrap();
        sim.create_block(BlockKind::Wire, 2, 1).unwrap();

        sim.tick();
        sim.tick();
        assert_eq!(wire_level(&sim, 3, 2), MAX_POWER);
        // The side neighbor sees nothing.
        assert_eq!(wire_level(&sim, 2, 1), 0);
    }

    #[test]
    fn comparator_compare_mode_gates_on_side_input() {
        let mut sim = CircuitSim::new(8, 8);
        let comparator = sim.create_block(BlockKind::Comparator, 2, 2).unwrap();
        if let Some(block) = sim.grid.block_mut(comparator) {
            block.rotation = Direction::East;
        }
        sim.create_block(BlockKind::PowerSource, 1, 2).unwrap();
        sim.create_block(BlockKind::Wire, 3, 2).unwrap();

        sim.tick();
        // Rear 15, no side input: output follows the rear.
        assert!(matches!(
            sim.query(2, 2).unwrap().logic,
            Logic::Comparator {
                output: MAX_POWER,
                ..
            }
        ));
        assert_eq!(wire_level(&sim, 3, 2), MAX_POWER);
    }

    #[test]
    fn comparator_with_equal_rear_and_side_returns_rear() {
        let mut sim = CircuitSim::new(8, 8);
        let comparator = sim.create_block(BlockKind::Comparator, 2, 2).unwrap();
        if let Some(block) = sim.grid.block_mut(comparator) {
            block.rotation = Direction::East;
        }
        sim.create_block(BlockKind::PowerSource, 1, 2).unwrap();
        // North side: an equally strong source.
        sim.create_block(BlockKind::PowerSource, 2, 1).unwrap();

        sim.tick();
        assert!(matches!(
            sim.query(2, 2).unwrap().logic,
            Logic::Comparator {
                output: MAX_POWER,
                ..
            }
        ));
    }

    #[test]
    fn observer_ignores_updates_away_from_its_face() {
        let mut sim = CircuitSim::new(8, 8);
        let observer = sim.create_block(BlockKind::Observer, 2, 2).unwrap();
        if let Some(block) = sim.grid.block_mut(observer) {
            block.rotation = Direction::East;
        }
        // A lever south of the observer: toggling it updates the observer,
        // but not from the watched cell.
        sim.create_block(BlockKind::Lever, 2, 3).unwrap();
        sim.interact(2, 3);
        for _ in 0..6 {
            sim.tick();
            assert!(matches!(
                sim.query(2, 2).unwrap().logic,
                Logic::Observer {
                    phase: ObserverPhase::Idle
                }
            ));
        }
    }

    #[test]
    fn observer_pulses_after_watched_cell_changes() {
        let mut sim = CircuitSim::new(8, 8);
        let observer = sim.create_block(BlockKind::Observer, 2, 2).unwrap();
        if let Some(block) = sim.grid.block_mut(observer) {
            block.rotation = Direction::East;
        }
        // Wire behind the observer reads its output.
        sim.create_block(BlockKind::Wire, 1, 2).unwrap();

        // Placing a block in the watched cell triggers a pulse.
        sim.create_block(BlockKind::Solid(SolidKind::Stone), 3, 2)
            .unwrap();
        assert_eq!(wire_level(&sim, 1, 2), 0);
        sim.tick();
        sim.tick();
        assert_eq!(wire_level(&sim, 1, 2), MAX_POWER);
        sim.tick();
        sim.tick();
        assert_eq!(wire_level(&sim, 1, 2), 0);
    }
}
