//! The simulator facade: player-style edits, the game-tick loop, and the
//! neighbor-update fan-out that ties the block state machines together.

use crate::block::Logic;
use crate::grid::Grid;
use crate::metrics::SimMetrics;
use crate::scheduler::TickScheduler;
use gridstone_core::{BlockId, BlockKind, GridPos, SimTick};
use thiserror::Error;
use tracing::warn;

/// Default grid width in cells.
pub const DEFAULT_GRID_WIDTH: u32 = 64;
/// Default grid height in cells.
pub const DEFAULT_GRID_HEIGHT: u32 = 48;

/// Neighbor-update dispatches allowed per externally initiated chain.
/// Convergent circuits stay far below this; hitting it means a state
/// machine failed to reach a fixed point.
const MAX_CHAIN_DISPATCHES: u64 = 10_000;

/// Why a placement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlaceError {
    /// The coordinate lies outside the grid.
    #[error("cell ({x}, {y}) is outside the grid")]
    OutOfBounds {
        /// Requested column.
        x: i32,
        /// Requested row.
        y: i32,
    },
    /// The cell already holds a block.
    #[error("cell ({x}, {y}) is already occupied")]
    Occupied {
        /// Requested column.
        x: i32,
        /// Requested row.
        y: i32,
    },
}

/// A running circuit simulation.
///
/// All mutation happens through the edit methods and [`CircuitSim::tick`];
/// everything runs on the calling thread and every callback completes before
/// control returns.
pub struct CircuitSim {
    pub(crate) grid: Grid,
    pub(crate) scheduler: TickScheduler,
    pub(crate) metrics: SimMetrics,
    chain_dispatches: u64,
}

impl CircuitSim {
    /// Create a simulator over an empty `width` x `height` grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            grid: Grid::new(width, height),
            scheduler: TickScheduler::new(),
            metrics: SimMetrics::default(),
            chain_dispatches: 0,
        }
    }

    /// Read-only access to the grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The current game tick.
    pub fn current_tick(&self) -> SimTick {
        self.scheduler.now()
    }

    /// Scheduled entries not yet due.
    pub fn pending_count(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Snapshot of the run counters.
    pub fn metrics(&self) -> SimMetrics {
        let mut snapshot = self.metrics.clone();
        snapshot.tick = self.scheduler.now().0;
        snapshot.blocks = self.grid.len();
        snapshot.pending_updates = self.scheduler.pending_count();
        snapshot.census.clear();
        for block in self.grid.blocks() {
            *snapshot.census.entry(block.visual.name).or_insert(0) += 1;
        }
        snapshot
    }

    /// Place a block of `kind` at `(x, y)`.
    pub fn create_block(&mut self, kind: BlockKind, x: i32, y: i32) -> Result<BlockId, PlaceError> {
        let pos = GridPos::new(x, y);
        if !self.grid.in_bounds(pos) {
            return Err(PlaceError::OutOfBounds { x, y });
        }
        if self.grid.occupant(pos).is_some() {
            return Err(PlaceError::Occupied { x, y });
        }

        self.begin_chain();
        let id = self.grid.allocate(kind, pos);
        self.on_placed(id);
        self.notify_neighbors(pos);
        Ok(id)
    }

    /// Delete the block at `(x, y)`, if any.
    ///
    /// Removing an extended piston also removes its head; removing a head
    /// directly retracts its owning piston's state so the two never
    /// disagree.
    pub fn remove_block(&mut self, x: i32, y: i32) {
        let pos = GridPos::new(x, y);
        let Some(id) = self.grid.occupant(pos) else {
            return;
        };

        self.begin_chain();
        let Some(removed) = self.grid.remove(id) else {
            return;
        };

        let mut head_cell = None;
        match removed.logic {
            Logic::Piston {
                extended: true,
                head: Some(head_id),
                ..
            } => {
                // Orphaned head: take it down with its base.
                if let Some(head) = self.grid.block(head_id) {
                    if head.kind == BlockKind::PistonHead
                        && head.pos == pos.step(removed.rotation)
                    {
                        let cell = head.pos;
                        let _ = self.grid.remove(head_id);
                        head_cell = Some(cell);
                    }
                }
            }
            Logic::PistonHead {
                piston: Some(base_id),
                ..
            } => {
                if let Some(base) = self.grid.block_mut(base_id) {
                    if let Logic::Piston { extended, head, .. } = &mut base.logic {
                        if *head == Some(id) {
                            *extended = false;
                            *head = None;
                            base.refresh_visual();
                        }
                    }
                }
            }
            _ => {}
        }

        self.notify_neighbors(pos);
        if let Some(cell) = head_cell {
            self.notify_neighbors(cell);
        }
    }

    /// Step the rotation of the block at `(x, y)` one cardinal clockwise.
    /// Extended pistons refuse to rotate.
    pub fn rotate_block(&mut self, x: i32, y: i32) {
        let pos = GridPos::new(x, y);
        let Some(id) = self.grid.occupant(pos) else {
            return;
        };
        let Some(block) = self.grid.block_mut(id) else {
            return;
        };
        if matches!(block.logic, Logic::Piston { extended: true, .. }) {
            return;
        }
        block.rotation = block.rotation.right();

        self.begin_chain();
        self.dispatch_neighbor_update(pos, pos);
        self.notify_neighbors(pos);
    }

    /// Use the block at `(x, y)`: levers toggle, buttons press, everything
    /// else ignores the interaction.
    pub fn interact(&mut self, x: i32, y: i32) {
        let pos = GridPos::new(x, y);
        let Some(id) = self.grid.occupant(pos) else {
            return;
        };
        let Some(kind) = self.grid.block(id).map(|b| b.kind) else {
            return;
        };

        self.begin_chain();
        match kind {
            BlockKind::Lever => self.toggle_lever(id),
            BlockKind::Button => self.press_button(id),
            _ => {}
        }
    }

    /// Cycle a repeater's delay 1 -> 2 -> 3 -> 4 -> 1 redstone ticks.
    pub fn configure_repeater_delay(&mut self, x: i32, y: i32) {
        let pos = GridPos::new(x, y);
        let Some(id) = self.grid.occupant(pos) else {
            return;
        };
        let Some(block) = self.grid.block_mut(id) else {
            return;
        };
        if let Logic::Repeater { delay, .. } = &mut block.logic {
            *delay = if *delay >= 4 { 1 } else { *delay + 1 };
        }
    }

    /// Toggle a comparator between compare and subtract mode. The new mode
    /// takes effect on the next tick.
    pub fn configure_comparator_mode(&mut self, x: i32, y: i32) {
        let pos = GridPos::new(x, y);
        let Some(id) = self.grid.occupant(pos) else {
            return;
        };
        let Some(block) = self.grid.block_mut(id) else {
            return;
        };
        if let Logic::Comparator { mode, .. } = &mut block.logic {
            *mode = mode.toggled();
            self.schedule_block(id, 0);
        }
    }

    /// Advance the clock one game tick and run every update that has come
    /// due. Entries addressed to a vacated or re-occupied cell are dropped.
    pub fn tick(&mut self) {
        self.scheduler.advance();
        for entry in self.scheduler.drain_due() {
            self.begin_chain();
            match self.grid.occupant(entry.pos) {
                Some(id) if id == entry.block => {
                    self.metrics.scheduled_fired += 1;
                    self.on_scheduled_tick(id);
                }
                _ => self.metrics.orphan_entries_dropped += 1,
            }
        }
    }

    /// Read-only view of the block at `(x, y)`.
    pub fn query(&self, x: i32, y: i32) -> Option<&crate::block::Block> {
        self.grid.block_at(GridPos::new(x, y))
    }

    /// Strongest power entering the cell at `(x, y)` from its neighbors.
    pub fn query_power(&self, x: i32, y: i32) -> u8 {
        let pos = GridPos::new(x, y);
        if !self.grid.in_bounds(pos) {
            return 0;
        }
        self.max_neighbor_power(pos)
    }

    // ---- internal plumbing shared by the state machines ----

    /// Reset the per-chain dispatch budget. Called at every external entry
    /// point and for each drained scheduler entry.
    fn begin_chain(&mut self) {
        self.chain_dispatches = 0;
    }

    /// Fan a neighbor update out to the four cardinal neighbors of `pos`,
    /// depth-first.
    pub(crate) fn notify_neighbors(&mut self, pos: GridPos) {
        for neighbor in pos.neighbors() {
            self.dispatch_neighbor_update(neighbor, pos);
        }
    }

    /// Deliver one neighbor update, charging it against the chain budget.
    pub(crate) fn dispatch_neighbor_update(&mut self, pos: GridPos, from: GridPos) {
        if !self.grid.in_bounds(pos) {
            return;
        }
        self.chain_dispatches += 1;
        if self.chain_dispatches > MAX_CHAIN_DISPATCHES {
            if self.chain_dispatches == MAX_CHAIN_DISPATCHES + 1 {
                warn!(
                    x = pos.x,
                    y = pos.y,
                    limit = MAX_CHAIN_DISPATCHES,
                    "update chain exceeded its dispatch budget; dropping the remainder"
                );
            }
            return;
        }
        let Some(id) = self.grid.occupant(pos) else {
            return;
        };
        self.metrics.neighbor_updates += 1;
        self.on_neighbor_update(id, from);
    }

    /// Enqueue a scheduled update for `id`'s current cell.
    pub(crate) fn schedule_block(&mut self, id: BlockId, delay: u64) {
        if let Some(block) = self.grid.block(id) {
            self.scheduler.schedule(block.pos, id, delay, 0);
        }
    }
}

impl Default for CircuitSim {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_WIDTH, DEFAULT_GRID_HEIGHT)
    }
}
