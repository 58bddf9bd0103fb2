//! The scheduled-tick queue.
//!
//! Blocks enqueue future work addressed to a cell; each game tick drains
//! every entry that has come due. A delay of 0 fires on the *next* tick,
//! never within the call that enqueued it.

use gridstone_core::{BlockId, GridPos, SimTick};

/// A pending update addressed to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTick {
    /// Cell the update is addressed to.
    pub pos: GridPos,
    /// Block occupying the cell at enqueue time. If the occupant changes
    /// before the entry drains, the entry is dropped.
    pub block: BlockId,
    /// Tick at which the entry becomes due.
    pub due: SimTick,
    /// Tie-break within a tick; lower fires first. Currently always 0.
    pub priority: i8,
    seq: u64,
}

/// Insertion-ordered queue of [`ScheduledTick`] entries.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    now: SimTick,
    entries: Vec<ScheduledTick>,
    next_seq: u64,
}

impl TickScheduler {
    /// An empty queue at tick zero.
    pub fn new() -> Self {
        Self {
            now: SimTick::ZERO,
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    /// The current tick.
    pub fn now(&self) -> SimTick {
        self.now
    }

    /// Advance the clock by one tick and return the new value.
    pub fn advance(&mut self) -> SimTick {
        self.now = self.now.advance(1);
        self.now
    }

    /// Enqueue an update for `pos` to fire `delay` ticks from now.
    ///
    /// Duplicate entries for the same cell are permitted; each fires
    /// independently when due.
    pub fn schedule(&mut self, pos: GridPos, block: BlockId, delay: u64, priority: i8) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(ScheduledTick {
            pos,
            block,
            due: self.now.advance(delay),
            priority,
            seq,
        });
    }

    /// Remove and return every entry due at or before the current tick,
    /// ordered by `(due, priority, seq)`. With every caller passing
    /// priority 0 this is insertion order.
    pub fn drain_due(&mut self) -> Vec<ScheduledTick> {
        let now = self.now;
        let mut due = Vec::new();
        self.entries.retain(|entry| {
            if entry.due <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|entry| (entry.due, entry.priority, entry.seq));
        due
    }

    /// Number of entries not yet due.
    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether any queued entry is addressed to `block` at `pos`. Entries
    /// left behind at a cell the block has since moved out of do not count;
    /// they will be dropped as orphans when they drain.
    pub fn has_pending(&self, pos: GridPos, block: BlockId) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.block == block && entry.pos == pos)
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: i32, y: i32) -> GridPos {
        GridPos::new(x, y)
    }

    #[test]
    fn zero_delay_fires_on_next_tick_only() {
        let mut queue = TickScheduler::new();
        queue.schedule(pos(1, 1), BlockId(7), 0, 0);

        // Nothing is due before the clock moves.
        assert!(queue.drain_due().is_empty());
        assert_eq!(queue.pending_count(), 1);

        queue.advance();
        let due = queue.drain_due();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].pos, pos(1, 1));
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn entries_fire_in_insertion_order_within_a_tick() {
        let mut queue = TickScheduler::new();
        queue.schedule(pos(0, 0), BlockId(0), 1, 0);
        queue.schedule(pos(1, 0), BlockId(1), 1, 0);
        queue.schedule(pos(2, 0), BlockId(2), 1, 0);

        queue.advance();
        let order: Vec<i32> = queue.drain_due().iter().map(|e| e.pos.x).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn earlier_due_ticks_fire_first() {
        let mut queue = TickScheduler::new();
        queue.schedule(pos(9, 0), BlockId(0), 2, 0);
        queue.schedule(pos(5, 0), BlockId(1), 1, 0);

        queue.advance();
        queue.advance();
        let order: Vec<i32> = queue.drain_due().iter().map(|e| e.pos.x).collect();
        assert_eq!(order, vec![5, 9]);
    }

    #[test]
    fn duplicates_fire_independently() {
        let mut queue = TickScheduler::new();
        queue.schedule(pos(3, 3), BlockId(4), 1, 0);
        queue.schedule(pos(3, 3), BlockId(4), 1, 0);

        queue.advance();
        assert_eq!(queue.drain_due().len(), 2);
    }

    #[test]
    fn pending_lookup_by_cell_and_block() {
        let mut queue = TickScheduler::new();
        assert!(!queue.has_pending(pos(3, 3), BlockId(4)));
        queue.schedule(pos(3, 3), BlockId(4), 2, 0);
        assert!(queue.has_pending(pos(3, 3), BlockId(4)));
        assert!(!queue.has_pending(pos(3, 3), BlockId(5)));
        // An entry does not count for a cell the block is no longer at.
        assert!(!queue.has_pending(pos(4, 3), BlockId(4)));

        queue.advance();
        queue.advance();
        queue.drain_due();
        assert!(!queue.has_pending(pos(3, 3), BlockId(4)));
    }

    #[test]
    fn entries_keep_waiting_until_due() {
        let mut queue = TickScheduler::new();
        queue.schedule(pos(0, 0), BlockId(0), 3, 0);

        queue.advance();
        assert!(queue.drain_due().is_empty());
        queue.advance();
        assert!(queue.drain_due().is_empty());
        queue.advance();
        assert_eq!(queue.drain_due().len(), 1);
    }
}
