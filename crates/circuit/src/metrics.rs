//! Run counters for observability and headless drivers.

use gridstone_core::BlockName;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters accumulated over a simulator's lifetime.
///
/// `tick`, `blocks`, `pending_updates`, and `census` are filled in when a
/// snapshot is taken; the rest are running totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimMetrics {
    /// Current game tick.
    pub tick: u64,
    /// Blocks alive on the grid.
    pub blocks: usize,
    /// Scheduled entries not yet due.
    pub pending_updates: usize,
    /// Neighbor-update dispatches delivered to occupied cells.
    pub neighbor_updates: u64,
    /// Scheduled entries that fired on a live block.
    pub scheduled_fired: u64,
    /// Scheduled entries dropped because the cell was empty or had changed
    /// occupants.
    pub orphan_entries_dropped: u64,
    /// Successful piston extensions.
    pub piston_pushes: u64,
    /// Extensions refused by an immovable block or the push limit.
    pub piston_push_failures: u64,
    /// Count of live blocks per display name.
    pub census: BTreeMap<BlockName, usize>,
}
