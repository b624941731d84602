//! Statistics and debugging for the buddy tree
//!
//! Provides block statistics and allocation failure reporting.

use super::node_state::MAX_LEVEL;

/// Buddy tree statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyStats {
    pub total_units: usize,
    pub used_units: usize,
    pub free_units: usize,
    /// Outstanding allocations, indexed by order (block length `2^order`).
    pub allocated_blocks_by_order: [usize; MAX_LEVEL + 1],
    /// Maximal free blocks, indexed by order.
    pub free_blocks_by_order: [usize; MAX_LEVEL + 1],
}

impl Default for BuddyStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BuddyStats {
    pub const fn new() -> Self {
        Self {
            total_units: 0,
            used_units: 0,
            free_units: 0,
            allocated_blocks_by_order: [0; MAX_LEVEL + 1],
            free_blocks_by_order: [0; MAX_LEVEL + 1],
        }
    }

    /// Add statistics from another BuddyStats
    pub fn add(&mut self, other: &BuddyStats) {
        self.total_units += other.total_units;
        self.used_units += other.used_units;
        self.free_units += other.free_units;
        for (i, &count) in other.allocated_blocks_by_order.iter().enumerate() {
            self.allocated_blocks_by_order[i] += count;
        }
        for (i, &count) in other.free_blocks_by_order.iter().enumerate() {
            self.free_blocks_by_order[i] += count;
        }
    }

    /// Largest order with a free block, if any.
    pub fn largest_free_order(&self) -> Option<usize> {
        (0..=MAX_LEVEL)
            .rev()
            .find(|&order| self.free_blocks_by_order[order] > 0)
    }
}

/// Allocation failure reporter
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Print detailed allocation failure statistics
    #[allow(unused_variables)]
    pub fn print_alloc_failure_stats(stats: &BuddyStats, requested: usize, rounded: usize) {
        #[cfg(feature = "log")]
        use log::error;
        error!("========================================");
        error!("Request: {} units (rounded to {})", requested, rounded);
        error!("  Total units: {}", stats.total_units);
        error!("  Free units: {}", stats.free_units);
        error!("  Used units: {}", stats.used_units);
        error!("  Free blocks by order:");
        for order in (0..=MAX_LEVEL).rev() {
            let count = stats.free_blocks_by_order[order];
            if count > 0 {
                error!(
                    "    Order {}: {} blocks ({} units each, {} units total)",
                    order,
                    count,
                    1usize << order,
                    count << order
                );
            }
        }
        error!("========================================");
    }
}
