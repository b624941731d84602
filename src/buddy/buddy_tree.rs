//! Buddy tree engine
//!
//! Tracks the occupancy of a `2^level` unit arena in a flat array of node
//! states laid out as an implicit complete binary tree. Allocation is a
//! leftmost-fit depth-first walk that splits free blocks on the way down;
//! release coalesces free buddies on the way up.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::{is_aligned, AllocError, AllocResult, OffsetAllocator};

#[cfg(feature = "log")]
use log::{debug, info, trace, warn};

#[cfg(feature = "tracking")]
use super::stats::{BuddyStats, MemoryStatsReporter};

use super::index::{
    block_len, is_left_child, left_child_of, next_power_of_two, offset_of, parent_of,
    right_child_of, sibling_of,
};
use super::node_state::{NodeState, MAX_LEVEL};

/// A fixed-capacity buddy allocator over a virtual arena of `2^level` units.
///
/// Every node below a `Free` or `Allocated` node is kept `Free`, so a tree
/// whose allocations have all been released is identical to a fresh one.
#[derive(Debug, Clone)]
pub struct BuddyTree {
    level: usize,
    used_units: usize,
    /// One cell per node, `2^(level + 1) - 1` in total.
    states: Vec<NodeState>,
}

impl BuddyTree {
    /// Create a tree for an arena of `2^level` units with every node free.
    pub fn new(level: usize) -> AllocResult<Self> {
        if level > MAX_LEVEL {
            warn!(
                "buddy tree: level {} exceeds maximum level {}",
                level, MAX_LEVEL
            );
            return Err(AllocError::InvalidParam);
        }

        let node_count = (2usize << level) - 1;
        let mut states = Vec::new();
        if states.try_reserve_exact(node_count).is_err() {
            warn!(
                "buddy tree: cannot reserve {} state cells for level {}",
                node_count, level
            );
            return Err(AllocError::NoMemory);
        }
        states.resize(node_count, NodeState::Free);

        info!(
            "buddy tree: created level {} ({} units, {} nodes)",
            level,
            1usize << level,
            node_count
        );
        Ok(Self {
            level,
            used_units: 0,
            states,
        })
    }

    pub const fn level(&self) -> usize {
        self.level
    }

    /// Arena size in units.
    pub const fn capacity(&self) -> usize {
        1 << self.level
    }

    pub fn node_count(&self) -> usize {
        self.states.len()
    }

    /// Node states in heap order, root first.
    pub fn states(&self) -> &[NodeState] {
        &self.states
    }

    /// No allocation is outstanding.
    pub fn is_empty(&self) -> bool {
        self.used_units == 0
    }

    /// Allocate a block of at least `size` units and return its offset.
    ///
    /// The request is rounded up to a power of two (`0` counts as `1`) and
    /// the leftmost free block of exactly that length is granted.
    pub fn allocate(&mut self, size: usize) -> AllocResult<usize> {
        let len = self.round_request(size)?;

        match self.find_and_mark(len) {
            Some(offset) => {
                self.used_units += len;
                trace!(
                    "buddy tree: alloc {} units at offset {} (len {}): {}",
                    size,
                    offset,
                    len,
                    self
                );
                Ok(offset)
            }
            None => {
                debug!(
                    "buddy tree: no free block of {} units for request of {}",
                    len, size
                );
                #[cfg(feature = "tracking")]
                MemoryStatsReporter::print_alloc_failure_stats(&self.stats(), size, len);
                Err(AllocError::NoFreeBlock)
            }
        }
    }

    /// Allocate the block of at least `size` units that starts at `offset`.
    ///
    /// `offset` must be aligned to the rounded size.
    pub fn allocate_at(&mut self, offset: usize, size: usize) -> AllocResult<usize> {
        let len = self.round_request(size)?;
        if offset >= self.capacity() || !is_aligned(offset, len) {
            warn!(
                "buddy tree: offset {} is not a valid start for a {} unit block",
                offset, len
            );
            return Err(AllocError::InvalidParam);
        }

        // Nothing is modified before the walk reaches a free node, and
        // everything below a free node is free, so failures leave no marks.
        let mut index = 0;
        let mut left = 0;
        let mut length = self.capacity();
        while length > len {
            match self.states[index] {
                NodeState::Free | NodeState::Split => {
                    self.states[index] = NodeState::Split;
                    length /= 2;
                    if offset < left + length {
                        index = left_child_of(index);
                    } else {
                        index = right_child_of(index);
                        left += length;
                    }
                }
                NodeState::Allocated | NodeState::Full => {
                    debug!(
                        "buddy tree: block [{}, {}) covering offset {} is occupied",
                        left,
                        left + length,
                        offset
                    );
                    return Err(AllocError::NoFreeBlock);
                }
            }
        }

        if self.states[index] != NodeState::Free {
            debug!(
                "buddy tree: block [{}, {}) is not free ({:?})",
                offset,
                offset + len,
                self.states[index]
            );
            return Err(AllocError::NoFreeBlock);
        }

        self.states[index] = NodeState::Allocated;
        self.mark_parent(index);
        self.used_units += len;
        trace!(
            "buddy tree: alloc {} units at fixed offset {} (len {}): {}",
            size,
            offset,
            len,
            self
        );
        Ok(offset)
    }

    /// Release the outstanding block starting at `offset`, merging it with
    /// free buddies as far up as possible.
    pub fn free(&mut self, offset: usize) -> AllocResult {
        let (index, length) = self.locate(offset).map_err(|err| {
            warn!("buddy tree: free of offset {} rejected: {:?}", offset, err);
            err
        })?;

        self.combine_parent(index);
        self.used_units -= length;
        trace!(
            "buddy tree: free offset {} (len {}): {}",
            offset,
            length,
            self
        );
        Ok(())
    }

    /// Length of the outstanding block starting at `offset`.
    pub fn size_of(&self, offset: usize) -> AllocResult<usize> {
        let (_, length) = self.locate(offset).map_err(|err| {
            warn!("buddy tree: size of offset {} rejected: {:?}", offset, err);
            err
        })?;
        Ok(length)
    }

    /// Whether `offset` starts an outstanding block.
    pub fn is_allocated(&self, offset: usize) -> bool {
        self.locate(offset).is_ok()
    }

    /// Render the tree: free blocks as `(offset:len)`, allocated blocks as
    /// `[offset:len]`, split nodes as `(left right)` and full nodes as
    /// `{left right}`.
    pub fn dump(&self) -> String {
        self.to_string()
    }

    #[cfg(feature = "tracking")]
    pub fn stats(&self) -> BuddyStats {
        let mut stats = BuddyStats::new();
        stats.total_units = self.capacity();
        stats.used_units = self.used_units;
        stats.free_units = self.capacity() - self.used_units;
        self.collect_stats(0, 0, &mut stats);
        stats
    }

    #[cfg(feature = "tracking")]
    fn collect_stats(&self, index: usize, depth: usize, stats: &mut BuddyStats) {
        let order = self.level - depth;
        match self.states[index] {
            NodeState::Free => stats.free_blocks_by_order[order] += 1,
            NodeState::Allocated => stats.allocated_blocks_by_order[order] += 1,
            NodeState::Split | NodeState::Full => {
                self.collect_stats(left_child_of(index), depth + 1, stats);
                self.collect_stats(right_child_of(index), depth + 1, stats);
            }
        }
    }

    /// Round a request to the block length that will serve it.
    fn round_request(&self, size: usize) -> AllocResult<usize> {
        if size > self.capacity() {
            debug!(
                "buddy tree: request of {} units exceeds arena of {} units",
                size,
                self.capacity()
            );
            return Err(AllocError::CapacityExceeded);
        }
        Ok(if size == 0 { 1 } else { next_power_of_two(size) })
    }

    /// Find the leftmost free node of length `len`, mark it allocated and
    /// return its offset.
    ///
    /// The cursor walks depth first, left to right: oversized free nodes are
    /// split and entered, split nodes are entered, and occupied subtrees are
    /// skipped by moving to the right sibling or backtracking up to the
    /// nearest ancestor that is a left child.
    fn find_and_mark(&mut self, len: usize) -> Option<usize> {
        let mut index = 0;
        let mut depth = 0;
        let mut length = self.capacity();

        loop {
            let state = self.states[index];
            if length == len {
                if state == NodeState::Free {
                    self.states[index] = NodeState::Allocated;
                    self.mark_parent(index);
                    return Some(offset_of(index, depth, self.level));
                }
            } else {
                match state {
                    NodeState::Free | NodeState::Split => {
                        self.states[index] = NodeState::Split;
                        index = left_child_of(index);
                        depth += 1;
                        length /= 2;
                        continue;
                    }
                    NodeState::Allocated | NodeState::Full => {}
                }
            }

            if is_left_child(index) {
                index += 1;
                continue;
            }

            loop {
                index = parent_of(index)?;
                depth -= 1;
                length *= 2;
                if is_left_child(index) {
                    index += 1;
                    break;
                }
            }
        }
    }

    /// Mark ancestors full for as long as the node's buddy is occupied too.
    fn mark_parent(&mut self, mut index: usize) {
        while let (Some(sibling), Some(parent)) = (sibling_of(index), parent_of(index)) {
            if !self.states[sibling].is_occupied() {
                break;
            }
            self.states[parent] = NodeState::Full;
            index = parent;
        }
    }

    /// Free `index` and coalesce upward while the buddy is free, then demote
    /// every full ancestor of the merged block to split.
    fn combine_parent(&mut self, mut index: usize) {
        loop {
            self.states[index] = NodeState::Free;
            match (sibling_of(index), parent_of(index)) {
                (Some(sibling), Some(parent)) if self.states[sibling] == NodeState::Free => {
                    index = parent;
                }
                _ => break,
            }
        }

        let mut next = parent_of(index);
        while let Some(parent) = next {
            if self.states[parent] != NodeState::Full {
                break;
            }
            self.states[parent] = NodeState::Split;
            next = parent_of(parent);
        }
    }

    /// Descend to the allocated node starting at `offset`, returning its
    /// index and length.
    fn locate(&self, offset: usize) -> AllocResult<(usize, usize)> {
        if offset >= self.capacity() {
            return Err(AllocError::InvalidParam);
        }

        let mut index = 0;
        let mut left = 0;
        let mut length = self.capacity();
        loop {
            match self.states[index] {
                NodeState::Allocated => {
                    // Offsets inside a block are not block starts.
                    if offset != left {
                        return Err(AllocError::InvalidOffset);
                    }
                    return Ok((index, length));
                }
                NodeState::Split | NodeState::Full => {
                    length /= 2;
                    if offset < left + length {
                        index = left_child_of(index);
                    } else {
                        index = right_child_of(index);
                        left += length;
                    }
                }
                NodeState::Free => return Err(AllocError::InvalidOffset),
            }
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, index: usize, depth: usize) -> fmt::Result {
        let offset = offset_of(index, depth, self.level);
        let length = block_len(depth, self.level);
        match self.states[index] {
            NodeState::Free => write!(f, "({}:{})", offset, length),
            NodeState::Allocated => write!(f, "[{}:{}]", offset, length),
            NodeState::Full => {
                f.write_str("{")?;
                self.fmt_node(f, left_child_of(index), depth + 1)?;
                self.fmt_node(f, right_child_of(index), depth + 1)?;
                f.write_str("}")
            }
            NodeState::Split => {
                f.write_str("(")?;
                self.fmt_node(f, left_child_of(index), depth + 1)?;
                self.fmt_node(f, right_child_of(index), depth + 1)?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for BuddyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, 0, 0)
    }
}

impl OffsetAllocator for BuddyTree {
    fn allocate(&mut self, size: usize) -> AllocResult<usize> {
        BuddyTree::allocate(self, size)
    }

    fn free(&mut self, offset: usize) -> AllocResult {
        BuddyTree::free(self, offset)
    }

    fn size_of(&self, offset: usize) -> AllocResult<usize> {
        BuddyTree::size_of(self, offset)
    }

    fn total_units(&self) -> usize {
        self.capacity()
    }

    fn used_units(&self) -> usize {
        self.used_units
    }

    fn available_units(&self) -> usize {
        self.capacity() - self.used_units
    }
}
