//! Per-node occupancy state
//!
//! Every node of the buddy tree is in exactly one of four states.

/// Maximum arena level supported
pub const MAX_LEVEL: usize = 28; // 256M units, 512MB of state cells

/// State of a node in the buddy tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NodeState {
    /// Unallocated and not subdivided.
    #[default]
    Free = 0,
    /// Granted whole to one outstanding allocation.
    Allocated = 1,
    /// Subdivided, with free capacity left somewhere beneath.
    Split = 2,
    /// Subdivided, and both children are allocated or full.
    Full = 3,
}

impl NodeState {
    /// No free capacity remains anywhere in this node's block.
    #[inline]
    pub const fn is_occupied(self) -> bool {
        matches!(self, Self::Allocated | Self::Full)
    }
}
