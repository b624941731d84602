//! Buddy Tree Allocator
//!
//! A fixed-capacity buddy allocator that hands out power-of-two sized blocks
//! from a virtual arena of `2^level` units. It never touches real memory:
//! callers get offsets and lengths back and map them onto whatever storage
//! they manage.
//!
//! Occupancy is kept in an implicit complete binary tree with one state cell
//! per node, featuring:
//! - Leftmost-fit allocation with lazy splitting
//! - Coalescing of free buddies on release
//! - Fixed-position allocation
//! - Optional statistics (`tracking` feature)

#![no_std]

extern crate alloc;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Invalid parameter (e.g. level too large, offset outside the arena,
    /// misaligned fixed offset).
    InvalidParam,
    /// The state table for the tree could not be reserved.
    NoMemory,
    /// The rounded request is larger than the whole arena.
    CapacityExceeded,
    /// No free block of the rounded size exists right now.
    NoFreeBlock,
    /// The offset does not name an outstanding allocation.
    InvalidOffset,
}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// Allocator that grants blocks as offsets into a fixed arena.
pub trait OffsetAllocator {
    /// Allocate a block of at least `size` units and return its offset.
    fn allocate(&mut self, size: usize) -> AllocResult<usize>;

    /// Release the block starting at `offset`.
    fn free(&mut self, offset: usize) -> AllocResult;

    /// Returns the length of the outstanding block starting at `offset`.
    fn size_of(&self, offset: usize) -> AllocResult<usize>;

    /// Returns the arena size in units.
    fn total_units(&self) -> usize;

    /// Returns the number of units held by outstanding blocks.
    fn used_units(&self) -> usize;

    /// Returns the number of units not held by any block.
    fn available_units(&self) -> usize;
}

/// Checks whether the offset has the demanded alignment.
///
/// Equivalent to `offset % align == 0`, but the alignment must be a power of two.
#[inline]
const fn is_aligned(offset: usize, align: usize) -> bool {
    offset & (align - 1) == 0
}

pub mod buddy;
#[cfg(feature = "tracking")]
pub use buddy::BuddyStats;
pub use buddy::{BuddyTree, NodeState, MAX_LEVEL};
