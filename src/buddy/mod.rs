//! Buddy tree allocator module
//!
//! This module provides a complete buddy system implementation with:
//! - Heap-indexed occupancy tree with four node states
//! - Index arithmetic between tree positions and arena offsets
//! - Statistics and failure reporting (`tracking` feature)

pub mod buddy_tree;
pub mod index;
pub mod node_state;
#[cfg(feature = "tracking")]
pub mod stats;

pub use buddy_tree::BuddyTree;
pub use node_state::{NodeState, MAX_LEVEL};
#[cfg(feature = "tracking")]
pub use stats::BuddyStats;
