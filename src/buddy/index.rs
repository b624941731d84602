//! Index arithmetic for the implicit buddy tree
//!
//! Nodes are numbered heap-style from the root (index 0): the children of
//! node `i` are `2i + 1` and `2i + 2`. A node at depth `d` of a tree whose
//! leaves sit at depth `max_depth` covers `2^(max_depth - d)` units.

/// Left-aligned arena offset of the node `index` found at `depth`.
#[inline]
pub const fn offset_of(index: usize, depth: usize, max_depth: usize) -> usize {
    (index + 1 - (1 << depth)) << (max_depth - depth)
}

/// Index of the node at `depth` whose block contains `offset`.
#[inline]
pub const fn index_of(offset: usize, depth: usize, max_depth: usize) -> usize {
    (offset >> (max_depth - depth)) + (1 << depth) - 1
}

/// Length in units of a block at `depth`.
#[inline]
pub const fn block_len(depth: usize, max_depth: usize) -> usize {
    1 << (max_depth - depth)
}

/// The buddy of `index`, or `None` for the root.
#[inline]
pub const fn sibling_of(index: usize) -> Option<usize> {
    if index == 0 {
        None
    } else if is_left_child(index) {
        Some(index + 1)
    } else {
        Some(index - 1)
    }
}

#[inline]
pub const fn parent_of(index: usize) -> Option<usize> {
    if index == 0 {
        None
    } else {
        Some((index - 1) / 2)
    }
}

#[inline]
pub const fn left_child_of(index: usize) -> usize {
    2 * index + 1
}

#[inline]
pub const fn right_child_of(index: usize) -> usize {
    2 * index + 2
}

/// Left children carry odd indices; the root is nobody's child.
#[inline]
pub const fn is_left_child(index: usize) -> bool {
    index & 1 == 1
}

/// Smallest power of two that is `>= x`, for `x >= 1`.
#[inline]
pub const fn next_power_of_two(x: usize) -> usize {
    x.next_power_of_two()
}

#[inline]
pub const fn is_power_of_two(x: usize) -> bool {
    x.is_power_of_two()
}
