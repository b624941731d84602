//! Integration tests for the buddy tree allocator
//!
//! Drives the public API through the allocation scenarios and properties
//! a buddy allocator has to satisfy.

#![no_std]

extern crate alloc;
extern crate buddy_tree_allocator;

use alloc::vec::Vec;
use buddy_tree_allocator::{AllocError, BuddyTree, NodeState, OffsetAllocator};

const LEVEL: usize = 5;
const ARENA: usize = 1 << LEVEL;

fn fresh() -> BuddyTree {
    BuddyTree::new(LEVEL).unwrap()
}

fn assert_all_free(tree: &BuddyTree) {
    assert!(
        tree.states().iter().all(|&s| s == NodeState::Free),
        "tree not fully free: {}",
        tree
    );
}

#[test]
fn test_reference_scenario() {
    let mut tree = fresh();
    assert_eq!(tree.dump(), "(0:32)");

    let m1 = tree.allocate(4).unwrap();
    assert_eq!((m1, tree.size_of(m1).unwrap()), (0, 4));

    let m2 = tree.allocate(9).unwrap();
    assert_eq!((m2, tree.size_of(m2).unwrap()), (16, 16));

    let m3 = tree.allocate(3).unwrap();
    assert_eq!((m3, tree.size_of(m3).unwrap()), (4, 4));

    let m4 = tree.allocate(7).unwrap();
    assert_eq!((m4, tree.size_of(m4).unwrap()), (8, 8));
    assert_eq!(tree.dump(), "{{{[0:4][4:4]}[8:8]}[16:16]}");

    tree.free(m3).unwrap();
    assert_eq!(tree.dump(), "((([0:4](4:4))[8:8])[16:16])");

    // Buddies at 0 and 4 merge into one free 8-unit block.
    tree.free(m1).unwrap();
    assert_eq!(tree.dump(), "(((0:8)[8:8])[16:16])");

    tree.free(m4).unwrap();
    assert_eq!(tree.dump(), "((0:16)[16:16])");

    tree.free(m2).unwrap();
    assert_eq!(tree.dump(), "(0:32)");
    assert_all_free(&tree);

    let m5 = tree.allocate(32).unwrap();
    assert_eq!((m5, tree.size_of(m5).unwrap()), (0, 32));
    assert_eq!(tree.dump(), "[0:32]");
    tree.free(m5).unwrap();

    let m6 = tree.allocate(0).unwrap();
    assert_eq!((m6, tree.size_of(m6).unwrap()), (0, 1));
    tree.free(m6).unwrap();
    assert_all_free(&tree);
}

#[test]
fn test_round_trip_restores_fresh_tree() {
    let reference = fresh();
    for size in 1..=ARENA {
        let mut tree = fresh();
        let offset = tree.allocate(size).unwrap();
        tree.free(offset).unwrap();
        assert_eq!(tree.states(), reference.states(), "size {}", size);
        assert!(tree.is_empty());
    }
}

#[test]
fn test_exact_fit_rounding() {
    for size in 0..=ARENA {
        let mut tree = fresh();
        let offset = tree.allocate(size).unwrap();
        let expected = size.max(1).next_power_of_two();
        assert_eq!(tree.size_of(offset), Ok(expected));
        assert_eq!(offset % expected, 0);
    }
}

#[test]
fn test_capacity_boundary() {
    let mut tree = fresh();
    let whole = tree.allocate(ARENA).unwrap();
    assert_eq!(whole, 0);
    assert_eq!(tree.allocate(ARENA), Err(AllocError::NoFreeBlock));
    assert_eq!(tree.allocate(1), Err(AllocError::NoFreeBlock));
    tree.free(whole).unwrap();

    tree.allocate(1).unwrap();
    assert_eq!(tree.allocate(ARENA), Err(AllocError::NoFreeBlock));
}

#[test]
fn test_over_capacity_rejection() {
    let mut tree = fresh();
    assert_eq!(tree.allocate(ARENA + 1), Err(AllocError::CapacityExceeded));
    tree.allocate(5).unwrap();
    assert_eq!(tree.allocate(ARENA + 1), Err(AllocError::CapacityExceeded));
    assert_eq!(tree.allocate(usize::MAX), Err(AllocError::CapacityExceeded));
}

#[test]
fn test_zero_size_behaves_like_one() {
    let mut zero = fresh();
    let mut one = fresh();
    for _ in 0..4 {
        assert_eq!(zero.allocate(0), one.allocate(1));
    }
    assert_eq!(zero.states(), one.states());
}

#[test]
fn test_full_occupancy_demotion() {
    let mut tree = fresh();
    let left = tree.allocate(16).unwrap();
    let right = tree.allocate(16).unwrap();
    assert_eq!(tree.states()[0], NodeState::Full);

    tree.free(left).unwrap();
    assert_eq!(tree.states()[0], NodeState::Split);
    // The occupied half still blocks a whole-arena request ...
    assert_eq!(tree.allocate(32), Err(AllocError::NoFreeBlock));
    // ... while the freed half is usable again.
    assert_eq!(tree.allocate(16), Ok(left));
    tree.free(right).unwrap();
}

#[test]
fn test_coalescing_buddies() {
    let mut tree = fresh();
    let a = tree.allocate(1).unwrap();
    let b = tree.allocate(1).unwrap();
    assert_eq!((a, b), (0, 1));

    tree.free(a).unwrap();
    tree.free(b).unwrap();
    assert_eq!(tree.allocate(2), Ok(0));
}

#[test]
fn test_outstanding_blocks_never_overlap() {
    let mut tree = fresh();
    let sizes = [3, 1, 8, 2, 1, 4, 1, 2, 5, 1];
    let mut blocks = Vec::new();
    for &size in sizes.iter() {
        if let Ok(offset) = tree.allocate(size) {
            blocks.push((offset, tree.size_of(offset).unwrap()));
        }
    }

    for (i, &(a, a_len)) in blocks.iter().enumerate() {
        for &(b, b_len) in blocks.iter().skip(i + 1) {
            assert!(a + a_len <= b || b + b_len <= a, "{:?}", blocks);
        }
    }
    let used: usize = blocks.iter().map(|&(_, len)| len).sum();
    assert_eq!(tree.used_units(), used);
}

#[test]
fn test_invalid_offsets_are_reported() {
    let mut tree = fresh();
    assert_eq!(tree.free(0), Err(AllocError::InvalidOffset));
    assert_eq!(tree.size_of(3), Err(AllocError::InvalidOffset));
    assert_eq!(tree.free(ARENA), Err(AllocError::InvalidParam));

    let offset = tree.allocate(8).unwrap();
    assert_eq!(tree.free(offset + 4), Err(AllocError::InvalidOffset));
    tree.free(offset).unwrap();
    assert_eq!(tree.free(offset), Err(AllocError::InvalidOffset));
    assert_all_free(&tree);
}

#[test]
fn test_fixed_position_allocation() {
    let mut tree = fresh();
    assert_eq!(tree.allocate_at(16, 16), Ok(16));
    assert_eq!(tree.allocate_at(24, 4), Err(AllocError::NoFreeBlock));
    assert_eq!(tree.allocate_at(4, 8), Err(AllocError::InvalidParam));
    assert_eq!(tree.allocate(16), Ok(0));
    assert_eq!(tree.allocate(1), Err(AllocError::NoFreeBlock));

    tree.free(16).unwrap();
    tree.free(0).unwrap();
    assert_all_free(&tree);
}

#[test]
fn test_trait_object_usage() {
    let mut tree = fresh();
    let allocator: &mut dyn OffsetAllocator = &mut tree;

    let offset = allocator.allocate(6).unwrap();
    assert_eq!(allocator.size_of(offset), Ok(8));
    assert_eq!(allocator.total_units(), ARENA);
    assert_eq!(allocator.used_units(), 8);
    assert_eq!(allocator.available_units(), ARENA - 8);

    allocator.free(offset).unwrap();
    assert_eq!(allocator.available_units(), ARENA);
}
