/*!
 * Arena Tests
 * Bump allocation, alignment and exhaustion properties
 */

use engine_memory::memory::{Arena, ArenaRegistry, Category, MemoryError, MemoryPressure};
use pretty_assertions::assert_eq;
use std::alloc::Layout;

#[test]
fn test_buffer_created_on_first_allocation() {
    let arena = Arena::new(Category::Fonts, 1024);
    assert!(arena.is_valid());
    assert!(!arena.is_buffered());
    assert_eq!(arena.offset_of(std::ptr::null::<u8>()), None);

    let first = arena.allocate(0xAAu8).unwrap();
    assert!(arena.is_buffered());
    assert_eq!(arena.offset_of(first.as_ptr()), Some(0));
}

#[test]
fn test_consecutive_allocations_are_contiguous() {
    let arena = Arena::new(Category::Code, 1024);
    let a = arena.allocate([0u8; 10]).unwrap();
    let b = arena.allocate([0u8; 6]).unwrap();

    assert_eq!(arena.offset_of(a.as_ptr()), Some(0));
    assert_eq!(arena.offset_of(b.as_ptr()), Some(10));
    assert_eq!(arena.used(), 16);
}

#[test]
fn test_padding_counts_towards_usage() {
    let arena = Arena::new(Category::Code, 1024);
    arena.allocate(1u8).unwrap();
    let word = arena.allocate(2u64).unwrap();

    assert_eq!(arena.offset_of(word.as_ptr()), Some(8));
    assert_eq!(arena.used(), 16);
    assert_eq!(unsafe { *word.as_ptr() }, 2);
}

#[test]
fn test_exact_fit_then_exhaustion() {
    let arena = Arena::new(Category::Physics, 32);
    arena.allocate([0u8; 32]).unwrap();
    assert_eq!(arena.stats().memory_pressure(), MemoryPressure::Critical);

    let err = arena.allocate(1u8).unwrap_err();
    assert_eq!(
        err,
        MemoryError::OutOfMemory {
            category: Category::Physics,
            requested: 1,
            available: 0,
            used: 32,
            total: 32,
        }
    );
}

#[test]
fn test_failed_allocation_leaves_state_unchanged() {
    let arena = Arena::new(Category::Images, 64);
    arena.allocate([0u8; 40]).unwrap();

    assert!(arena.allocate([0u8; 40]).is_err());
    assert_eq!(arena.used(), 40);
    assert_eq!(arena.stats().allocations, 1);

    arena.allocate([0u8; 24]).unwrap();
    assert_eq!(arena.used(), 64);
}

#[test]
fn test_invalid_arenas_refuse_everything() {
    for arena in [
        Arena::new(Category::Images, 0),
        Arena::new(Category::None, 1024),
        Arena::unconfigured(Category::Strings),
    ] {
        assert!(!arena.is_valid());
        let err = arena.allocate_layout(Layout::new::<u32>()).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArena { .. }));
        assert!(!arena.is_buffered());
    }
}

#[test]
fn test_reset_keeps_buffer() {
    let arena = Arena::new(Category::Controls, 256);
    let first = arena.allocate(5u32).unwrap();
    arena.allocate(6u32).unwrap();

    arena.reset();
    assert!(arena.is_buffered());
    assert_eq!(arena.used(), 0);
    assert_eq!(arena.stats().resets, 1);

    let again = arena.allocate(7u32).unwrap();
    assert_eq!(again, first);
}

#[test]
fn test_allocate_with_runs_initializer_once() {
    let arena = Arena::new(Category::Collections, 256);
    let mut calls = 0;
    let value = arena
        .allocate_with(|| {
            calls += 1;
            vec![1, 2, 3]
        })
        .unwrap();

    assert_eq!(calls, 1);
    unsafe {
        assert_eq!(value.as_ref(), &vec![1, 2, 3]);
        std::ptr::drop_in_place(value.as_ptr());
    }
}

#[test]
fn test_registry_stats_cover_every_arena() {
    let registry = ArenaRegistry::with_capacity(512);
    registry.arena(Category::Resource).unwrap().allocate(0u64).unwrap();

    let stats = registry.stats();
    assert_eq!(stats.len(), Category::ARENA_COUNT);
    assert_eq!(stats[0].category, Category::Resource);
    assert_eq!(stats[0].used, 8);
    assert!(stats[1..].iter().all(|s| s.used == 0 && !s.buffered));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn allocations_are_aligned_and_disjoint(
            requests in proptest::collection::vec((1usize..64, 0u32..5), 1..40),
        ) {
            let arena = Arena::new(Category::Collections, 4096);
            let mut blocks: Vec<(usize, usize)> = Vec::new();

            for (size, align_pow) in requests {
                let layout = Layout::from_size_align(size, 1 << align_pow).unwrap();
                match arena.allocate_layout(layout) {
                    Ok(ptr) => {
                        let addr = ptr.as_ptr() as usize;
                        prop_assert_eq!(addr % layout.align(), 0);
                        prop_assert!(arena.offset_of(ptr.as_ptr()).unwrap() + size <= 4096);
                        for &(start, len) in &blocks {
                            prop_assert!(addr + size <= start || start + len <= addr);
                        }
                        blocks.push((addr, size));
                    }
                    Err(err) => {
                        let is_oom = matches!(err, MemoryError::OutOfMemory { .. });
                        prop_assert!(is_oom);
                    }
                }
            }

            prop_assert!(arena.used() <= arena.capacity());
        }

        #[test]
        fn used_never_decreases_without_reset(
            sizes in proptest::collection::vec(1usize..128, 1..50),
        ) {
            let arena = Arena::new(Category::Strings, 1024);
            let mut last = 0;
            for size in sizes {
                let _ = arena.allocate_layout(Layout::from_size_align(size, 1).unwrap());
                prop_assert!(arena.used() >= last);
                last = arena.used();
            }
        }
    }
}
