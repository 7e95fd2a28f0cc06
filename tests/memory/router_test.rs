/*!
 * Allocation Router Tests
 * Routing, exhaustion, reset and destruction through the public API
 */

use engine_memory::memory::{
    AllocationRouter, Category, CategoryTable, GeneralAllocator, MemoryConfig, MemoryError,
    MemoryInfo,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;

struct Image {
    data: [u8; 48],
}

struct StringName {
    hash: u32,
}

struct RigidBody2D {
    mass: f32,
    owner: Arc<()>,
}

struct Label {
    text: String,
}

struct Scratch {
    value: u64,
}

struct Payload {
    owner: Arc<()>,
}

fn router_with(config: MemoryConfig) -> AllocationRouter {
    AllocationRouter::builder()
        .with_config(config)
        .with_heap(GeneralAllocator::new())
        .build()
}

fn small_router() -> AllocationRouter {
    router_with(MemoryConfig::default().with_arena_capacity(64 * 1024))
}

#[test]
fn test_default_membership_routes() {
    let router = small_router();

    assert_eq!(router.classify::<Image>().category, Category::Images);
    assert_eq!(router.classify::<StringName>().category, Category::Strings);
    assert_eq!(router.classify::<RigidBody2D>().category, Category::Physics);
    assert_eq!(router.classify::<Label>().category, Category::Controls);
    assert_eq!(router.classify::<Scratch>().category, Category::None);
}

#[test]
fn test_arena_routed_objects_live_in_their_arena() {
    let router = small_router();
    let name = router.construct(StringName { hash: 7 }).unwrap();
    let label = router
        .construct(Label {
            text: "ok".to_string(),
        })
        .unwrap();

    assert!(router.route(Category::Strings).unwrap().contains(name.as_ptr()));
    assert!(router.route(Category::Controls).unwrap().contains(label.as_ptr()));
    assert!(!router.route(Category::Strings).unwrap().contains(label.as_ptr()));
    assert_eq!(router.heap().alloc_count(), 0);

    unsafe {
        assert_eq!(name.as_ref().hash, 7);
        assert_eq!(label.as_ref().text, "ok");
        router.destroy(name);
        router.destroy(label);
    }
}

#[test]
fn test_heap_routed_objects_are_released() {
    let router = small_router();
    let scratch = router.construct(Scratch { value: 11 }).unwrap();
    assert_eq!(router.heap().alloc_count(), 1);

    unsafe {
        assert_eq!(scratch.as_ref().value, 11);
        router.destroy(scratch);
    }
    assert_eq!(router.heap().alloc_count(), 0);
    assert_eq!(router.current_usage(), 0);
}

#[test]
fn test_arena_exhaustion_reports_out_of_memory() {
    let router = router_with(
        MemoryConfig::default()
            .with_arena_capacity(4096)
            .with_capacity_for(Category::Images, 64),
    );

    let first = router.construct(Image { data: [1; 48] }).unwrap();
    let err = router.construct(Image { data: [2; 48] }).unwrap_err();

    assert_eq!(
        err,
        MemoryError::OutOfMemory {
            category: Category::Images,
            requested: 48,
            available: 16,
            used: 48,
            total: 64,
        }
    );
    assert_eq!(router.route(Category::Images).unwrap().used(), 48);

    // Earlier placements are unaffected by the failure
    unsafe {
        (*first.as_ptr()).data[0] = 42;
        assert_eq!(first.as_ref().data[0], 42);
        assert_eq!(first.as_ref().data[47], 1);
    }
}

#[test]
fn test_zero_capacity_arena_is_invalid() {
    let router = router_with(
        MemoryConfig::default()
            .with_arena_capacity(4096)
            .with_capacity_for(Category::Strings, 0),
    );

    let err = router.construct(StringName { hash: 1 }).unwrap_err();
    assert_eq!(
        err,
        MemoryError::InvalidArena {
            category: Category::Strings
        }
    );
}

#[test]
fn test_reset_rewinds_to_first_address() {
    let router = small_router();
    let first = router.construct(StringName { hash: 1 }).unwrap();
    router.construct(StringName { hash: 2 }).unwrap();

    assert!(router.reset_arena(Category::Strings));
    assert_eq!(router.route(Category::Strings).unwrap().used(), 0);

    let again = router.construct(StringName { hash: 3 }).unwrap();
    assert_eq!(again, first);
    assert!(!router.reset_arena(Category::None));
}

#[test]
fn test_destroy_runs_destructor_in_arena() {
    let router = small_router();
    let owner = Arc::new(());
    let body = router
        .construct(RigidBody2D {
            mass: 2.5,
            owner: Arc::clone(&owner),
        })
        .unwrap();
    assert_eq!(Arc::strong_count(&owner), 2);

    let used = router.route(Category::Physics).unwrap().used();
    unsafe {
        assert_eq!(body.as_ref().mass, 2.5);
        router.destroy(body);
    }

    assert_eq!(Arc::strong_count(&owner), 1);
    assert_eq!(router.route(Category::Physics).unwrap().used(), used);
}

#[test]
fn test_destroy_notnull_releases_heap_object() {
    let router = small_router();
    let owner = Arc::new(());
    let before = router.heap().alloc_count();

    let payload = router
        .construct(Payload {
            owner: Arc::clone(&owner),
        })
        .unwrap();
    assert_eq!(router.heap().alloc_count(), before + 1);
    assert_eq!(Arc::strong_count(&owner), 2);

    unsafe { router.destroy_notnull(payload.as_ptr()) };
    assert_eq!(Arc::strong_count(&owner), 1);
    assert_eq!(router.heap().alloc_count(), before);
}

#[test]
fn test_destroy_notnull_drops_arena_object() {
    let router = small_router();
    let owner = Arc::new(());
    let before = router.heap().alloc_count();

    let body = router
        .construct(RigidBody2D {
            mass: 3.0,
            owner: Arc::clone(&owner),
        })
        .unwrap();
    let used = router.route(Category::Physics).unwrap().used();

    unsafe { router.destroy_notnull(body.as_ptr()) };
    assert_eq!(Arc::strong_count(&owner), 1);
    assert_eq!(router.heap().alloc_count(), before);
    assert_eq!(router.route(Category::Physics).unwrap().used(), used);
}

#[test]
fn test_reset_runs_no_destructors() {
    let router = small_router();
    let owner = Arc::new(());
    router
        .construct(RigidBody2D {
            mass: 1.0,
            owner: Arc::clone(&owner),
        })
        .unwrap();

    router.reset_arenas();
    assert_eq!(Arc::strong_count(&owner), 2);
}

#[test]
fn test_reset_arenas_counts_every_arena() {
    let router = small_router();
    router.construct(StringName { hash: 1 }).unwrap();

    router.reset_arenas();
    let stats = router.stats();
    assert!(stats.arenas.iter().all(|arena| arena.resets == 1 && arena.used == 0));
}

#[test]
fn test_deferred_initialization() {
    let router = small_router();
    let slot = router.construct_uninit::<Image>().unwrap();
    assert!(router.route(Category::Images).unwrap().contains(slot.as_ptr()));

    unsafe {
        slot.as_ptr().write(std::mem::MaybeUninit::new(Image { data: [9; 48] }));
        let image = slot.cast::<Image>();
        assert_eq!(image.as_ref().data[47], 9);
        router.destroy(image);
    }
}

#[test]
fn test_construct_at_caller_memory() {
    let router = small_router();
    let mut storage = std::mem::MaybeUninit::<Scratch>::uninit();
    let ptr = std::ptr::NonNull::new(storage.as_mut_ptr()).unwrap();

    let placed = unsafe { router.construct_at(ptr, Scratch { value: 5 }) };
    assert_eq!(placed, ptr);
    assert_eq!(unsafe { storage.assume_init() }.value, 5);
    assert_eq!(router.heap().alloc_count(), 0);
}

#[test]
fn test_construct_in_custom_allocator() {
    let router = small_router();
    let custom = GeneralAllocator::new();

    let image = router.construct_in(&custom, Image { data: [3; 48] }).unwrap();
    assert!(!router.route(Category::Images).unwrap().contains(image.as_ptr()));
    assert_eq!(custom.alloc_count(), 1);

    unsafe { router.destroy_in(&custom, image) };
    assert_eq!(custom.alloc_count(), 0);
    assert_eq!(router.heap().alloc_count(), 0);
}

#[test]
fn test_heap_only_config() {
    let router = router_with(MemoryConfig::heap_only().with_arena_capacity(4096));
    let image = router.construct(Image { data: [0; 48] }).unwrap();

    assert_eq!(router.classify::<Image>().category, Category::None);
    assert_eq!(router.heap().alloc_count(), 1);
    assert_eq!(router.stats().arena_bytes_used(), 0);
    unsafe { router.destroy(image) };
}

#[test]
fn test_over_aligned_arena_type() {
    #[repr(align(64))]
    struct Wide {
        lanes: [u8; 64],
    }

    let router = AllocationRouter::builder()
        .with_config(MemoryConfig::default().with_arena_capacity(4096))
        .with_table(CategoryTable::empty().with_names(Category::Collections, &["Wide"]))
        .with_heap(GeneralAllocator::new())
        .build();

    for _ in 0..4 {
        let wide = router.construct(Wide { lanes: [1; 64] }).unwrap();
        assert_eq!(wide.as_ptr() as usize % 64, 0);
        assert!(router.route(Category::Collections).unwrap().contains(wide.as_ptr()));
        assert_eq!(unsafe { wide.as_ref().lanes[63] }, 1);
    }
}

#[test]
fn test_concurrent_construction_yields_distinct_addresses() {
    let router = small_router();

    let addresses: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let router = &router;
                scope.spawn(move || {
                    (0..64)
                        .map(|i| {
                            router
                                .construct(StringName { hash: t * 1000 + i })
                                .unwrap()
                                .as_ptr() as usize
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    let distinct: HashSet<usize> = addresses.iter().copied().collect();
    assert_eq!(distinct.len(), 256);
    assert_eq!(
        router.route(Category::Strings).unwrap().used(),
        256 * std::mem::size_of::<StringName>()
    );
}

#[test]
fn test_router_stats() {
    let router = small_router();
    router.construct(StringName { hash: 1 }).unwrap();
    let scratch = router.construct(Scratch { value: 1 }).unwrap();

    let stats = router.stats();
    assert_eq!(stats.registered_types, 2);
    assert_eq!(stats.heap.alloc_count, 1);
    assert_eq!(stats.arena_bytes_used(), std::mem::size_of::<StringName>());
    assert_eq!(router.available_memory(), u64::MAX);

    let strings = stats
        .arenas
        .iter()
        .find(|arena| arena.category == Category::Strings)
        .unwrap();
    assert!(strings.buffered);
    assert_eq!(strings.allocations, 1);

    unsafe { router.destroy(scratch) };
}
