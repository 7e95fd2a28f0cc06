/*!
 * Lifecycle Hook Tests
 * Post-initialize and pre-delete callbacks around routed objects
 */

use engine_memory::core::types::Address;
use engine_memory::memory::{
    AllocationRouter, Category, GeneralAllocator, LifecycleHooks, MemoryConfig, TypeInfo,
};
use mockall::mock;
use mockall::predicate::always;
use pretty_assertions::assert_eq;
use std::sync::Arc;

mock! {
    pub Hooks {}

    impl LifecycleHooks for Hooks {
        fn post_initialize(&self, info: &TypeInfo, address: Address);
        fn pre_delete(&self, info: &TypeInfo, address: Address) -> bool;
    }
}

struct Area2D {
    owner: Arc<()>,
}

struct Scratch {
    owner: Arc<()>,
}

fn router_with_hooks(hooks: MockHooks, heap: GeneralAllocator) -> AllocationRouter {
    AllocationRouter::builder()
        .with_config(MemoryConfig::default().with_arena_capacity(4096))
        .with_heap(heap)
        .with_hooks(Arc::new(hooks))
        .build()
}

#[test]
fn test_hooks_see_type_and_address() {
    let mut hooks = MockHooks::new();
    hooks
        .expect_post_initialize()
        .withf(|info, address| info.category == Category::Physics && *address != 0)
        .times(1)
        .return_const(());
    hooks
        .expect_pre_delete()
        .withf(|info, _| info.name.as_ref() == "Area2D")
        .times(1)
        .return_const(true);

    let router = router_with_hooks(hooks, GeneralAllocator::new());
    let owner = Arc::new(());
    let area = router
        .construct(Area2D {
            owner: Arc::clone(&owner),
        })
        .unwrap();

    unsafe { router.destroy(area) };
    assert_eq!(Arc::strong_count(&owner), 1);
}

#[test]
fn test_pre_delete_can_suppress_destruction() {
    let mut hooks = MockHooks::new();
    hooks.expect_post_initialize().times(1).return_const(());
    hooks
        .expect_pre_delete()
        .with(always(), always())
        .times(1)
        .return_const(false);

    let heap = GeneralAllocator::new();
    let router = router_with_hooks(hooks, heap.clone());
    let owner = Arc::new(());
    let scratch = router
        .construct(Scratch {
            owner: Arc::clone(&owner),
        })
        .unwrap();

    unsafe { router.destroy(scratch) };
    assert_eq!(Arc::strong_count(&owner), 2);
    assert_eq!(heap.alloc_count(), 1);

    // Nothing was released, so the object is still readable
    assert!(Arc::ptr_eq(unsafe { &scratch.as_ref().owner }, &owner));
}

#[test]
fn test_arrays_skip_hooks() {
    let mut hooks = MockHooks::new();
    hooks.expect_post_initialize().never();
    hooks.expect_pre_delete().never();

    let router = router_with_hooks(hooks, GeneralAllocator::new());
    let ptr = router.allocate_array::<u32>(4).unwrap().unwrap();
    unsafe { router.deallocate_array(ptr) };
}
