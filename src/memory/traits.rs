/*!
 * Memory Traits
 * Memory management abstractions
 */

use super::classifier::TypeInfo;
use super::types::*;
use crate::core::types::Address;
use std::alloc::Layout;
use std::ptr::NonNull;

/// Untyped allocator interface
///
/// Implemented by the general heap; custom allocators plug into
/// `AllocationRouter::construct_in` / `destroy_in` through it.
pub trait RawAllocator: Send + Sync {
    /// Allocate a block for `layout`
    fn allocate(&self, layout: Layout) -> MemoryResult<NonNull<u8>>;

    /// Release a block.
    ///
    /// # Safety
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Memory statistics provider
pub trait MemoryInfo: Send + Sync {
    /// Bytes still obtainable, `u64::MAX` when unbounded
    fn available_memory(&self) -> u64;

    /// Bytes in use (debug builds only, zero otherwise)
    fn current_usage(&self) -> u64;

    /// Peak bytes in use (debug builds only, zero otherwise)
    fn peak_usage(&self) -> u64;

    /// Heap counters as one snapshot
    fn heap_stats(&self) -> HeapStats {
        HeapStats {
            alloc_count: 0,
            current_usage: self.current_usage(),
            peak_usage: self.peak_usage(),
            available_memory: self.available_memory(),
        }
    }
}

/// Extension points run around construction and destruction
///
/// The defaults do nothing and always permit deletion.
pub trait LifecycleHooks: Send + Sync {
    /// Called after an object has been written to its final address
    fn post_initialize(&self, _info: &TypeInfo, _address: Address) {}

    /// Called before an object is destroyed; returning false suppresses the
    /// destruction entirely (no drop, no release)
    fn pre_delete(&self, _info: &TypeInfo, _address: Address) -> bool {
        true
    }
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl LifecycleHooks for NoopHooks {}

/// Per-type allocation interface for containers that own their nodes
pub trait TypedAllocator<T> {
    /// Place `value` and return its address
    fn new_allocation(&self, value: T) -> MemoryResult<NonNull<T>>;

    /// Destroy an allocation made by `new_allocation`.
    ///
    /// # Safety
    /// `ptr` must come from `new_allocation` on this allocator and must not
    /// be used afterwards.
    unsafe fn delete_allocation(&self, ptr: NonNull<T>);
}
