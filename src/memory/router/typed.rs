/*!
 * Typed Allocator
 * Per-type handle over the router for node-owning containers
 */

use super::AllocationRouter;
use crate::memory::traits::TypedAllocator;
use crate::memory::types::MemoryResult;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Routes every allocation of `T` through the owning router, so container
/// nodes land in the same arena as standalone objects of their type
pub struct DefaultTypedAllocator<'r, T> {
    router: &'r AllocationRouter,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: 'static> DefaultTypedAllocator<'r, T> {
    pub fn new(router: &'r AllocationRouter) -> Self {
        Self {
            router,
            _marker: PhantomData,
        }
    }

    pub fn router(&self) -> &'r AllocationRouter {
        self.router
    }
}

impl<T> Clone for DefaultTypedAllocator<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DefaultTypedAllocator<'_, T> {}

impl<T: 'static> TypedAllocator<T> for DefaultTypedAllocator<'_, T> {
    fn new_allocation(&self, value: T) -> MemoryResult<NonNull<T>> {
        self.router.construct(value)
    }

    unsafe fn delete_allocation(&self, ptr: NonNull<T>) {
        self.router.destroy(ptr)
    }
}
