/*!
 * Array Allocator
 *
 * Homogeneous arrays on the general heap with the element count stored in a
 * header before the data, so `array_length` needs no side table. Arrays are
 * never routed to a category arena.
 */

use crate::core::limits::MAX_ALIGN;
use crate::memory::heap::{header, GeneralAllocator};
use crate::memory::types::{MemoryError, MemoryResult};
use std::ptr::NonNull;
use tracing::error;

/// Header-prefixed array allocation over a `GeneralAllocator`
#[derive(Clone, Debug)]
pub struct ArrayAllocator {
    heap: GeneralAllocator,
}

impl ArrayAllocator {
    pub fn new(heap: GeneralAllocator) -> Self {
        Self { heap }
    }

    pub fn heap(&self) -> &GeneralAllocator {
        &self.heap
    }

    /// Allocate `count` default-initialized elements.
    ///
    /// Returns `Ok(None)` for `count == 0` without touching the heap.
    pub fn allocate_array<T: Default>(&self, count: usize) -> MemoryResult<Option<NonNull<T>>> {
        self.allocate_array_with(count, |_| T::default())
    }

    /// Allocate `count` elements, building element `i` with `init(i)` in
    /// ascending index order
    pub fn allocate_array_with<T, F>(
        &self,
        count: usize,
        mut init: F,
    ) -> MemoryResult<Option<NonNull<T>>>
    where
        F: FnMut(usize) -> T,
    {
        if count == 0 {
            return Ok(None);
        }

        let align = std::mem::align_of::<T>();
        if align > MAX_ALIGN {
            error!(alignment = align, max = MAX_ALIGN, "Array element over-aligned");
            return Err(MemoryError::UnsupportedAlignment {
                alignment: align,
                max: MAX_ALIGN,
            });
        }

        let element_size = std::mem::size_of::<T>();
        let bytes = element_size
            .checked_mul(count)
            .ok_or(MemoryError::CapacityOverflow {
                count,
                element_size,
            })?;

        let data = self.heap.allocate_padded(bytes)?;

        // SAFETY: `data` is a fresh padded block sized for `count` elements
        // and aligned to MAX_ALIGN >= align_of::<T>()
        unsafe {
            header::element_count_field(data).write(count as u64);

            let mut guard = InitGuard {
                heap: &self.heap,
                elements: data.cast::<T>(),
                initialized: 0,
            };
            while guard.initialized < count {
                let i = guard.initialized;
                guard.elements.as_ptr().add(i).write(init(i));
                guard.initialized += 1;
            }

            let elements = guard.elements;
            std::mem::forget(guard);
            Ok(Some(elements))
        }
    }

    /// Element count recorded for an array.
    ///
    /// # Safety
    /// `ptr` must come from `allocate_array` (or `allocate_array_with`) on an
    /// allocator sharing this heap, and must not have been deallocated.
    pub unsafe fn array_length<T>(&self, ptr: NonNull<T>) -> usize {
        header::element_count_field(ptr.cast()).read() as usize
    }

    /// Drop every element in ascending order, then release header and data.
    ///
    /// # Safety
    /// Same contract as [`array_length`](Self::array_length); the array must
    /// not be used afterwards.
    pub unsafe fn deallocate_array<T>(&self, ptr: NonNull<T>) {
        if std::mem::needs_drop::<T>() {
            let count = self.array_length(ptr);
            for i in 0..count {
                std::ptr::drop_in_place(ptr.as_ptr().add(i));
            }
        }

        self.heap.deallocate_padded(ptr.cast());
    }
}

/// Drops the elements built so far and frees the block if an initializer
/// panics
struct InitGuard<'h, T> {
    heap: &'h GeneralAllocator,
    elements: NonNull<T>,
    initialized: usize,
}

impl<T> Drop for InitGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: elements 0..initialized were written; the block came from
        // allocate_padded on this heap
        unsafe {
            for i in 0..self.initialized {
                std::ptr::drop_in_place(self.elements.as_ptr().add(i));
            }
            self.heap.deallocate_padded(self.elements.cast());
        }
    }
}
