/*!
 * General Allocator
 *
 * Thin, counted wrapper over the platform heap (`std::alloc`).
 *
 * ## Modes
 *
 * - **Plain**: caller supplies the `Layout` on both allocate and deallocate.
 *   Used for heap-routed single objects.
 * - **Padded**: a fixed header (allocation size + element count) is reserved
 *   before the data region, so the block can be released from the data
 *   pointer alone. Used exclusively by the array allocator.
 *
 * ## Accounting
 *
 * - Live allocation count is kept in every build
 * - Byte usage and peak usage are kept in debug builds, or whenever a heap
 *   budget is configured
 */

pub(crate) mod header;
mod counters;

use super::traits::{MemoryInfo, RawAllocator};
use super::types::{HeapStats, MemoryError, MemoryResult};
use crate::core::limits::{DATA_OFFSET, MAX_ALIGN};
use crate::core::types::Size;
use counters::HeapCounters;
use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::{Arc, OnceLock};
use tracing::{error, trace};

static GLOBAL_HEAP: OnceLock<GeneralAllocator> = OnceLock::new();

/// Counted general-purpose heap
///
/// Clones share counters, so a router and the code that created it observe
/// the same usage figures.
#[derive(Clone, Debug)]
pub struct GeneralAllocator {
    counters: Arc<HeapCounters>,
    budget: Option<u64>,
    tracks_usage: bool,
}

impl GeneralAllocator {
    /// Fresh allocator with its own counters and no budget
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Allocator that refuses requests once `bytes` are in use
    pub fn with_budget(bytes: u64) -> Self {
        Self::build(Some(bytes))
    }

    fn build(budget: Option<u64>) -> Self {
        Self {
            counters: Arc::new(HeapCounters::new()),
            budget,
            tracks_usage: cfg!(debug_assertions) || budget.is_some(),
        }
    }

    /// The process-wide allocator
    pub fn global() -> &'static GeneralAllocator {
        GLOBAL_HEAP.get_or_init(GeneralAllocator::new)
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    /// Allocate a block for `layout`. Zero-sized layouts get a dangling,
    /// well-aligned pointer and are not counted.
    pub fn allocate(&self, layout: Layout) -> MemoryResult<NonNull<u8>> {
        if layout.size() == 0 {
            return Ok(dangling(layout));
        }

        let size = layout.size() as u64;
        if self.tracks_usage && !self.counters.reserve(size, self.budget) {
            error!(
                requested = layout.size(),
                budget = ?self.budget,
                usage = self.counters.usage(),
                "Heap budget exceeded"
            );
            return Err(MemoryError::HeapExhausted {
                requested: layout.size(),
            });
        }

        // SAFETY: layout has a non-zero size
        let ptr = unsafe { std::alloc::alloc(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            if self.tracks_usage {
                self.counters.release(size);
            }
            error!(requested = layout.size(), "Platform allocator returned null");
            return Err(MemoryError::HeapExhausted {
                requested: layout.size(),
            });
        };

        self.counters.record_alloc();
        trace!(size = layout.size(), align = layout.align(), address = ?ptr, "Heap allocation");
        Ok(ptr)
    }

    /// Release a block obtained from [`allocate`](Self::allocate).
    ///
    /// # Safety
    /// `ptr` must come from this allocator (or a clone) with the same `layout`
    /// and must not be used afterwards.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        std::alloc::dealloc(ptr.as_ptr(), layout);
        self.counters.record_free();
        if self.tracks_usage {
            self.counters.release(layout.size() as u64);
        }
        trace!(size = layout.size(), address = ?ptr, "Heap release");
    }

    /// Resize a block. On failure the original block is untouched.
    ///
    /// # Safety
    /// Same contract as [`deallocate`](Self::deallocate) for `ptr`/`layout`.
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: Size,
    ) -> MemoryResult<NonNull<u8>> {
        let new_layout = Layout::from_size_align(new_size, layout.align()).map_err(|_| {
            MemoryError::HeapExhausted {
                requested: new_size,
            }
        })?;

        if layout.size() == 0 {
            return self.allocate(new_layout);
        }
        if new_size == 0 {
            self.deallocate(ptr, layout);
            return Ok(dangling(new_layout));
        }

        let (old, new) = (layout.size() as u64, new_size as u64);
        if self.tracks_usage && new > old && !self.counters.reserve(new - old, self.budget) {
            error!(requested = new_size, "Heap budget exceeded on reallocation");
            return Err(MemoryError::HeapExhausted {
                requested: new_size,
            });
        }

        let resized = std::alloc::realloc(ptr.as_ptr(), layout, new_size);
        let Some(resized) = NonNull::new(resized) else {
            if self.tracks_usage && new > old {
                self.counters.release(new - old);
            }
            error!(requested = new_size, "Platform reallocation returned null");
            return Err(MemoryError::HeapExhausted {
                requested: new_size,
            });
        };

        if self.tracks_usage && new < old {
            self.counters.release(old - new);
        }
        Ok(resized)
    }

    /// Allocate `bytes` of data preceded by the array header.
    /// The returned pointer is the data start, aligned to `MAX_ALIGN`.
    pub fn allocate_padded(&self, bytes: Size) -> MemoryResult<NonNull<u8>> {
        let layout = padded_layout(bytes)?;
        let base = self.allocate(layout)?;

        // SAFETY: the block is at least DATA_OFFSET bytes long
        unsafe {
            let data = NonNull::new_unchecked(base.as_ptr().add(DATA_OFFSET));
            header::size_field(data).write(bytes as u64);
            header::element_count_field(data).write(0);
            Ok(data)
        }
    }

    /// Release a padded block from its data pointer.
    ///
    /// # Safety
    /// `data` must come from [`allocate_padded`](Self::allocate_padded) or
    /// [`reallocate_padded`](Self::reallocate_padded) on this allocator.
    pub unsafe fn deallocate_padded(&self, data: NonNull<u8>) {
        let bytes = Self::padded_size(data);
        // Layout was valid when the block was created
        let layout = Layout::from_size_align_unchecked(DATA_OFFSET + bytes, MAX_ALIGN);
        self.deallocate(header::block_start(data), layout);
    }

    /// Resize the data region of a padded block, keeping both header fields.
    ///
    /// # Safety
    /// Same contract as [`deallocate_padded`](Self::deallocate_padded).
    pub unsafe fn reallocate_padded(
        &self,
        data: NonNull<u8>,
        bytes: Size,
    ) -> MemoryResult<NonNull<u8>> {
        let old_bytes = Self::padded_size(data);
        let old_layout = Layout::from_size_align_unchecked(DATA_OFFSET + old_bytes, MAX_ALIGN);
        let new_total = padded_layout(bytes)?.size();

        let base = self.reallocate(header::block_start(data), old_layout, new_total)?;
        let data = NonNull::new_unchecked(base.as_ptr().add(DATA_OFFSET));
        header::size_field(data).write(bytes as u64);
        Ok(data)
    }

    /// Data size recorded in a padded block's header.
    ///
    /// # Safety
    /// `data` must come from a padded allocation.
    pub unsafe fn padded_size(data: NonNull<u8>) -> Size {
        header::size_field(data).read() as Size
    }

    /// Number of live allocations (all builds)
    pub fn alloc_count(&self) -> u64 {
        self.counters.live()
    }

    /// Bytes currently allocated; zero in release builds
    pub fn current_usage(&self) -> u64 {
        if cfg!(debug_assertions) {
            self.counters.usage()
        } else {
            0
        }
    }

    /// Highest byte usage observed; zero in release builds
    pub fn peak_usage(&self) -> u64 {
        if cfg!(debug_assertions) {
            self.counters.peak()
        } else {
            0
        }
    }

    /// Bytes left under the budget, `u64::MAX` when unbounded
    pub fn available_memory(&self) -> u64 {
        match self.budget {
            Some(limit) => limit.saturating_sub(self.counters.usage()),
            None => u64::MAX,
        }
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            alloc_count: self.alloc_count(),
            current_usage: self.current_usage(),
            peak_usage: self.peak_usage(),
            available_memory: self.available_memory(),
        }
    }
}

impl Default for GeneralAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RawAllocator for GeneralAllocator {
    fn allocate(&self, layout: Layout) -> MemoryResult<NonNull<u8>> {
        GeneralAllocator::allocate(self, layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        GeneralAllocator::deallocate(self, ptr, layout)
    }
}

impl MemoryInfo for GeneralAllocator {
    fn available_memory(&self) -> u64 {
        GeneralAllocator::available_memory(self)
    }

    fn current_usage(&self) -> u64 {
        GeneralAllocator::current_usage(self)
    }

    fn peak_usage(&self) -> u64 {
        GeneralAllocator::peak_usage(self)
    }

    fn heap_stats(&self) -> HeapStats {
        GeneralAllocator::stats(self)
    }
}

fn padded_layout(bytes: Size) -> MemoryResult<Layout> {
    DATA_OFFSET
        .checked_add(bytes)
        .and_then(|total| Layout::from_size_align(total, MAX_ALIGN).ok())
        .ok_or(MemoryError::HeapExhausted { requested: bytes })
}

#[inline]
fn dangling(layout: Layout) -> NonNull<u8> {
    // Alignment is never zero
    NonNull::new(layout.align() as *mut u8).unwrap_or(NonNull::dangling())
}
