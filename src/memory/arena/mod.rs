/*!
 * Category Arenas
 *
 * Fixed-capacity bump allocators, one per arena-backed category.
 *
 * # Performance
 *
 * - **Allocation**: O(1), aligns and bumps a single offset
 * - **Deallocation**: none per object; `reset()` rewinds the whole arena
 * - **Buffer**: reserved on first allocation, never resized
 *
 * # Lifetime rules
 *
 * Objects placed in an arena keep their address until the arena is reset.
 * `reset()` runs no destructors: callers must have destroyed (or stopped
 * referencing) everything placed since the last reset.
 */

mod registry;

pub use registry::ArenaRegistry;

use super::types::{ArenaStats, Category, MemoryError, MemoryPressure, MemoryResult};
use crate::core::limits::{bytes_to_mb, ARENA_BUFFER_ALIGN};
use crate::core::types::{Address, Size};
use parking_lot::Mutex;
use std::alloc::Layout;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use tracing::{debug, error, warn};

/// Mutable arena state, guarded by the arena mutex
struct ArenaState {
    buffer: Option<NonNull<u8>>,
    used: Size,
    allocations: u64,
    resets: u64,
    pressure: MemoryPressure,
}

/// Fixed-capacity bump allocator
pub struct Arena {
    category: Category,
    capacity: Size,
    valid: bool,
    state: Mutex<ArenaState>,
}

// SAFETY: the buffer is exclusively owned by the arena and every access to
// the bump state goes through the mutex.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    /// Arena for `category` holding at most `capacity` bytes.
    ///
    /// A zero capacity, an unrepresentable capacity or `Category::None`
    /// produce an invalid arena that refuses every allocation.
    pub fn new(category: Category, capacity: Size) -> Self {
        let valid = category.is_arena_backed()
            && capacity > 0
            && Layout::from_size_align(capacity, ARENA_BUFFER_ALIGN).is_ok();

        if !valid {
            warn!(category = %category, capacity, "Arena configured as invalid");
        }

        Self {
            category,
            capacity,
            valid,
            state: Mutex::new(ArenaState {
                buffer: None,
                used: 0,
                allocations: 0,
                resets: 0,
                pressure: MemoryPressure::Low,
            }),
        }
    }

    /// Arena that has not been given a configuration yet
    pub fn unconfigured(category: Category) -> Self {
        Self::new(category, 0)
    }

    /// Move `value` into the arena
    pub fn allocate<T>(&self, value: T) -> MemoryResult<NonNull<T>> {
        let slot = self.allocate_uninit::<T>()?;
        // SAFETY: slot is aligned, sized for T and exclusively ours
        unsafe {
            slot.as_ptr().write(MaybeUninit::new(value));
        }
        Ok(slot.cast())
    }

    /// Reserve the slot first, then build the value in it
    pub fn allocate_with<T, F>(&self, init: F) -> MemoryResult<NonNull<T>>
    where
        F: FnOnce() -> T,
    {
        let slot = self.allocate_uninit::<T>()?;
        // SAFETY: as in `allocate`
        unsafe {
            slot.as_ptr().write(MaybeUninit::new(init()));
        }
        Ok(slot.cast())
    }

    /// Reserve an uninitialized slot for deferred initialization
    pub fn allocate_uninit<T>(&self) -> MemoryResult<NonNull<MaybeUninit<T>>> {
        self.allocate_layout(Layout::new::<T>()).map(NonNull::cast)
    }

    /// Bump-allocate a block for `layout`
    pub fn allocate_layout(&self, layout: Layout) -> MemoryResult<NonNull<u8>> {
        if !self.valid {
            error!(
                category = %self.category,
                size = layout.size(),
                "Allocation from an arena without a valid configuration"
            );
            return Err(MemoryError::InvalidArena {
                category: self.category,
            });
        }

        let mut state = self.state.lock();
        let base = match state.buffer {
            Some(base) => base,
            None => {
                let base = self.reserve_buffer()?;
                state.buffer = Some(base);
                base
            }
        };

        // Align by address so over-aligned types work on any buffer base
        let align = layout.align();
        let current = base.as_ptr() as usize + state.used;
        let padding = current.wrapping_neg() & (align - 1);
        let available = self.capacity - state.used;

        let required = match padding.checked_add(layout.size()) {
            Some(required) if required <= available => required,
            _ => {
                error!(
                    category = %self.category,
                    requested = layout.size(),
                    padding,
                    used = state.used,
                    capacity = self.capacity,
                    "Out of memory"
                );
                return Err(MemoryError::OutOfMemory {
                    category: self.category,
                    requested: layout.size(),
                    available,
                    used: state.used,
                    total: self.capacity,
                });
            }
        };

        let offset = state.used + padding;
        state.used += required;
        state.allocations += 1;
        self.note_pressure(&mut state);

        // SAFETY: offset + size <= capacity, so the pointer stays in the buffer
        Ok(unsafe { NonNull::new_unchecked(base.as_ptr().add(offset)) })
    }

    /// Rewind the bump offset to zero. Runs no destructors.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let released = state.used;
        state.used = 0;
        state.resets += 1;
        state.pressure = MemoryPressure::Low;
        debug!(category = %self.category, released, "Arena reset");
    }

    /// Byte offset of `ptr` inside the buffer, if it points into it
    pub fn offset_of<T: ?Sized>(&self, ptr: *const T) -> Option<Size> {
        let state = self.state.lock();
        let base = state.buffer?.as_ptr() as Address;
        let address = ptr.cast::<u8>() as Address;
        (address >= base && address < base + self.capacity).then(|| address - base)
    }

    /// Whether `ptr` points into this arena's buffer
    pub fn contains<T: ?Sized>(&self, ptr: *const T) -> bool {
        self.offset_of(ptr).is_some()
    }

    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    #[inline]
    pub fn capacity(&self) -> Size {
        self.capacity
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn used(&self) -> Size {
        self.state.lock().used
    }

    pub fn is_buffered(&self) -> bool {
        self.state.lock().buffer.is_some()
    }

    pub fn stats(&self) -> ArenaStats {
        let state = self.state.lock();
        ArenaStats {
            category: self.category,
            capacity: self.capacity,
            used: state.used,
            available: self.capacity - state.used,
            allocations: state.allocations,
            resets: state.resets,
            buffered: state.buffer.is_some(),
            valid: self.valid,
        }
    }

    fn reserve_buffer(&self) -> MemoryResult<NonNull<u8>> {
        let layout = self.buffer_layout();
        // SAFETY: valid arenas have a non-zero, representable layout
        let buffer = unsafe { std::alloc::alloc(layout) };

        match NonNull::new(buffer) {
            Some(buffer) => {
                debug!(
                    category = %self.category,
                    capacity = self.capacity,
                    address = ?buffer,
                    "Reserved arena buffer"
                );
                Ok(buffer)
            }
            None => {
                error!(
                    category = %self.category,
                    capacity = self.capacity,
                    "Failed to reserve arena buffer"
                );
                Err(MemoryError::HeapExhausted {
                    requested: self.capacity,
                })
            }
        }
    }

    fn buffer_layout(&self) -> Layout {
        // Checked in `new` for valid arenas
        Layout::from_size_align(self.capacity, ARENA_BUFFER_ALIGN)
            .unwrap_or_else(|_| Layout::new::<u8>())
    }

    fn note_pressure(&self, state: &mut ArenaState) {
        let pressure = MemoryPressure::from_ratio(state.used as f64 / self.capacity as f64);
        if pressure > state.pressure && pressure >= MemoryPressure::High {
            warn!(
                category = %self.category,
                level = %pressure,
                used = state.used,
                capacity = self.capacity,
                capacity_mb = bytes_to_mb(self.capacity),
                "Arena memory pressure"
            );
        }
        state.pressure = pressure;
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Some(buffer) = self.state.get_mut().buffer.take() {
            // SAFETY: allocated in `reserve_buffer` with this exact layout
            unsafe { std::alloc::dealloc(buffer.as_ptr(), self.buffer_layout()) };
        }
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("category", &self.category)
            .field("capacity", &self.capacity)
            .field("valid", &self.valid)
            .field("used", &self.used())
            .finish()
    }
}
