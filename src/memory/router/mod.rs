/*!
 * Allocation Router
 *
 * The construct/destroy entry points. Every request is classified once and
 * routed once:
 *
 * ```text
 * construct::<T>(value)
 *   └── classify::<T>() ─► Category
 *         ├── None ─────► GeneralAllocator (Layout of T, no header)
 *         └── otherwise ─► ArenaRegistry[category] (bump allocation)
 *   └── write value ─► post_initialize hook ─► NonNull<T>
 *
 * destroy::<T>(ptr)
 *   └── pre_delete hook (may suppress) ─► drop_in_place
 *         ├── None ─────► GeneralAllocator release
 *         └── otherwise ─► nothing; the slot is reclaimed by arena reset
 * ```
 *
 * Arena slots are never reused per object. Destructors run on `destroy`,
 * but the bytes stay reserved (and the address stable) until the arena is
 * reset.
 */

mod array;
mod builder;
mod typed;

pub use array::ArrayAllocator;
pub use builder::AllocationRouterBuilder;
pub use typed::DefaultTypedAllocator;

use super::arena::{Arena, ArenaRegistry};
use super::classifier::{TypeClassifier, TypeInfo};
use super::config::MemoryConfig;
use super::heap::GeneralAllocator;
use super::traits::{LifecycleHooks, MemoryInfo, RawAllocator};
use super::types::{Category, HeapStats, MemoryResult, RouterStats};
use crate::core::types::Address;
use crate::monitoring::span_reset;
use std::alloc::Layout;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::trace;

/// Routes typed construction to a category arena or the general heap
pub struct AllocationRouter {
    classifier: TypeClassifier,
    arenas: ArenaRegistry,
    heap: GeneralAllocator,
    arrays: ArrayAllocator,
    hooks: Arc<dyn LifecycleHooks>,
    trace_types: bool,
}

impl AllocationRouter {
    /// Router with the default configuration
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn from_config(config: MemoryConfig) -> Self {
        Self::builder().with_config(config).build()
    }

    pub fn builder() -> AllocationRouterBuilder {
        AllocationRouterBuilder::new()
    }

    /// Classification of `T` (cached after first use)
    #[inline]
    pub fn classify<T: ?Sized + 'static>(&self) -> TypeInfo {
        self.classifier.classify::<T>()
    }

    /// Arena for a category, `None` meaning the general heap
    #[inline]
    pub fn route(&self, category: Category) -> Option<&Arena> {
        self.arenas.arena(category)
    }

    /// Place `value` where its type belongs
    pub fn construct<T: 'static>(&self, value: T) -> MemoryResult<NonNull<T>> {
        let info = self.classify::<T>();
        let ptr = match self.route(info.category) {
            Some(arena) => arena.allocate(value)?,
            None => {
                let ptr = self.heap.allocate(Layout::new::<T>())?.cast::<T>();
                // SAFETY: fresh block sized and aligned for T
                unsafe { ptr.as_ptr().write(value) };
                ptr
            }
        };

        Ok(self.finish_construct("construct", &info, ptr))
    }

    /// Reserve the slot, then build the value in it
    pub fn construct_with<T: 'static, F>(&self, init: F) -> MemoryResult<NonNull<T>>
    where
        F: FnOnce() -> T,
    {
        let info = self.classify::<T>();
        let slot = self.place_uninit::<T>(&info)?;
        // SAFETY: slot is aligned, sized for T and exclusively ours
        unsafe { slot.as_ptr().write(MaybeUninit::new(init())) };

        Ok(self.finish_construct("construct_with", &info, slot.cast()))
    }

    /// Place `T::default()`
    pub fn construct_default<T: Default + 'static>(&self) -> MemoryResult<NonNull<T>> {
        self.construct_with(T::default)
    }

    /// Reserve a slot without running any initializer (deferred
    /// initialization). The caller must write a `T` before destroying it.
    pub fn construct_uninit<T: 'static>(&self) -> MemoryResult<NonNull<MaybeUninit<T>>> {
        let info = self.classify::<T>();
        let slot = self.place_uninit::<T>(&info)?;
        Ok(self.finish_construct("construct_uninit", &info, slot))
    }

    /// Write `value` at caller-provided memory and run the post-construction
    /// hook. No allocation happens.
    ///
    /// # Safety
    /// `ptr` must be valid for writes and aligned for `T`; any previous value
    /// there is overwritten without being dropped.
    pub unsafe fn construct_at<T: 'static>(&self, ptr: NonNull<T>, value: T) -> NonNull<T> {
        let info = self.classify::<T>();
        ptr.as_ptr().write(value);
        self.finish_construct("construct_at", &info, ptr)
    }

    /// Place `value` in a caller-chosen allocator, bypassing category routing
    pub fn construct_in<T, A>(&self, allocator: &A, value: T) -> MemoryResult<NonNull<T>>
    where
        T: 'static,
        A: RawAllocator + ?Sized,
    {
        let info = self.classify::<T>();
        let ptr = allocator.allocate(Layout::new::<T>())?.cast::<T>();
        // SAFETY: fresh block sized and aligned for T
        unsafe { ptr.as_ptr().write(value) };
        Ok(self.finish_construct("construct_in", &info, ptr))
    }

    /// Destroy an object made by `construct*`.
    ///
    /// Runs the pre-delete hook, drops the value in place, and releases the
    /// memory when the type is heap-routed. Arena slots stay reserved until
    /// the arena is reset.
    ///
    /// # Safety
    /// `ptr` must come from `construct`, `construct_with`, `construct_default`
    /// or a fully initialized `construct_uninit` slot on this router, and must
    /// not be used afterwards.
    pub unsafe fn destroy<T: 'static>(&self, ptr: NonNull<T>) {
        let info = self.classify::<T>();
        if !self.begin_destroy("destroy", &info, ptr) {
            return;
        }

        if std::mem::needs_drop::<T>() {
            std::ptr::drop_in_place(ptr.as_ptr());
        }

        if self.route(info.category).is_none() {
            self.heap.deallocate(ptr.cast(), Layout::new::<T>());
        }
    }

    /// [`destroy`](Self::destroy) that ignores null pointers.
    ///
    /// # Safety
    /// A non-null `ptr` carries the same contract as `destroy`.
    pub unsafe fn destroy_notnull<T: 'static>(&self, ptr: *mut T) {
        if let Some(ptr) = NonNull::new(ptr) {
            self.destroy(ptr);
        }
    }

    /// Destroy an object made by [`construct_in`](Self::construct_in).
    ///
    /// # Safety
    /// `ptr` must come from `construct_in` with the same `allocator`.
    pub unsafe fn destroy_in<T, A>(&self, allocator: &A, ptr: NonNull<T>)
    where
        T: 'static,
        A: RawAllocator + ?Sized,
    {
        let info = self.classify::<T>();
        if !self.begin_destroy("destroy_in", &info, ptr) {
            return;
        }

        if std::mem::needs_drop::<T>() {
            std::ptr::drop_in_place(ptr.as_ptr());
        }
        allocator.deallocate(ptr.cast(), Layout::new::<T>());
    }

    /// See [`ArrayAllocator::allocate_array`]
    pub fn allocate_array<T: Default>(&self, count: usize) -> MemoryResult<Option<NonNull<T>>> {
        self.arrays.allocate_array(count)
    }

    /// See [`ArrayAllocator::allocate_array_with`]
    pub fn allocate_array_with<T, F>(&self, count: usize, init: F) -> MemoryResult<Option<NonNull<T>>>
    where
        F: FnMut(usize) -> T,
    {
        self.arrays.allocate_array_with(count, init)
    }

    /// See [`ArrayAllocator::array_length`]
    ///
    /// # Safety
    /// `ptr` must come from this router's `allocate_array*`.
    pub unsafe fn array_length<T>(&self, ptr: NonNull<T>) -> usize {
        self.arrays.array_length(ptr)
    }

    /// See [`ArrayAllocator::deallocate_array`]
    ///
    /// # Safety
    /// `ptr` must come from this router's `allocate_array*` and must not be
    /// used afterwards.
    pub unsafe fn deallocate_array<T>(&self, ptr: NonNull<T>) {
        self.arrays.deallocate_array(ptr)
    }

    /// Per-type allocator handle for containers
    pub fn typed<T: 'static>(&self) -> DefaultTypedAllocator<'_, T> {
        DefaultTypedAllocator::new(self)
    }

    /// Rewind one category arena. Runs no destructors: nothing placed in the
    /// arena since the last reset may be used afterwards.
    pub fn reset_arena(&self, category: Category) -> bool {
        let Some(arena) = self.route(category) else {
            return false;
        };
        let _span = span_reset(category, arena.used());
        arena.reset();
        true
    }

    /// Rewind every arena, same contract as [`reset_arena`](Self::reset_arena)
    pub fn reset_arenas(&self) {
        for arena in self.arenas.iter() {
            let used = arena.used();
            let _span = (used > 0).then(|| span_reset(arena.category(), used));
            arena.reset();
        }
    }

    pub fn classifier(&self) -> &TypeClassifier {
        &self.classifier
    }

    pub fn arenas(&self) -> &ArenaRegistry {
        &self.arenas
    }

    pub fn heap(&self) -> &GeneralAllocator {
        &self.heap
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            heap: self.heap.stats(),
            arenas: self.arenas.stats(),
            registered_types: self.classifier.len(),
        }
    }

    fn place_uninit<T>(&self, info: &TypeInfo) -> MemoryResult<NonNull<MaybeUninit<T>>> {
        match self.route(info.category) {
            Some(arena) => arena.allocate_uninit::<T>(),
            None => self.heap.allocate(Layout::new::<T>()).map(|ptr| ptr.cast()),
        }
    }

    fn finish_construct<P>(&self, operation: &'static str, info: &TypeInfo, ptr: NonNull<P>) -> NonNull<P> {
        if self.trace_types {
            trace!(
                operation,
                type_name = %info.name,
                category = %info.category,
                signature = %info.signature,
                address = ?ptr,
                "Routed construction"
            );
        }
        self.hooks.post_initialize(info, ptr.as_ptr() as Address);
        ptr
    }

    fn begin_destroy<T>(&self, operation: &'static str, info: &TypeInfo, ptr: NonNull<T>) -> bool {
        let address = ptr.as_ptr() as Address;
        if !self.hooks.pre_delete(info, address) {
            trace!(operation, type_name = %info.name, address, "Deletion suppressed by hook");
            return false;
        }

        if self.trace_types {
            trace!(
                operation,
                type_name = %info.name,
                category = %info.category,
                address,
                "Routed destruction"
            );
        }
        true
    }
}

impl Default for AllocationRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryInfo for AllocationRouter {
    fn available_memory(&self) -> u64 {
        self.heap.available_memory()
    }

    fn current_usage(&self) -> u64 {
        self.heap.current_usage()
    }

    fn peak_usage(&self) -> u64 {
        self.heap.peak_usage()
    }

    fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }
}

impl std::fmt::Debug for AllocationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("AllocationRouter")
            .field("classifier", &self.classifier)
            .field("arenas", &self.arenas)
            .field("heap", &self.heap)
            .field("trace_types", &self.trace_types)
            .finish()
    }
}
