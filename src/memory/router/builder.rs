/*!
 * Allocation Router Builder
 * Builder pattern for AllocationRouter construction
 */

use super::array::ArrayAllocator;
use super::AllocationRouter;
use crate::memory::arena::ArenaRegistry;
use crate::memory::classifier::{CategoryTable, TypeClassifier};
use crate::memory::config::MemoryConfig;
use crate::memory::heap::GeneralAllocator;
use crate::memory::traits::{LifecycleHooks, NoopHooks};
use std::sync::Arc;
use tracing::info;

/// Builder for AllocationRouter
pub struct AllocationRouterBuilder {
    config: MemoryConfig,
    table: Option<CategoryTable>,
    heap: Option<GeneralAllocator>,
    hooks: Option<Arc<dyn LifecycleHooks>>,
}

impl AllocationRouterBuilder {
    /// Create a new builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: MemoryConfig::default(),
            table: None,
            heap: None,
            hooks: None,
        }
    }

    /// Use `config` for capacities, heap budget and membership
    pub fn with_config(mut self, config: MemoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the membership table derived from the config
    pub fn with_table(mut self, table: CategoryTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Route heap allocations through `heap` (and share its counters)
    pub fn with_heap(mut self, heap: GeneralAllocator) -> Self {
        self.heap = Some(heap);
        self
    }

    /// Install construction/destruction hooks
    pub fn with_hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Build the router
    ///
    /// Without an explicit heap, a configured budget gets a dedicated
    /// allocator and everything else shares the process-wide one.
    pub fn build(self) -> AllocationRouter {
        let config = self.config;
        let table = self.table.unwrap_or_else(|| config.membership_table());
        let heap = self.heap.unwrap_or_else(|| match config.heap_budget {
            Some(budget) => GeneralAllocator::with_budget(budget),
            None => GeneralAllocator::global().clone(),
        });

        let arenas = ArenaRegistry::with_capacities(|category| config.capacity_for(category));
        let custom_hooks = self.hooks.is_some();

        info!(
            memberships = table.len(),
            arena_capacity = config.arena_capacity,
            heap_budget = ?heap.budget(),
            trace_types = config.trace_types,
            custom_hooks,
            "Allocation router initialized"
        );

        AllocationRouter {
            classifier: TypeClassifier::new(table),
            arenas,
            arrays: ArrayAllocator::new(heap.clone()),
            heap,
            hooks: self.hooks.unwrap_or_else(|| Arc::new(NoopHooks)),
            trace_types: config.trace_types,
        }
    }
}

impl Default for AllocationRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
