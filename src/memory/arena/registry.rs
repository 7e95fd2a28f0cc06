/*!
 * Arena Registry
 * One lazily buffered arena per arena-backed category
 */

use super::Arena;
use crate::core::limits::DEFAULT_ARENA_CAPACITY;
use crate::core::types::Size;
use crate::memory::types::{ArenaStats, Category};
use tracing::debug;

/// Owns every category arena for the lifetime of the router
pub struct ArenaRegistry {
    arenas: [Arena; Category::ARENA_COUNT],
}

impl ArenaRegistry {
    /// Every arena at the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ARENA_CAPACITY)
    }

    /// Every arena at `capacity` bytes
    pub fn with_capacity(capacity: Size) -> Self {
        Self::with_capacities(|_| capacity)
    }

    /// Capacity chosen per category; zero leaves that arena invalid
    pub fn with_capacities<F>(capacity: F) -> Self
    where
        F: Fn(Category) -> Size,
    {
        let arenas = std::array::from_fn(|idx| {
            let category = Category::PRIORITY[idx];
            Arena::new(category, capacity(category))
        });

        debug!(arenas = Category::ARENA_COUNT, "Arena registry initialized");
        Self { arenas }
    }

    /// The arena that owns `category`, `None` for heap-routed types
    #[inline]
    pub fn arena(&self, category: Category) -> Option<&Arena> {
        category.arena_index().map(|idx| &self.arenas[idx])
    }

    /// Reset one arena. Returns false for `Category::None`.
    pub fn reset(&self, category: Category) -> bool {
        match self.arena(category) {
            Some(arena) => {
                arena.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&self) {
        for arena in &self.arenas {
            arena.reset();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arena> {
        self.arenas.iter()
    }

    pub fn stats(&self) -> Vec<ArenaStats> {
        self.arenas.iter().map(Arena::stats).collect()
    }

    /// Bytes bump-allocated across all arenas
    pub fn total_used(&self) -> Size {
        self.arenas.iter().map(Arena::used).sum()
    }
}

impl Default for ArenaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArenaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_list().entries(self.arenas.iter()).finish()
    }
}
