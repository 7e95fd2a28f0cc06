/*!
 * Memory Types
 * Common types for routed memory management
 */

use crate::core::types::Size;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
///
/// Every variant is reported synchronously at the call that triggered it.
/// Nothing in this crate retries a failed allocation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Out of memory in {category} arena: requested {requested} bytes, available {available} bytes ({used} used / {total} total)")]
    #[diagnostic(
        code(memory::arena_exhausted),
        help("Arenas never grow. Reset the arena or raise its capacity in the memory config.")
    )]
    OutOfMemory {
        category: Category,
        requested: Size,
        available: Size,
        used: Size,
        total: Size,
    },

    #[error("Heap exhausted: requested {requested} bytes")]
    #[diagnostic(
        code(memory::heap_exhausted),
        help("The platform allocator refused the request or the heap budget was exceeded.")
    )]
    HeapExhausted { requested: Size },

    #[error("Arena for category {category} is not configured")]
    #[diagnostic(
        code(memory::invalid_arena),
        help("The arena has zero capacity or an invalid layout. Check the memory config.")
    )]
    InvalidArena { category: Category },

    #[error("Array size overflow: {count} elements of {element_size} bytes")]
    #[diagnostic(code(memory::capacity_overflow))]
    CapacityOverflow { count: usize, element_size: Size },

    #[error("Unsupported alignment {alignment} (maximum {max})")]
    #[diagnostic(
        code(memory::unsupported_alignment),
        help("Array elements must not be aligned beyond the engine maximum alignment.")
    )]
    UnsupportedAlignment { alignment: usize, max: usize },
}

/// Semantic grouping of types that share an arena
///
/// `None` means "general heap". Every other category owns exactly one arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    None,
    Resource,
    RefCounted,
    Code,
    Collections,
    Physics,
    Images,
    Controls,
    Fonts,
    Strings,
}

impl Category {
    /// Arena-backed categories in classification priority order.
    /// The first table that contains a signature wins.
    pub const PRIORITY: [Category; 9] = [
        Category::Resource,
        Category::RefCounted,
        Category::Code,
        Category::Collections,
        Category::Physics,
        Category::Images,
        Category::Controls,
        Category::Fonts,
        Category::Strings,
    ];

    /// Number of arena-backed categories
    pub const ARENA_COUNT: usize = Self::PRIORITY.len();

    /// Slot of this category's arena, `None` for heap-routed types
    #[inline]
    pub const fn arena_index(self) -> Option<usize> {
        match self {
            Category::None => None,
            Category::Resource => Some(0),
            Category::RefCounted => Some(1),
            Category::Code => Some(2),
            Category::Collections => Some(3),
            Category::Physics => Some(4),
            Category::Images => Some(5),
            Category::Controls => Some(6),
            Category::Fonts => Some(7),
            Category::Strings => Some(8),
        }
    }

    #[inline]
    pub const fn is_arena_backed(self) -> bool {
        !matches!(self, Category::None)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::None => "none",
            Category::Resource => "resource",
            Category::RefCounted => "ref_counted",
            Category::Code => "code",
            Category::Collections => "collections",
            Category::Physics => "physics",
            Category::Images => "images",
            Category::Controls => "controls",
            Category::Fonts => "fonts",
            Category::Strings => "strings",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl MemoryPressure {
    /// Pressure level for a usage ratio in `[0, 1]`
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.95 {
            MemoryPressure::Critical
        } else if ratio >= 0.80 {
            MemoryPressure::High
        } else if ratio >= 0.60 {
            MemoryPressure::Medium
        } else {
            MemoryPressure::Low
        }
    }
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// General heap statistics
///
/// `current_usage` and `peak_usage` are only tracked in debug builds and
/// read as zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapStats {
    pub alloc_count: u64,
    pub current_usage: u64,
    pub peak_usage: u64,
    pub available_memory: u64,
}

/// Per-arena statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaStats {
    pub category: Category,
    pub capacity: Size,
    pub used: Size,
    pub available: Size,
    pub allocations: u64,
    pub resets: u64,
    pub buffered: bool,
    pub valid: bool,
}

impl ArenaStats {
    pub fn usage_percentage(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.used as f64 / self.capacity as f64) * 100.0
    }

    pub fn memory_pressure(&self) -> MemoryPressure {
        MemoryPressure::from_ratio(self.usage_percentage() / 100.0)
    }
}

/// Snapshot of the whole router: heap counters, every arena, type registry size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterStats {
    pub heap: HeapStats,
    pub arenas: Vec<ArenaStats>,
    pub registered_types: usize,
}

impl RouterStats {
    /// Bytes bump-allocated across every arena
    pub fn arena_bytes_used(&self) -> Size {
        self.arenas.iter().map(|a| a.used).sum()
    }
}
