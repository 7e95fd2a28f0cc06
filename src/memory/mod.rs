/*!
 * Memory Module
 * Type-routed arena allocation over a counted general heap
 */

pub mod arena;
pub mod classifier;
pub mod config;
pub mod heap;
pub mod router;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use arena::{Arena, ArenaRegistry};
pub use classifier::{CategoryTable, TypeClassifier, TypeInfo, TypeSignature};
pub use config::{ArenaSettings, ConfigError, ConfigResult, MemoryConfig};
pub use heap::GeneralAllocator;
pub use router::{AllocationRouter, AllocationRouterBuilder, ArrayAllocator, DefaultTypedAllocator};
pub use traits::*;
pub use types::*;
