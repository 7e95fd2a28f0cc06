/*!
 * Engine Memory Library
 * Category arenas, type classification and header-tracked arrays
 */

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::*;
pub use memory::{
    AllocationRouter, Arena, ArenaRegistry, Category, GeneralAllocator, MemoryConfig,
    MemoryInfo, TypeClassifier, TypeInfo, TypeSignature,
};
pub use monitoring::init_tracing;
