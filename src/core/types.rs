/*!
 * Core Types
 * Common types used across the memory subsystem
 */

/// Address type for memory operations
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Sequential id handed out to each type the first time it is classified
pub type TypeOrdinal = u32;
