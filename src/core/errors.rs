/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

// Re-export MemoryError from memory module
pub use crate::memory::{MemoryError, MemoryResult};

// Re-export ConfigError from config module
pub use crate::memory::config::{ConfigError, ConfigResult};
