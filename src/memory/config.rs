/*!
 * Memory Configuration
 *
 * Arena capacities, heap budget and category membership, loadable from JSON.
 *
 * Environment variables:
 * - ENGINE_MEMORY_CONFIG: path to a JSON config file (defaults otherwise)
 *
 * ```json
 * {
 *   "arena_capacity": 536870912,
 *   "heap_budget": null,
 *   "trace_types": false,
 *   "arenas": {
 *     "images": { "capacity": 67108864, "types": ["Image", "ImageTexture"] },
 *     "strings": { "types": ["StringName"], "signatures": [3735928559] }
 *   }
 * }
 * ```
 */

use super::classifier::{default_type_names, CategoryTable, TypeSignature};
use super::types::Category;
use crate::core::limits::DEFAULT_ARENA_CAPACITY;
use crate::core::types::Size;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ENGINE_MEMORY_CONFIG";

/// Configuration result
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read memory config {path}: {source}")]
    #[diagnostic(code(config::io), help("Check that the file exists and is readable."))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed memory config: {0}")]
    #[diagnostic(code(config::parse))]
    Parse(#[from] serde_json::Error),

    #[error("Category {0} cannot own an arena")]
    #[diagnostic(
        code(config::invalid_category),
        help("Heap-routed types need no entry; remove the \"none\" key.")
    )]
    InvalidCategory(Category),

    #[error("Empty type name listed for {0}")]
    #[diagnostic(code(config::empty_type_name))]
    EmptyTypeName(Category),
}

/// Settings for a single category arena
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    /// Capacity override; falls back to `MemoryConfig::arena_capacity`
    pub capacity: Option<Size>,
    /// Member type names (module paths are ignored)
    pub types: Vec<String>,
    /// Member signatures given directly
    pub signatures: Vec<u32>,
}

/// Top-level memory configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Capacity of every arena without its own override
    pub arena_capacity: Size,
    /// Byte budget for the general heap; unbounded when absent
    pub heap_budget: Option<u64>,
    /// Emit a trace event naming the type of every routed construct/destroy
    pub trace_types: bool,
    /// Per-category settings; categories missing here get no members
    pub arenas: BTreeMap<Category, ArenaSettings>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let arenas = Category::PRIORITY
            .into_iter()
            .map(|category| {
                let settings = ArenaSettings {
                    types: default_type_names(category)
                        .iter()
                        .map(|name| name.to_string())
                        .collect(),
                    ..ArenaSettings::default()
                };
                (category, settings)
            })
            .collect();

        Self {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            heap_budget: None,
            trace_types: false,
            arenas,
        }
    }
}

impl MemoryConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        info!(path = %path.display(), "Loaded memory config");
        Ok(config)
    }

    /// Load from the file named by `ENGINE_MEMORY_CONFIG`, or use defaults
    pub fn from_env() -> ConfigResult<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Serialize back to pretty JSON
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (category, settings) in &self.arenas {
            if !category.is_arena_backed() {
                return Err(ConfigError::InvalidCategory(*category));
            }
            if settings.types.iter().any(|name| name.trim().is_empty()) {
                return Err(ConfigError::EmptyTypeName(*category));
            }
        }
        Ok(())
    }

    /// Capacity of the arena for `category`
    pub fn capacity_for(&self, category: Category) -> Size {
        if !category.is_arena_backed() {
            return 0;
        }
        self.arenas
            .get(&category)
            .and_then(|settings| settings.capacity)
            .unwrap_or(self.arena_capacity)
    }

    /// Membership table built from every category's names and signatures
    pub fn membership_table(&self) -> CategoryTable {
        let mut table = CategoryTable::empty();
        for (category, settings) in &self.arenas {
            for name in &settings.types {
                table.insert_name(*category, name);
            }
            for raw in &settings.signatures {
                table.insert(*category, TypeSignature::from_raw(*raw));
            }
        }
        table
    }

    /// Builder: same capacity for every arena, overrides cleared
    pub fn with_arena_capacity(mut self, capacity: Size) -> Self {
        self.arena_capacity = capacity;
        for settings in self.arenas.values_mut() {
            settings.capacity = None;
        }
        self
    }

    /// Builder: capacity override for one category
    pub fn with_capacity_for(mut self, category: Category, capacity: Size) -> Self {
        self.arenas.entry(category).or_default().capacity = Some(capacity);
        self
    }

    /// Builder: add member type names to a category
    pub fn with_types(mut self, category: Category, names: &[&str]) -> Self {
        let settings = self.arenas.entry(category).or_default();
        settings.types.extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn with_heap_budget(mut self, bytes: u64) -> Self {
        self.heap_budget = Some(bytes);
        self
    }

    pub fn with_trace_types(mut self, enabled: bool) -> Self {
        self.trace_types = enabled;
        self
    }

    /// Config with no memberships: every type routes to the heap
    pub fn heap_only() -> Self {
        Self {
            arenas: BTreeMap::new(),
            ..Self::default()
        }
    }
}
