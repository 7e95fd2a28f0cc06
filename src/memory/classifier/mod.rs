/*!
 * Type Classifier
 *
 * Maps a Rust type to a stable `TypeSignature` and the signature to a
 * `Category`.
 *
 * ## Signatures
 *
 * The signature is the 32-bit FNV-1a hash of `std::any::type_name::<T>()`
 * with module paths stripped, so configuration can name engine types the way
 * the engine does (`Image`, not `engine::resources::Image`). A type may pin
 * an explicit name with [`TypeClassifier::register_as`] before first use.
 *
 * ## Caching
 *
 * Each type is classified once and cached by `TypeId`. Cached entries also
 * carry a sequential ordinal in first-use order, for introspection.
 */

mod membership;
mod signature;

pub use membership::{
    default_type_names, CategoryTable, DEFAULT_CODE_TYPES, DEFAULT_COLLECTION_TYPES,
    DEFAULT_CONTROL_TYPES, DEFAULT_FONT_TYPES, DEFAULT_IMAGE_TYPES, DEFAULT_PHYSICS_TYPES,
    DEFAULT_STRING_TYPES,
};
pub use signature::{fnv1a_32, normalize_type_name, TypeSignature};

use crate::core::types::TypeOrdinal;
use crate::memory::types::Category;
use ahash::RandomState;
use dashmap::DashMap;
use serde::Serialize;
use std::any::TypeId;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything the router needs to know about a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeInfo {
    pub ordinal: TypeOrdinal,
    pub signature: TypeSignature,
    pub name: Arc<str>,
    pub category: Category,
}

/// Cached type classification over a fixed membership table
pub struct TypeClassifier {
    table: CategoryTable,
    types: DashMap<TypeId, TypeInfo, RandomState>,
    next_ordinal: AtomicU32,
}

impl TypeClassifier {
    pub fn new(table: CategoryTable) -> Self {
        debug!(memberships = table.len(), "Type classifier initialized");
        Self {
            table,
            types: DashMap::with_hasher(RandomState::new()),
            next_ordinal: AtomicU32::new(0),
        }
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Classify `T`, computing and caching its entry on first use
    pub fn classify<T: ?Sized + 'static>(&self) -> TypeInfo {
        if let Some(entry) = self.types.get(&TypeId::of::<T>()) {
            return entry.value().clone();
        }

        self.types
            .entry(TypeId::of::<T>())
            .or_insert_with(|| self.describe(normalize_type_name(std::any::type_name::<T>())))
            .value()
            .clone()
    }

    #[inline]
    pub fn signature_of<T: ?Sized + 'static>(&self) -> TypeSignature {
        self.classify::<T>().signature
    }

    #[inline]
    pub fn category_of<T: ?Sized + 'static>(&self) -> Category {
        self.classify::<T>().category
    }

    /// Pin `T` to an explicit name before its first classification.
    ///
    /// Returns the new entry, or `None` when `T` was already classified (the
    /// existing entry is kept so routing stays stable).
    pub fn register_as<T: ?Sized + 'static>(&self, name: &str) -> Option<TypeInfo> {
        let mut inserted = None;
        let entry = self.types.entry(TypeId::of::<T>()).or_insert_with(|| {
            let info = self.describe(normalize_type_name(name));
            inserted = Some(info.clone());
            info
        });

        if inserted.is_none() {
            warn!(
                requested = name,
                existing = %entry.value().name,
                "Type already classified, keeping existing name"
            );
        }
        inserted
    }

    /// Entry with the given ordinal
    pub fn by_ordinal(&self, ordinal: TypeOrdinal) -> Option<TypeInfo> {
        self.types
            .iter()
            .find(|entry| entry.value().ordinal == ordinal)
            .map(|entry| entry.value().clone())
    }

    /// Entry with the given normalized name
    pub fn by_name(&self, name: &str) -> Option<TypeInfo> {
        let name = normalize_type_name(name);
        self.types
            .iter()
            .find(|entry| *entry.value().name == *name)
            .map(|entry| entry.value().clone())
    }

    /// Every cached entry sharing `signature` (more than one means a collision)
    pub fn by_signature(&self, signature: TypeSignature) -> Vec<TypeInfo> {
        let mut found: Vec<TypeInfo> = self
            .types
            .iter()
            .filter(|entry| entry.value().signature == signature)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|info| info.ordinal);
        found
    }

    /// Every cached entry in first-use order
    pub fn registered(&self) -> Vec<TypeInfo> {
        let mut all: Vec<TypeInfo> = self.types.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|info| info.ordinal);
        all
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn describe(&self, name: String) -> TypeInfo {
        let signature = TypeSignature::from_normalized(&name);
        let category = self.table.classify(signature);
        let ordinal = self.next_ordinal.fetch_add(1, Ordering::Relaxed) + 1;

        debug!(
            ordinal,
            name = %name,
            signature = %signature,
            category = %category,
            "Classified type"
        );

        TypeInfo {
            ordinal,
            signature,
            name: name.into(),
            category,
        }
    }
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::new(CategoryTable::engine_defaults())
    }
}

impl std::fmt::Debug for TypeClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TypeClassifier")
            .field("memberships", &self.table.len())
            .field("types", &self.types.len())
            .finish()
    }
}
