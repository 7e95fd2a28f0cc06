/*!
 * Category Membership
 * Signature sets per arena-backed category
 */

use super::signature::TypeSignature;
use crate::memory::types::Category;
use ahash::RandomState;
use std::collections::HashSet;

/// Default scripting types routed to the code arena
pub const DEFAULT_CODE_TYPES: &[&str] = &[
    "GDScript",
    "GDScriptFunction",
    "GDScriptInstance",
    "GDScriptNativeClass",
    "GDScriptLambdaCallable",
];

/// Default container types routed to the collections arena
pub const DEFAULT_COLLECTION_TYPES: &[&str] = &[
    "Array",
    "Dictionary",
    "PackedNodePtrArray",
    "PackedByteArray",
    "PackedInt32Array",
    "PackedFloat32Array",
    "PackedStringArray",
    "PackedVector2Array",
];

/// Default physics bodies routed to the physics arena
pub const DEFAULT_PHYSICS_TYPES: &[&str] = &[
    "RigidBody2D",
    "RigidBody3D",
    "CharacterBody2D",
    "CharacterBody3D",
    "StaticBody2D",
    "StaticBody3D",
    "Area2D",
    "Area3D",
    "CollisionShape2D",
    "CollisionShape3D",
];

/// Default image types routed to the images arena
pub const DEFAULT_IMAGE_TYPES: &[&str] = &[
    "Image",
    "ImageTexture",
    "Texture2D",
    "CompressedTexture2D",
    "AtlasTexture",
];

/// Default UI controls routed to the controls arena
pub const DEFAULT_CONTROL_TYPES: &[&str] = &[
    "Control",
    "Button",
    "Label",
    "LineEdit",
    "Panel",
    "Container",
    "TextureRect",
];

/// Default font types routed to the fonts arena
pub const DEFAULT_FONT_TYPES: &[&str] = &["Font", "FontFile", "FontVariation", "SystemFont"];

/// Default interned string types routed to the strings arena
pub const DEFAULT_STRING_TYPES: &[&str] = &["StringName"];

/// Default type names per category.
///
/// Resource and RefCounted start empty: in the host object model most
/// types are both, so membership there is opt-in through configuration.
pub fn default_type_names(category: Category) -> &'static [&'static str] {
    match category {
        Category::Code => DEFAULT_CODE_TYPES,
        Category::Collections => DEFAULT_COLLECTION_TYPES,
        Category::Physics => DEFAULT_PHYSICS_TYPES,
        Category::Images => DEFAULT_IMAGE_TYPES,
        Category::Controls => DEFAULT_CONTROL_TYPES,
        Category::Fonts => DEFAULT_FONT_TYPES,
        Category::Strings => DEFAULT_STRING_TYPES,
        Category::None | Category::Resource | Category::RefCounted => &[],
    }
}

/// Membership table: one signature set per arena-backed category
///
/// Tables may overlap; `classify` resolves overlaps by `Category::PRIORITY`.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    sets: [HashSet<TypeSignature, RandomState>; Category::ARENA_COUNT],
}

impl CategoryTable {
    /// Table with no members: everything routes to the heap
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table populated from the default type name lists
    pub fn engine_defaults() -> Self {
        let mut table = Self::empty();
        for category in Category::PRIORITY {
            for name in default_type_names(category) {
                table.insert_name(category, name);
            }
        }
        table
    }

    /// Builder form of [`insert_name`](Self::insert_name)
    pub fn with_names(mut self, category: Category, names: &[&str]) -> Self {
        for name in names {
            self.insert_name(category, name);
        }
        self
    }

    /// Add a signature. Returns false for `Category::None` or a duplicate.
    pub fn insert(&mut self, category: Category, signature: TypeSignature) -> bool {
        match category.arena_index() {
            Some(idx) => self.sets[idx].insert(signature),
            None => false,
        }
    }

    /// Add a type by name (normalized before hashing)
    pub fn insert_name(&mut self, category: Category, name: &str) -> bool {
        self.insert(category, TypeSignature::from_name(name))
    }

    /// Add `T` by its own type name
    pub fn insert_type<T: ?Sized>(&mut self, category: Category) -> bool {
        self.insert(category, TypeSignature::of::<T>())
    }

    pub fn remove(&mut self, category: Category, signature: TypeSignature) -> bool {
        match category.arena_index() {
            Some(idx) => self.sets[idx].remove(&signature),
            None => false,
        }
    }

    pub fn contains(&self, category: Category, signature: TypeSignature) -> bool {
        category
            .arena_index()
            .map_or(false, |idx| self.sets[idx].contains(&signature))
    }

    /// First category in priority order whose table holds `signature`
    pub fn classify(&self, signature: TypeSignature) -> Category {
        Category::PRIORITY
            .into_iter()
            .find(|category| self.contains(*category, signature))
            .unwrap_or(Category::None)
    }

    /// Signatures registered for `category`
    pub fn members(&self, category: Category) -> impl Iterator<Item = TypeSignature> + '_ {
        category
            .arena_index()
            .into_iter()
            .flat_map(move |idx| self.sets[idx].iter().copied())
    }

    /// Total number of memberships across all categories
    pub fn len(&self) -> usize {
        self.sets.iter().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
