/*!
 * Type Signatures
 * Stable 32-bit identifiers derived from normalized type names
 */

use serde::{Deserialize, Serialize};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over `bytes`
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Stable per-type identifier
///
/// Two unrelated types can collide in a 32-bit space. That risk is accepted:
/// a collision only means both types share a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeSignature(u32);

impl TypeSignature {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Hash a name that is already normalized. Usable in `const` tables.
    pub const fn from_normalized(name: &str) -> Self {
        Self(fnv1a_32(name.as_bytes()))
    }

    /// Normalize `name` (module paths stripped) and hash it
    pub fn from_name(name: &str) -> Self {
        Self::from_normalized(&normalize_type_name(name))
    }

    /// Signature of `T` as seen by the classifier
    pub fn of<T: ?Sized>() -> Self {
        Self::from_name(std::any::type_name::<T>())
    }
}

impl std::fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Strip module paths from every path in a type name:
/// `alloc::vec::Vec<game::Image>` becomes `Vec<Image>`.
pub fn normalize_type_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut segment_start = 0;
    let mut chars = name.trim().chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
        } else {
            out.push(c);
            segment_start = out.len();
        }
    }
    out
}
