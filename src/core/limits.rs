/*!
 * Memory Limits and Constants
 *
 * Centralized location for arena capacities, alignment requirements and the
 * array header layout. Values are grouped by domain.
 *
 * - Layout-critical constants are marked with [LAYOUT]
 */

// =============================================================================
// ARENA LIMITS
// =============================================================================

/// Default capacity of a single category arena (512MB)
/// Buffers are reserved lazily, so untouched arenas cost nothing
pub const DEFAULT_ARENA_CAPACITY: usize = 512 * 1024 * 1024;

/// Alignment of every arena buffer base address
/// [LAYOUT] Objects with a larger alignment are aligned by address masking
pub const ARENA_BUFFER_ALIGN: usize = MAX_ALIGN;

// =============================================================================
// ALIGNMENT
// =============================================================================

/// Largest fundamental alignment the engine guarantees (C `max_align_t`)
/// [LAYOUT] Array data starts on this boundary
pub const MAX_ALIGN: usize = 16;

// =============================================================================
// ARRAY HEADER LAYOUT
// =============================================================================
//
// Alignment:  ↓ MAX_ALIGN          ↓ u64               ↓ MAX_ALIGN
//             ┌─────────────────┬──┬────────────────┬──┬───────────...
//             │ u64             │░░│ u64            │░░│ T[]
//             │ alloc size      │░░│ element count  │░░│ data
//             └─────────────────┴──┴────────────────┴──┴───────────...
// Offset:     ↑ SIZE_OFFSET        ↑ ELEMENT_OFFSET    ↑ DATA_OFFSET

/// Offset of the allocation size field
pub const SIZE_OFFSET: usize = 0;

/// Offset of the element count field
pub const ELEMENT_OFFSET: usize = align_up(SIZE_OFFSET + HEADER_FIELD_SIZE, HEADER_FIELD_ALIGN);

/// Offset of the first data byte
/// [LAYOUT] Always a multiple of MAX_ALIGN
pub const DATA_OFFSET: usize = align_up(ELEMENT_OFFSET + HEADER_FIELD_SIZE, MAX_ALIGN);

const HEADER_FIELD_SIZE: usize = std::mem::size_of::<u64>();
const HEADER_FIELD_ALIGN: usize = std::mem::align_of::<u64>();

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Round `value` up to the next multiple of `align` (a power of two)
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Convert bytes to megabytes for human-readable output
#[inline]
pub const fn bytes_to_mb(bytes: usize) -> usize {
    bytes / (1024 * 1024)
}
