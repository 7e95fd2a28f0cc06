/*!
 * Array Header Access
 * Raw accessors for the size and element-count fields stored before padded data
 */

use crate::core::limits::{DATA_OFFSET, ELEMENT_OFFSET, SIZE_OFFSET};
use std::ptr::NonNull;

/// Start of the block that owns `data`.
///
/// # Safety
/// `data` must have been returned by a padded allocation.
#[inline]
pub unsafe fn block_start(data: NonNull<u8>) -> NonNull<u8> {
    NonNull::new_unchecked(data.as_ptr().sub(DATA_OFFSET))
}

/// # Safety
/// `data` must have been returned by a padded allocation.
#[inline]
pub unsafe fn size_field(data: NonNull<u8>) -> *mut u64 {
    block_start(data).as_ptr().add(SIZE_OFFSET).cast::<u64>()
}

/// # Safety
/// `data` must have been returned by a padded allocation.
#[inline]
pub unsafe fn element_count_field(data: NonNull<u8>) -> *mut u64 {
    block_start(data).as_ptr().add(ELEMENT_OFFSET).cast::<u64>()
}
