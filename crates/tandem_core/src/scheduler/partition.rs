//! # Data Partitioning
//!
//! Splits `len` items into `parts` contiguous, disjoint ranges. The first
//! `len % parts` ranges carry one extra item.
//!
//! ## Safety Note
//!
//! [`SharedSlice`] hands each worker a `&mut` view of its own range of one
//! borrowed slice. Soundness rests on two facts: ranges from [`partition`]
//! never overlap, and a dispatch runs each worker index exactly once.

#![allow(unsafe_code)]

use std::marker::PhantomData;
use std::ops::Range;

/// Returns the range of items owned by `index` out of `parts`.
///
/// # Panics
///
/// Panics if `parts` is zero or `index >= parts`.
#[must_use]
pub fn partition(len: usize, parts: usize, index: usize) -> Range<usize> {
    assert!(parts > 0, "Cannot partition into zero parts");
    assert!(index < parts, "Partition index {index} out of {parts}");

    let base = len / parts;
    let extra = len % parts;
    let start = index * base + index.min(extra);
    let end = start + base + usize::from(index < extra);
    start..end
}

/// A `&mut [T]` that may be re-borrowed in disjoint pieces from many threads.
pub(super) struct SharedSlice<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

impl<'a, T> SharedSlice<'a, T> {
    pub(super) fn new(data: &'a mut [T]) -> Self {
        Self {
            ptr: data.as_mut_ptr(),
            len: data.len(),
            _marker: PhantomData,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.len
    }

    /// Re-borrows `range` mutably.
    ///
    /// # Safety
    ///
    /// No two live borrows may overlap.
    #[allow(clippy::mut_from_ref)]
    pub(super) unsafe fn slice_mut(&self, range: Range<usize>) -> &mut [T] {
        assert!(range.start <= range.end && range.end <= self.len);
        // SAFETY: in bounds (checked above), disjointness upheld by the caller.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(range.start), range.len()) }
    }
}

// SAFETY: each thread only touches its own disjoint range, so this is the
// same as sending one `&mut [T]` piece to each thread.
unsafe impl<T: Send> Sync for SharedSlice<'_, T> {}
