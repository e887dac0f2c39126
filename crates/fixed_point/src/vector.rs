//! Aligned numeric vectors
//!
//! `AlignedVec<T>` owns a zero-initialised buffer whose start address is
//! aligned to at least 32 bytes, so full 256-bit lanes can be loaded from
//! any block boundary. The length is fixed at construction; there is no
//! resizing. Cloning is an explicit deep copy that keeps the alignment.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{FixedPointError, Result};

/// Default buffer alignment in bytes (one AVX register)
pub const DEFAULT_ALIGNMENT: usize = 32;

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
}

/// Plain numeric element types whose all-zero bit pattern is the value zero.
pub trait Element:
    sealed::Sealed + Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static
{
}

impl Element for f32 {}
impl Element for i16 {}
impl Element for i32 {}

/// An owning, fixed-length, aligned buffer of numeric elements
pub struct AlignedVec<T: Element> {
    ptr: NonNull<T>,
    len: usize,
    layout: Layout,
}

// SAFETY: AlignedVec uniquely owns its allocation, like Vec<T>.
unsafe impl<T: Element> Send for AlignedVec<T> {}
// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Element> Sync for AlignedVec<T> {}

impl<T: Element> AlignedVec<T> {
    /// Allocate `len` zeroed elements with the default 32-byte alignment.
    ///
    /// Panics on capacity overflow, like `Vec::with_capacity`; allocator
    /// failure aborts through `handle_alloc_error`.
    pub fn zeroed(len: usize) -> Self {
        match Self::with_alignment(DEFAULT_ALIGNMENT, len) {
            Ok(v) => v,
            Err(err) => panic!("aligned allocation failed: {err}"),
        }
    }

    /// Allocate `len` zeroed elements aligned to `align` bytes
    pub fn with_alignment(align: usize, len: usize) -> Result<Self> {
        if !align.is_power_of_two() || align < std::mem::align_of::<T>() {
            return Err(FixedPointError::InvalidAlignment { align });
        }

        let size = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(FixedPointError::CapacityOverflow { len })?;
        let layout = Layout::from_size_align(size, align)
            .map_err(|_| FixedPointError::CapacityOverflow { len })?;

        if size == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len: 0,
                layout,
            });
        }

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw.cast::<T>()) else {
            handle_alloc_error(layout);
        };

        Ok(Self { ptr, len, layout })
    }

    /// Allocate with the default alignment and copy `values` in
    pub fn from_slice(values: &[T]) -> Self {
        let mut v = Self::zeroed(values.len());
        v.as_mut_slice().copy_from_slice(values);
        v
    }

    /// Overwrite the contents with `src`, which must have the same length
    pub fn copy_from_slice(&mut self, src: &[T]) -> Result<()> {
        if src.len() != self.len {
            return Err(FixedPointError::DimensionMismatch {
                expected: self.len,
                got: src.len(),
            });
        }
        self.as_mut_slice().copy_from_slice(src);
        Ok(())
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment of the buffer in bytes
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: ptr is valid for len initialised elements (or dangling with len 0).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, and &mut self guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Set every element back to zero
    pub fn fill_zero(&mut self) {
        self.as_mut_slice().fill(T::default());
    }
}

impl<T: Element> Drop for AlignedVec<T> {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: allocated in with_alignment with this exact layout.
            unsafe { dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout) };
        }
    }
}

impl<T: Element> Clone for AlignedVec<T> {
    fn clone(&self) -> Self {
        let mut copy = match Self::with_alignment(self.alignment(), self.len) {
            Ok(v) => v,
            Err(err) => panic!("aligned allocation failed: {err}"),
        };
        copy.as_mut_slice().copy_from_slice(self.as_slice());
        copy
    }
}

impl<T: Element> Deref for AlignedVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> DerefMut for AlignedVec<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Element> AsRef<[T]> for AlignedVec<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> AsMut<[T]> for AlignedVec<T> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Element> PartialEq for AlignedVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Element> std::fmt::Debug for AlignedVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedVec")
            .field("align", &self.alignment())
            .field("data", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_is_aligned_and_zero() {
        for len in [1usize, 7, 16, 33, 4096] {
            let v: AlignedVec<f32> = AlignedVec::zeroed(len);
            assert_eq!(v.len(), len);
            assert_eq!(v.as_ptr() as usize % DEFAULT_ALIGNMENT, 0);
            assert!(v.iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn test_custom_alignment() {
        let v: AlignedVec<i16> = AlignedVec::with_alignment(64, 100).unwrap();
        assert_eq!(v.alignment(), 64);
        assert_eq!(v.as_ptr() as usize % 64, 0);
    }

    #[test]
    fn test_invalid_alignment() {
        assert!(matches!(
            AlignedVec::<f32>::with_alignment(24, 8),
            Err(FixedPointError::InvalidAlignment { align: 24 })
        ));
        assert!(matches!(
            AlignedVec::<i32>::with_alignment(2, 8),
            Err(FixedPointError::InvalidAlignment { align: 2 })
        ));
    }

    #[test]
    fn test_capacity_overflow() {
        assert!(matches!(
            AlignedVec::<f32>::with_alignment(32, usize::MAX),
            Err(FixedPointError::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn test_empty_vector() {
        let v: AlignedVec<f32> = AlignedVec::zeroed(0);
        assert!(v.is_empty());
        assert_eq!(v.as_slice(), &[] as &[f32]);
        let c = v.clone();
        assert!(c.is_empty());
    }

    #[test]
    fn test_clone_is_deep_copy() {
        let mut a = AlignedVec::from_slice(&[1.0f32, 2.0, 3.0]);
        let b = a.clone();
        a[0] = 10.0;
        assert_eq!(b.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(a.as_slice(), &[10.0, 2.0, 3.0]);
        assert_eq!(b.as_ptr() as usize % DEFAULT_ALIGNMENT, 0);
    }

    #[test]
    fn test_clone_keeps_alignment() {
        let a: AlignedVec<i16> = AlignedVec::with_alignment(128, 10).unwrap();
        assert_eq!(a.clone().alignment(), 128);
    }

    #[test]
    fn test_copy_from_slice_checks_length() {
        let mut v: AlignedVec<i16> = AlignedVec::zeroed(3);
        v.copy_from_slice(&[1, 2, 3]).unwrap();
        assert_eq!(v.as_slice(), &[1, 2, 3]);
        assert_eq!(
            v.copy_from_slice(&[1, 2]),
            Err(FixedPointError::DimensionMismatch { expected: 3, got: 2 })
        );
    }

    #[test]
    fn test_fill_zero() {
        let mut v = AlignedVec::from_slice(&[5i32, -5, 7]);
        v.fill_zero();
        assert_eq!(v.as_slice(), &[0, 0, 0]);
    }
}
