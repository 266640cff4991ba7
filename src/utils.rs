use std::convert::TryFrom;
use std::ops::{Range, RangeTo};

/// A range that does not fit into the slice it was used on.
///
/// Callers turn this into the `Error` kind that fits the structure they were
/// trying to read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OutOfBounds {
    /// Exclusive end of the requested range.
    pub end: u64,
    /// Length of the slice.
    pub len: usize,
}

/// Slice extension methods.
pub trait SliceExt<T> {
    /// Tries to obtain a subslice of `self`, returning `OutOfBounds` if the
    /// range doesn't fit.
    fn try_get<R>(&self, range: R) -> Result<&R::Output, OutOfBounds>
    where
        R: SliceIndex<T>;
}

impl<T> SliceExt<T> for [T] {
    fn try_get<R>(&self, range: R) -> Result<&R::Output, OutOfBounds>
    where
        R: SliceIndex<T>,
    {
        range.get(self)
    }
}

/// A type that can be used to index a slice.
pub trait SliceIndex<T> {
    type Output: ?Sized;

    /// Get the subslice of `slice` at the position indicated by `self`.
    fn get(self, slice: &[T]) -> Result<&Self::Output, OutOfBounds>;
}

// Ranges are `u64` so that `offset + length` computed from two on-disk `u32`s
// can never overflow. Conversion to `usize` is checked.

impl<T> SliceIndex<T> for Range<u64> {
    type Output = [T];

    fn get(self, slice: &[T]) -> Result<&[T], OutOfBounds> {
        let err = OutOfBounds { end: self.end, len: slice.len() };
        let start = usize::try_from(self.start).map_err(|_| err)?;
        let end = usize::try_from(self.end).map_err(|_| err)?;
        slice.get(start..end).ok_or(err)
    }
}

impl<T> SliceIndex<T> for RangeTo<u64> {
    type Output = [T];

    fn get(self, slice: &[T]) -> Result<&[T], OutOfBounds> {
        (0..self.end).get(slice)
    }
}

/// The byte range of `len` Bytes starting at the 32-bit file offset `offset`.
pub fn span(offset: u32, len: u64) -> Range<u64> {
    let start = u64::from(offset);
    start..start + len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_bounds() {
        let data = [1u8, 2, 3, 4];
        assert_eq!(data.try_get(span(1, 2)).unwrap(), &[2, 3]);
        assert_eq!(data.try_get(..4u64).unwrap(), &data);
        assert_eq!(data.try_get(span(4, 0)).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn out_of_bounds() {
        let data = [0u8; 4];
        assert_eq!(data.try_get(..5u64), Err(OutOfBounds { end: 5, len: 4 }));
        assert_eq!(
            data.try_get(span(u32::MAX, 8)),
            Err(OutOfBounds { end: u64::from(u32::MAX) + 8, len: 4 })
        );
    }
}
