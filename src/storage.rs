//! Pixel storage and the commit-or-rollback allocation used to replace it.

use alloc::vec::Vec;

use crate::error::ImageError;
use crate::layout::LayoutPlan;

/// Where an image's bytes live.
#[derive(Debug, Default)]
pub(crate) enum Storage<'a> {
    /// No pixel data: zero-sized, never allocated, or released after a failure.
    #[default]
    Empty,
    Owned(Vec<u8>),
    Borrowed(&'a [u8]),
}

impl Storage<'_> {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Storage::Empty => &[],
            Storage::Owned(v) => v,
            Storage::Borrowed(b) => b,
        }
    }

    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Storage::Owned(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self, Storage::Borrowed(_))
    }
}

/// `len` zero bytes, or [`ImageError::OutOfMemory`] if the allocator refuses.
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<u8>, ImageError> {
    let mut bytes = try_with_capacity(len)?;
    bytes.resize(len, 0);
    Ok(bytes)
}

/// An empty vector with room for `len` bytes, allocated fallibly.
pub(crate) fn try_with_capacity(len: usize) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| ImageError::OutOfMemory { bytes: len })?;
    Ok(bytes)
}

/// A finished allocation ready to be installed into an image.
#[derive(Debug)]
pub(crate) struct Allocation {
    pub bytes: Vec<u8>,
    /// Index of the first meaningful pixel.
    pub first: usize,
    pub pitch: isize,
}

/// A new buffer being filled while the old one is still in place.
///
/// Dropping it without calling [`PendingAllocation::finish`] discards the
/// new buffer and leaves the image untouched.
pub(crate) struct PendingAllocation {
    bytes: Vec<u8>,
    first: usize,
    pitch: isize,
    rows_end: usize,
}

impl PendingAllocation {
    /// Allocate zeroed storage for `plan`, aligning the first scanline to the
    /// requested boundary against the real buffer address.
    pub fn new(plan: &LayoutPlan) -> Result<Self, ImageError> {
        let bytes = try_zeroed(plan.alloc_len())?;

        let addr = bytes.as_ptr() as usize;
        let pad = (plan.align - addr % plan.align) % plan.align;
        Ok(Self {
            bytes,
            first: pad + plan.first_pixel,
            pitch: plan.signed_pitch(),
            rows_end: pad + plan.rows_len,
        })
    }

    fn row_offset(&self, y: usize) -> usize {
        self.first.wrapping_add_signed(y as isize * self.pitch)
    }

    /// Scanline `y` (`row_len` bytes) and the scratch area after the rows.
    pub fn row_and_scratch(&mut self, y: usize, row_len: usize) -> (&mut [u8], &mut [u8]) {
        let offset = self.row_offset(y);
        let (rows, scratch) = self.bytes.split_at_mut(self.rows_end);
        (&mut rows[offset..offset + row_len], scratch)
    }

    /// Release the scratch area and hand the buffer over.
    pub fn finish(mut self) -> Allocation {
        self.bytes.truncate(self.rows_end);
        Allocation {
            bytes: self.bytes,
            first: self.first,
            pitch: self.pitch,
        }
    }
}
