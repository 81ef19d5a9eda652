//! Layout constraints: guarantees about addressable padding around pixels.
//!
//! A [`Layout`] is a 16-bit flag set:
//!
//! | bits  | field                                         |
//! |-------|-----------------------------------------------|
//! | 0–1   | multiplicity, log2 (1, 2, 4, 8 pixels)        |
//! | 2–3   | trailing pixels (0, 1, 3, 7)                  |
//! | 4–6   | scanline alignment, log2 (1 ..= 128 bytes)    |
//! | 7–8   | border pixels (0 ..= 3)                       |
//! | 9     | flipped (bottom-up storage, negative pitch)   |
//! | 10    | straight (top-down storage, positive pitch)   |
//! | 11    | gapless (pitch equals the packed row size)    |
//! | 12–15 | reserved, must be zero                        |
//!
//! All pixel counts are in units of the image's own pixel type.

use alloc::format;

use crate::error::ImageError;

const MULTIPLICITY_SHIFT: u16 = 0;
const TRAILING_SHIFT: u16 = 2;
const ALIGNMENT_SHIFT: u16 = 4;
const BORDER_SHIFT: u16 = 7;
const FLIPPED: u16 = 1 << 9;
const STRAIGHT: u16 = 1 << 10;
const GAPLESS: u16 = 1 << 11;
const RESERVED: u16 = 0xF000;

/// Scanlines can be read in blocks of this many pixels from their first pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Multiplicity {
    X1,
    X2,
    X4,
    X8,
}

impl Multiplicity {
    pub const fn pixels(self) -> usize {
        1 << self as usize
    }

    const fn from_code(code: u16) -> Self {
        match code & 0b11 {
            0 => Self::X1,
            1 => Self::X2,
            2 => Self::X4,
            _ => Self::X8,
        }
    }
}

/// Readable pixels immediately after the last pixel of every scanline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trailing {
    Zero,
    One,
    Three,
    Seven,
}

impl Trailing {
    pub const fn pixels(self) -> usize {
        (1 << self as usize) - 1
    }

    const fn from_code(code: u16) -> Self {
        match code & 0b11 {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Three,
            _ => Self::Seven,
        }
    }
}

/// Byte alignment of the first scanline and of the pitch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Alignment {
    B1,
    B2,
    B4,
    B8,
    B16,
    B32,
    B64,
    B128,
}

impl Alignment {
    pub const fn bytes(self) -> usize {
        1 << self as usize
    }

    const fn from_code(code: u16) -> Self {
        match code & 0b111 {
            0 => Self::B1,
            1 => Self::B2,
            2 => Self::B4,
            3 => Self::B8,
            4 => Self::B16,
            5 => Self::B32,
            6 => Self::B64,
            _ => Self::B128,
        }
    }
}

/// Readable margin on all four sides of the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Border {
    Zero,
    One,
    Two,
    Three,
}

impl Border {
    pub const fn pixels(self) -> usize {
        self as usize
    }

    const fn from_code(code: u16) -> Self {
        match code & 0b11 {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            _ => Self::Three,
        }
    }
}

/// Vertical storage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Either order is acceptable.
    #[default]
    Any,
    /// Bottom-up: the last scanline comes first in memory.
    Flipped,
    /// Top-down: the first scanline comes first in memory.
    Straight,
}

/// Memory layout guarantees of an image buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Layout(u16);

impl Layout {
    /// No guarantees beyond the pixels themselves.
    pub const NONE: Layout = Layout(0);
    /// Scanlines are contiguous with no padding.
    pub const GAPLESS: Layout = Layout(GAPLESS);

    pub const fn new() -> Self {
        Self::NONE
    }

    /// Wrap raw bits. Use [`Layout::validate`] before relying on the result.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    const fn with_field(self, shift: u16, width_mask: u16, code: u16) -> Self {
        Self((self.0 & !(width_mask << shift)) | ((code & width_mask) << shift))
    }

    pub const fn with_multiplicity(self, m: Multiplicity) -> Self {
        self.with_field(MULTIPLICITY_SHIFT, 0b11, m as u16)
    }

    pub const fn with_trailing(self, t: Trailing) -> Self {
        self.with_field(TRAILING_SHIFT, 0b11, t as u16)
    }

    pub const fn with_alignment(self, a: Alignment) -> Self {
        self.with_field(ALIGNMENT_SHIFT, 0b111, a as u16)
    }

    pub const fn with_border(self, b: Border) -> Self {
        self.with_field(BORDER_SHIFT, 0b11, b as u16)
    }

    pub const fn with_orientation(self, o: Orientation) -> Self {
        let bits = self.0 & !(FLIPPED | STRAIGHT);
        Self(match o {
            Orientation::Any => bits,
            Orientation::Flipped => bits | FLIPPED,
            Orientation::Straight => bits | STRAIGHT,
        })
    }

    pub const fn with_gapless(self, gapless: bool) -> Self {
        if gapless {
            Self(self.0 | GAPLESS)
        } else {
            Self(self.0 & !GAPLESS)
        }
    }

    pub const fn multiplicity(self) -> Multiplicity {
        Multiplicity::from_code(self.0 >> MULTIPLICITY_SHIFT)
    }

    pub const fn trailing(self) -> Trailing {
        Trailing::from_code(self.0 >> TRAILING_SHIFT)
    }

    pub const fn alignment(self) -> Alignment {
        Alignment::from_code(self.0 >> ALIGNMENT_SHIFT)
    }

    pub const fn border(self) -> Border {
        Border::from_code(self.0 >> BORDER_SHIFT)
    }

    /// Orientation. Invalid sets with both bits report [`Orientation::Flipped`].
    pub const fn orientation(self) -> Orientation {
        if self.0 & FLIPPED != 0 {
            Orientation::Flipped
        } else if self.0 & STRAIGHT != 0 {
            Orientation::Straight
        } else {
            Orientation::Any
        }
    }

    pub const fn is_gapless(self) -> bool {
        self.0 & GAPLESS != 0
    }

    /// Whether any padding (multiplicity, trailing, alignment, border) is requested.
    pub const fn has_padding(self) -> bool {
        self.0 & !(FLIPPED | STRAIGHT | GAPLESS | RESERVED) != 0
    }

    /// Reject contradictory flag sets.
    pub fn validate(self) -> Result<(), ImageError> {
        if self.0 & RESERVED != 0 {
            return Err(ImageError::InvalidLayout(format!(
                "reserved bits set: {:#06x}",
                self.0 & RESERVED
            )));
        }
        if self.0 & FLIPPED != 0 && self.0 & STRAIGHT != 0 {
            return Err(ImageError::InvalidLayout(
                "flipped and straight are mutually exclusive".into(),
            ));
        }
        if self.is_gapless() && self.has_padding() {
            return Err(ImageError::InvalidLayout(format!(
                "gapless cannot be combined with padding ({self:?})"
            )));
        }
        Ok(())
    }

    /// Whether a buffer laid out according to `self` also meets `required`.
    pub fn satisfies(self, required: Layout) -> bool {
        let orientation_ok = match required.orientation() {
            Orientation::Any => true,
            o => self.orientation() == o,
        };
        orientation_ok
            && self.multiplicity() >= required.multiplicity()
            && self.trailing() >= required.trailing()
            && self.alignment() >= required.alignment()
            && self.border() >= required.border()
            && (self.is_gapless() || !required.is_gapless())
    }

    /// Pixels readable from the first pixel of a scanline of `width` pixels,
    /// not counting the left border.
    pub const fn readable_after(self, width: usize) -> usize {
        let m = self.multiplicity().pixels();
        let blocks = width.div_ceil(m) * m;
        let trailing = width + self.trailing().pixels();
        let border = width + self.border().pixels();
        max(blocks, max(trailing, border))
    }

    /// Guarantees that still hold for a rectangle cut out of a buffer with
    /// this layout: trailing, border and orientation survive, but the
    /// rectangle's start is not aligned, not block-padded and not gapless.
    pub const fn for_sub_image(self) -> Layout {
        self.with_multiplicity(Multiplicity::X1)
            .with_alignment(Alignment::B1)
            .with_gapless(false)
    }

    /// Guarantees that hold after reinterpreting scanlines of `width` pixels
    /// of `from_bpp` bytes as pixels of `to_bpp` bytes.
    ///
    /// Byte positions do not move, so alignment, orientation and gaplessness
    /// carry over; the pixel-counted guarantees are recomputed in the new
    /// unit and rounded down to the nearest representable value.
    pub fn for_cast(self, width: usize, from_bpp: usize, to_bpp: usize) -> Layout {
        let row_bytes = width * from_bpp;
        let new_width = row_bytes / to_bpp;
        let after_bytes = self.readable_after(width) * from_bpp;
        let left_bytes = self.border().pixels() * from_bpp;

        let spare_px = (after_bytes - new_width * to_bpp) / to_bpp;
        let border_px = self.border().pixels().min(left_bytes / to_bpp).min(spare_px);
        let border = Border::from_code(border_px as u16);

        let trailing = [Trailing::Seven, Trailing::Three, Trailing::One]
            .into_iter()
            .find(|t| t.pixels() <= spare_px)
            .unwrap_or(Trailing::Zero);

        let multiplicity = [Multiplicity::X8, Multiplicity::X4, Multiplicity::X2]
            .into_iter()
            .find(|m| new_width.div_ceil(m.pixels()) * m.pixels() * to_bpp <= after_bytes)
            .unwrap_or(Multiplicity::X1);

        self.with_border(border)
            .with_trailing(trailing)
            .with_multiplicity(multiplicity)
    }
}

const fn max(a: usize, b: usize) -> usize {
    if a > b { a } else { b }
}

impl core::fmt::Debug for Layout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Layout")
            .field("multiplicity", &self.multiplicity().pixels())
            .field("trailing", &self.trailing().pixels())
            .field("alignment", &self.alignment().bytes())
            .field("border", &self.border().pixels())
            .field("orientation", &self.orientation())
            .field("gapless", &self.is_gapless())
            .finish()
    }
}

/// Byte geometry of an allocation that satisfies a [`Layout`].
///
/// Offsets are relative to the aligned base of the allocation; the caller
/// adds up to `align - 1` bytes in front to reach that base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LayoutPlan {
    /// Absolute pitch in bytes.
    pub pitch: usize,
    pub flipped: bool,
    /// Offset of the first meaningful pixel.
    pub first_pixel: usize,
    /// Bytes covered by scanlines, border rows included.
    pub rows_len: usize,
    /// Scratch bytes placed after the rows.
    pub bonus: usize,
    pub align: usize,
}

impl LayoutPlan {
    /// Compute the geometry for `width` × `height` pixels of `bpp` bytes,
    /// plus `bonus` scratch bytes.
    ///
    /// Fails with [`ImageError::OutOfMemory`] when the sizes overflow.
    pub fn compute(
        width: u32,
        height: u32,
        bpp: usize,
        layout: Layout,
        bonus: usize,
    ) -> Result<Self, ImageError> {
        layout.validate()?;
        let overflow = || ImageError::OutOfMemory { bytes: usize::MAX };
        let w = width as usize;
        let h = height as usize;
        let border = layout.border().pixels();
        let align = layout.alignment().bytes();

        // The left border is padded so the first pixel of every row lands on
        // the alignment boundary, not the border.
        let left = border
            .checked_mul(bpp)
            .and_then(|bytes| bytes.checked_next_multiple_of(align))
            .ok_or_else(overflow)?;
        let pitch = layout
            .readable_after(w)
            .checked_mul(bpp)
            .and_then(|bytes| bytes.checked_add(left))
            .and_then(|bytes| bytes.checked_next_multiple_of(align))
            .ok_or_else(overflow)?;
        let rows_len = h
            .checked_add(2 * border)
            .and_then(|rows| rows.checked_mul(pitch))
            .ok_or_else(overflow)?;
        rows_len
            .checked_add(bonus)
            .and_then(|n| n.checked_add(align))
            .ok_or_else(overflow)?;

        let flipped = layout.orientation() == Orientation::Flipped;
        let first_row = if flipped {
            (h + border).saturating_sub(1)
        } else {
            border
        };
        Ok(Self {
            pitch,
            flipped,
            first_pixel: first_row * pitch + left,
            rows_len,
            bonus,
            align,
        })
    }

    /// Signed pitch: negative for bottom-up storage.
    pub fn signed_pitch(&self) -> isize {
        if self.flipped {
            -(self.pitch as isize)
        } else {
            self.pitch as isize
        }
    }

    /// Bytes to request from the allocator, alignment slack included.
    pub fn alloc_len(&self) -> usize {
        self.rows_len + self.bonus + self.align - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_round_trip_through_bits() {
        let l = Layout::new()
            .with_multiplicity(Multiplicity::X4)
            .with_trailing(Trailing::Three)
            .with_alignment(Alignment::B64)
            .with_border(Border::Two)
            .with_orientation(Orientation::Flipped);
        let l = Layout::from_bits(l.bits());
        assert_eq!(l.multiplicity().pixels(), 4);
        assert_eq!(l.trailing().pixels(), 3);
        assert_eq!(l.alignment().bytes(), 64);
        assert_eq!(l.border().pixels(), 2);
        assert_eq!(l.orientation(), Orientation::Flipped);
        assert!(!l.is_gapless());
        assert!(l.validate().is_ok());
    }

    #[test]
    fn rejects_contradictions() {
        let both = Layout::from_bits(FLIPPED | STRAIGHT);
        assert!(matches!(both.validate(), Err(ImageError::InvalidLayout(_))));

        let gapless_aligned = Layout::GAPLESS.with_alignment(Alignment::B16);
        assert!(gapless_aligned.validate().is_err());

        let gapless_border = Layout::GAPLESS.with_border(Border::One);
        assert!(gapless_border.validate().is_err());

        assert!(Layout::from_bits(0x8000).validate().is_err());

        let gapless_flipped = Layout::GAPLESS.with_orientation(Orientation::Flipped);
        assert!(gapless_flipped.validate().is_ok());
    }

    #[test]
    fn stronger_satisfies_weaker() {
        let strong = Layout::new()
            .with_multiplicity(Multiplicity::X8)
            .with_trailing(Trailing::Seven)
            .with_alignment(Alignment::B32)
            .with_border(Border::Three);
        let weak = Layout::new()
            .with_multiplicity(Multiplicity::X2)
            .with_alignment(Alignment::B16)
            .with_border(Border::One);
        assert!(strong.satisfies(weak));
        assert!(!weak.satisfies(strong));
        assert!(strong.satisfies(Layout::NONE));
        assert!(!strong.satisfies(Layout::GAPLESS));
        assert!(Layout::GAPLESS.satisfies(Layout::GAPLESS));
        assert!(!strong.satisfies(Layout::NONE.with_orientation(Orientation::Flipped)));
        assert!(
            strong
                .with_orientation(Orientation::Straight)
                .satisfies(Layout::NONE.with_orientation(Orientation::Straight))
        );
    }

    #[test]
    fn readable_after_takes_largest_requirement() {
        let l = Layout::new()
            .with_multiplicity(Multiplicity::X8)
            .with_trailing(Trailing::One);
        assert_eq!(l.readable_after(10), 16);
        assert_eq!(l.readable_after(16), 17);
        let b = Layout::new().with_border(Border::Three);
        assert_eq!(b.readable_after(5), 8);
    }

    #[test]
    fn plan_gapless() {
        let plan = LayoutPlan::compute(7, 3, 3, Layout::GAPLESS, 0).unwrap();
        assert_eq!(plan.pitch, 21);
        assert_eq!(plan.first_pixel, 0);
        assert_eq!(plan.rows_len, 63);
        assert_eq!(plan.signed_pitch(), 21);
    }

    #[test]
    fn plan_with_border_alignment_and_bonus() {
        let l = Layout::new()
            .with_alignment(Alignment::B16)
            .with_border(Border::Two)
            .with_multiplicity(Multiplicity::X4);
        let plan = LayoutPlan::compute(5, 4, 4, l, 100).unwrap();
        // left border 8 bytes padded to 16, then 8 block-rounded pixels = 48
        assert_eq!(plan.pitch, 48);
        assert_eq!(plan.first_pixel, 2 * 48 + 16);
        assert_eq!(plan.first_pixel % 16, 0);
        assert_eq!(plan.rows_len, 8 * 48);
        assert_eq!(plan.alloc_len(), 8 * 48 + 100 + 15);
    }

    #[test]
    fn plan_border_keeps_first_pixel_aligned() {
        for bpp in [1, 2, 3, 4, 6, 8, 12, 16] {
            for align in [Alignment::B4, Alignment::B16, Alignment::B128] {
                let l = Layout::new().with_alignment(align).with_border(Border::Three);
                let plan = LayoutPlan::compute(5, 2, bpp, l, 0).unwrap();
                assert_eq!(plan.first_pixel % align.bytes(), 0, "bpp {bpp} {align:?}");
                assert_eq!(plan.pitch % align.bytes(), 0, "bpp {bpp} {align:?}");
                assert!(plan.first_pixel % plan.pitch >= 3 * bpp);
                assert!(plan.pitch - plan.first_pixel % plan.pitch >= 8 * bpp);
            }
        }
    }

    #[test]
    fn plan_flipped_starts_at_last_row() {
        let l = Layout::NONE.with_orientation(Orientation::Flipped);
        let plan = LayoutPlan::compute(4, 3, 1, l, 0).unwrap();
        assert_eq!(plan.first_pixel, 2 * 4);
        assert_eq!(plan.signed_pitch(), -4);
    }

    #[test]
    fn plan_overflow_is_out_of_memory() {
        let r = LayoutPlan::compute(u32::MAX, u32::MAX, usize::MAX / 2, Layout::NONE, 0);
        assert!(matches!(r, Err(ImageError::OutOfMemory { .. })));
    }

    #[test]
    fn sub_image_keeps_trailing_and_border() {
        let l = Layout::new()
            .with_multiplicity(Multiplicity::X4)
            .with_trailing(Trailing::Three)
            .with_alignment(Alignment::B32)
            .with_border(Border::One)
            .with_orientation(Orientation::Straight);
        let s = l.for_sub_image();
        assert_eq!(s.multiplicity(), Multiplicity::X1);
        assert_eq!(s.alignment(), Alignment::B1);
        assert_eq!(s.trailing(), Trailing::Three);
        assert_eq!(s.border(), Border::One);
        assert_eq!(s.orientation(), Orientation::Straight);
        assert!(Layout::GAPLESS.for_sub_image() == Layout::NONE);
    }

    #[test]
    fn cast_rescales_pixel_guarantees() {
        // 4 RGBA8 pixels + 3 trailing = 28 bytes readable.
        let l = Layout::new().with_trailing(Trailing::Three);
        let gray = l.for_cast(4, 4, 1);
        assert_eq!(gray.trailing(), Trailing::Seven);
        assert_eq!(gray.multiplicity(), Multiplicity::X8);

        // 8 Gray8 pixels + 7 trailing = 15 bytes; as RGBA8 2 pixels + 1 spare.
        let l = Layout::new().with_trailing(Trailing::Seven);
        let rgba = l.for_cast(8, 1, 4);
        assert_eq!(rgba.trailing(), Trailing::One);
        assert_eq!(rgba.multiplicity(), Multiplicity::X2);

        let b = Layout::new().with_border(Border::Three).for_cast(6, 1, 2);
        assert_eq!(b.border(), Border::One);
    }
}
