//! The image buffer: dimensions, pixel type, pitch, layout guarantees, and
//! either owned or borrowed bytes.

use alloc::format;
use alloc::vec::Vec;

use crate::error::ImageError;
use crate::layout::{Layout, LayoutPlan};
use crate::limits;
use crate::pixel::PixelType;
use crate::scanline;
use crate::storage::{Allocation, PendingAllocation, Storage};

/// A 2D pixel buffer.
///
/// An `Image<'static>` owns its pixels. Views created with
/// [`Image::view`], [`Image::sub_image`] or [`Image::from_borrowed`] borrow
/// them; views can be read and cast but not converted, resized or loaded
/// into.
///
/// Failures of [`set_size`](Image::set_size), [`convert`](Image::convert)
/// and [`load`](Image::load) are returned and also kept in the image.
/// While an error is kept, every pixel operation returns it again and row
/// accessors return `None`, until `set_size` or `load` succeeds.
#[derive(Debug)]
pub struct Image<'a> {
    storage: Storage<'a>,
    /// Index of the first meaningful pixel in `storage`.
    first: usize,
    pitch: isize,
    width: u32,
    height: u32,
    pixel_type: PixelType,
    layout: Layout,
    pixel_aspect: Option<f32>,
    resolution: Option<f32>,
    error: Option<ImageError>,
}

impl Default for Image<'_> {
    fn default() -> Self {
        Self::empty(PixelType::Rgba8)
    }
}

impl Image<'static> {
    /// Allocate a zeroed image satisfying `layout`.
    pub fn new(
        width: u32,
        height: u32,
        pixel_type: PixelType,
        layout: Layout,
    ) -> Result<Self, ImageError> {
        let mut image = Image::empty(pixel_type);
        image.set_size(width, height, pixel_type, layout)?;
        Ok(image)
    }
}

impl<'a> Image<'a> {
    /// A 0×0 image with no storage.
    pub fn empty(pixel_type: PixelType) -> Self {
        Self {
            storage: Storage::Empty,
            first: 0,
            pitch: 0,
            width: 0,
            height: 0,
            pixel_type,
            layout: Layout::NONE,
            pixel_aspect: None,
            resolution: None,
            error: None,
        }
    }

    /// Wrap caller-owned rows.
    ///
    /// `pitch` is the byte distance between rows and must be at least
    /// `width * pixel_type.bytes_per_pixel()`.
    pub fn from_borrowed(
        data: &'a [u8],
        width: u32,
        height: u32,
        pitch: usize,
        pixel_type: PixelType,
    ) -> Result<Self, ImageError> {
        limits::check_dimensions(width, height, pixel_type.bytes_per_pixel())?;
        let row_bytes = width as usize * pixel_type.bytes_per_pixel();
        if pitch < row_bytes {
            return Err(ImageError::InvalidArgument(format!(
                "pitch {pitch} is smaller than the row size {row_bytes}"
            )));
        }
        let needed = if width == 0 || height == 0 {
            0
        } else {
            (height as usize - 1)
                .checked_mul(pitch)
                .and_then(|n| n.checked_add(row_bytes))
                .ok_or(ImageError::DimensionsTooLarge { width, height })?
        };
        if data.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        let layout = if pitch == row_bytes {
            Layout::GAPLESS
        } else {
            Layout::NONE
        };
        Ok(Self {
            storage: Storage::Borrowed(data),
            first: 0,
            pitch: pitch as isize,
            width,
            height,
            pixel_type,
            layout,
            pixel_aspect: None,
            resolution: None,
            error: None,
        })
    }

    // ── accessors ───────────────────────────────────────────────────

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Signed byte distance between consecutive rows; negative when rows are
    /// stored bottom-up. Zero when the image has no pixel data.
    pub fn pitch(&self) -> isize {
        self.pitch
    }

    /// Guarantees the current storage satisfies.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Packed byte length of one row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.pixel_type.bytes_per_pixel()
    }

    /// Whether this image owns its pixel allocation.
    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    /// Whether this image borrows its pixels from elsewhere.
    pub fn is_view(&self) -> bool {
        self.storage.is_borrowed()
    }

    /// Whether this image holds pixel data.
    pub fn has_pixels(&self) -> bool {
        self.width != 0 && self.height != 0 && !matches!(self.storage, Storage::Empty)
    }

    /// Width-to-height ratio of one pixel, if known.
    pub fn pixel_aspect(&self) -> Option<f32> {
        self.pixel_aspect
    }

    pub fn set_pixel_aspect(&mut self, aspect: Option<f32>) {
        self.pixel_aspect = aspect;
    }

    /// Vertical resolution in pixels per inch, if known.
    pub fn resolution(&self) -> Option<f32> {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Option<f32>) {
        self.resolution = resolution;
    }

    /// The error kept from the last failed `set_size`, `convert` or `load`.
    pub fn error(&self) -> Option<&ImageError> {
        self.error.as_ref()
    }

    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    /// Address of the first meaningful pixel, for alignment checks.
    pub fn first_pixel_addr(&self) -> usize {
        self.storage.bytes().as_ptr() as usize + self.first
    }

    // ── sizing ──────────────────────────────────────────────────────

    /// Discard the current pixels and allocate `width` × `height` zeroed
    /// pixels of `pixel_type` satisfying `layout`.
    ///
    /// The old allocation is released before the new one is attempted, so
    /// a failure leaves the image empty and errored.
    pub fn set_size(
        &mut self,
        width: u32,
        height: u32,
        pixel_type: PixelType,
        layout: Layout,
    ) -> Result<(), ImageError> {
        if self.storage.is_borrowed() {
            return Err(ImageError::NotOwned);
        }
        self.reset(pixel_type);
        let result = self.allocate(width, height, pixel_type, layout);
        self.record(result)
    }

    fn allocate(
        &mut self,
        width: u32,
        height: u32,
        pixel_type: PixelType,
        layout: Layout,
    ) -> Result<(), ImageError> {
        layout.validate()?;
        limits::check_dimensions(width, height, pixel_type.bytes_per_pixel())?;
        self.width = width;
        self.height = height;
        self.layout = layout;
        if width == 0 || height == 0 {
            return Ok(());
        }
        let plan = LayoutPlan::compute(width, height, pixel_type.bytes_per_pixel(), layout, 0)?;
        let allocation = PendingAllocation::new(&plan)?.finish();
        self.install(allocation, pixel_type, layout);
        Ok(())
    }

    /// Drop pixels, metadata and any kept error.
    pub(crate) fn reset(&mut self, pixel_type: PixelType) {
        *self = Image::empty(pixel_type);
    }

    /// Take over decoder output: tightly packed or `pitch`-spaced rows.
    pub(crate) fn install_decoded(
        &mut self,
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        pitch: usize,
        pixel_type: PixelType,
    ) -> Result<(), ImageError> {
        limits::check_dimensions(width, height, pixel_type.bytes_per_pixel())?;
        let row_bytes = width as usize * pixel_type.bytes_per_pixel();
        let needed = if width == 0 || height == 0 {
            0
        } else {
            (height as usize - 1)
                .checked_mul(pitch)
                .and_then(|n| n.checked_add(row_bytes))
                .ok_or(ImageError::DimensionsTooLarge { width, height })?
        };
        if pitch < row_bytes || pixels.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: pixels.len(),
            });
        }
        self.width = width;
        self.height = height;
        let layout = if pitch == row_bytes {
            Layout::GAPLESS
        } else {
            Layout::NONE
        };
        if needed == 0 {
            self.pixel_type = pixel_type;
            self.layout = layout;
            return Ok(());
        }
        self.install(
            Allocation {
                bytes: pixels,
                first: 0,
                pitch: pitch as isize,
            },
            pixel_type,
            layout,
        );
        Ok(())
    }

    fn install(&mut self, allocation: Allocation, pixel_type: PixelType, layout: Layout) {
        self.storage = Storage::Owned(allocation.bytes);
        self.first = allocation.first;
        self.pitch = allocation.pitch;
        self.pixel_type = pixel_type;
        self.layout = layout;
    }

    pub(crate) fn record<T>(&mut self, result: Result<T, ImageError>) -> Result<T, ImageError> {
        if let Err(e) = &result {
            self.error = Some(e.clone());
        }
        result
    }

    pub(crate) fn check_usable(&self) -> Result<(), ImageError> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    // ── row access ──────────────────────────────────────────────────

    fn row_offset(&self, y: usize) -> usize {
        self.first.wrapping_add_signed(y as isize * self.pitch)
    }

    /// Row `y` without error or bounds bookkeeping; callers check both.
    pub(crate) fn row(&self, y: usize) -> &[u8] {
        let offset = self.row_offset(y);
        &self.storage.bytes()[offset..offset + self.row_bytes()]
    }

    fn readable(&self) -> bool {
        self.error.is_none() && self.has_pixels()
    }

    /// Packed pixels of row `y`.
    pub fn scanline(&self, y: u32) -> Option<&[u8]> {
        if !self.readable() || y >= self.height {
            return None;
        }
        Some(self.row(y as usize))
    }

    /// Mutable packed pixels of row `y`; `None` for views.
    pub fn scanline_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if !self.readable() || y >= self.height {
            return None;
        }
        let offset = self.row_offset(y as usize);
        let len = self.row_bytes();
        self.storage
            .bytes_mut()
            .map(|bytes| &mut bytes[offset..offset + len])
    }

    /// Byte range of row `y` including the left border and everything the
    /// layout guarantees readable to the right.
    fn padded_span(&self, y: i64) -> Option<(usize, usize)> {
        if !self.readable() {
            return None;
        }
        let border = self.layout.border().pixels() as i64;
        if y < -border || y >= i64::from(self.height) + border {
            return None;
        }
        let bpp = self.pixel_type.bytes_per_pixel();
        let start = self.first as i64 + y * self.pitch as i64 - border * bpp as i64;
        let len = (border as usize + self.layout.readable_after(self.width as usize)) * bpp;
        usize::try_from(start).ok().map(|start| (start, len))
    }

    /// Row `y` widened by the border and trailing guarantees of the layout.
    ///
    /// `y` may range over `-border .. height + border`. The slice starts
    /// `border` pixels left of the first pixel.
    pub fn padded_scanline(&self, y: i64) -> Option<&[u8]> {
        let (start, len) = self.padded_span(y)?;
        self.storage.bytes().get(start..start + len)
    }

    /// Mutable counterpart of [`padded_scanline`](Image::padded_scanline).
    pub fn padded_scanline_mut(&mut self, y: i64) -> Option<&mut [u8]> {
        let (start, len) = self.padded_span(y)?;
        self.storage.bytes_mut()?.get_mut(start..start + len)
    }

    /// Iterate the packed rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let height = if self.readable() { self.height } else { 0 };
        (0..height as usize).map(move |y| self.row(y))
    }

    /// All rows top to bottom with no padding.
    pub fn to_packed(&self) -> Result<Vec<u8>, ImageError> {
        self.check_usable()?;
        let mut out = Vec::new();
        out.try_reserve_exact(self.row_bytes() * self.height as usize)
            .map_err(|_| ImageError::OutOfMemory {
                bytes: self.row_bytes() * self.height as usize,
            })?;
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        Ok(out)
    }

    /// The bytes from the first pixel to the end of the last row, with the
    /// row stride, when rows are stored top-down.
    pub(crate) fn contiguous_rows(&self) -> Option<(&[u8], usize)> {
        if !self.readable() || self.pitch <= 0 {
            return None;
        }
        let pitch = self.pitch as usize;
        let len = (self.height as usize - 1) * pitch + self.row_bytes();
        self.storage
            .bytes()
            .get(self.first..self.first + len)
            .map(|rows| (rows, pitch))
    }

    // ── views ───────────────────────────────────────────────────────

    /// Borrow the whole image.
    pub fn view(&self) -> Result<Image<'_>, ImageError> {
        self.check_usable()?;
        Ok(Image {
            storage: Storage::Borrowed(self.storage.bytes()),
            first: self.first,
            pitch: self.pitch,
            width: self.width,
            height: self.height,
            pixel_type: self.pixel_type,
            layout: self.layout,
            pixel_aspect: self.pixel_aspect,
            resolution: self.resolution,
            error: None,
        })
    }

    /// Borrow the `width` × `height` rectangle at (`x`, `y`).
    ///
    /// The view keeps the trailing, border and orientation guarantees of
    /// this image but not multiplicity, alignment or gaplessness.
    pub fn sub_image(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Image<'_>, ImageError> {
        self.check_usable()?;
        let fits = |start: u32, len: u32, max: u32| {
            start.checked_add(len).is_some_and(|end| end <= max)
        };
        if !fits(x, width, self.width) || !fits(y, height, self.height) {
            return Err(ImageError::InvalidArgument(format!(
                "rectangle {width}x{height} at ({x}, {y}) exceeds {}x{}",
                self.width, self.height
            )));
        }
        let mut view = self.view()?;
        view.width = width;
        view.height = height;
        view.layout = self.layout.for_sub_image();
        if width == 0 || height == 0 || !self.has_pixels() {
            return Ok(view);
        }
        let x_offset = x as usize * self.pixel_type.bytes_per_pixel();
        view.first = self.row_offset(y as usize) + x_offset;
        Ok(view)
    }

    // ── conversion ──────────────────────────────────────────────────

    /// Whether the current storage meets `required`.
    ///
    /// Rows packed back to back count as gapless even when the recorded
    /// layout does not say so.
    pub fn satisfies(&self, required: Layout) -> bool {
        let gapless_ok = !required.is_gapless()
            || self.layout.is_gapless()
            || self.pitch.unsigned_abs() == self.row_bytes();
        self.layout.satisfies(required.with_gapless(false)) && gapless_ok
    }

    /// Change the pixel type and layout in place.
    ///
    /// A no-op when the type already matches and the layout already
    /// satisfies `layout`. Otherwise converts into a new allocation and
    /// swaps it in only on success; on failure the old pixels stay in place
    /// and the error is kept.
    pub fn convert(&mut self, target: PixelType, layout: Layout) -> Result<(), ImageError> {
        self.check_usable()?;
        if self.storage.is_borrowed() {
            return Err(ImageError::NotOwned);
        }
        let result = self.convert_in_place(target, layout);
        self.record(result)
    }

    pub(crate) fn convert_in_place(
        &mut self,
        target: PixelType,
        layout: Layout,
    ) -> Result<(), ImageError> {
        layout.validate()?;
        if self.storage.is_borrowed() {
            return Err(ImageError::NotOwned);
        }
        if target == self.pixel_type && self.satisfies(layout) {
            tracing::trace!(?target, "convert: layout already satisfied");
            return Ok(());
        }
        limits::check_dimensions(self.width, self.height, target.bytes_per_pixel())?;
        if !self.has_pixels() {
            self.pixel_type = target;
            self.layout = layout;
            return Ok(());
        }
        tracing::debug!(
            from = ?self.pixel_type,
            to = ?target,
            width = self.width,
            height = self.height,
            "convert: reallocating"
        );
        let allocation = self.convert_into(target, layout)?;
        self.install(allocation, target, layout);
        Ok(())
    }

    /// Convert every row into a fresh allocation; `self` is not touched.
    fn convert_into(&self, target: PixelType, layout: Layout) -> Result<Allocation, ImageError> {
        let width = self.width as usize;
        let scratch = scanline::scratch_len(self.pixel_type, target, width);
        let plan = LayoutPlan::compute(
            self.width,
            self.height,
            target.bytes_per_pixel(),
            layout,
            scratch,
        )?;
        let mut pending = PendingAllocation::new(&plan)?;
        let row_len = width * target.bytes_per_pixel();
        for y in 0..self.height as usize {
            let (dst, scratch) = pending.row_and_scratch(y, row_len);
            scanline::convert_scanline(self.pixel_type, self.row(y), target, dst, width, scratch);
        }
        Ok(pending.finish())
    }

    /// A converted owned copy; `self` is not modified.
    pub fn to_converted(
        &self,
        target: PixelType,
        layout: Layout,
    ) -> Result<Image<'static>, ImageError> {
        self.check_usable()?;
        layout.validate()?;
        limits::check_dimensions(self.width, self.height, target.bytes_per_pixel())?;
        let mut out = Image::empty(target);
        out.width = self.width;
        out.height = self.height;
        out.layout = layout;
        out.pixel_aspect = self.pixel_aspect;
        out.resolution = self.resolution;
        if self.has_pixels() {
            let allocation = self.convert_into(target, layout)?;
            out.install(allocation, target, layout);
        }
        Ok(out)
    }

    /// Deep copy with the same type and layout.
    pub fn try_clone(&self) -> Result<Image<'static>, ImageError> {
        self.to_converted(self.pixel_type, self.layout)
    }

    /// Reinterpret the bytes as `target` without copying.
    ///
    /// The row byte length must be a multiple of `target`'s pixel size; the
    /// width is rescaled to match. On failure nothing changes.
    pub fn cast(&mut self, target: PixelType) -> Result<(), ImageError> {
        self.check_usable()?;
        let row_bytes = self.row_bytes();
        let to_bpp = target.bytes_per_pixel();
        if row_bytes % to_bpp != 0 {
            return Err(ImageError::UnsupportedCast {
                from: self.pixel_type,
                to: target,
                row_bytes,
            });
        }
        let new_width = u32::try_from(row_bytes / to_bpp)
            .ok()
            .filter(|&w| w <= limits::MAX_DIMENSION)
            .ok_or_else(|| {
                ImageError::InvalidArgument(format!(
                    "cast to {target:?} would make rows {} pixels wide",
                    row_bytes / to_bpp
                ))
            })?;
        let from_bpp = self.pixel_type.bytes_per_pixel();
        self.layout = self
            .layout
            .for_cast(self.width as usize, from_bpp, to_bpp);
        self.width = new_width;
        self.pixel_type = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Alignment, Border, Multiplicity, Orientation, Trailing};
    use alloc::vec;

    fn filled(width: u32, height: u32, ty: PixelType, layout: Layout) -> Image<'static> {
        let mut img = Image::new(width, height, ty, layout).unwrap();
        let mut v = 0u8;
        for y in 0..height {
            for b in img.scanline_mut(y).unwrap() {
                *b = v;
                v = v.wrapping_add(7);
            }
        }
        img
    }

    #[test]
    fn new_image_satisfies_layout() {
        let layout = Layout::new()
            .with_alignment(Alignment::B32)
            .with_border(Border::Two)
            .with_multiplicity(Multiplicity::X8)
            .with_trailing(Trailing::Seven);
        let img = Image::new(5, 3, PixelType::Rgb8, layout).unwrap();
        assert_eq!(img.first_pixel_addr() % 32, 0);
        assert_eq!(img.pitch() % 32, 0);
        assert!(img.satisfies(layout));
        for y in -2..5 {
            let row = img.padded_scanline(y).unwrap();
            assert_eq!(row.len(), (2 + 12) * 3);
        }
        assert!(img.padded_scanline(-3).is_none());
        assert!(img.padded_scanline(5).is_none());
    }

    #[test]
    fn zero_sized_image_has_no_storage() {
        let img = Image::new(0, 10, PixelType::Gray8, Layout::NONE).unwrap();
        assert!(!img.has_pixels());
        assert!(img.scanline(0).is_none());
        assert_eq!(img.to_packed().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn invalid_layout_errors_image() {
        let mut img = Image::empty(PixelType::Gray8);
        let bad = Layout::GAPLESS.with_border(Border::One);
        let err = img.set_size(4, 4, PixelType::Gray8, bad).unwrap_err();
        assert!(matches!(err, ImageError::InvalidLayout(_)));
        assert!(img.is_errored());
        assert!(img.convert(PixelType::Rgb8, Layout::NONE).is_err());
        img.set_size(4, 4, PixelType::Gray8, Layout::NONE).unwrap();
        assert!(!img.is_errored());
    }

    #[test]
    fn oversized_dimensions_rejected() {
        let err = Image::new(limits::MAX_DIMENSION + 1, 1, PixelType::Gray8, Layout::NONE)
            .unwrap_err();
        assert!(matches!(err, ImageError::DimensionsTooLarge { .. }));
    }

    #[test]
    fn convert_fast_path_keeps_buffer() {
        let mut img = filled(8, 8, PixelType::Rgb8, Layout::NONE);
        img.convert(PixelType::Rgba8, Layout::GAPLESS).unwrap();
        let addr = img.first_pixel_addr();
        let before = img.to_packed().unwrap();
        img.convert(PixelType::Rgba8, Layout::GAPLESS).unwrap();
        assert_eq!(img.first_pixel_addr(), addr);
        assert_eq!(img.to_packed().unwrap(), before);
    }

    #[test]
    fn flipped_layout_keeps_logical_order() {
        let img = filled(3, 4, PixelType::Gray8, Layout::NONE);
        let flipped = img
            .to_converted(
                PixelType::Gray8,
                Layout::NONE.with_orientation(Orientation::Flipped),
            )
            .unwrap();
        assert!(flipped.pitch() < 0);
        assert_eq!(flipped.to_packed().unwrap(), img.to_packed().unwrap());
        assert!(flipped.satisfies(Layout::GAPLESS));
    }

    #[test]
    fn sub_image_addresses_rectangle() {
        let img = filled(6, 5, PixelType::Gray8, Layout::new().with_border(Border::One));
        let sub = img.sub_image(2, 1, 3, 2).unwrap();
        assert!(!sub.is_owned());
        assert_eq!(sub.scanline(0).unwrap(), &img.scanline(1).unwrap()[2..5]);
        assert_eq!(sub.scanline(1).unwrap(), &img.scanline(2).unwrap()[2..5]);
        assert_eq!(sub.layout().border(), Border::One);
        assert!(img.sub_image(4, 0, 3, 1).is_err());
    }

    #[test]
    fn views_refuse_mutation() {
        let img = filled(4, 4, PixelType::Rgb8, Layout::NONE);
        let mut view = img.view().unwrap();
        assert_eq!(
            view.convert(PixelType::Gray8, Layout::NONE),
            Err(ImageError::NotOwned)
        );
        assert!(view.scanline_mut(0).is_none());
        let copy = view.try_clone().unwrap();
        assert!(copy.is_owned());
    }

    #[test]
    fn cast_failure_leaves_image_untouched() {
        let mut img = filled(5, 2, PixelType::Rgb8, Layout::NONE);
        let err = img.cast(PixelType::Rgba8).unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedCast { row_bytes: 15, .. }));
        assert_eq!(img.width(), 5);
        assert_eq!(img.pixel_type(), PixelType::Rgb8);
        assert!(!img.is_errored());
    }

    #[test]
    fn borrowed_rows_with_pitch() {
        let data = vec![1u8, 2, 3, 0, 4, 5, 6, 0];
        let img = Image::from_borrowed(&data, 3, 2, 4, PixelType::Gray8).unwrap();
        assert_eq!(img.to_packed().unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert!(matches!(
            Image::from_borrowed(&data[..6], 3, 2, 4, PixelType::Gray8),
            Err(ImageError::BufferTooSmall { needed: 7, actual: 6 })
        ));
    }
}
