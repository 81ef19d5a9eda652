//! Typed pixel access through the `rgb` and `imgref` crates.

use rgb::AsPixels as _;

use crate::error::ImageError;
use crate::image::Image;
use crate::pixel::PixelType;

/// A pixel struct with a fixed [`PixelType`].
pub trait TypedPixel: Copy + 'static {
    const PIXEL_TYPE: PixelType;
}

impl TypedPixel for rgb::RGB8 {
    const PIXEL_TYPE: PixelType = PixelType::Rgb8;
}

impl TypedPixel for rgb::RGBA8 {
    const PIXEL_TYPE: PixelType = PixelType::Rgba8;
}

impl TypedPixel for rgb::alt::BGRA8 {
    const PIXEL_TYPE: PixelType = PixelType::Bgra8;
}

impl<'a> Image<'a> {
    fn expect_type<P: TypedPixel>(&self) -> Result<(), ImageError> {
        self.check_usable()?;
        if self.pixel_type() != P::PIXEL_TYPE {
            return Err(ImageError::PixelTypeMismatch {
                expected: P::PIXEL_TYPE,
                actual: self.pixel_type(),
            });
        }
        Ok(())
    }

    /// Row `y` as typed pixels.
    pub fn row_as<P: TypedPixel>(&self, y: u32) -> Result<&[P], ImageError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        self.expect_type::<P>()?;
        let row = self.scanline(y).ok_or_else(|| {
            ImageError::InvalidArgument(alloc::format!("row {y} of {}", self.height()))
        })?;
        Ok(row.as_pixels())
    }

    /// Mutable row `y` as typed pixels; fails for views.
    pub fn row_as_mut<P: TypedPixel>(&mut self, y: u32) -> Result<&mut [P], ImageError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        self.expect_type::<P>()?;
        if self.is_view() {
            return Err(ImageError::NotOwned);
        }
        let height = self.height();
        let row = self.scanline_mut(y).ok_or_else(|| {
            ImageError::InvalidArgument(alloc::format!("row {y} of {height}"))
        })?;
        Ok(row.as_pixels_mut())
    }

    /// Every row, top to bottom, as typed pixels.
    pub fn rows_as<P: TypedPixel>(
        &self,
    ) -> Result<impl Iterator<Item = &[P]> + '_, ImageError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        self.expect_type::<P>()?;
        Ok(self.rows().map(|row| row.as_pixels()))
    }

    /// Zero-copy [`imgref::ImgRef`] over the pixels.
    ///
    /// Needs top-down rows whose pitch is a whole number of pixels.
    #[cfg(feature = "imgref")]
    pub fn as_imgref<P: TypedPixel>(&self) -> Result<imgref::ImgRef<'_, P>, ImageError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        self.expect_type::<P>()?;
        let bpp = P::PIXEL_TYPE.bytes_per_pixel();
        if !self.has_pixels() {
            return Err(ImageError::InvalidArgument("image has no pixels".into()));
        }
        let (bytes, pitch) = self
            .contiguous_rows()
            .filter(|(_, pitch)| pitch % bpp == 0)
            .ok_or_else(|| {
                ImageError::InvalidLayout(alloc::format!(
                    "pitch {} is not a positive multiple of {bpp}",
                    self.pitch()
                ))
            })?;
        Ok(imgref::ImgRef::new_stride(
            bytes.as_pixels(),
            self.width() as usize,
            self.height() as usize,
            pitch / bpp,
        ))
    }

    /// Packed copy as an [`imgref::ImgVec`].
    #[cfg(feature = "imgref")]
    pub fn to_imgvec<P: TypedPixel>(&self) -> Result<imgref::ImgVec<P>, ImageError>
    where
        [u8]: rgb::AsPixels<P>,
    {
        self.expect_type::<P>()?;
        let mut pixels = alloc::vec::Vec::with_capacity(self.width() as usize * self.height() as usize);
        for row in self.rows() {
            pixels.extend_from_slice(row.as_pixels());
        }
        Ok(imgref::ImgVec::new(
            pixels,
            self.width() as usize,
            self.height() as usize,
        ))
    }

    /// Borrow an [`imgref::ImgRef`] as an image view.
    #[cfg(feature = "imgref")]
    pub fn from_imgref<P: TypedPixel>(img: imgref::ImgRef<'a, P>) -> Result<Self, ImageError>
    where
        [P]: rgb::ComponentBytes<u8>,
    {
        use rgb::ComponentBytes as _;
        let bpp = P::PIXEL_TYPE.bytes_per_pixel();
        let (width, height, stride) = (img.width(), img.height(), img.stride());
        let buf: &'a [P] = img.into_buf();
        Image::from_borrowed(
            buf.as_bytes(),
            width as u32,
            height as u32,
            stride * bpp,
            P::PIXEL_TYPE,
        )
    }
}
