//! Load and save orchestration.
//!
//! Decoders only produce *a* flat pixel type in packed (or pitch-spaced)
//! rows. Loading installs that output into an [`Image`] and then runs
//! [`Image::convert`] to apply the caller's [`LoadFlags`] and [`Layout`].

use alloc::format;
use alloc::vec::Vec;

use crate::error::ImageError;
use crate::image::Image;
use crate::layout::Layout;
use crate::limits::Limits;
use crate::pixel::PixelType;
use crate::registry::{FormatRegistry, ImageFormat};

/// Raw decoder output.
#[derive(Clone, Debug)]
pub struct DecodeOutput {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes between row starts; at least `width * bytes_per_pixel`.
    pub pitch: usize,
    pub pixel_type: PixelType,
    pub pixel_aspect: Option<f32>,
    pub resolution: Option<f32>,
}

impl DecodeOutput {
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Tightly packed rows. Codecs outside this crate build their output
    /// with this and register it through [`FormatRegistry::with`].
    pub fn packed(pixels: Vec<u8>, width: u32, height: u32, pixel_type: PixelType) -> Self {
        Self {
            pixels,
            width,
            height,
            pitch: width as usize * pixel_type.bytes_per_pixel(),
            pixel_type,
            pixel_aspect: None,
            resolution: None,
        }
    }

    /// Rows start `pitch` bytes apart instead of packed.
    pub fn with_pitch(mut self, pitch: usize) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_metadata(mut self, pixel_aspect: Option<f32>, resolution: Option<f32>) -> Self {
        self.pixel_aspect = pixel_aspect;
        self.resolution = resolution;
        self
    }
}

/// Type transforms applied to decoded pixels.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LoadFlags(u16);

impl LoadFlags {
    pub const NONE: LoadFlags = LoadFlags(0);
    /// Reduce colour to luminance.
    pub const GREYSCALE: LoadFlags = LoadFlags(1 << 0);
    /// Expand luminance to RGB.
    pub const RGB: LoadFlags = LoadFlags(1 << 1);
    /// Add an alpha channel if missing.
    pub const ALPHA: LoadFlags = LoadFlags(1 << 2);
    /// Drop the alpha channel if present.
    pub const NO_ALPHA: LoadFlags = LoadFlags(1 << 3);
    pub const DEPTH_8: LoadFlags = LoadFlags(1 << 4);
    pub const DEPTH_16: LoadFlags = LoadFlags(1 << 5);
    pub const FLOAT: LoadFlags = LoadFlags(1 << 6);
    /// Premultiply alpha, if there is alpha.
    pub const PREMULTIPLIED: LoadFlags = LoadFlags(1 << 7);

    const ALL_BITS: u16 = 0xFF;

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: LoadFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: LoadFlags) -> Self {
        Self(self.0 | other.0)
    }

    /// Reject mutually exclusive flags and unknown bits.
    pub fn validate(self) -> Result<(), ImageError> {
        if self.0 & !Self::ALL_BITS != 0 {
            return Err(ImageError::InvalidArgument(format!(
                "unknown load flags {:#06x}",
                self.0 & !Self::ALL_BITS
            )));
        }
        let conflicts = [
            (Self::GREYSCALE, Self::RGB, "GREYSCALE and RGB"),
            (Self::ALPHA, Self::NO_ALPHA, "ALPHA and NO_ALPHA"),
            (Self::DEPTH_8, Self::DEPTH_16, "DEPTH_8 and DEPTH_16"),
            (Self::DEPTH_8, Self::FLOAT, "DEPTH_8 and FLOAT"),
            (Self::DEPTH_16, Self::FLOAT, "DEPTH_16 and FLOAT"),
            (Self::NO_ALPHA, Self::PREMULTIPLIED, "NO_ALPHA and PREMULTIPLIED"),
        ];
        for (a, b, what) in conflicts {
            if self.contains(a) && self.contains(b) {
                return Err(ImageError::InvalidArgument(format!(
                    "load flags {what} are mutually exclusive"
                )));
            }
        }
        Ok(())
    }

    /// The type a decoded `pixel_type` becomes under these flags.
    pub const fn apply(self, pixel_type: PixelType) -> PixelType {
        let mut t = pixel_type;
        if self.contains(Self::GREYSCALE) {
            t = t.greyscale();
        }
        if self.contains(Self::RGB) {
            t = t.rgb();
        }
        if self.contains(Self::ALPHA) {
            t = t.add_alpha();
        }
        if self.contains(Self::NO_ALPHA) {
            t = t.drop_alpha();
        }
        if self.contains(Self::DEPTH_8) {
            t = t.to_8bit();
        }
        if self.contains(Self::DEPTH_16) {
            t = t.to_16bit();
        }
        if self.contains(Self::FLOAT) {
            t = t.to_float();
        }
        if self.contains(Self::PREMULTIPLIED) {
            t = t.premultiplied();
        }
        t
    }
}

impl core::ops::BitOr for LoadFlags {
    type Output = LoadFlags;

    fn bitor(self, rhs: LoadFlags) -> LoadFlags {
        self.union(rhs)
    }
}

impl core::fmt::Debug for LoadFlags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        const NAMES: [&str; 8] = [
            "GREYSCALE",
            "RGB",
            "ALPHA",
            "NO_ALPHA",
            "DEPTH_8",
            "DEPTH_16",
            "FLOAT",
            "PREMULTIPLIED",
        ];
        let mut set = f.debug_set();
        for (bit, name) in NAMES.iter().enumerate() {
            if self.0 & (1 << bit) != 0 {
                set.entry(name);
            }
        }
        set.finish()
    }
}

/// Builder for loading an image from encoded bytes.
///
/// ```
/// use zenraster::{FormatRegistry, Image, Layout, LoadFlags, LoadRequest, PixelType};
///
/// let src = Image::new(8, 8, PixelType::Rgb8, Layout::NONE)?;
/// # #[cfg(feature = "qoix")]
/// # {
/// let registry = FormatRegistry::builtin();
/// let bytes = src.save(registry, zenraster::ImageFormat::Qoix, &Default::default())?;
/// let image = LoadRequest::new(registry, &bytes)
///     .with_flags(LoadFlags::GREYSCALE)
///     .decode()?;
/// assert_eq!(image.pixel_type(), PixelType::Gray8);
/// # }
/// # Ok::<(), zenraster::ImageError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct LoadRequest<'a> {
    registry: &'a FormatRegistry,
    data: &'a [u8],
    format: Option<ImageFormat>,
    flags: LoadFlags,
    layout: Layout,
    limits: Option<&'a Limits>,
}

impl<'a> LoadRequest<'a> {
    pub fn new(registry: &'a FormatRegistry, data: &'a [u8]) -> Self {
        Self {
            registry,
            data,
            format: None,
            flags: LoadFlags::NONE,
            layout: Layout::NONE,
            limits: None,
        }
    }

    /// Skip detection and decode as `format`.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_flags(mut self, flags: LoadFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Layout the loaded image must satisfy.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// The explicit format, or the one detected from the data.
    pub fn format(&self) -> Result<ImageFormat, ImageError> {
        match self.format {
            Some(f) => Ok(f),
            None => self
                .registry
                .detect(self.data)
                .ok_or(ImageError::UnrecognizedFormat),
        }
    }

    /// Run the decoder only, without flags or layout.
    pub fn decode_raw(&self) -> Result<DecodeOutput, ImageError> {
        let codec = self.registry.codec(self.format()?)?;
        (codec.decode)(self.data, self.limits)
    }

    /// Decode into a new image.
    pub fn decode(&self) -> Result<Image<'static>, ImageError> {
        let mut image = Image::empty(PixelType::Rgba8);
        image.load(self)?;
        Ok(image)
    }

    fn check(&self) -> Result<(), ImageError> {
        self.flags.validate()?;
        self.layout.validate()
    }

    fn load_into(&self, image: &mut Image<'_>) -> Result<(), ImageError> {
        let decoded = self.decode_raw()?;
        let target = self.flags.apply(decoded.pixel_type);
        tracing::debug!(
            decoded = ?decoded.pixel_type,
            ?target,
            width = decoded.width,
            height = decoded.height,
            "load"
        );
        let (width, height, pitch, pixel_type) = (
            decoded.width,
            decoded.height,
            decoded.pitch,
            decoded.pixel_type,
        );
        image.set_pixel_aspect(decoded.pixel_aspect);
        image.set_resolution(decoded.resolution);
        image.install_decoded(decoded.into_pixels(), width, height, pitch, pixel_type)?;
        image.convert_in_place(target, self.layout)
    }
}

/// Colour interpretation tag written by encoders that record one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Colorspace {
    /// sRGB colour channels; alpha linear.
    #[default]
    Srgb,
    /// All channels linear.
    Linear,
}

/// Whether an encoder may add a general-purpose compression pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CompressionPolicy {
    /// Try it and keep whichever output is smaller.
    #[default]
    Auto,
    /// Never compress.
    Never,
}

/// Options for [`Image::save`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct SaveOptions {
    pub colorspace: Colorspace,
    pub compression: CompressionPolicy,
}

impl SaveOptions {
    pub fn with_colorspace(mut self, colorspace: Colorspace) -> Self {
        self.colorspace = colorspace;
        self
    }

    pub fn with_compression(mut self, compression: CompressionPolicy) -> Self {
        self.compression = compression;
        self
    }
}

impl Image<'_> {
    /// Replace this image with the result of `request`.
    ///
    /// Invalid flags or layout are returned without touching the image.
    /// Any later failure leaves the image empty and errored.
    pub fn load(&mut self, request: &LoadRequest<'_>) -> Result<(), ImageError> {
        if self.is_view() {
            return Err(ImageError::NotOwned);
        }
        request.check()?;
        self.reset(self.pixel_type());
        let result = request.load_into(self);
        if result.is_err() {
            let pixel_type = self.pixel_type();
            self.reset(pixel_type);
        }
        self.record(result)
    }

    /// Decode `data` with format detection and no transforms.
    pub fn decode(registry: &FormatRegistry, data: &[u8]) -> Result<Image<'static>, ImageError> {
        LoadRequest::new(registry, data).decode()
    }

    /// Encode as `format`.
    pub fn save(
        &self,
        registry: &FormatRegistry,
        format: ImageFormat,
        options: &SaveOptions,
    ) -> Result<Vec<u8>, ImageError> {
        self.check_usable()?;
        let codec = registry.codec(format)?;
        tracing::debug!(format = codec.name, pixel_type = ?self.pixel_type(), "save");
        (codec.encode)(self, options)
    }

    /// Read a whole stream and decode it.
    #[cfg(feature = "std")]
    pub fn read_from<R: std::io::Read>(
        registry: &FormatRegistry,
        reader: &mut R,
    ) -> Result<Image<'static>, ImageError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Image::decode(registry, &data)
    }

    /// Encode as `format` into `writer`.
    #[cfg(feature = "std")]
    pub fn write_to<W: std::io::Write>(
        &self,
        registry: &FormatRegistry,
        format: ImageFormat,
        options: &SaveOptions,
        writer: &mut W,
    ) -> Result<(), ImageError> {
        let bytes = self.save(registry, format, options)?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}
