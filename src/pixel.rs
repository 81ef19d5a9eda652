//! The closed catalog of flat pixel types.
//!
//! Every type is a combination of a [`ChannelLayout`], a [`Depth`] and an
//! alpha mode. Samples are stored in native endian. The transform methods
//! (`greyscale`, `add_alpha`, `to_16bit`, ...) are total: asking for a
//! property the type already has returns the type unchanged.

/// Channel layout (number, order and meaning of channels).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    /// Single luminance channel.
    Gray,
    /// Luminance + alpha.
    GrayAlpha,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
    /// Blue, green, red, alpha. Only exists as straight 8-bit.
    Bgra,
}

impl ChannelLayout {
    /// Number of channels in this layout.
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::GrayAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    /// Whether this layout includes an alpha channel.
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::GrayAlpha | Self::Rgba | Self::Bgra)
    }
}

/// Storage type of a single channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Depth {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit float, nominal range 0.0..=1.0.
    F32,
}

impl Depth {
    /// Byte size of a single channel value.
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }

    /// Bits per channel.
    pub const fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32)
    }
}

/// Pixel memory layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// Single channel, 8-bit grayscale.
    Gray8,
    /// 8-bit grayscale + straight alpha.
    GrayAlpha8,
    /// 8-bit grayscale + premultiplied alpha.
    GrayAlpha8Premul,
    /// 3 channels, 8-bit RGB.
    Rgb8,
    /// 4 channels, 8-bit RGBA, straight alpha.
    Rgba8,
    /// 4 channels, 8-bit RGBA, premultiplied alpha.
    Rgba8Premul,
    /// 4 channels, 8-bit BGRA, straight alpha.
    Bgra8,
    /// Single channel, 16-bit grayscale.
    Gray16,
    GrayAlpha16,
    GrayAlpha16Premul,
    Rgb16,
    Rgba16,
    Rgba16Premul,
    /// Single channel, 32-bit float grayscale.
    GrayF32,
    GrayAlphaF32,
    GrayAlphaF32Premul,
    RgbF32,
    /// 4 channels, 32-bit float RGBA, straight alpha.
    RgbaF32,
    RgbaF32Premul,
}

impl PixelType {
    /// Every pixel type, in declaration order.
    pub const ALL: [PixelType; 19] = [
        Self::Gray8,
        Self::GrayAlpha8,
        Self::GrayAlpha8Premul,
        Self::Rgb8,
        Self::Rgba8,
        Self::Rgba8Premul,
        Self::Bgra8,
        Self::Gray16,
        Self::GrayAlpha16,
        Self::GrayAlpha16Premul,
        Self::Rgb16,
        Self::Rgba16,
        Self::Rgba16Premul,
        Self::GrayF32,
        Self::GrayAlphaF32,
        Self::GrayAlphaF32Premul,
        Self::RgbF32,
        Self::RgbaF32,
        Self::RgbaF32Premul,
    ];

    /// Build a type from its parts.
    ///
    /// `premultiplied` is ignored for layouts without alpha. BGRA order only
    /// exists as straight 8-bit; every other combination falls back to RGBA.
    pub const fn from_parts(layout: ChannelLayout, depth: Depth, premultiplied: bool) -> Self {
        use ChannelLayout as L;
        use Depth as D;
        match (layout, depth, premultiplied) {
            (L::Gray, D::U8, _) => Self::Gray8,
            (L::Gray, D::U16, _) => Self::Gray16,
            (L::Gray, D::F32, _) => Self::GrayF32,
            (L::GrayAlpha, D::U8, false) => Self::GrayAlpha8,
            (L::GrayAlpha, D::U8, true) => Self::GrayAlpha8Premul,
            (L::GrayAlpha, D::U16, false) => Self::GrayAlpha16,
            (L::GrayAlpha, D::U16, true) => Self::GrayAlpha16Premul,
            (L::GrayAlpha, D::F32, false) => Self::GrayAlphaF32,
            (L::GrayAlpha, D::F32, true) => Self::GrayAlphaF32Premul,
            (L::Rgb, D::U8, _) => Self::Rgb8,
            (L::Rgb, D::U16, _) => Self::Rgb16,
            (L::Rgb, D::F32, _) => Self::RgbF32,
            (L::Bgra, D::U8, false) => Self::Bgra8,
            (L::Rgba, D::U8, false) => Self::Rgba8,
            (L::Rgba | L::Bgra, D::U8, true) => Self::Rgba8Premul,
            (L::Rgba | L::Bgra, D::U16, false) => Self::Rgba16,
            (L::Rgba | L::Bgra, D::U16, true) => Self::Rgba16Premul,
            (L::Rgba | L::Bgra, D::F32, false) => Self::RgbaF32,
            (L::Rgba | L::Bgra, D::F32, true) => Self::RgbaF32Premul,
        }
    }

    pub const fn channel_layout(self) -> ChannelLayout {
        match self {
            Self::Gray8 | Self::Gray16 | Self::GrayF32 => ChannelLayout::Gray,
            Self::GrayAlpha8
            | Self::GrayAlpha8Premul
            | Self::GrayAlpha16
            | Self::GrayAlpha16Premul
            | Self::GrayAlphaF32
            | Self::GrayAlphaF32Premul => ChannelLayout::GrayAlpha,
            Self::Rgb8 | Self::Rgb16 | Self::RgbF32 => ChannelLayout::Rgb,
            Self::Rgba8
            | Self::Rgba8Premul
            | Self::Rgba16
            | Self::Rgba16Premul
            | Self::RgbaF32
            | Self::RgbaF32Premul => ChannelLayout::Rgba,
            Self::Bgra8 => ChannelLayout::Bgra,
        }
    }

    pub const fn depth(self) -> Depth {
        match self {
            Self::Gray8
            | Self::GrayAlpha8
            | Self::GrayAlpha8Premul
            | Self::Rgb8
            | Self::Rgba8
            | Self::Rgba8Premul
            | Self::Bgra8 => Depth::U8,
            Self::Gray16
            | Self::GrayAlpha16
            | Self::GrayAlpha16Premul
            | Self::Rgb16
            | Self::Rgba16
            | Self::Rgba16Premul => Depth::U16,
            Self::GrayF32
            | Self::GrayAlphaF32
            | Self::GrayAlphaF32Premul
            | Self::RgbF32
            | Self::RgbaF32
            | Self::RgbaF32Premul => Depth::F32,
        }
    }

    pub const fn is_premultiplied(self) -> bool {
        matches!(
            self,
            Self::GrayAlpha8Premul
                | Self::Rgba8Premul
                | Self::GrayAlpha16Premul
                | Self::Rgba16Premul
                | Self::GrayAlphaF32Premul
                | Self::RgbaF32Premul
        )
    }

    /// Number of channels.
    pub const fn channels(self) -> usize {
        self.channel_layout().channels()
    }

    pub const fn has_alpha(self) -> bool {
        self.channel_layout().has_alpha()
    }

    /// Bytes per pixel for this type.
    pub const fn bytes_per_pixel(self) -> usize {
        self.channels() * self.depth().bytes()
    }

    pub const fn is_gray(self) -> bool {
        matches!(
            self.channel_layout(),
            ChannelLayout::Gray | ChannelLayout::GrayAlpha
        )
    }

    /// The type with luminance instead of color channels.
    pub const fn greyscale(self) -> Self {
        let layout = match self.channel_layout() {
            ChannelLayout::Gray | ChannelLayout::Rgb => ChannelLayout::Gray,
            _ => ChannelLayout::GrayAlpha,
        };
        Self::from_parts(layout, self.depth(), self.is_premultiplied())
    }

    /// The type with color instead of luminance channels.
    pub const fn rgb(self) -> Self {
        match self.channel_layout() {
            ChannelLayout::Gray => Self::from_parts(ChannelLayout::Rgb, self.depth(), false),
            ChannelLayout::GrayAlpha => {
                Self::from_parts(ChannelLayout::Rgba, self.depth(), self.is_premultiplied())
            }
            _ => self,
        }
    }

    /// The type with an alpha channel (straight alpha when one is added).
    pub const fn add_alpha(self) -> Self {
        match self.channel_layout() {
            ChannelLayout::Gray => Self::from_parts(ChannelLayout::GrayAlpha, self.depth(), false),
            ChannelLayout::Rgb => Self::from_parts(ChannelLayout::Rgba, self.depth(), false),
            _ => self,
        }
    }

    /// The type without an alpha channel.
    pub const fn drop_alpha(self) -> Self {
        match self.channel_layout() {
            ChannelLayout::GrayAlpha => Self::from_parts(ChannelLayout::Gray, self.depth(), false),
            ChannelLayout::Rgba | ChannelLayout::Bgra => {
                Self::from_parts(ChannelLayout::Rgb, self.depth(), false)
            }
            _ => self,
        }
    }

    /// The premultiplied-alpha variant. Types without alpha are unchanged.
    pub const fn premultiplied(self) -> Self {
        Self::from_parts(self.channel_layout(), self.depth(), true)
    }

    /// The straight-alpha variant.
    pub const fn unpremultiplied(self) -> Self {
        Self::from_parts(self.channel_layout(), self.depth(), false)
    }

    pub const fn to_8bit(self) -> Self {
        Self::from_parts(self.channel_layout(), Depth::U8, self.is_premultiplied())
    }

    pub const fn to_16bit(self) -> Self {
        Self::from_parts(self.channel_layout(), Depth::U16, self.is_premultiplied())
    }

    pub const fn to_float(self) -> Self {
        Self::from_parts(self.channel_layout(), Depth::F32, self.is_premultiplied())
    }

    /// Whether every value of this type is exactly representable as straight
    /// 8-bit RGBA.
    pub const fn fits_rgba8(self) -> bool {
        matches!(self.depth(), Depth::U8) && !self.is_premultiplied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(PixelType::Gray8.bytes_per_pixel(), 1);
        assert_eq!(PixelType::GrayAlpha16.bytes_per_pixel(), 4);
        assert_eq!(PixelType::Rgb8.bytes_per_pixel(), 3);
        assert_eq!(PixelType::Bgra8.bytes_per_pixel(), 4);
        assert_eq!(PixelType::Rgba16Premul.bytes_per_pixel(), 8);
        assert_eq!(PixelType::RgbF32.bytes_per_pixel(), 12);
        assert_eq!(PixelType::RgbaF32.bytes_per_pixel(), 16);
    }

    #[test]
    fn from_parts_inverts_accessors() {
        for ty in PixelType::ALL {
            let rebuilt =
                PixelType::from_parts(ty.channel_layout(), ty.depth(), ty.is_premultiplied());
            assert_eq!(rebuilt, ty);
        }
    }

    #[test]
    fn bgra_falls_back_to_rgba_outside_straight_8bit() {
        use ChannelLayout as L;
        assert_eq!(PixelType::from_parts(L::Bgra, Depth::U8, false), PixelType::Bgra8);
        assert_eq!(PixelType::from_parts(L::Bgra, Depth::U8, true), PixelType::Rgba8Premul);
        assert_eq!(PixelType::from_parts(L::Bgra, Depth::U16, false), PixelType::Rgba16);
        assert_eq!(PixelType::from_parts(L::Bgra, Depth::F32, true), PixelType::RgbaF32Premul);
    }

    #[test]
    fn premultiplied_only_with_alpha() {
        for ty in PixelType::ALL {
            if ty.is_premultiplied() {
                assert!(ty.has_alpha(), "{ty:?}");
            }
        }
        assert_eq!(PixelType::Rgb16.premultiplied(), PixelType::Rgb16);
        assert_eq!(PixelType::Bgra8.premultiplied(), PixelType::Rgba8Premul);
    }

    #[test]
    fn transforms_are_idempotent() {
        for ty in PixelType::ALL {
            assert_eq!(ty.greyscale().greyscale(), ty.greyscale());
            assert_eq!(ty.rgb().rgb(), ty.rgb());
            assert_eq!(ty.add_alpha().add_alpha(), ty.add_alpha());
            assert_eq!(ty.drop_alpha().drop_alpha(), ty.drop_alpha());
            assert_eq!(ty.to_16bit().to_16bit(), ty.to_16bit());
        }
    }

    #[test]
    fn alpha_round_trip_keeps_color_layout() {
        for ty in PixelType::ALL {
            let back = ty.add_alpha().drop_alpha();
            assert_eq!(back.depth(), ty.depth());
            assert_eq!(back.is_gray(), ty.is_gray());
            assert!(!back.has_alpha());
            if !ty.has_alpha() {
                assert_eq!(back, ty);
            }
        }
    }

    #[test]
    fn greyscale_of_rgba_keeps_depth_and_premultiplication() {
        assert_eq!(
            PixelType::Rgba16Premul.greyscale(),
            PixelType::GrayAlpha16Premul
        );
        assert_eq!(PixelType::RgbaF32.greyscale(), PixelType::GrayAlphaF32);
        assert_eq!(PixelType::Bgra8.greyscale(), PixelType::GrayAlpha8);
        assert_eq!(PixelType::Rgb8.greyscale(), PixelType::Gray8);
        assert_eq!(PixelType::Rgb8.rgb(), PixelType::Rgb8);
    }

    #[test]
    fn depth_changes() {
        assert_eq!(PixelType::Bgra8.to_8bit(), PixelType::Bgra8);
        assert_eq!(PixelType::Bgra8.to_16bit(), PixelType::Rgba16);
        assert_eq!(PixelType::GrayAlpha8Premul.to_float(), PixelType::GrayAlphaF32Premul);
        assert_eq!(PixelType::RgbF32.to_8bit(), PixelType::Rgb8);
    }
}
