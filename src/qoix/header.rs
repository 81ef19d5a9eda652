//! QOIX header: 28 bytes, multi-byte fields big-endian.
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 4    | magic `qoix`                           |
//! | 4      | 1    | channels (1 ..= 4)                     |
//! | 5      | 1    | bit depth (8 or 10)                    |
//! | 6      | 1    | compression (0 none, 1 LZ4)            |
//! | 7      | 1    | colorspace (0 sRGB, 1 linear)          |
//! | 8      | 4    | width                                  |
//! | 12     | 4    | height                                 |
//! | 16     | 4    | pitch of the decoded rows, in bytes    |
//! | 20     | 4    | pixel aspect ratio, f32 bits, 0 = unknown |
//! | 24     | 4    | vertical resolution, f32 bits, 0 = unknown |
//!
//! With LZ4 compression a 4-byte payload length follows the header, then
//! the compressed block.

use alloc::format;
use alloc::vec::Vec;

use crate::error::ImageError;
use crate::load::Colorspace;
use crate::pixel::PixelType;

pub const MAGIC: [u8; 4] = *b"qoix";
pub const HEADER_LEN: usize = 28;

/// Secondary compression applied to the sub-codec payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compression {
    None = 0,
    Lz4 = 1,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QoixHeader {
    pub channels: u8,
    /// 8 or 10.
    pub bit_depth: u8,
    pub compression: Compression,
    pub colorspace: Colorspace,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub pixel_aspect: Option<f32>,
    pub resolution: Option<f32>,
}

impl QoixHeader {
    pub fn parse(data: &[u8]) -> Result<Self, ImageError> {
        if data.len() < MAGIC.len() || data[..4] != MAGIC {
            return Err(ImageError::UnrecognizedFormat);
        }
        if data.len() < HEADER_LEN {
            return Err(ImageError::UnexpectedEof);
        }
        let u32_at = |o: usize| u32::from_be_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);
        let f32_at = |o: usize| Some(f32::from_bits(u32_at(o))).filter(|v| *v != 0.0);

        let channels = data[4];
        let bit_depth = data[5];
        if pixel_type_for(channels, bit_depth).is_none() {
            return Err(ImageError::InvalidHeader(format!(
                "{channels} channels at {bit_depth} bits"
            )));
        }
        let compression = match data[6] {
            0 => Compression::None,
            1 => Compression::Lz4,
            other => {
                return Err(ImageError::InvalidHeader(format!(
                    "unknown compression {other}"
                )));
            }
        };
        let colorspace = match data[7] {
            0 => Colorspace::Srgb,
            1 => Colorspace::Linear,
            other => {
                return Err(ImageError::InvalidHeader(format!(
                    "unknown colorspace {other}"
                )));
            }
        };
        Ok(Self {
            channels,
            bit_depth,
            compression,
            colorspace,
            width: u32_at(8),
            height: u32_at(12),
            pitch: u32_at(16),
            pixel_aspect: f32_at(20),
            resolution: f32_at(24),
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.push(self.channels);
        out.push(self.bit_depth);
        out.push(self.compression as u8);
        out.push(match self.colorspace {
            Colorspace::Srgb => 0,
            Colorspace::Linear => 1,
        });
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.pitch.to_be_bytes());
        out.extend_from_slice(&self.pixel_aspect.unwrap_or(0.0).to_bits().to_be_bytes());
        out.extend_from_slice(&self.resolution.unwrap_or(0.0).to_bits().to_be_bytes());
    }

    /// The decoded pixel type.
    pub fn pixel_type(&self) -> Option<PixelType> {
        pixel_type_for(self.channels, self.bit_depth)
    }
}

/// Pixel type stored for (`channels`, `bit_depth`). 10-bit streams decode
/// to 16-bit types.
pub const fn pixel_type_for(channels: u8, bit_depth: u8) -> Option<PixelType> {
    Some(match (channels, bit_depth) {
        (1, 8) => PixelType::Gray8,
        (2, 8) => PixelType::GrayAlpha8,
        (3, 8) => PixelType::Rgb8,
        (4, 8) => PixelType::Rgba8,
        (1, 10) => PixelType::Gray16,
        (2, 10) => PixelType::GrayAlpha16,
        (3, 10) => PixelType::Rgb16,
        (4, 10) => PixelType::Rgba16,
        _ => return None,
    })
}

/// The closest type the container stores, and its (channels, bit depth).
///
/// Premultiplied becomes straight, BGRA becomes RGBA, float becomes 16-bit.
pub const fn storage_for(pixel_type: PixelType) -> (PixelType, u8, u8) {
    let mut t = pixel_type.unpremultiplied();
    if t.depth().is_float() {
        t = t.to_16bit();
    }
    if matches!(t, PixelType::Bgra8) {
        t = PixelType::Rgba8;
    }
    let bit_depth = if t.depth().bytes() == 1 { 8 } else { 10 };
    (t, t.channels() as u8, bit_depth)
}
