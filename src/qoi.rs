//! Plain QOI (`qoif`) streams via `rapid-qoi`.

use alloc::format;
use alloc::vec::Vec;

use rapid_qoi::{Colors, Qoi};

use crate::error::ImageError;
use crate::image::Image;
use crate::layout::Layout;
use crate::limits::{self, Limits};
use crate::load::{Colorspace, DecodeOutput, SaveOptions};
use crate::pixel::PixelType;
use crate::registry::{FormatCodec, ImageFormat};

pub const MAGIC: [u8; 4] = *b"qoif";

pub(crate) const CODEC: FormatCodec = FormatCodec {
    format: ImageFormat::Qoi,
    name: "QOI",
    extensions: &["qoi"],
    signature: &MAGIC,
    detect,
    decode,
    encode,
};

pub fn detect(head: &[u8]) -> bool {
    head.starts_with(&MAGIC)
}

/// Decode to `Rgb8` or `Rgba8`.
pub fn decode(data: &[u8], limits: Option<&Limits>) -> Result<DecodeOutput, ImageError> {
    if !detect(data) {
        return Err(ImageError::UnrecognizedFormat);
    }
    let header = Qoi::decode_header(data)
        .map_err(|e| ImageError::InvalidHeader(format!("QOI: {e:?}")))?;
    let pixel_type = if header.colors.has_alpha() {
        PixelType::Rgba8
    } else {
        PixelType::Rgb8
    };
    limits::check_dimensions(header.width, header.height, pixel_type.bytes_per_pixel())?;
    if let Some(limits) = limits {
        limits.check(header.width, header.height)?;
        limits.check_memory(
            header.width as usize * header.height as usize * pixel_type.bytes_per_pixel(),
        )?;
    }
    let (qoi, pixels) =
        Qoi::decode_alloc(data).map_err(|e| ImageError::DecodeFailed(format!("QOI: {e:?}")))?;
    Ok(DecodeOutput::packed(pixels, qoi.width, qoi.height, pixel_type))
}

/// Encode as RGB, or RGBA when the image has alpha.
pub fn encode(image: &Image<'_>, options: &SaveOptions) -> Result<Vec<u8>, ImageError> {
    let target = if image.pixel_type().has_alpha() {
        PixelType::Rgba8
    } else {
        PixelType::Rgb8
    };
    let colors = match (target, options.colorspace) {
        (PixelType::Rgb8, Colorspace::Srgb) => Colors::Srgb,
        (PixelType::Rgb8, Colorspace::Linear) => Colors::Rgb,
        (_, Colorspace::Srgb) => Colors::SrgbLinA,
        (_, Colorspace::Linear) => Colors::Rgba,
    };
    let pixels = if image.pixel_type() == target {
        image.to_packed()?
    } else {
        image.to_converted(target, Layout::GAPLESS)?.to_packed()?
    };
    Qoi {
        width: image.width(),
        height: image.height(),
        colors,
    }
    .encode_alloc(&pixels)
    .map_err(|e| ImageError::InvalidArgument(format!("QOI encode failed: {e:?}")))
}
