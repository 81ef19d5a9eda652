//! Colour sub-codec for 8-bit RGB and RGBA: a QOI stream via `rapid-qoi`.

use alloc::format;
use alloc::vec::Vec;

use rapid_qoi::{Colors, Qoi};

use crate::error::ImageError;
use crate::load::Colorspace;

pub(crate) fn colors_for(channels: usize, colorspace: Colorspace) -> Option<Colors> {
    Some(match (channels, colorspace) {
        (3, Colorspace::Srgb) => Colors::Srgb,
        (4, Colorspace::Srgb) => Colors::SrgbLinA,
        (3, Colorspace::Linear) => Colors::Rgb,
        (4, Colorspace::Linear) => Colors::Rgba,
        _ => return None,
    })
}

pub(crate) fn colors_channels(colors: Colors) -> usize {
    if colors.has_alpha() { 4 } else { 3 }
}

pub(crate) fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    colorspace: Colorspace,
) -> Result<Vec<u8>, ImageError> {
    let colors = colors_for(channels, colorspace).ok_or_else(|| {
        ImageError::InvalidArgument(format!("QOI cannot store {channels} channels"))
    })?;
    Qoi {
        width,
        height,
        colors,
    }
    .encode_alloc(pixels)
    .map_err(|e| ImageError::InvalidArgument(format!("QOI encode failed: {e:?}")))
}

/// Decode a QOI stream that must describe `width` × `height` × `channels`.
pub(crate) fn decode(
    data: &[u8],
    width: u32,
    height: u32,
    channels: usize,
) -> Result<Vec<u8>, ImageError> {
    let qoi =
        Qoi::decode_header(data).map_err(|e| ImageError::DecodeFailed(format!("QOI: {e:?}")))?;
    if qoi.width != width || qoi.height != height || colors_channels(qoi.colors) != channels {
        return Err(ImageError::DecodeFailed(format!(
            "QOI stream is {}x{}x{}, container says {width}x{height}x{channels}",
            qoi.width,
            qoi.height,
            colors_channels(qoi.colors)
        )));
    }
    let (_, pixels) =
        Qoi::decode_alloc(data).map_err(|e| ImageError::DecodeFailed(format!("QOI: {e:?}")))?;
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_round_trip() {
        let pixels: Vec<u8> = (0..8 * 8 * 3).map(|i| (i * 5) as u8).collect();
        let encoded = encode(&pixels, 8, 8, 3, Colorspace::Srgb).unwrap();
        assert_eq!(decode(&encoded, 8, 8, 3).unwrap(), pixels);
    }

    #[test]
    fn mismatched_geometry_fails() {
        let pixels = alloc::vec![9u8; 4 * 4 * 4];
        let encoded = encode(&pixels, 4, 4, 4, Colorspace::Linear).unwrap();
        assert!(decode(&encoded, 4, 4, 3).is_err());
        assert!(decode(&encoded, 2, 8, 4).is_err());
        assert!(encode(&pixels, 4, 4, 2, Colorspace::Srgb).is_err());
    }
}
