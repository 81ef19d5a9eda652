use alloc::vec::Vec;

use super::MAGIC;
use crate::error::ImageError;
use crate::image::Image;
use crate::layout::Layout;
use crate::load::SaveOptions;
use crate::pixel::PixelType;

/// Encode any image, converting a private copy to `Rgba16` when needed.
pub fn encode(image: &Image<'_>, _options: &SaveOptions) -> Result<Vec<u8>, ImageError> {
    let converted;
    let source = if image.pixel_type() == PixelType::Rgba16 {
        image
    } else {
        converted = image.to_converted(PixelType::Rgba16, Layout::GAPLESS)?;
        &converted
    };
    let (width, height) = (source.width(), source.height());
    let total = source
        .row_bytes()
        .checked_mul(height as usize)
        .and_then(|n| n.checked_add(MAGIC.len() + 8))
        .ok_or(ImageError::DimensionsTooLarge { width, height })?;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    for row in source.rows() {
        for pair in row.chunks_exact(2) {
            let v = u16::from_ne_bytes([pair[0], pair[1]]);
            out.extend_from_slice(&v.to_be_bytes());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb8_expands_with_opaque_alpha() {
        let mut img = Image::new(1, 1, PixelType::Rgb8, Layout::NONE).unwrap();
        img.scanline_mut(0).unwrap().copy_from_slice(&[1, 2, 255]);
        let out = encode(&img, &SaveOptions::default()).unwrap();
        assert_eq!(&out[..8], b"farbfeld");
        assert_eq!(
            &out[16..],
            &[0x01, 0x01, 0x02, 0x02, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }
}
