use alloc::vec::Vec;

use super::{HEADER_LEN, MAGIC};
use crate::error::ImageError;
use crate::limits::{self, Limits};
use crate::load::DecodeOutput;
use crate::pixel::PixelType;

fn parse_header(data: &[u8]) -> Result<(u32, u32), ImageError> {
    if !data.starts_with(&MAGIC) {
        return Err(ImageError::UnrecognizedFormat);
    }
    let header = data.get(..HEADER_LEN).ok_or(ImageError::UnexpectedEof)?;
    let width = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
    let height = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidHeader(alloc::format!(
            "farbfeld dimensions {width}x{height}"
        )));
    }
    Ok((width, height))
}

/// Decode to `Rgba16` with native-endian samples.
pub fn decode(data: &[u8], limits: Option<&Limits>) -> Result<DecodeOutput, ImageError> {
    let (width, height) = parse_header(data)?;
    limits::check_dimensions(width, height, PixelType::Rgba16.bytes_per_pixel())?;
    let out_bytes = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(PixelType::Rgba16.bytes_per_pixel()))
        .ok_or(ImageError::DimensionsTooLarge { width, height })?;
    if let Some(limits) = limits {
        limits.check(width, height)?;
        limits.check_memory(out_bytes)?;
    }
    let samples = data
        .get(HEADER_LEN..HEADER_LEN + out_bytes)
        .ok_or(ImageError::UnexpectedEof)?;

    let mut pixels = Vec::with_capacity(out_bytes);
    for pair in samples.chunks_exact(2) {
        let v = u16::from_be_bytes([pair[0], pair[1]]);
        pixels.extend_from_slice(&v.to_ne_bytes());
    }
    Ok(DecodeOutput::packed(pixels, width, height, PixelType::Rgba16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_pixels() {
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&[0u8; 15]);
        assert_eq!(decode(&data, None).unwrap_err(), ImageError::UnexpectedEof);
        data.push(0);
        assert_eq!(decode(&data, None).unwrap().pixels().len(), 16);
    }

    #[test]
    fn zero_dimensions_rejected() {
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 8]);
        assert!(matches!(decode(&data, None), Err(ImageError::InvalidHeader(_))));
    }
}
