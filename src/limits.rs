use crate::error::ImageError;

/// Largest width or height any image may have, in pixels.
pub const MAX_DIMENSION: u32 = 1 << 24;

/// Largest allocation, in bytes, any single image may occupy.
pub const MAX_IMAGE_BYTES: u64 = (isize::MAX as u64) / 2;

/// Caller-supplied caps applied while decoding.
///
/// All fields default to `None`; the fixed maxima above apply regardless.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum bytes for any buffer the decoder allocates.
    pub max_memory_bytes: Option<u64>,
}

fn within(what: &str, value: u64, limit: Option<u64>) -> Result<(), ImageError> {
    match limit {
        Some(max) if value > max => Err(ImageError::LimitExceeded(alloc::format!(
            "{what} {value} exceeds limit {max}"
        ))),
        _ => Ok(()),
    }
}

impl Limits {
    pub fn with_max_pixels(mut self, max: u64) -> Self {
        self.max_pixels = Some(max);
        self
    }

    pub fn with_max_memory_bytes(mut self, max: u64) -> Self {
        self.max_memory_bytes = Some(max);
        self
    }

    /// Dimensions from a parsed header.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), ImageError> {
        within("width", u64::from(width), self.max_width)?;
        within("height", u64::from(height), self.max_height)?;
        within(
            "pixel count",
            u64::from(width) * u64::from(height),
            self.max_pixels,
        )
    }

    /// Size of a buffer about to be allocated.
    pub(crate) fn check_memory(&self, bytes: usize) -> Result<(), ImageError> {
        within("allocation", bytes as u64, self.max_memory_bytes)
    }
}

/// Validate dimensions against the fixed maxima. Zero-sized images are always
/// accepted.
pub(crate) fn check_dimensions(
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Ok(());
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ImageError::DimensionsTooLarge { width, height });
    }
    let bytes = u64::from(width) * u64::from(height) * bytes_per_pixel as u64;
    if bytes > MAX_IMAGE_BYTES {
        return Err(ImageError::DimensionsTooLarge { width, height });
    }
    Ok(())
}
