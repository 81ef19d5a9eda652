use alloc::string::String;

use crate::pixel::PixelType;

/// Errors from image buffer operations and codecs.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ImageError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid layout constraints: {0}")]
    InvalidLayout(String),

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("out of memory: could not allocate {bytes} bytes")]
    OutOfMemory { bytes: usize },

    #[error("cannot cast {from:?} to {to:?}: {row_bytes} row bytes are not a multiple of the target pixel size")]
    UnsupportedCast {
        from: PixelType,
        to: PixelType,
        row_bytes: usize,
    },

    #[error("pixel type mismatch: expected {expected:?}, got {actual:?}")]
    PixelTypeMismatch {
        expected: PixelType,
        actual: PixelType,
    },

    #[error("unsupported format variant: {0}")]
    UnsupportedFormat(String),

    #[error("operation requires an image that owns its pixels")]
    NotOwned,

    #[error("unrecognized format magic bytes")]
    UnrecognizedFormat,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("decoding failed: {0}")]
    DecodeFailed(String),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(std::io::ErrorKind),
}

/// Coarse error taxonomy shared by every operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bad dimensions or flags, detected before any allocation.
    InvalidArgument,
    /// An allocation attempt failed.
    OutOfMemory,
    /// The requested conversion, cast or format is not supported.
    Unsupported,
    /// Malformed or truncated input, or an I/O failure while reading it.
    DecodeFailure,
}

impl ImageError {
    /// Which class of failure this is.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidArgument(_)
            | Self::InvalidLayout(_)
            | Self::DimensionsTooLarge { .. }
            | Self::LimitExceeded(_) => ErrorClass::InvalidArgument,
            Self::OutOfMemory { .. } => ErrorClass::OutOfMemory,
            Self::UnsupportedCast { .. }
            | Self::PixelTypeMismatch { .. }
            | Self::UnsupportedFormat(_)
            | Self::NotOwned => {
                ErrorClass::Unsupported
            }
            Self::UnrecognizedFormat
            | Self::InvalidHeader(_)
            | Self::DecodeFailed(_)
            | Self::UnexpectedEof
            | Self::BufferTooSmall { .. } => ErrorClass::DecodeFailure,
            #[cfg(feature = "std")]
            Self::Io(_) => ErrorClass::DecodeFailure,
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for ImageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ImageError::UnexpectedEof
        } else {
            ImageError::Io(e.kind())
        }
    }
}
