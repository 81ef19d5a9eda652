//! # zenraster
//!
//! An image buffer with a closed catalog of 19 flat pixel types,
//! layout-constrained allocation, and the QOIX container codec.
//!
//! ## Pixel types
//!
//! [`PixelType`] covers grey, grey+alpha, RGB and RGBA at 8 bits, 16 bits
//! and 32-bit float, premultiplied variants of the alpha-bearing ones, and
//! 8-bit BGRA. Conversion between any two types goes through at most two
//! scanline passes via 8-bit RGBA or float RGBA (see [`scanline`]).
//!
//! ## Layout constraints
//!
//! A [`Layout`] declares what may be read around the pixels: block
//! multiplicity, trailing pixels, scanline alignment, a border on all four
//! sides, storage orientation, or none of that ("gapless"). [`Image::convert`]
//! reallocates only when the current storage does not already satisfy the
//! requested layout.
//!
//! ## Formats (feature-gated)
//!
//! - **QOIX** (`qoix`, default): plane / QOI / 10-bit sub-codecs with an
//!   LZ4 pass kept only when it shrinks the output
//! - **QOI** (`qoi`): plain QOI via `rapid-qoi`
//! - **Farbfeld** (`farbfeld`): RGBA 16-bit
//!
//! Formats are dispatched through an explicit [`FormatRegistry`];
//! [`FormatRegistry::builtin`] holds every format compiled in.
//!
//! ## Usage
//!
//! ```
//! use zenraster::{FormatRegistry, Image, ImageFormat, Layout, LoadRequest, PixelType};
//! use zenraster::layout::Alignment;
//!
//! let mut image = Image::new(16, 16, PixelType::Rgb8, Layout::NONE)?;
//! for y in 0..16 {
//!     image.scanline_mut(y).unwrap().fill(200);
//! }
//! image.convert(PixelType::Rgba8, Layout::new().with_alignment(Alignment::B64))?;
//! assert_eq!(image.first_pixel_addr() % 64, 0);
//!
//! # #[cfg(feature = "qoix")]
//! # {
//! let registry = FormatRegistry::builtin();
//! let bytes = image.save(registry, ImageFormat::Qoix, &Default::default())?;
//! let back = LoadRequest::new(registry, &bytes).decode()?;
//! assert_eq!(back.to_packed()?, image.to_packed()?);
//! # }
//! # Ok::<(), zenraster::ImageError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod error;
mod image;
mod limits;
mod load;
mod pixel;
mod registry;
mod storage;

pub mod layout;
pub mod scanline;

#[cfg(feature = "qoix")]
pub mod qoix;

#[cfg(feature = "qoi")]
pub mod qoi;

#[cfg(feature = "farbfeld")]
pub mod farbfeld;

#[cfg(feature = "rgb")]
mod typed;

// Re-exports
pub use error::{ErrorClass, ImageError};
pub use image::Image;
pub use layout::Layout;
pub use limits::{Limits, MAX_DIMENSION, MAX_IMAGE_BYTES};
pub use load::{
    Colorspace, CompressionPolicy, DecodeOutput, LoadFlags, LoadRequest, SaveOptions,
};
pub use pixel::{ChannelLayout, Depth, PixelType};
pub use registry::{
    DecodeFn, DetectFn, EncodeFn, FormatCodec, FormatRegistry, ImageFormat, SIGNATURE_LEN,
};

#[cfg(feature = "rgb")]
pub use typed::TypedPixel;
