//! Farbfeld: 8-byte magic `farbfeld`, width and height as big-endian u32,
//! then RGBA pixels with 16-bit big-endian samples.
//!
//! Implementation draws from [zune-farbfeld](https://github.com/etemesi254/zune-image)
//! by Caleb Etemesi (MIT/Apache-2.0/Zlib licensed).

mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

use crate::registry::{FormatCodec, ImageFormat};

pub const MAGIC: [u8; 8] = *b"farbfeld";
const HEADER_LEN: usize = 16;

pub(crate) const CODEC: FormatCodec = FormatCodec {
    format: ImageFormat::Farbfeld,
    name: "farbfeld",
    extensions: &["ff", "farbfeld"],
    signature: &MAGIC,
    detect,
    decode,
    encode,
};

pub fn detect(head: &[u8]) -> bool {
    head.starts_with(&MAGIC)
}
