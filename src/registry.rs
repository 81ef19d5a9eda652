//! The format table: which codecs exist, how to recognise their streams, and
//! where their decode and encode functions live.
//!
//! A [`FormatRegistry`] is a plain value. [`FormatRegistry::builtin`] is a
//! `'static` table of every format compiled in; load and save take a registry
//! reference explicitly, so callers can also pass a narrower table of their
//! own.

use alloc::vec::Vec;

use crate::error::ImageError;
use crate::image::Image;
use crate::limits::Limits;
use crate::load::{DecodeOutput, SaveOptions};

/// Container formats known to this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ImageFormat {
    /// QOIX container.
    Qoix,
    /// Plain QOI.
    Qoi,
    /// Farbfeld (RGBA, 16 bits per channel, big-endian).
    Farbfeld,
}

impl ImageFormat {
    pub const COUNT: usize = 3;

    pub const ALL: [ImageFormat; Self::COUNT] = [Self::Qoix, Self::Qoi, Self::Farbfeld];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Decode a complete stream.
pub type DecodeFn = fn(&[u8], Option<&Limits>) -> Result<DecodeOutput, ImageError>;
/// Encode an image into a complete stream.
pub type EncodeFn = fn(&Image<'_>, &SaveOptions) -> Result<Vec<u8>, ImageError>;
/// Check a stream prefix of at least [`SIGNATURE_LEN`] bytes (or the whole
/// stream, if shorter).
pub type DetectFn = fn(&[u8]) -> bool;

/// Bytes read from a stream to recognise its format.
pub const SIGNATURE_LEN: usize = 8;

/// One registered format.
#[derive(Clone, Copy)]
pub struct FormatCodec {
    pub format: ImageFormat,
    pub name: &'static str,
    /// Lower-case file extensions, without the dot.
    pub extensions: &'static [&'static str],
    /// Leading magic bytes, at most [`SIGNATURE_LEN`] long.
    pub signature: &'static [u8],
    pub detect: DetectFn,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

impl core::fmt::Debug for FormatCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FormatCodec")
            .field("format", &self.format)
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Immutable format table indexed by [`ImageFormat`].
#[derive(Clone, Debug)]
pub struct FormatRegistry {
    codecs: [Option<FormatCodec>; ImageFormat::COUNT],
}

static BUILTIN: FormatRegistry = builtin_table();

#[allow(unused_mut)]
const fn builtin_table() -> FormatRegistry {
    let mut registry = FormatRegistry::empty();
    #[cfg(feature = "qoix")]
    {
        registry = registry.with(crate::qoix::CODEC);
    }
    #[cfg(feature = "qoi")]
    {
        registry = registry.with(crate::qoi::CODEC);
    }
    #[cfg(feature = "farbfeld")]
    {
        registry = registry.with(crate::farbfeld::CODEC);
    }
    registry
}

impl FormatRegistry {
    /// A table with no formats.
    pub const fn empty() -> Self {
        Self {
            codecs: [None; ImageFormat::COUNT],
        }
    }

    /// This table plus `codec`, replacing any codec for the same format.
    pub const fn with(mut self, codec: FormatCodec) -> Self {
        self.codecs[codec.format.index()] = Some(codec);
        self
    }

    /// Every format enabled at compile time.
    pub fn builtin() -> &'static FormatRegistry {
        &BUILTIN
    }

    pub fn get(&self, format: ImageFormat) -> Option<&FormatCodec> {
        self.codecs[format.index()].as_ref()
    }

    /// The codec for `format`, or [`ImageError::UnsupportedFormat`].
    pub fn codec(&self, format: ImageFormat) -> Result<&FormatCodec, ImageError> {
        self.get(format).ok_or_else(|| {
            ImageError::UnsupportedFormat(alloc::format!("{format:?} is not registered"))
        })
    }

    pub fn codecs(&self) -> impl Iterator<Item = &FormatCodec> {
        self.codecs.iter().flatten()
    }

    /// Recognise a format from the leading bytes of a stream.
    pub fn detect(&self, head: &[u8]) -> Option<ImageFormat> {
        let found = self
            .codecs()
            .find(|codec| (codec.detect)(head))
            .map(|codec| codec.format);
        tracing::debug!(?found, "format detection");
        found
    }

    /// Recognise a format from a seekable stream, restoring its position.
    #[cfg(feature = "std")]
    pub fn detect_stream<R: std::io::Read + std::io::Seek>(
        &self,
        reader: &mut R,
    ) -> Result<Option<ImageFormat>, ImageError> {
        let mut head = [0u8; SIGNATURE_LEN];
        let n = peek(reader, &mut head)?;
        Ok(self.detect(&head[..n]))
    }

    /// Look up a format by file extension (case-insensitive, leading dot
    /// optional).
    pub fn from_extension(&self, ext: &str) -> Option<ImageFormat> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        self.codecs()
            .find(|codec| {
                codec
                    .extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .map(|codec| codec.format)
    }
}

/// Read up to `buf.len()` bytes and seek back to where the stream was,
/// whether or not the read succeeded.
#[cfg(feature = "std")]
pub(crate) fn peek<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<usize, ImageError> {
    let start = reader.stream_position()?;
    let filled = read_up_to(reader, buf);
    reader.seek(std::io::SeekFrom::Start(start))?;
    Ok(filled?)
}

#[cfg(feature = "std")]
fn read_up_to<R: std::io::Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_knows_nothing() {
        let r = FormatRegistry::empty();
        assert!(r.codecs().next().is_none());
        assert_eq!(r.detect(b"qoix\0\0\0\0"), None);
        assert!(matches!(
            r.codec(ImageFormat::Qoix),
            Err(ImageError::UnsupportedFormat(_))
        ));
    }

    #[cfg(feature = "qoix")]
    #[test]
    fn builtin_has_qoix() {
        let r = FormatRegistry::builtin();
        assert_eq!(r.from_extension(".QOIX"), Some(ImageFormat::Qoix));
        assert_eq!(r.detect(b"qoix\x04\x08"), Some(ImageFormat::Qoix));
        assert_eq!(r.detect(b"png"), None);
    }

    #[cfg(feature = "std")]
    #[test]
    fn peek_restores_position() {
        use std::io::{Cursor, Seek, SeekFrom};
        let mut c = Cursor::new(b"abcdefghijkl".to_vec());
        c.seek(SeekFrom::Start(3)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(peek(&mut c, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"defg");
        assert_eq!(c.stream_position().unwrap(), 3);

        c.seek(SeekFrom::Start(10)).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(peek(&mut c, &mut buf).unwrap(), 2);
        assert_eq!(c.stream_position().unwrap(), 10);
    }
}
