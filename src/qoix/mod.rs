//! QOIX container: a fixed header, then the payload of one of three
//! sub-codecs, optionally wrapped in an LZ4 block.
//!
//! The sub-codec is a function of bit depth and channel count alone:
//!
//! - 10-bit (stored from 16-bit images): [`SubCodec::TenBit`], any channel count;
//! - 8-bit, 1–2 channels: [`SubCodec::Plane`];
//! - 8-bit, 3–4 channels: [`SubCodec::Color`] (a QOI stream).
//!
//! After encoding, the payload is LZ4-compressed. The compressed form is
//! kept only if it plus its 4-byte length prefix is smaller than the raw
//! payload; otherwise the raw payload is written and the header says
//! "none".

mod color;
mod header;
mod plane;
mod tenbit;

use alloc::borrow::Cow;
use alloc::format;
use alloc::vec::Vec;

pub use header::{Compression, HEADER_LEN, MAGIC, QoixHeader, pixel_type_for};

use crate::error::ImageError;
use crate::image::Image;
use crate::layout::Layout;
use crate::limits::{self, Limits};
use crate::load::{Colorspace, CompressionPolicy, DecodeOutput, SaveOptions};
use crate::registry::{FormatCodec, ImageFormat};
use crate::storage::try_zeroed;

pub(crate) const CODEC: FormatCodec = FormatCodec {
    format: ImageFormat::Qoix,
    name: "QOIX",
    extensions: &["qoix"],
    signature: &MAGIC,
    detect,
    decode: decode_format,
    encode: encode_image,
};

/// Payload coder chosen by bit depth and channel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubCodec {
    Plane,
    Color,
    TenBit,
}

impl SubCodec {
    pub const fn for_depth(bit_depth: u8, channels: u8) -> Option<Self> {
        match (bit_depth, channels) {
            (10, 1..=4) => Some(Self::TenBit),
            (8, 1 | 2) => Some(Self::Plane),
            (8, 3 | 4) => Some(Self::Color),
            _ => None,
        }
    }

    fn encode(
        self,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: usize,
        colorspace: Colorspace,
    ) -> Result<Vec<u8>, ImageError> {
        let (w, h) = (width as usize, height as usize);
        Ok(match self {
            Self::Plane => plane::encode(pixels, w, h, channels),
            Self::Color => color::encode(pixels, width, height, channels, colorspace)?,
            Self::TenBit => tenbit::encode(pixels, w * h, channels),
        })
    }

    /// Whether `payload_len` bytes could describe `pixels` pixels at all.
    ///
    /// No op of any sub-codec expands to more than 64 units: plane samples
    /// for [`SubCodec::Plane`], pixels otherwise.
    const fn can_cover(self, payload_len: usize, pixels: usize, channels: usize) -> bool {
        let units = match self {
            Self::Plane => pixels.saturating_mul(channels),
            Self::Color | Self::TenBit => pixels,
        };
        units <= payload_len.saturating_mul(64)
    }

    fn decode(
        self,
        payload: &[u8],
        width: u32,
        height: u32,
        channels: usize,
    ) -> Result<Vec<u8>, ImageError> {
        let (w, h) = (width as usize, height as usize);
        if !self.can_cover(payload.len(), w * h, channels) {
            return Err(ImageError::DecodeFailed(format!(
                "{}-byte payload cannot hold {width}x{height} pixels",
                payload.len()
            )));
        }
        match self {
            Self::Plane => plane::decode(payload, w, h, channels),
            Self::Color => color::decode(payload, width, height, channels),
            Self::TenBit => tenbit::decode(payload, w * h, channels),
        }
    }
}

/// Raw pixels to encode.
///
/// 8-bit samples are bytes; 10-bit streams take native-endian 16-bit
/// samples and keep their top 10 bits.
#[derive(Clone, Copy, Debug)]
pub struct EncodeInput<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes between row starts.
    pub pitch: usize,
    /// 1 ..= 4.
    pub channels: u8,
    /// 8 or 10.
    pub bit_depth: u8,
    pub colorspace: Colorspace,
    pub pixel_aspect: Option<f32>,
    pub resolution: Option<f32>,
}

/// Whether `head` starts with the QOIX magic.
pub fn detect(head: &[u8]) -> bool {
    head.starts_with(&MAGIC)
}

/// [`detect`] on a seekable stream; the stream position is restored.
#[cfg(feature = "std")]
pub fn detect_stream<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<bool, ImageError> {
    let mut head = [0u8; MAGIC.len()];
    let n = crate::registry::peek(reader, &mut head)?;
    Ok(detect(&head[..n]))
}

/// Encode raw pixels as a QOIX stream.
pub fn encode(input: &EncodeInput<'_>, compression: CompressionPolicy) -> Result<Vec<u8>, ImageError> {
    let codec = SubCodec::for_depth(input.bit_depth, input.channels).ok_or_else(|| {
        ImageError::InvalidArgument(format!(
            "QOIX cannot store {} channels at {} bits",
            input.channels, input.bit_depth
        ))
    })?;
    let sample_bytes = if input.bit_depth == 8 { 1 } else { 2 };
    let bpp = usize::from(input.channels) * sample_bytes;
    limits::check_dimensions(input.width, input.height, bpp)?;
    let row_bytes = input.width as usize * bpp;
    let pixels = packed_rows(input.pixels, row_bytes, input.height as usize, input.pitch)?;
    let pitch = u32::try_from(row_bytes).map_err(|_| ImageError::DimensionsTooLarge {
        width: input.width,
        height: input.height,
    })?;

    let payload = codec.encode(
        &pixels,
        input.width,
        input.height,
        usize::from(input.channels),
        input.colorspace,
    )?;
    let compressed = match compression {
        CompressionPolicy::Auto => compress_if_smaller(&payload),
        CompressionPolicy::Never => None,
    };
    tracing::debug!(
        ?codec,
        payload = payload.len(),
        compressed = compressed.as_ref().map(Vec::len),
        "qoix encode"
    );

    let header = QoixHeader {
        channels: input.channels,
        bit_depth: input.bit_depth,
        compression: if compressed.is_some() {
            Compression::Lz4
        } else {
            Compression::None
        },
        colorspace: input.colorspace,
        width: input.width,
        height: input.height,
        pitch,
        pixel_aspect: input.pixel_aspect,
        resolution: input.resolution,
    };
    let body_len = compressed.as_ref().map_or(payload.len(), |c| c.len());
    let mut out = Vec::with_capacity(HEADER_LEN + body_len);
    header.write(&mut out);
    out.extend_from_slice(compressed.as_deref().unwrap_or(&payload));
    Ok(out)
}

/// Length-prefixed LZ4 block, if it beats `payload`.
fn compress_if_smaller(payload: &[u8]) -> Option<Vec<u8>> {
    let original_len = u32::try_from(payload.len()).ok()?;
    let block = lz4_flex::block::compress(payload);
    if block.len() + 4 >= payload.len() {
        return None;
    }
    let mut out = Vec::with_capacity(block.len() + 4);
    out.extend_from_slice(&original_len.to_be_bytes());
    out.extend_from_slice(&block);
    Some(out)
}

/// `height` rows of `row_bytes`, copied only when `pitch` leaves gaps.
fn packed_rows(
    pixels: &[u8],
    row_bytes: usize,
    height: usize,
    pitch: usize,
) -> Result<Cow<'_, [u8]>, ImageError> {
    if pitch < row_bytes {
        return Err(ImageError::InvalidArgument(format!(
            "pitch {pitch} is smaller than the row size {row_bytes}"
        )));
    }
    let needed = if height == 0 {
        0
    } else {
        (height - 1) * pitch + row_bytes
    };
    if pixels.len() < needed {
        return Err(ImageError::BufferTooSmall {
            needed,
            actual: pixels.len(),
        });
    }
    if pitch == row_bytes || height <= 1 {
        return Ok(Cow::Borrowed(&pixels[..needed]));
    }
    let mut out = Vec::with_capacity(row_bytes * height);
    for row in pixels.chunks(pitch).take(height) {
        out.extend_from_slice(&row[..row_bytes]);
    }
    Ok(Cow::Owned(out))
}

/// Decode a QOIX stream.
pub fn decode(data: &[u8], limits: Option<&Limits>) -> Result<DecodeOutput, ImageError> {
    let header = QoixHeader::parse(data)?;
    let pixel_type = header
        .pixel_type()
        .ok_or_else(|| ImageError::InvalidHeader("channel count or depth".into()))?;
    let (width, height) = (header.width, header.height);
    limits::check_dimensions(width, height, pixel_type.bytes_per_pixel())?;
    if let Some(limits) = limits {
        limits.check(width, height)?;
    }
    let row_bytes = width as usize * pixel_type.bytes_per_pixel();
    let pitch = header.pitch as usize;
    if pitch < row_bytes {
        return Err(ImageError::InvalidHeader(format!(
            "pitch {pitch} is smaller than the row size {row_bytes}"
        )));
    }
    let out_bytes = spread_len(row_bytes, height as usize, pitch)
        .filter(|&n| n as u64 <= limits::MAX_IMAGE_BYTES)
        .ok_or_else(|| ImageError::InvalidHeader(format!("pitch {pitch} spans too many bytes")))?;
    if let Some(limits) = limits {
        limits.check_memory(out_bytes)?;
    }

    let body = &data[HEADER_LEN..];
    let payload: Cow<'_, [u8]> = match header.compression {
        Compression::None => Cow::Borrowed(body),
        Compression::Lz4 => Cow::Owned(decompress(body, limits)?),
    };
    let codec = SubCodec::for_depth(header.bit_depth, header.channels)
        .ok_or_else(|| ImageError::InvalidHeader("no sub-codec for header".into()))?;
    tracing::debug!(?codec, ?header.compression, width, height, "qoix decode");
    let packed = codec.decode(&payload, width, height, usize::from(header.channels))?;
    let pixels = spread_rows(packed, row_bytes, height as usize, pitch, out_bytes)?;

    Ok(DecodeOutput::packed(pixels, width, height, pixel_type)
        .with_pitch(pitch)
        .with_metadata(header.pixel_aspect, header.resolution))
}

fn decompress(body: &[u8], limits: Option<&Limits>) -> Result<Vec<u8>, ImageError> {
    let prefix = body.get(..4).ok_or(ImageError::UnexpectedEof)?;
    let original_len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    let block = &body[4..];
    // An LZ4 block cannot expand by more than 255x.
    if original_len > block.len().saturating_mul(255) + 16 {
        return Err(ImageError::DecodeFailed(format!(
            "LZ4 length {original_len} impossible for a {}-byte block",
            block.len()
        )));
    }
    if let Some(limits) = limits {
        limits.check_memory(original_len)?;
    }
    let out = lz4_flex::block::decompress(block, original_len)
        .map_err(|e| ImageError::DecodeFailed(format!("LZ4: {e}")))?;
    if out.len() != original_len {
        return Err(ImageError::DecodeFailed(format!(
            "LZ4 produced {} bytes, expected {original_len}",
            out.len()
        )));
    }
    Ok(out)
}

/// Bytes spanned by `height` rows of `row_bytes` spaced `pitch` apart.
fn spread_len(row_bytes: usize, height: usize, pitch: usize) -> Option<usize> {
    if height == 0 || row_bytes == 0 {
        return Some(0);
    }
    (height - 1).checked_mul(pitch)?.checked_add(row_bytes)
}

/// Re-space packed rows to `pitch` in a buffer of `len` bytes.
fn spread_rows(
    packed: Vec<u8>,
    row_bytes: usize,
    height: usize,
    pitch: usize,
    len: usize,
) -> Result<Vec<u8>, ImageError> {
    if pitch == row_bytes || height == 0 || row_bytes == 0 {
        return Ok(packed);
    }
    let mut out = try_zeroed(len)?;
    for (dst, src) in out.chunks_mut(pitch).zip(packed.chunks_exact(row_bytes)) {
        dst[..row_bytes].copy_from_slice(src);
    }
    Ok(out)
}

fn decode_format(data: &[u8], limits: Option<&Limits>) -> Result<DecodeOutput, ImageError> {
    decode(data, limits)
}

/// Encode an image, converting a private copy to the nearest stored type
/// first when needed.
pub fn encode_image(image: &Image<'_>, options: &SaveOptions) -> Result<Vec<u8>, ImageError> {
    let (stored, channels, bit_depth) = header::storage_for(image.pixel_type());
    let converted;
    let source = if stored == image.pixel_type() {
        image
    } else {
        tracing::debug!(from = ?image.pixel_type(), to = ?stored, "qoix: normalising pixel type");
        converted = image.to_converted(stored, Layout::GAPLESS)?;
        &converted
    };
    let packed;
    let (pixels, pitch) = match source.contiguous_rows() {
        Some(rows) => rows,
        None => {
            packed = source.to_packed()?;
            (packed.as_slice(), source.row_bytes())
        }
    };
    encode(
        &EncodeInput {
            pixels,
            width: source.width(),
            height: source.height(),
            pitch,
            channels,
            bit_depth,
            colorspace: options.colorspace,
            pixel_aspect: image.pixel_aspect(),
            resolution: image.resolution(),
        },
        options.compression,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(pixels: &[u8], width: u32, height: u32, channels: u8, bit_depth: u8) -> EncodeInput<'_> {
        let sample = if bit_depth == 8 { 1 } else { 2 };
        EncodeInput {
            pixels,
            width,
            height,
            pitch: width as usize * usize::from(channels) * sample,
            channels,
            bit_depth,
            colorspace: Colorspace::Srgb,
            pixel_aspect: None,
            resolution: None,
        }
    }

    #[test]
    fn sub_codec_selection() {
        assert_eq!(SubCodec::for_depth(10, 1), Some(SubCodec::TenBit));
        assert_eq!(SubCodec::for_depth(10, 4), Some(SubCodec::TenBit));
        assert_eq!(SubCodec::for_depth(8, 1), Some(SubCodec::Plane));
        assert_eq!(SubCodec::for_depth(8, 2), Some(SubCodec::Plane));
        assert_eq!(SubCodec::for_depth(8, 3), Some(SubCodec::Color));
        assert_eq!(SubCodec::for_depth(8, 4), Some(SubCodec::Color));
        assert_eq!(SubCodec::for_depth(8, 5), None);
        assert_eq!(SubCodec::for_depth(16, 3), None);
    }

    #[test]
    fn compression_flag_matches_body() {
        let solid = alloc::vec![40u8; 64 * 64];
        let encoded = encode(&input(&solid, 64, 64, 1, 8), CompressionPolicy::Auto).unwrap();
        let header = QoixHeader::parse(&encoded).unwrap();
        let decoded = decode(&encoded, None).unwrap();
        assert_eq!(decoded.pixels(), &solid[..]);
        if header.compression == Compression::Lz4 {
            let raw = encode(&input(&solid, 64, 64, 1, 8), CompressionPolicy::Never).unwrap();
            assert!(encoded.len() < raw.len());
        }
    }

    #[test]
    fn never_policy_skips_compression() {
        let solid = alloc::vec![7u8; 32 * 32 * 3];
        let encoded = encode(&input(&solid, 32, 32, 3, 8), CompressionPolicy::Never).unwrap();
        assert_eq!(encoded[6], Compression::None as u8);
        assert_eq!(decode(&encoded, None).unwrap().pixels(), &solid[..]);
    }

    #[test]
    fn padded_rows_are_packed() {
        // 2x2 gray with a pitch of 4
        let pixels = [1u8, 2, 0, 0, 3, 4];
        let mut inp = input(&pixels, 2, 2, 1, 8);
        inp.pitch = 4;
        let encoded = encode(&inp, CompressionPolicy::Never).unwrap();
        let decoded = decode(&encoded, None).unwrap();
        assert_eq!(decoded.pixels(), &[1, 2, 3, 4]);
        assert_eq!(decoded.pitch, 2);
    }

    #[test]
    fn header_pitch_spreads_rows() {
        let pixels = [1u8, 2, 3, 4];
        let mut encoded = encode(&input(&pixels, 2, 2, 1, 8), CompressionPolicy::Never).unwrap();
        encoded[16..20].copy_from_slice(&3u32.to_be_bytes());
        let decoded = decode(&encoded, None).unwrap();
        assert_eq!(decoded.pitch, 3);
        assert_eq!(decoded.pixels(), &[1, 2, 0, 3, 4]);
    }

    #[test]
    fn corrupt_lz4_length_rejected() {
        let solid = alloc::vec![0u8; 128 * 128];
        let mut encoded = encode(&input(&solid, 128, 128, 1, 8), CompressionPolicy::Auto).unwrap();
        encoded[6] = Compression::Lz4 as u8;
        encoded.truncate(HEADER_LEN);
        encoded.extend_from_slice(&u32::MAX.to_be_bytes());
        encoded.extend_from_slice(&[0x10, 0x00]);
        assert!(matches!(decode(&encoded, None), Err(ImageError::DecodeFailed(_))));
    }

    #[test]
    fn metadata_survives() {
        let pixels = alloc::vec![0u8; 8 * 8 * 4];
        let mut inp = input(&pixels, 8, 8, 2, 10);
        inp.pixel_aspect = Some(2.0);
        inp.resolution = Some(300.0);
        let decoded = decode(&encode(&inp, CompressionPolicy::Auto).unwrap(), None).unwrap();
        assert_eq!(decoded.pixel_aspect, Some(2.0));
        assert_eq!(decoded.resolution, Some(300.0));
        assert_eq!(decoded.pixel_type, crate::pixel::PixelType::GrayAlpha16);
    }

    #[test]
    fn limits_apply_before_decoding() {
        let pixels = alloc::vec![0u8; 16 * 16];
        let encoded = encode(&input(&pixels, 16, 16, 1, 8), CompressionPolicy::Auto).unwrap();
        let limits = Limits {
            max_width: Some(8),
            ..Default::default()
        };
        assert!(matches!(
            decode(&encoded, Some(&limits)),
            Err(ImageError::LimitExceeded(_))
        ));
    }

    fn header_only(width: u32, height: u32, channels: u8, bit_depth: u8, pitch: u32) -> Vec<u8> {
        let mut out = Vec::new();
        QoixHeader {
            channels,
            bit_depth,
            compression: Compression::None,
            colorspace: Colorspace::Srgb,
            width,
            height,
            pitch,
            pixel_aspect: None,
            resolution: None,
        }
        .write(&mut out);
        out
    }

    #[test]
    fn huge_header_without_payload_fails_cleanly() {
        for (channels, bit_depth, bpp) in [(1u8, 8u8, 1u32), (2, 8, 2), (3, 8, 3), (4, 10, 8)] {
            let data = header_only(1 << 24, 1 << 24, channels, bit_depth, (1 << 24) * bpp);
            let err = decode(&data, None).unwrap_err();
            assert_eq!(err.class(), crate::error::ErrorClass::DecodeFailure, "{err:?}");
        }
    }

    #[test]
    fn short_payload_rejected_before_decoding() {
        // 4096 plane samples need at least 64 op bytes
        let mut data = header_only(64, 64, 1, 8, 64);
        data.extend_from_slice(&[0xFF; 63]);
        assert!(matches!(decode(&data, None), Err(ImageError::DecodeFailed(_))));
        data.push(0xFF);
        assert_eq!(decode(&data, None).unwrap().pixels(), &[0u8; 4096][..]);
    }

    #[test]
    fn header_pitch_counts_against_memory_limit() {
        let mut data = header_only(1, 2, 1, 8, 0x8000_0000);
        data.push(0xC1);
        let limits = Limits::default().with_max_memory_bytes(1024);
        assert!(matches!(
            decode(&data, Some(&limits)),
            Err(ImageError::LimitExceeded(_))
        ));

        let mut data = header_only(1, 2, 1, 8, 16);
        data.push(0xC1);
        let decoded = decode(&data, Some(&limits)).unwrap();
        assert_eq!(decoded.pitch, 16);
        assert_eq!(decoded.pixels().len(), 17);
    }
}
