//! 10-bit sub-codec for 16-bit images with one to four channels.
//!
//! Samples are quantised to 10 bits (`round(v * 1023 / 65535)`) and coded
//! pixel by pixel against the previous pixel, which starts as all zeros:
//!
//! | bytes                 | op                                          |
//! |-----------------------|---------------------------------------------|
//! | `11nn_nnnn`           | repeat the previous pixel `n + 1` times     |
//! | `1000_0000` + 1/chan  | per-channel delta `b - 64`, in `-64 ..= 63` |
//! | `1000_0001` + 2/chan  | full pixel, 10-bit values big-endian        |
//!
//! Decoding expands back to 16 bits with `round(q * 65535 / 1023)`, so any
//! value that came from 10 bits survives exactly.

use alloc::vec::Vec;

use crate::error::ImageError;
use crate::storage::try_with_capacity;

const OP_RUN: u8 = 0xC0;
const OP_DIFF: u8 = 0x80;
const OP_FULL: u8 = 0x81;
const MAX_RUN: usize = 64;
const MASK: u16 = 0x3FF;

#[inline]
pub(crate) fn quantize(v: u16) -> u16 {
    ((u32::from(v) * 1023 + 32767) / 65535) as u16
}

#[inline]
pub(crate) fn expand(q: u16) -> u16 {
    ((u32::from(q) * 65535 + 511) / 1023) as u16
}

/// Signed difference in the 10-bit ring.
#[inline]
fn delta(from: u16, to: u16) -> i16 {
    ((to.wrapping_sub(from).wrapping_add(512)) & MASK) as i16 - 512
}

/// Encode native-endian 16-bit samples, `channels` per pixel.
pub(crate) fn encode(samples: &[u8], pixel_count: usize, channels: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixel_count * (channels + 1) / 2 + 16);
    let mut prev = [0u16; 4];
    let mut cur = [0u16; 4];
    let mut run = 0usize;

    for px in samples.chunks_exact(channels * 2).take(pixel_count) {
        for (c, s) in cur.iter_mut().zip(px.chunks_exact(2)) {
            *c = quantize(u16::from_ne_bytes([s[0], s[1]]));
        }
        if cur[..channels] == prev[..channels] {
            run += 1;
            if run == MAX_RUN {
                out.push(OP_RUN | (MAX_RUN - 1) as u8);
                run = 0;
            }
            continue;
        }
        if run > 0 {
            out.push(OP_RUN | (run - 1) as u8);
            run = 0;
        }
        let deltas = core::array::from_fn::<i16, 4, _>(|c| delta(prev[c], cur[c]));
        if deltas[..channels].iter().all(|d| (-64..=63).contains(d)) {
            out.push(OP_DIFF);
            out.extend(deltas[..channels].iter().map(|d| (d + 64) as u8));
        } else {
            out.push(OP_FULL);
            for q in &cur[..channels] {
                out.extend_from_slice(&q.to_be_bytes());
            }
        }
        prev = cur;
    }
    if run > 0 {
        out.push(OP_RUN | (run - 1) as u8);
    }
    out
}

fn take<'a>(data: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8], ImageError> {
    let bytes = data.get(*pos..*pos + n).ok_or(ImageError::UnexpectedEof)?;
    *pos += n;
    Ok(bytes)
}

/// Decode into native-endian 16-bit samples, `channels` per pixel.
pub(crate) fn decode(
    data: &[u8],
    pixel_count: usize,
    channels: usize,
) -> Result<Vec<u8>, ImageError> {
    let mut out = try_with_capacity(pixel_count * channels * 2)?;
    let mut prev = [0u16; 4];
    let mut pos = 0usize;
    let mut written = 0usize;

    while written < pixel_count {
        let op = take(data, &mut pos, 1)?[0];
        let repeat = match op {
            _ if op & 0xC0 == OP_RUN => {
                let n = usize::from(op & 0x3F) + 1;
                if written + n > pixel_count {
                    return Err(ImageError::DecodeFailed(
                        "10-bit codec: run past the last pixel".into(),
                    ));
                }
                n
            }
            OP_DIFF => {
                let bytes = take(data, &mut pos, channels)?;
                for (p, &b) in prev.iter_mut().zip(bytes) {
                    let d = i16::from(b) - 64;
                    *p = (p.wrapping_add_signed(d)) & MASK;
                }
                1
            }
            OP_FULL => {
                let bytes = take(data, &mut pos, channels * 2)?;
                for (p, b) in prev.iter_mut().zip(bytes.chunks_exact(2)) {
                    let q = u16::from_be_bytes([b[0], b[1]]);
                    if q > MASK {
                        return Err(ImageError::DecodeFailed(alloc::format!(
                            "10-bit codec: sample {q} out of range"
                        )));
                    }
                    *p = q;
                }
                1
            }
            _ => {
                return Err(ImageError::DecodeFailed(alloc::format!(
                    "10-bit codec: invalid op {op:#04x}"
                )));
            }
        };
        for _ in 0..repeat {
            for q in &prev[..channels] {
                out.extend_from_slice(&expand(*q).to_ne_bytes());
            }
        }
        written += repeat;
    }
    if pos != data.len() {
        return Err(ImageError::DecodeFailed(
            "10-bit codec: trailing data after last pixel".into(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    #[test]
    fn quantize_expand_is_stable() {
        for q in 0..=1023u16 {
            assert_eq!(quantize(expand(q)), q);
        }
        assert_eq!(expand(1023), 65535);
        assert_eq!(expand(0), 0);
        assert_eq!(quantize(65535), 1023);
    }

    #[test]
    fn ten_bit_values_round_trip_exactly() {
        let values: Vec<u16> = (0..300u16).map(|i| expand((i * 37) % 1024)).collect();
        let data = samples(&values);
        let encoded = encode(&data, 100, 3);
        assert_eq!(decode(&encoded, 100, 3).unwrap(), data);
    }

    #[test]
    fn arbitrary_values_lose_at_most_one_step() {
        let values: Vec<u16> = (0..64u32).map(|i| (i * 1031) as u16).collect();
        let encoded = encode(&samples(&values), 64, 1);
        let decoded = decode(&encoded, 64, 1).unwrap();
        for (orig, d) in values.iter().zip(decoded.chunks_exact(2)) {
            let d = u16::from_ne_bytes([d[0], d[1]]);
            assert!(orig.abs_diff(d) <= 33, "{orig} -> {d}");
        }
    }

    #[test]
    fn solid_image_is_runs() {
        let data = samples(&[expand(700); 4 * 130]);
        let encoded = encode(&data, 130, 4);
        // one full pixel, then 129 repeats: 64 + 64 + 1
        assert_eq!(encoded.len(), 1 + 8 + 3);
        assert_eq!(decode(&encoded, 130, 4).unwrap(), data);
    }

    #[test]
    fn rejects_bad_streams() {
        assert!(decode(&[0xC5], 3, 1).is_err());
        assert!(decode(&[0x90], 1, 1).is_err());
        assert!(decode(&[OP_FULL, 0x04, 0x00], 1, 1).is_err());
        assert!(decode(&[OP_DIFF], 1, 2).is_err());
        assert!(decode(&[OP_DIFF, 64, 0xC0], 1, 1).is_err());
    }
}
