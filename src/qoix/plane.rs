//! Plane sub-codec for 8-bit images with one or two channels.
//!
//! Each channel is coded as its own plane, one after the other. A sample is
//! predicted from its decoded neighbours: the rounded mean of left and up,
//! or whichever of the two exists, or 0 at the origin. The wrapping
//! residual is then written with one of three ops:
//!
//! | bits          | op                                         |
//! |---------------|--------------------------------------------|
//! | `00vv_vvvv`   | residual `v - 32`, in `-32 ..= 31`         |
//! | `0100_0000` b | residual `b` as a raw byte                 |
//! | `11nn_nnnn`   | `n + 1` zero residuals (1 ..= 64)          |
//!
//! Runs may cross row and plane boundaries.

use alloc::vec::Vec;

use crate::error::ImageError;
use crate::storage::try_zeroed;

const OP_SMALL: u8 = 0x00;
const OP_LITERAL: u8 = 0x40;
const OP_RUN: u8 = 0xC0;
const MAX_RUN: usize = 64;

fn predict(plane: &[u8], width: usize, x: usize, y: usize) -> u8 {
    let i = y * width + x;
    match (x > 0, y > 0) {
        (true, true) => ((u16::from(plane[i - 1]) + u16::from(plane[i - width]) + 1) / 2) as u8,
        (true, false) => plane[i - 1],
        (false, true) => plane[i - width],
        (false, false) => 0,
    }
}

/// Encode interleaved `pixels` of `channels` samples each.
pub(crate) fn encode(pixels: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let count = width * height;
    let mut out = Vec::with_capacity(count * channels / 2 + 16);
    let mut plane: Vec<u8> = Vec::with_capacity(count);
    let mut run = 0usize;

    for c in 0..channels {
        plane.clear();
        plane.extend(pixels.iter().skip(c).step_by(channels).take(count));
        for y in 0..height {
            for x in 0..width {
                let residual = plane[y * width + x].wrapping_sub(predict(&plane, width, x, y));
                if residual == 0 {
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
                let signed = residual as i8;
                if (-32..=31).contains(&signed) {
                    out.push(OP_SMALL | (signed + 32) as u8);
                } else {
                    out.push(OP_LITERAL);
                    out.push(residual);
                }
            }
        }
    }
    if run > 0 {
        out.push(OP_RUN | (run - 1) as u8);
    }
    out
}

struct Residuals<'a> {
    data: &'a [u8],
    pos: usize,
    pending_zeros: usize,
}

impl Residuals<'_> {
    fn next(&mut self) -> Result<u8, ImageError> {
        if self.pending_zeros > 0 {
            self.pending_zeros -= 1;
            return Ok(0);
        }
        let op = *self.data.get(self.pos).ok_or(ImageError::UnexpectedEof)?;
        self.pos += 1;
        match op {
            _ if op & 0xC0 == OP_RUN => {
                self.pending_zeros = usize::from(op & 0x3F);
                Ok(0)
            }
            _ if op & 0xC0 == OP_SMALL => Ok(((op & 0x3F) as i8 - 32) as u8),
            OP_LITERAL => {
                let b = *self.data.get(self.pos).ok_or(ImageError::UnexpectedEof)?;
                self.pos += 1;
                Ok(b)
            }
            _ => Err(ImageError::DecodeFailed(alloc::format!(
                "plane codec: invalid op {op:#04x}"
            ))),
        }
    }
}

/// Decode into interleaved pixels of `channels` samples each.
pub(crate) fn decode(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
) -> Result<Vec<u8>, ImageError> {
    let count = width * height;
    let mut out = try_zeroed(count * channels)?;
    let mut plane = try_zeroed(count)?;
    let mut residuals = Residuals {
        data,
        pos: 0,
        pending_zeros: 0,
    };

    for c in 0..channels {
        for y in 0..height {
            for x in 0..width {
                let r = residuals.next()?;
                plane[y * width + x] = predict(&plane, width, x, y).wrapping_add(r);
            }
        }
        for (dst, &v) in out.iter_mut().skip(c).step_by(channels).zip(&plane) {
            *dst = v;
        }
    }
    if residuals.pending_zeros != 0 || residuals.pos != data.len() {
        return Err(ImageError::DecodeFailed(
            "plane codec: trailing data after last sample".into(),
        ));
    }
    Ok(out)
}
