//! Scanline conversion between pixel types.
//!
//! Only four converter families exist: every type to and from straight 8-bit
//! RGBA, and every type to and from straight 32-bit float RGBA. Any other
//! pair goes through one of those two pivots, picked by [`intermediate_for`].
//!
//! Numeric rules:
//! - integer to float is `v / max`, float to integer is `floor(x * max + 0.5)`
//!   after clamping to `0.0..=1.0`;
//! - luminance is the unweighted mean of red, green and blue;
//! - unpremultiplying a sample with alpha 0 yields 0.
//!
//! Nothing here checks bounds beyond slice indexing; the caller guarantees
//! that both rows hold `width` pixels and do not overlap.

use crate::pixel::{ChannelLayout, Depth, PixelType};

/// The pivot type used to convert `src` to `dst`.
///
/// 8-bit RGBA when both ends are straight 8-bit, float RGBA otherwise.
pub const fn intermediate_for(src: PixelType, dst: PixelType) -> PixelType {
    if src.fits_rgba8() && dst.fits_rgba8() {
        PixelType::Rgba8
    } else {
        PixelType::RgbaF32
    }
}

/// Scratch bytes [`convert_scanline`] needs for a row of `width` pixels.
pub const fn scratch_len(src: PixelType, dst: PixelType, width: usize) -> usize {
    let mid = intermediate_for(src, dst);
    if is_same(src, dst) || is_same(src, mid) || is_same(dst, mid) {
        0
    } else {
        width * mid.bytes_per_pixel()
    }
}

const fn is_same(a: PixelType, b: PixelType) -> bool {
    a as u8 == b as u8
}

type RowFn = fn(PixelType, &[u8], &mut [u8], usize);

/// Convert `width` pixels of `src_type` in `src` to `dst_type` in `dst`.
///
/// `scratch` must hold at least [`scratch_len`] bytes.
pub fn convert_scanline(
    src_type: PixelType,
    src: &[u8],
    dst_type: PixelType,
    dst: &mut [u8],
    width: usize,
    scratch: &mut [u8],
) {
    if src_type == dst_type {
        let n = width * src_type.bytes_per_pixel();
        dst[..n].copy_from_slice(&src[..n]);
        return;
    }
    let mid = intermediate_for(src_type, dst_type);
    let (to_mid, from_mid): (RowFn, RowFn) = if mid == PixelType::Rgba8 {
        (to_rgba8, from_rgba8)
    } else {
        (to_rgbaf32, from_rgbaf32)
    };

    if src_type == mid {
        from_mid(dst_type, src, dst, width);
    } else if dst_type == mid {
        to_mid(src_type, src, dst, width);
    } else {
        let tmp = &mut scratch[..width * mid.bytes_per_pixel()];
        to_mid(src_type, src, tmp, width);
        from_mid(dst_type, tmp, dst, width);
    }
}

// ── 8-bit RGBA pivot ────────────────────────────────────────────────

/// Convert a row of any type to straight 8-bit RGBA.
pub fn to_rgba8(src_type: PixelType, src: &[u8], dst: &mut [u8], width: usize) {
    let dst = &mut dst[..width * 4];
    if swizzle_to_rgba8(src_type, &src[..width * src_type.bytes_per_pixel()], dst) {
        return;
    }
    match src_type {
        PixelType::Gray8 => {
            for (out, &l) in dst.chunks_exact_mut(4).zip(&src[..width]) {
                out.copy_from_slice(&[l, l, l, 255]);
            }
        }
        PixelType::GrayAlpha8 => {
            for (out, px) in dst.chunks_exact_mut(4).zip(src.chunks_exact(2)) {
                out.copy_from_slice(&[px[0], px[0], px[0], px[1]]);
            }
        }
        PixelType::Rgb8 => {
            for (out, px) in dst.chunks_exact_mut(4).zip(src.chunks_exact(3)) {
                out.copy_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        PixelType::Rgba8 => dst.copy_from_slice(&src[..width * 4]),
        PixelType::Bgra8 => {
            for (out, px) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                out.copy_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
        }
        _ => {
            let bpp = src_type.bytes_per_pixel();
            for (out, px) in dst.chunks_exact_mut(4).zip(src.chunks_exact(bpp)) {
                let rgba = load(src_type, px);
                for (o, v) in out.iter_mut().zip(rgba) {
                    *o = quantize(v, 255.0) as u8;
                }
            }
        }
    }
}

/// Convert a row of straight 8-bit RGBA to any type.
pub fn from_rgba8(dst_type: PixelType, src: &[u8], dst: &mut [u8], width: usize) {
    let src = &src[..width * 4];
    if swizzle_from_rgba8(dst_type, src, &mut dst[..width * dst_type.bytes_per_pixel()]) {
        return;
    }
    match dst_type {
        PixelType::Gray8 => {
            for (out, px) in dst[..width].iter_mut().zip(src.chunks_exact(4)) {
                *out = mean_u8(px[0], px[1], px[2]);
            }
        }
        PixelType::GrayAlpha8 => {
            for (out, px) in dst.chunks_exact_mut(2).zip(src.chunks_exact(4)) {
                out[0] = mean_u8(px[0], px[1], px[2]);
                out[1] = px[3];
            }
        }
        PixelType::Rgb8 => {
            for (out, px) in dst.chunks_exact_mut(3).zip(src.chunks_exact(4)) {
                out.copy_from_slice(&px[..3]);
            }
        }
        PixelType::Rgba8 => dst[..width * 4].copy_from_slice(src),
        PixelType::Bgra8 => {
            for (out, px) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                out.copy_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
        }
        _ => {
            let bpp = dst_type.bytes_per_pixel();
            for (out, px) in dst.chunks_exact_mut(bpp).zip(src.chunks_exact(4)) {
                let rgba = [px[0], px[1], px[2], px[3]].map(|v| f32::from(v) / 255.0);
                store(dst_type, rgba, out);
            }
        }
    }
}

#[cfg(feature = "simd")]
fn swizzle_to_rgba8(src_type: PixelType, src: &[u8], dst: &mut [u8]) -> bool {
    let done = match src_type {
        PixelType::Gray8 => garb::bytes::gray_to_rgba(src, dst),
        PixelType::GrayAlpha8 => garb::bytes::gray_alpha_to_rgba(src, dst),
        PixelType::Rgb8 => garb::bytes::rgb_to_rgba(src, dst),
        PixelType::Bgra8 => garb::bytes::bgra_to_rgba(src, dst),
        _ => return false,
    };
    done.is_ok()
}

#[cfg(feature = "simd")]
fn swizzle_from_rgba8(dst_type: PixelType, src: &[u8], dst: &mut [u8]) -> bool {
    let done = match dst_type {
        PixelType::Rgb8 => garb::bytes::rgba_to_rgb(src, dst),
        PixelType::Bgra8 => garb::bytes::rgba_to_bgra(src, dst),
        _ => return false,
    };
    done.is_ok()
}

#[cfg(not(feature = "simd"))]
fn swizzle_to_rgba8(_src_type: PixelType, _src: &[u8], _dst: &mut [u8]) -> bool {
    false
}

#[cfg(not(feature = "simd"))]
fn swizzle_from_rgba8(_dst_type: PixelType, _src: &[u8], _dst: &mut [u8]) -> bool {
    false
}

// ── float RGBA pivot ────────────────────────────────────────────────

/// Convert a row of any type to straight float RGBA.
pub fn to_rgbaf32(src_type: PixelType, src: &[u8], dst: &mut [u8], width: usize) {
    let bpp = src_type.bytes_per_pixel();
    for (out, px) in dst[..width * 16]
        .chunks_exact_mut(16)
        .zip(src[..width * bpp].chunks_exact(bpp))
    {
        let rgba = load(src_type, px);
        for (o, v) in out.chunks_exact_mut(4).zip(rgba) {
            o.copy_from_slice(&v.to_ne_bytes());
        }
    }
}

/// Convert a row of straight float RGBA to any type.
pub fn from_rgbaf32(dst_type: PixelType, src: &[u8], dst: &mut [u8], width: usize) {
    let bpp = dst_type.bytes_per_pixel();
    for (out, px) in dst[..width * bpp]
        .chunks_exact_mut(bpp)
        .zip(src[..width * 16].chunks_exact(16))
    {
        let rgba = [0, 4, 8, 12].map(|o| read_f32(&px[o..o + 4]));
        store(dst_type, rgba, out);
    }
}

// ── per-pixel helpers ───────────────────────────────────────────────

/// Read one pixel as straight float RGBA.
fn load(ty: PixelType, px: &[u8]) -> [f32; 4] {
    let depth = ty.depth();
    let ch = |i: usize| read_channel(depth, px, i);
    let [r, g, b, a] = match ty.channel_layout() {
        ChannelLayout::Gray => {
            let l = ch(0);
            [l, l, l, 1.0]
        }
        ChannelLayout::GrayAlpha => {
            let l = ch(0);
            [l, l, l, ch(1)]
        }
        ChannelLayout::Rgb => [ch(0), ch(1), ch(2), 1.0],
        ChannelLayout::Rgba => [ch(0), ch(1), ch(2), ch(3)],
        ChannelLayout::Bgra => [ch(2), ch(1), ch(0), ch(3)],
    };
    if ty.is_premultiplied() {
        [unpremultiply(r, a), unpremultiply(g, a), unpremultiply(b, a), a]
    } else {
        [r, g, b, a]
    }
}

/// Write one straight float RGBA pixel as `ty`.
fn store(ty: PixelType, [r, g, b, a]: [f32; 4], out: &mut [u8]) {
    let depth = ty.depth();
    let premul = ty.is_premultiplied();
    let scale = |c: f32| if premul { c * a } else { c };
    match ty.channel_layout() {
        ChannelLayout::Gray => write_channel(depth, out, 0, mean_f32(r, g, b)),
        ChannelLayout::GrayAlpha => {
            write_channel(depth, out, 0, scale(mean_f32(r, g, b)));
            write_channel(depth, out, 1, a);
        }
        ChannelLayout::Rgb => {
            write_channel(depth, out, 0, r);
            write_channel(depth, out, 1, g);
            write_channel(depth, out, 2, b);
        }
        ChannelLayout::Rgba => {
            write_channel(depth, out, 0, scale(r));
            write_channel(depth, out, 1, scale(g));
            write_channel(depth, out, 2, scale(b));
            write_channel(depth, out, 3, a);
        }
        ChannelLayout::Bgra => {
            write_channel(depth, out, 0, b);
            write_channel(depth, out, 1, g);
            write_channel(depth, out, 2, r);
            write_channel(depth, out, 3, a);
        }
    }
}

fn read_channel(depth: Depth, px: &[u8], index: usize) -> f32 {
    match depth {
        Depth::U8 => f32::from(px[index]) / 255.0,
        Depth::U16 => {
            let o = index * 2;
            f32::from(u16::from_ne_bytes([px[o], px[o + 1]])) / 65535.0
        }
        Depth::F32 => {
            let o = index * 4;
            read_f32(&px[o..o + 4])
        }
    }
}

fn write_channel(depth: Depth, out: &mut [u8], index: usize, value: f32) {
    match depth {
        Depth::U8 => out[index] = quantize(value, 255.0) as u8,
        Depth::U16 => {
            let o = index * 2;
            let v = quantize(value, 65535.0) as u16;
            out[o..o + 2].copy_from_slice(&v.to_ne_bytes());
        }
        Depth::F32 => {
            let o = index * 4;
            out[o..o + 4].copy_from_slice(&value.to_ne_bytes());
        }
    }
}

fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// `floor(x * max + 0.5)` with `x` clamped to `0.0..=1.0`. NaN maps to 0.
#[inline]
fn quantize(x: f32, max: f32) -> u32 {
    (x.clamp(0.0, 1.0) * max + 0.5) as u32
}

#[inline]
fn unpremultiply(c: f32, a: f32) -> f32 {
    if a != 0.0 { c / a } else { 0.0 }
}

#[inline]
fn mean_u8(r: u8, g: u8, b: u8) -> u8 {
    ((u16::from(r) + u16::from(g) + u16::from(b) + 1) / 3) as u8
}

/// Unweighted mean; computed in f64 so that `r == g == b` returns `r` exactly.
#[inline]
fn mean_f32(r: f32, g: f32, b: f32) -> f32 {
    ((f64::from(r) + f64::from(g) + f64::from(b)) / 3.0) as f32
}
