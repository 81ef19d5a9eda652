#![no_main]
use libfuzzer_sys::fuzz_target;
use zenraster::*;

fuzz_target!(|data: &[u8]| {
    // from type, to type, layout bits (2 bytes), width, height, then pixels
    let [from, to, lo, hi, w, h, rest @ ..] = data else {
        return;
    };
    let from = PixelType::ALL[*from as usize % PixelType::ALL.len()];
    let to = PixelType::ALL[*to as usize % PixelType::ALL.len()];
    let layout = Layout::from_bits(u16::from_le_bytes([*lo, *hi]));
    let (w, h) = (u32::from(*w % 32), u32::from(*h % 32));

    let Ok(mut image) = Image::new(w, h, from, Layout::NONE) else {
        return;
    };
    let mut src = rest.iter().copied().cycle();
    for y in 0..h {
        if let Some(row) = image.scanline_mut(y) {
            row.iter_mut().zip(&mut src).for_each(|(dst, b)| *dst = b);
        }
    }
    let before = image.to_packed().unwrap();

    match image.convert(to, layout) {
        Ok(()) => {
            assert_eq!(image.pixel_type(), to);
            assert!(image.satisfies(layout));
            assert_eq!(image.rows().count(), h as usize * usize::from(w > 0));
        }
        Err(_) => {
            assert!(layout.validate().is_err());
            assert!(image.is_errored());
        }
    }

    // Casting back and forth must not move or change the bytes
    let mut copy = Image::new(w, h, from, Layout::NONE).unwrap();
    for y in 0..h {
        let start = y as usize * copy.row_bytes();
        let len = copy.row_bytes();
        copy.scanline_mut(y).unwrap().copy_from_slice(&before[start..start + len]);
    }
    if copy.cast(PixelType::Gray8).is_ok() {
        copy.cast(from).unwrap();
        assert_eq!(copy.to_packed().unwrap(), before);
    }
});
