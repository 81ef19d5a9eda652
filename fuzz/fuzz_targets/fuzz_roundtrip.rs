#![no_main]
use libfuzzer_sys::fuzz_target;
use zenraster::*;

fuzz_target!(|data: &[u8]| {
    let registry = FormatRegistry::builtin();
    let limits = Limits {
        max_pixels: Some(1 << 20),
        ..Default::default()
    };
    // If we can decode it, re-encoding and decoding again must produce identical pixels
    let Ok(format) = LoadRequest::new(registry, data).format() else {
        return;
    };
    let Ok(decoded) = LoadRequest::new(registry, data).with_limits(&limits).decode() else {
        return;
    };
    let Ok(reencoded) = decoded.save(registry, format, &SaveOptions::default()) else {
        return;
    };
    let Ok(decoded2) = Image::decode(registry, &reencoded) else {
        panic!("re-encoded data failed to decode");
    };

    assert_eq!(decoded.pixel_type(), decoded2.pixel_type());
    assert_eq!(decoded.width(), decoded2.width());
    assert_eq!(decoded.height(), decoded2.height());
    assert_eq!(
        decoded.to_packed().unwrap(),
        decoded2.to_packed().unwrap(),
        "roundtrip pixel mismatch"
    );
});
