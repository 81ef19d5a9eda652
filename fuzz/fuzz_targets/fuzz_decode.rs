#![no_main]
use libfuzzer_sys::fuzz_target;
use zenraster::*;

fuzz_target!(|data: &[u8]| {
    let registry = FormatRegistry::builtin();
    let limits = Limits {
        max_pixels: Some(1 << 22),
        max_memory_bytes: Some(1 << 26),
        ..Default::default()
    };

    // Auto-detect decode: must never panic
    let _ = LoadRequest::new(registry, data).with_limits(&limits).decode();

    // Each format explicitly: must never panic
    for format in ImageFormat::ALL {
        let _ = LoadRequest::new(registry, data)
            .with_format(format)
            .with_limits(&limits)
            .decode_raw();
    }
});
