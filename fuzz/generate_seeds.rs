#!/usr/bin/env -S cargo +nightly -Zscript
//! Generate seed corpus files for fuzzing.
//! Run: cargo +nightly -Zscript fuzz/generate_seeds.rs

fn qoix_header(channels: u8, bit_depth: u8, compression: u8, w: u32, h: u32, pitch: u32) -> Vec<u8> {
    let mut out = b"qoix".to_vec();
    out.extend_from_slice(&[channels, bit_depth, compression, 0]);
    out.extend_from_slice(&w.to_be_bytes());
    out.extend_from_slice(&h.to_be_bytes());
    out.extend_from_slice(&pitch.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // pixel aspect
    out.extend_from_slice(&0u32.to_be_bytes()); // resolution
    out
}

fn main() {
    use std::fs;
    let dir = "fuzz/corpus/fuzz_decode";
    fs::create_dir_all(dir).unwrap();

    // QOIX gray 2x2, plane sub-codec: small, small, literal, small
    let mut gray = qoix_header(1, 8, 0, 2, 2, 2);
    gray.extend_from_slice(&[0x30, 0x30, 0x40, 0x20, 0x38]);
    fs::write(format!("{dir}/qoix_gray_2x2.qoix"), gray).unwrap();

    // QOIX gray 4x4, one zero run
    let mut flat = qoix_header(1, 8, 0, 4, 4, 4);
    flat.push(0xCF);
    fs::write(format!("{dir}/qoix_flat_4x4.qoix"), flat).unwrap();

    // QOIX 10-bit gray 1x2 with an 8-byte pitch: raw sample then a run
    let mut tenbit = qoix_header(1, 10, 0, 1, 2, 8);
    tenbit.extend_from_slice(&[0x81, 0x03, 0xFF, 0xC0]);
    fs::write(format!("{dir}/qoix_tenbit_1x2.qoix"), tenbit).unwrap();

    // QOIX with an LZ4 body: length prefix, then one literal-only block
    let mut lz4 = qoix_header(1, 8, 1, 4, 4, 4);
    lz4.extend_from_slice(&1u32.to_be_bytes());
    lz4.extend_from_slice(&[0x10, 0xCF]);
    fs::write(format!("{dir}/qoix_lz4_4x4.qoix"), lz4).unwrap();

    // Plain QOI 1x1 RGB
    let mut qoi = b"qoif".to_vec();
    qoi.extend_from_slice(&1u32.to_be_bytes());
    qoi.extend_from_slice(&1u32.to_be_bytes());
    qoi.extend_from_slice(&[3, 0, 0xFE, 0xFF, 0x00, 0x00]);
    qoi.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1]);
    fs::write(format!("{dir}/qoi_1x1.qoi"), qoi).unwrap();

    // Farbfeld 1x1
    let mut ff = b"farbfeld".to_vec();
    ff.extend_from_slice(&1u32.to_be_bytes());
    ff.extend_from_slice(&1u32.to_be_bytes());
    ff.extend_from_slice(&[0xFF, 0xFF, 0x80, 0x00, 0x00, 0x00, 0xFF, 0xFF]);
    fs::write(format!("{dir}/farbfeld_1x1.ff"), ff).unwrap();

    // Truncated/malformed seeds for edge coverage
    fs::write(format!("{dir}/empty.bin"), b"").unwrap();
    fs::write(format!("{dir}/just_magic.bin"), b"qoix").unwrap();
    fs::write(format!("{dir}/short_header.bin"), &qoix_header(3, 8, 0, 1, 1, 3)[..20]).unwrap();
    fs::write(format!("{dir}/bad_depth.bin"), qoix_header(3, 12, 0, 1, 1, 3)).unwrap();

    println!("Generated seed corpus in {dir}/");
}
