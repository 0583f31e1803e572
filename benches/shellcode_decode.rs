// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Shellcode Decode Benchmarks
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use katiska_honeyclient::shellcode::{
    decode_payload, extract_urldownloadtofile_urls, find_static_urls,
};

fn unicode_escaped_payload(len: usize) -> String {
    let mut payload = String::with_capacity(len * 6);
    for i in 0..len {
        payload.push_str(&format!("%u{:02x}{:02x}", i % 256, (i * 7) % 256));
    }
    payload
}

fn bench_decode(c: &mut Criterion) {
    let small = unicode_escaped_payload(64);
    let large = unicode_escaped_payload(4096);

    c.bench_function("decode_payload/64_escapes", |b| {
        b.iter(|| decode_payload(black_box(&small)))
    });
    c.bench_function("decode_payload/4096_escapes", |b| {
        b.iter(|| decode_payload(black_box(&large)))
    });
}

fn bench_url_scans(c: &mut Criterion) {
    let mut haystack = "A".repeat(16 * 1024);
    haystack.push_str(" http://evil.example/payload.exe tail");

    c.bench_function("find_static_urls/16k", |b| {
        b.iter(|| find_static_urls(black_box(&haystack)))
    });

    let mut profile = String::new();
    for i in 0..128 {
        profile.push_str(&format!(
            "step {i}; \"state\" more\nURLDownloadToFile download; \"http://evil.example/{i}.exe\" saved\n"
        ));
    }
    c.bench_function("extract_urldownloadtofile_urls/128_markers", |b| {
        b.iter(|| extract_urldownloadtofile_urls(black_box(&profile)))
    });
}

criterion_group!(benches, bench_decode, bench_url_scans);
criterion_main!(benches);
