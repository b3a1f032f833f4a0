use criterion::{criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use std::hint::black_box;
use std::sync::Arc;
use tilematch::{MatchConfig, Matcher, Palette, ReferencePattern, RegionImage, RegionRect};

const COLORS: [[u8; 3]; 8] = [
    [255, 255, 255],
    [0, 0, 0],
    [229, 0, 0],
    [0, 0, 234],
    [2, 190, 1],
    [229, 217, 0],
    [130, 0, 128],
    [160, 106, 66],
];

fn make_region(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = COLORS[(((x / 3) ^ (y / 5) ^ (x * y)) % 8) as usize];
        Rgba([r, g, b, 255])
    })
}

fn make_pattern(size: u32, seed: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let on = (x * 7 + y * 3 + seed) % 4 == 0 || x == size / 2;
        let [r, g, b] = if on { COLORS[1] } else { COLORS[0] };
        Rgba([r, g, b, 255])
    })
}

fn bench_matcher(c: &mut Criterion) {
    let palette =
        Arc::new(Palette::new(COLORS.iter().map(|&rgb| (format!("{rgb:?}"), rgb))).unwrap());
    let lookup = palette.lookup();
    let patterns: Vec<ReferencePattern> = (0..4)
        .map(|i| ReferencePattern::new(format!("p{i}"), make_pattern(12, i), &lookup).unwrap())
        .collect();

    let rect = RegionRect::new(0, 0, 512, 512).unwrap();
    let region = RegionImage::from_pixels(rect, make_region(512, 512)).unwrap();

    let sequential = Matcher::new(Arc::clone(&palette), &patterns, COLORS[1])
        .unwrap()
        .with_config(MatchConfig {
            threshold: 1.0,
            parallel: false,
        });
    c.bench_function("match_region_512_8colors_4patterns", |b| {
        b.iter(|| black_box(sequential.match_region(&region).unwrap()));
    });

    let loose = Matcher::new(Arc::clone(&palette), &patterns, COLORS[1])
        .unwrap()
        .with_config(MatchConfig {
            threshold: 0.8,
            parallel: false,
        });
    c.bench_function("match_region_512_threshold_0_8", |b| {
        b.iter(|| black_box(loose.match_region(&region).unwrap()));
    });

    if cfg!(feature = "rayon") {
        let parallel = Matcher::new(Arc::clone(&palette), &patterns, COLORS[1])
            .unwrap()
            .with_config(MatchConfig {
                threshold: 1.0,
                parallel: true,
            });
        c.bench_function("match_region_512_8colors_4patterns_parallel", |b| {
            b.iter(|| black_box(parallel.match_region(&region).unwrap()));
        });
    }

    c.bench_function("index_region_512", |b| {
        b.iter(|| black_box(lookup.to_indexed(region.pixels()).unwrap()));
    });
}

criterion_group!(benches, bench_matcher);
criterion_main!(benches);
