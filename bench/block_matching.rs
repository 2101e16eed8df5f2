use criterion::{black_box, criterion_group, criterion_main, Criterion};

use image::{GrayImage, Luma};
use stereo_cloud::block_matching::{BlockMatcher, Params};
use stereo_cloud::prelude::*;

fn pattern(x: u32, y: u32) -> u8 {
    let mut h = x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263);
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    (h >> 24) as u8
}

fn block_matching_bench(c: &mut Criterion) {

    // Build a synthetic pair with a constant 12 px shift
    let left = GrayImage::from_fn(320, 240, |x, y| Luma([pattern(x, y)]));
    let right = GrayImage::from_fn(320, 240, |x, y| Luma([pattern(x + 12, y)]));
    let frame = StereoFrame::new(left, right).unwrap();

    // Build disparity alg
    let mut disp = BlockMatcher::new(Params {
        block_size: 21,
        min_disparity: 0,
        num_disparities: 64,
        ..Params::default()
    }).unwrap();

    // Benchmark compute function
    c.bench_function("block matching 320x240", |b| b.iter(|| disp.compute(black_box(&frame))));
}

criterion_group!(benches, block_matching_bench);
criterion_main!(benches);
