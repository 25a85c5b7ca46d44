//! Benchmarks for the per-frame transform
//!
//! Run with: cargo bench --bench welch

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rustfft::num_complex::Complex64;
use std::f64::consts::TAU;
use std::hint::black_box;

use spectrum_streamer::dsp::{raw_magnitudes, WelchConfig, WelchEstimator, Window};

const SAMPLE_RATE: f64 = 1.2e6;

fn tone(len: usize) -> Vec<Complex64> {
    (0..len)
        .map(|n| Complex64::from_polar(1.0, TAU * 100e3 * n as f64 / SAMPLE_RATE))
        .collect()
}

fn bench_welch_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("welch_frame");
    let estimator = WelchEstimator::new(WelchConfig::new(SAMPLE_RATE, Window::Flattop, 1024)).unwrap();

    // 128k samples is the default frame
    for frame_len in [16 * 1024, 128 * 1024].iter() {
        let samples = tone(*frame_len);
        group.throughput(Throughput::Elements(*frame_len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(frame_len), &samples, |b, samples| {
            b.iter(|| black_box(estimator.estimate(black_box(samples)).unwrap()));
        });
    }

    group.finish();
}

fn bench_segment_len(c: &mut Criterion) {
    let mut group = c.benchmark_group("welch_segment_len");
    let samples = tone(128 * 1024);

    for segment_len in [256, 1024, 4096].iter() {
        let estimator =
            WelchEstimator::new(WelchConfig::new(SAMPLE_RATE, Window::Hann, *segment_len)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(segment_len), &samples, |b, samples| {
            b.iter(|| black_box(estimator.estimate(black_box(samples)).unwrap()));
        });
    }

    group.finish();
}

fn bench_raw_magnitudes(c: &mut Criterion) {
    let samples = tone(128 * 1024);
    c.bench_function("raw_magnitudes_128k", |b| {
        b.iter(|| black_box(raw_magnitudes(black_box(&samples), 9)));
    });
}

fn bench_payload_encode(c: &mut Criterion) {
    let estimator = WelchEstimator::new(WelchConfig::new(SAMPLE_RATE, Window::Flattop, 1024)).unwrap();
    let payload = spectrum_streamer::protocol::Payload::Spectrum(estimator.estimate(&tone(128 * 1024)).unwrap());
    c.bench_function("encode_1024_bins", |b| {
        b.iter(|| black_box(payload.encode().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_welch_frame,
    bench_segment_len,
    bench_raw_magnitudes,
    bench_payload_encode
);
criterion_main!(benches);
