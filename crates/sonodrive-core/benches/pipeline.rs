use criterion::{criterion_group, criterion_main, Criterion};
use sonodrive_core::{AnalysisConfig, AudioProcessor, AudioProcessorParams};
use std::f32::consts::PI;
use std::hint::black_box;

fn bench_process(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut processor = AudioProcessor::new(config, AudioProcessorParams::default())
        .expect("default config is valid");

    let frames: Vec<Vec<f32>> = (0..64)
        .map(|f| {
            (0..config.frame_size)
                .map(|i| {
                    let t = (f * config.frame_size + i) as f32 / config.sample_rate as f32;
                    (2.0 * PI * 220.0 * t).sin() * 0.3 + (2.0 * PI * 3300.0 * t).sin() * 0.1
                })
                .collect()
        })
        .collect();

    let mut next = 0;
    c.bench_function("audio_processor_frame", |b| {
        b.iter(|| {
            processor
                .process(black_box(&frames[next % frames.len()]))
                .expect("frame size matches");
            next += 1;
        })
    });
}

criterion_group!(benches, bench_process);
criterion_main!(benches);
