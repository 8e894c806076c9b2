use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sample_timeline::{DualTimeStamp, Timeline};

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("render() looped, 512 frames", |b| {
        let mut timeline = Timeline::new(48_000.0, |ts: &DualTimeStamp, frames: u32| {
            black_box((ts, frames));
        })
        .unwrap();
        timeline.set_render_state(0.0, 0.0, 100.0, DualTimeStamp::with_sample_and_host(0.0, 1));
        let (_control, mut renderer) = timeline.split();

        let mut sample = 0.0;
        b.iter(move || {
            renderer.render(&DualTimeStamp::with_sample_and_host(sample, 1), 512);
            sample += 512.0;
        })
    });

    c.bench_function("render() linear, 512 frames", |b| {
        let mut timeline = Timeline::new(48_000.0, |ts: &DualTimeStamp, frames: u32| {
            black_box((ts, frames));
        })
        .unwrap();
        timeline.set_render_state(0.0, 0.0, 0.0, DualTimeStamp::with_sample_and_host(0.0, 1));
        let (_control, mut renderer) = timeline.split();

        let mut sample = 0.0;
        b.iter(move || {
            renderer.render(&DualTimeStamp::with_sample_and_host(sample, 1), 512);
            sample += 512.0;
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
