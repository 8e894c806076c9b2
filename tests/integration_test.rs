use sample_timeline::{
    host_time_now, DualTimeStamp, SegmentCallback, Timeline, TimelineError, TimelineRenderer,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{sleep, JoinHandle};
use std::time::Duration;

const RATE: f64 = 48_000.0;
const BLOCK: u32 = 64;

#[derive(Default)]
struct Recorder {
    segments: Vec<(f64, u32)>,
}

impl SegmentCallback for Recorder {
    fn segment(&mut self, timestamp: &DualTimeStamp, frames: u32) {
        self.segments.push((timestamp.sample_time().unwrap(), frames));
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Stands in for an audio driver: renders a block every 500us with a running
/// sample counter and the real host clock.
fn spawn_driver(
    mut renderer: TimelineRenderer<Recorder>,
    running: Arc<AtomicBool>,
) -> JoinHandle<TimelineRenderer<Recorder>> {
    std::thread::spawn(move || {
        let mut sample = 0.0;
        while running.load(Ordering::Relaxed) {
            let now = DualTimeStamp::with_sample_and_host(sample, host_time_now());
            renderer.render(&now, BLOCK);
            sample += BLOCK as f64;
            sleep(Duration::from_micros(500));
        }
        renderer
    })
}

#[test]
/// start() from the control thread waits for the driver, then playback stays in the loop
fn looped_playback_across_threads() {
    init_tracing();
    let timeline = Timeline::new(RATE, Recorder::default()).unwrap();
    let (mut control, renderer) = timeline.split();

    let running = Arc::new(AtomicBool::new(true));
    let driver = spawn_driver(renderer, running.clone());

    control.set_loop(0.0, 100.0);
    control.start();
    assert!(control.is_started());

    sleep(Duration::from_millis(30));
    running.store(false, Ordering::Relaxed);
    let renderer = driver.join().unwrap();

    let segments = &renderer.callback().segments;
    assert!(!segments.is_empty(), "nothing rendered after start");
    for &(position, frames) in segments {
        assert!(position >= 0.0 && position < 100.0, "position {} escaped loop", position);
        assert!(
            position + frames as f64 <= 100.0,
            "segment ({}, {}) crosses loop end",
            position,
            frames
        );
    }
}

#[test]
/// Positions advance contiguously when not looping
fn linear_playback_is_contiguous() {
    init_tracing();
    let timeline = Timeline::new(RATE, Recorder::default()).unwrap();
    let (mut control, renderer) = timeline.split();

    let running = Arc::new(AtomicBool::new(true));
    let driver = spawn_driver(renderer, running.clone());

    control.set_time(1_000.0);
    control.start();

    sleep(Duration::from_millis(20));
    running.store(false, Ordering::Relaxed);
    let renderer = driver.join().unwrap();

    let segments = &renderer.callback().segments;
    assert!(!segments.is_empty(), "nothing rendered after start");
    assert!(segments[0].0 >= 1_000.0, "playback started before the seek position");
    for pair in segments.windows(2) {
        assert_eq!(pair[0].0 + pair[0].1 as f64, pair[1].0);
    }
}

#[test]
/// A flood of control messages never stalls the render thread and the latest state wins
fn command_flood_keeps_latest_state() {
    init_tracing();
    let timeline = Timeline::new(RATE, Recorder::default()).unwrap();
    let (mut control, renderer) = timeline.split();

    let running = Arc::new(AtomicBool::new(true));
    let driver = spawn_driver(renderer, running.clone());

    control.start();
    for i in 1..=5_000 {
        control.set_loop(0.0, (i % 97 + 1) as f64);
    }
    control.set_loop(0.0, 32.0);

    sleep(Duration::from_millis(10));
    running.store(false, Ordering::Relaxed);
    let mut renderer = driver.join().unwrap();

    renderer.callback_mut().segments.clear();
    renderer.render(&DualTimeStamp::with_sample_and_host(1e9, host_time_now()), 256);
    let segments = &renderer.callback().segments;
    let total: u32 = segments.iter().map(|s| s.1).sum();
    assert_eq!(total, 256);
    assert!(segments.iter().all(|&(position, frames)| position + frames as f64 <= 32.0));
}

#[test]
fn start_times_out_without_driver() {
    let timeline = Timeline::new(RATE, Recorder::default()).unwrap();
    let (mut control, _renderer) = timeline.split();

    let result = control.start_with_timeout(Duration::from_millis(10));
    assert_eq!(result, Err(TimelineError::RenderNotStarted(Duration::from_millis(10))));
    assert!(!control.is_started());
}

#[test]
/// stop() freezes the reported position and silences rendering
fn stop_freezes_position() {
    init_tracing();
    let timeline = Timeline::new(RATE, Recorder::default()).unwrap();
    let (mut control, renderer) = timeline.split();

    let running = Arc::new(AtomicBool::new(true));
    let driver = spawn_driver(renderer, running.clone());

    control.start();
    sleep(Duration::from_millis(5));
    control.stop();
    let stopped_at = control.idle_time();
    assert!(!control.is_started());
    assert_eq!(control.time(), stopped_at);

    sleep(Duration::from_millis(5));
    assert_eq!(control.time(), stopped_at);

    running.store(false, Ordering::Relaxed);
    let mut renderer = driver.join().unwrap();
    renderer.callback_mut().segments.clear();
    renderer.render(&DualTimeStamp::with_sample_and_host(1e9, host_time_now()), BLOCK);
    assert!(renderer.callback().segments.is_empty());
    assert!(!renderer.is_playing());
}
