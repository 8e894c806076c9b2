//! Drives a timeline from a simulated audio thread and plays with it from main.
//!
//! Run with `cargo run --example looped_playback`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use sample_timeline::{host_time_now, DualTimeStamp, Timeline};
use tracing::{info, Level};

const SAMPLE_RATE: f64 = 48_000.0;
const BLOCK: u32 = 480;

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let timeline = Timeline::new(SAMPLE_RATE, |ts: &DualTimeStamp, frames: u32| {
        tracing::trace!(position = ?ts.sample_time(), frames, "segment");
    })
    .expect("valid sample rate");
    let (mut control, mut renderer) = timeline.split();

    let running = Arc::new(AtomicBool::new(true));
    let audio_running = running.clone();
    let audio = std::thread::spawn(move || {
        let mut sample = 0.0;
        while audio_running.load(Ordering::Relaxed) {
            renderer.render(&DualTimeStamp::with_sample_and_host(sample, host_time_now()), BLOCK);
            sample += BLOCK as f64;
            // 480 frames @ 48kHz = 10ms
            sleep(Duration::from_millis(10));
        }
    });

    // Loop the first half second
    control.set_loop(0.0, SAMPLE_RATE / 2.0);
    control.start();

    for _ in 0..10 {
        sleep(Duration::from_millis(100));
        info!(position = control.time(), "playing");
    }

    control.set_time(SAMPLE_RATE / 4.0);
    info!(position = control.time(), "seeked");
    sleep(Duration::from_millis(200));

    control.stop();
    info!(position = control.time(), "stopped");

    running.store(false, Ordering::Relaxed);
    audio.join().expect("audio thread panicked");
}
