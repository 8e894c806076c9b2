//! Sample-accurate playback timeline for real-time audio.
//!
//! A [`Timeline`] reconciles two clocks: the host's monotonic tick counter and
//! the audio device's sample counter. It gives a control thread (which may
//! block) and a render thread (which must not) one shared notion of "current
//! playback position", with optional looping.
//!
//! - The control thread owns a [`TimelineControl`]: start, stop, seek, loop.
//! - The render thread owns a [`TimelineRenderer`]: once per audio buffer it
//!   picks up the latest control state, works out where in the timeline the
//!   buffer falls, and hands the buffer to a [`SegmentCallback`] in one or more
//!   loop-bounded segments.
//!
//! Commands cross threads as value snapshots through a fixed-size ring. The
//! render thread never waits on a lock; if the ring is busy it keeps the state
//! it already has until the next buffer.
//!
//! ```no_run
//! use sample_timeline::{DualTimeStamp, Timeline};
//!
//! let timeline = Timeline::new(48_000.0, |ts: &DualTimeStamp, frames: u32| {
//!     // synthesize `frames` frames starting at timeline position `ts.sample_time()`
//!     let _ = (ts, frames);
//! })
//! .unwrap();
//! let (mut control, mut renderer) = timeline.split();
//!
//! std::thread::spawn(move || {
//!     let mut sample = 0.0;
//!     loop {
//!         let now = sample_timeline::host_time_now();
//!         renderer.render(&DualTimeStamp::with_sample_and_host(sample, now), 512);
//!         sample += 512.0;
//!         std::thread::sleep(std::time::Duration::from_micros(10_667));
//!     }
//! });
//!
//! control.set_loop(0.0, 96_000.0);
//! control.start();
//! ```

mod channel;
mod clock;
mod control;
mod error;
mod render;
mod state;
mod time;
mod timeline;

pub use channel::{TimelineMessage, DEFAULT_MESSAGE_CAPACITY};
pub use clock::{host_time_now, tick_duration};
pub use control::TimelineControl;
pub use error::{Result, TimelineError};
pub use render::{SegmentCallback, TimelineRenderer};
pub use time::{safe_subtract, Domains, DualTimeStamp};
pub use timeline::{Timeline, TimelineConfig, DEFAULT_START_POLL_INTERVAL};
