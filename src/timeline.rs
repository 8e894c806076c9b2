//! Timeline construction and configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::channel::{message_channel, DEFAULT_MESSAGE_CAPACITY};
use crate::control::TimelineControl;
use crate::error::{Result, TimelineError};
use crate::render::{SegmentCallback, TimelineRenderer};
use crate::state::Shared;
use crate::time::DualTimeStamp;

/// How often [`TimelineControl::start`] checks for the first render call
pub const DEFAULT_START_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Fixed-for-life timeline settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineConfig {
    /// Device sample rate in Hz
    pub sample_rate: f64,
    /// Number of state snapshots the control-to-render ring can hold
    pub message_capacity: usize,
    /// Poll interval while waiting for the first render call
    pub start_poll_interval: Duration,
}

impl TimelineConfig {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            message_capacity: DEFAULT_MESSAGE_CAPACITY,
            start_poll_interval: DEFAULT_START_POLL_INTERVAL,
        }
    }

    /// Set the message ring capacity (builder pattern).
    pub fn with_message_capacity(mut self, capacity: usize) -> Self {
        self.message_capacity = capacity;
        self
    }

    /// Set the start poll interval (builder pattern).
    pub fn with_start_poll_interval(mut self, interval: Duration) -> Self {
        self.start_poll_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(TimelineError::InvalidSampleRate(self.sample_rate));
        }
        if self.message_capacity == 0 {
            return Err(TimelineError::ZeroCapacity);
        }
        Ok(())
    }
}

/// A sample-accurate playback timeline.
///
/// A `Timeline` is built in one piece and then [`split`](Self::split) into a
/// [`TimelineControl`] for the control thread and a [`TimelineRenderer`] for
/// the audio thread. Before splitting, both halves are reachable from one
/// thread, which is what [`set_render_state`](Self::set_render_state) needs.
///
/// # Example
///
/// ```
/// use sample_timeline::{DualTimeStamp, Timeline};
///
/// let mut timeline = Timeline::new(44_100.0, |ts: &DualTimeStamp, frames: u32| {
///     println!("render {} frames at {:?}", frames, ts.sample_time());
/// })
/// .unwrap();
///
/// // Play from position 0, looping the first 100 samples, right away
/// timeline.set_render_state(0.0, 0.0, 100.0, DualTimeStamp::with_sample_and_host(0.0, 1));
///
/// let (control, mut renderer) = timeline.split();
/// renderer.render(&DualTimeStamp::with_sample_and_host(0.0, 1), 150); // two segments
/// assert!(control.is_started());
/// ```
pub struct Timeline<C> {
    control: TimelineControl,
    renderer: TimelineRenderer<C>,
}

impl<C: SegmentCallback> Timeline<C> {
    /// Create a timeline with default settings at `sample_rate`.
    pub fn new(sample_rate: f64, callback: C) -> Result<Self> {
        Self::with_config(TimelineConfig::new(sample_rate), callback)
    }

    pub fn with_config(config: TimelineConfig, callback: C) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = message_channel(config.message_capacity);
        let shared = Arc::new(Shared::default());
        tracing::debug!(
            sample_rate = config.sample_rate,
            capacity = config.message_capacity,
            "timeline created"
        );

        Ok(Self {
            control: TimelineControl::new(
                sender,
                Arc::clone(&shared),
                config.sample_rate,
                config.start_poll_interval,
            ),
            renderer: TimelineRenderer::new(receiver, shared, config.sample_rate, callback),
        })
    }

    /// Set the playback state on both halves at once, bypassing the channel.
    ///
    /// Meant for initialising the render side before audio starts; it writes
    /// the render thread's state directly, which is only sound because `self`
    /// still owns both halves.
    ///
    /// # Panics
    ///
    /// Panics if `time` has no valid domain.
    pub fn set_render_state(
        &mut self,
        sample_time: f64,
        loop_start: f64,
        loop_end: f64,
        time: DualTimeStamp,
    ) {
        let shadow = self.control.set_render_state(sample_time, loop_start, loop_end, time);
        self.renderer.set_shadow(shadow);
    }

    pub fn control(&self) -> &TimelineControl {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut TimelineControl {
        &mut self.control
    }

    pub fn renderer_mut(&mut self) -> &mut TimelineRenderer<C> {
        &mut self.renderer
    }

    /// Hand the two halves to their threads.
    pub fn split(self) -> (TimelineControl, TimelineRenderer<C>) {
        (self.control, self.renderer)
    }
}
