//! Control-thread half of the timeline.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::channel::MessageSender;
use crate::error::{Result, TimelineError};
use crate::state::{DesiredState, LastRender, ShadowState, Shared};
use crate::time::DualTimeStamp;

/// The control-thread end of a [`Timeline`](crate::Timeline).
///
/// Every command computes a new desired state and hands a copy of it to the
/// render thread, which picks it up at the start of its next render call.
/// None of these methods are real-time safe; call them from a thread that is
/// allowed to block.
///
/// # Example
///
/// ```
/// use sample_timeline::{DualTimeStamp, Timeline};
///
/// let timeline = Timeline::new(44_100.0, |_: &DualTimeStamp, _: u32| {}).unwrap();
/// let (mut control, mut renderer) = timeline.split();
///
/// // The audio driver calls this once per buffer
/// renderer.render(&DualTimeStamp::with_sample_and_host(0.0, 1_000), 512);
///
/// control.set_loop(0.0, 44_100.0);
/// control.start();
/// assert!(control.is_started());
/// ```
pub struct TimelineControl {
    desired: DesiredState,
    sender: MessageSender,
    shared: Arc<Shared>,
    sample_rate: f64,
    start_poll_interval: Duration,
}

impl TimelineControl {
    pub(crate) fn new(
        sender: MessageSender,
        shared: Arc<Shared>,
        sample_rate: f64,
        start_poll_interval: Duration,
    ) -> Self {
        Self {
            desired: DesiredState::default(),
            sender,
            shared,
            sample_rate,
            start_poll_interval,
        }
    }

    /// Start playback at the beginning of the next render buffer.
    ///
    /// Blocks until the render thread has run at least once, polling at the
    /// configured interval. There is no timeout; if the audio driver never
    /// calls [`render`](crate::TimelineRenderer::render) this never returns.
    /// Use [`start_with_timeout`](Self::start_with_timeout) to bound the wait.
    ///
    /// The start boundary comes from the last render call the render thread
    /// managed to record. That record is skipped when its lock is contended,
    /// so the boundary can be one buffer stale, in which case up to one
    /// buffer's worth of the start is not rendered.
    ///
    /// Must not be called from the render thread.
    pub fn start(&mut self) {
        let last = self
            .wait_for_render(None)
            .unwrap_or_else(|| unreachable!("unbounded wait returned"));
        self.start_after(last);
    }

    /// Like [`start`](Self::start), but gives up after `timeout`.
    pub fn start_with_timeout(&mut self, timeout: Duration) -> Result<()> {
        let last = self
            .wait_for_render(Some(Instant::now() + timeout))
            .ok_or(TimelineError::RenderNotStarted(timeout))?;
        self.start_after(last);
        Ok(())
    }

    fn wait_for_render(&self, deadline: Option<Instant>) -> Option<LastRender> {
        tracing::debug!(?deadline, "waiting for first render call");
        loop {
            if let Some(last) = self.shared.last_render().filter(|last| last.frames > 0) {
                return Some(last);
            }
            let mut nap = self.start_poll_interval;
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::warn!("no render call observed before start deadline");
                    return None;
                }
                nap = nap.min(remaining);
            }
            thread::sleep(nap);
        }
    }

    fn start_after(&mut self, last: LastRender) {
        let next_render = last.timestamp.offset(last.frames as f64, self.sample_rate);
        self.start_at_time(next_render);
    }

    /// Start playback from the idle position at `time`.
    ///
    /// Does nothing if already started. Frames before `time` are not rendered.
    pub fn start_at_time(&mut self, time: DualTimeStamp) {
        if self.is_started() {
            tracing::trace!("start ignored, timeline already started");
            return;
        }
        let time = self.resolve(time);
        self.desired.wait_start = time;
        tracing::debug!(position = self.desired.idle_time, ?time, "starting timeline");
        self.set_state(
            self.desired.idle_time,
            self.desired.loop_start,
            self.desired.loop_end,
            time,
        );
    }

    /// Loop the window `[start, start + duration)`. A zero duration disables looping.
    ///
    /// # Panics
    ///
    /// Panics if `start` or `duration` is negative.
    pub fn set_loop(&mut self, start: f64, duration: f64) {
        assert!(
            start >= 0.0 && duration >= 0.0,
            "loop start and duration must be non-negative (start={}, duration={})",
            start,
            duration
        );
        self.desired.loop_start = start;
        self.desired.loop_end = start + duration;
        tracing::debug!(start, end = self.desired.loop_end, "loop set");
        self.synchronize();
    }

    /// Playback position at `time`, in samples.
    ///
    /// Returns the idle position while stopped or before the render thread
    /// has correlated the clocks. With an active loop, positions at or past
    /// the loop end are wrapped into the loop window.
    pub fn time_at_time(&self, time: DualTimeStamp) -> f64 {
        if !self.is_started() {
            return self.desired.idle_time;
        }
        let Some(anchor) = self.shared.anchor() else {
            return self.desired.idle_time;
        };
        if !time.is_valid() {
            debug_assert!(false, "time_at_time needs a timestamp with a valid domain");
            return self.desired.idle_time;
        }

        let base = self.desired.base_time.extrapolate(&anchor, self.sample_rate);
        let time = time.extrapolate(&anchor, self.sample_rate);
        let (Some(base_sample), Some(sample)) = (base.sample_time(), time.sample_time()) else {
            return self.desired.idle_time;
        };

        let elapsed = sample - base_sample;
        match self.desired.active_loop() {
            Some((loop_start, loop_end)) if elapsed >= loop_end => {
                loop_start + (elapsed - loop_start) % (loop_end - loop_start)
            }
            _ => elapsed,
        }
    }

    /// Current playback position, in samples.
    pub fn time(&self) -> f64 {
        self.time_at_time(DualTimeStamp::now())
    }

    /// Stop playback, keeping the current position as the idle position.
    pub fn stop(&mut self) {
        self.desired.idle_time = self.time();
        self.desired.base_time = DualTimeStamp::INVALID;
        self.desired.wait_start = DualTimeStamp::INVALID;
        tracing::debug!(position = self.desired.idle_time, "stopping timeline");
        self.synchronize();
    }

    /// Move playback so that position `sample_time` plays at `time`.
    pub fn set_time_at_time(&mut self, sample_time: f64, time: DualTimeStamp) {
        self.desired.wait_start = DualTimeStamp::INVALID;
        self.set_state(sample_time, self.desired.loop_start, self.desired.loop_end, time);
    }

    /// Seek to `sample_time`: immediately if started, otherwise the idle
    /// position is updated and used by the next start.
    pub fn set_time(&mut self, sample_time: f64) {
        if self.is_started() {
            self.set_time_at_time(sample_time, DualTimeStamp::now());
        } else {
            self.desired.idle_time = sample_time;
        }
    }

    /// Whether playback has been started.
    #[inline]
    pub fn is_started(&self) -> bool {
        self.desired.base_time.is_valid()
    }

    /// Set the full playback state: position `sample_time` plays at `time`
    /// with the given loop bounds.
    ///
    /// # Panics
    ///
    /// Panics if `time` has no valid domain.
    pub fn set_state(
        &mut self,
        sample_time: f64,
        loop_start: f64,
        loop_end: f64,
        time: DualTimeStamp,
    ) {
        self.desired.base_time = self.base_time_for(sample_time, time);
        self.desired.loop_start = loop_start;
        self.desired.loop_end = loop_end;
        self.synchronize();
    }

    /// Same as [`set_state`](Self::set_state) but without messaging; returns
    /// the shadow state the render thread should adopt directly.
    pub(crate) fn set_render_state(
        &mut self,
        sample_time: f64,
        loop_start: f64,
        loop_end: f64,
        time: DualTimeStamp,
    ) -> ShadowState {
        let base_time = self.base_time_for(sample_time, time);
        self.desired.base_time = base_time;
        self.desired.loop_start = loop_start;
        self.desired.loop_end = loop_end;
        self.desired.wait_start = DualTimeStamp::INVALID;
        ShadowState {
            base_time,
            loop_start,
            loop_end,
            wait_start: DualTimeStamp::INVALID,
        }
    }

    fn base_time_for(&self, sample_time: f64, time: DualTimeStamp) -> DualTimeStamp {
        assert!(time.is_valid(), "playback state needs a timestamp with a valid domain");
        self.resolve(time.offset(-sample_time, self.sample_rate))
    }

    /// Send the current desired state to the render thread.
    pub fn synchronize(&mut self) {
        let evicted = self.sender.send(self.desired.message());
        tracing::trace!(evicted, pending = self.sender.pending(), "timeline state sent");
    }

    fn resolve(&self, time: DualTimeStamp) -> DualTimeStamp {
        match self.shared.anchor() {
            Some(anchor) if time.is_valid() => time.extrapolate(&anchor, self.sample_rate),
            _ => time,
        }
    }

    /// Position reported while stopped.
    #[inline]
    pub fn idle_time(&self) -> f64 {
        self.desired.idle_time
    }

    #[inline]
    pub fn loop_start(&self) -> f64 {
        self.desired.loop_start
    }

    /// End of the loop window, `0.0` when not looping.
    #[inline]
    pub fn loop_end(&self) -> f64 {
        self.desired.loop_end
    }

    /// Timestamp of timeline position 0, invalid while stopped.
    #[inline]
    pub fn base_time(&self) -> DualTimeStamp {
        self.desired.base_time
    }

    #[inline]
    pub fn wait_start(&self) -> DualTimeStamp {
        self.desired.wait_start
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// The clock correlation point, once the render thread has run.
    pub fn anchor_time(&self) -> Option<DualTimeStamp> {
        self.shared.anchor()
    }

    /// Messages not yet picked up by the render thread.
    pub fn pending_messages(&self) -> usize {
        self.sender.pending()
    }
}
