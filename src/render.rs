//! Render-thread half of the timeline.
//!
//! [`TimelineRenderer::render`] is called once per audio buffer by the audio
//! driver. It never blocks and never allocates: pending control messages are
//! drained with a `try_lock`, and the loop splitting below is bounded by the
//! buffer's frame count.

use std::sync::Arc;

use crate::channel::MessageReceiver;
use crate::clock::host_time_now;
use crate::state::{ShadowState, Shared};
use crate::time::{Domains, DualTimeStamp};

/// Receives the contiguous segments of each render call.
///
/// Called zero or more times per render call, in time order. `timestamp` is
/// timeline-relative: its sample time is the playback position of the first
/// frame in the segment, already wrapped into the loop window. A segment ends
/// at the first whole frame at or past the loop end, so with a fractional
/// playback position it can overrun the loop end by less than one frame.
///
/// Any `FnMut(&DualTimeStamp, u32)` closure works:
///
/// ```
/// use sample_timeline::{DualTimeStamp, Timeline};
///
/// let mut timeline = Timeline::new(48_000.0, |ts: &DualTimeStamp, frames: u32| {
///     let _position = ts.sample_time();
///     let _ = frames;
/// })
/// .unwrap();
/// timeline.renderer_mut().render(&DualTimeStamp::with_sample_and_host(0.0, 1), 256);
/// ```
pub trait SegmentCallback: Send + 'static {
    fn segment(&mut self, timestamp: &DualTimeStamp, frames: u32);
}

impl<F> SegmentCallback for F
where
    F: FnMut(&DualTimeStamp, u32) + Send + 'static,
{
    #[inline]
    fn segment(&mut self, timestamp: &DualTimeStamp, frames: u32) {
        self(timestamp, frames)
    }
}

/// The render-thread end of a [`Timeline`](crate::Timeline).
///
/// Owns the shadow copy of the playback state; only [`render`](Self::render)
/// mutates it.
pub struct TimelineRenderer<C> {
    shadow: ShadowState,
    receiver: MessageReceiver,
    shared: Arc<Shared>,
    sample_rate: f64,
    callback: C,
}

impl<C: SegmentCallback> TimelineRenderer<C> {
    pub(crate) fn new(
        receiver: MessageReceiver,
        shared: Arc<Shared>,
        sample_rate: f64,
        callback: C,
    ) -> Self {
        Self {
            shadow: ShadowState::default(),
            receiver,
            shared,
            sample_rate,
            callback,
        }
    }

    /// Render one device buffer of `frames` frames starting at `timestamp`.
    ///
    /// Must not be called concurrently with itself, and timestamps must not
    /// go backwards.
    pub fn render(&mut self, timestamp: &DualTimeStamp, frames: u32) {
        let shadow = &mut self.shadow;
        if self.receiver.drain(|msg| shadow.apply(msg)).is_none() {
            tracing::trace!("message drain deferred, lock contended");
        }

        let Some((device_time, anchor)) = self.resolve_device_time(timestamp) else {
            return;
        };
        self.shared.record_render(device_time, frames);

        // Idle
        let base_time = match self.shadow.base_time.domains() {
            Domains::Neither => return,
            Domains::Both { .. } => self.shadow.base_time,
            Domains::Sample(_) | Domains::Host(_) => {
                let resolved = self.shadow.base_time.extrapolate(&anchor, self.sample_rate);
                self.shadow.base_time = resolved;
                resolved
            }
        };
        let (Some(base_sample), Some(device_sample)) =
            (base_time.sample_time(), device_time.sample_time())
        else {
            return;
        };

        let wait_offset = match self.shadow.wait_start.domains() {
            Domains::Neither => 0.0,
            Domains::Sample(wait) | Domains::Both { sample: wait, .. } => wait - base_sample,
            Domains::Host(_) => {
                let resolved = self.shadow.wait_start.extrapolate(&anchor, self.sample_rate);
                self.shadow.wait_start = resolved;
                resolved.sample_time().map_or(0.0, |wait| wait - base_sample)
            }
        }
        .max(0.0);

        let mut player_time =
            DualTimeStamp::new(Some(device_sample - base_sample), device_time.host_time());
        let mut frames_left = frames;

        let frames_early = wait_offset - (device_sample - base_sample);
        if frames_early > 0.0 {
            let skipped = frames_early.ceil();
            if skipped >= frames as f64 {
                return;
            }
            frames_left -= skipped as u32;
            player_time = player_time.offset(skipped, self.sample_rate);
        }

        if frames_left == 0 {
            return;
        }

        let Some((loop_start, loop_end)) = self.shadow.active_loop() else {
            self.callback.segment(&player_time, frames_left);
            return;
        };

        let loop_duration = loop_end - loop_start;
        let mut unlooped = player_time.sample_time().unwrap_or_default();

        while frames_left > 0 {
            if unlooped >= loop_end {
                let wrapped = loop_start + (unlooped - loop_start) % loop_duration;
                player_time = DualTimeStamp::new(Some(wrapped), player_time.host_time());
            }
            let position = player_time.sample_time().unwrap_or(unlooped);
            let until_loop_end = (loop_end - position).ceil().max(1.0);
            let segment = frames_left.min(until_loop_end as u32);

            self.callback.segment(&player_time, segment);

            player_time = player_time.offset(segment as f64, self.sample_rate);
            frames_left -= segment;
            unlooped += segment as f64;
        }
    }

    /// Latch the anchor on the first call and fill in both domains of the
    /// device timestamp.
    fn resolve_device_time(
        &self,
        timestamp: &DualTimeStamp,
    ) -> Option<(DualTimeStamp, DualTimeStamp)> {
        let anchor = match (self.shared.anchor(), timestamp.domains()) {
            (_, Domains::Neither) => {
                debug_assert!(false, "render needs a device timestamp with a valid domain");
                return None;
            }
            (Some(anchor), _) => anchor,
            (None, Domains::Both { .. }) => self.shared.latch_anchor(*timestamp),
            (None, Domains::Host(host)) => {
                self.shared.latch_anchor(DualTimeStamp::with_sample_and_host(0.0, host))
            }
            (None, Domains::Sample(sample)) => {
                let host = host_time_now();
                self.shared.latch_anchor(DualTimeStamp::with_sample_and_host(sample, host))
            }
        };
        Some((timestamp.extrapolate(&anchor, self.sample_rate), anchor))
    }

    /// Whether the render thread currently has a started timeline.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.shadow.base_time.is_valid()
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn callback(&self) -> &C {
        &self.callback
    }

    pub fn callback_mut(&mut self) -> &mut C {
        &mut self.callback
    }

    pub(crate) fn set_shadow(&mut self, shadow: ShadowState) {
        self.shadow = shadow;
    }

    #[cfg(test)]
    pub(crate) fn receiver(&self) -> &MessageReceiver {
        &self.receiver
    }
}
