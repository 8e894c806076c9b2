//! Timeline state owned by each side, plus the little that is shared.

use std::sync::{Mutex, OnceLock, PoisonError, TryLockError};

use crate::channel::TimelineMessage;
use crate::time::DualTimeStamp;

/// State the control thread wants the render thread to play.
///
/// `loop_end == 0` means no loop. `base_time` is the timestamp of timeline
/// position 0; the timeline is started iff it has a valid domain.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct DesiredState {
    pub loop_start: f64,
    pub loop_end: f64,
    pub base_time: DualTimeStamp,
    pub wait_start: DualTimeStamp,
    /// Position reported while stopped
    pub idle_time: f64,
}

impl DesiredState {
    pub fn message(&self) -> TimelineMessage {
        TimelineMessage {
            loop_start: self.loop_start,
            loop_end: self.loop_end,
            base_time: self.base_time,
            wait_start: self.wait_start,
        }
    }

    pub fn active_loop(&self) -> Option<(f64, f64)> {
        loop_window(self.loop_start, self.loop_end)
    }
}

/// The render thread's private copy of the desired state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct ShadowState {
    pub base_time: DualTimeStamp,
    pub loop_start: f64,
    pub loop_end: f64,
    pub wait_start: DualTimeStamp,
}

impl ShadowState {
    pub fn apply(&mut self, msg: TimelineMessage) {
        self.base_time = msg.base_time;
        self.loop_start = msg.loop_start;
        self.loop_end = msg.loop_end;
        self.wait_start = msg.wait_start;
    }

    pub fn active_loop(&self) -> Option<(f64, f64)> {
        loop_window(self.loop_start, self.loop_end)
    }
}

/// Loop bounds, if a loop that can actually advance is set.
///
/// `loop_end == 0` disables looping; an empty window is treated the same.
fn loop_window(loop_start: f64, loop_end: f64) -> Option<(f64, f64)> {
    (loop_end > 0.0 && loop_end > loop_start).then_some((loop_start, loop_end))
}

/// The most recent render call as seen by the control thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LastRender {
    pub timestamp: DualTimeStamp,
    pub frames: u32,
}

/// State visible to both threads.
#[derive(Default)]
pub(crate) struct Shared {
    /// Written once by the render thread
    anchor: OnceLock<DualTimeStamp>,
    last_render: Mutex<Option<LastRender>>,
}

impl Shared {
    pub fn anchor(&self) -> Option<DualTimeStamp> {
        self.anchor.get().copied()
    }

    /// Latch `timestamp` as the anchor if none is set yet.
    pub fn latch_anchor(&self, timestamp: DualTimeStamp) -> DualTimeStamp {
        debug_assert!(timestamp.is_resolved());
        *self.anchor.get_or_init(|| timestamp)
    }

    /// Record a render call. Skips the update rather than wait on the lock.
    ///
    /// A skipped update leaves the previous call's record in place, so a
    /// reader racing the render thread can see a timestamp one buffer old.
    pub fn record_render(&self, timestamp: DualTimeStamp, frames: u32) {
        let mut last = match self.last_render.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        *last = Some(LastRender { timestamp, frames });
    }

    pub fn last_render(&self) -> Option<LastRender> {
        *self.last_render.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_latches_once() {
        let shared = Shared::default();
        assert_eq!(shared.anchor(), None);

        let first = DualTimeStamp::with_sample_and_host(0.0, 10);
        assert_eq!(shared.latch_anchor(first), first);
        assert_eq!(shared.latch_anchor(DualTimeStamp::with_sample_and_host(5.0, 20)), first);
        assert_eq!(shared.anchor(), Some(first));
    }

    #[test]
    fn test_record_render() {
        let shared = Shared::default();
        assert_eq!(shared.last_render(), None);
        shared.record_render(DualTimeStamp::from_sample(64.0), 128);
        assert_eq!(
            shared.last_render(),
            Some(LastRender { timestamp: DualTimeStamp::from_sample(64.0), frames: 128 })
        );
    }

    #[test]
    fn test_contended_record_keeps_previous_render() {
        let shared = Shared::default();
        let first = LastRender { timestamp: DualTimeStamp::from_sample(0.0), frames: 64 };
        shared.record_render(first.timestamp, first.frames);

        let guard = shared.last_render.lock().unwrap();
        shared.record_render(DualTimeStamp::from_sample(64.0), 64);
        drop(guard);

        assert_eq!(shared.last_render(), Some(first));
    }

    #[test]
    fn test_active_loop() {
        let mut shadow = ShadowState::default();
        assert_eq!(shadow.active_loop(), None);
        shadow.loop_start = 20.0;
        shadow.loop_end = 50.0;
        assert_eq!(shadow.active_loop(), Some((20.0, 50.0)));
        shadow.loop_start = 50.0;
        assert_eq!(shadow.active_loop(), None);
    }

    #[test]
    fn test_desired_state_snapshot() {
        let desired = DesiredState {
            loop_start: 1.0,
            loop_end: 2.0,
            base_time: DualTimeStamp::from_host(3),
            wait_start: DualTimeStamp::from_sample(4.0),
            idle_time: 99.0,
        };
        let mut shadow = ShadowState::default();
        shadow.apply(desired.message());
        assert_eq!(shadow.base_time, desired.base_time);
        assert_eq!(shadow.wait_start, desired.wait_start);
        assert_eq!((shadow.loop_start, shadow.loop_end), (1.0, 2.0));
    }
}
