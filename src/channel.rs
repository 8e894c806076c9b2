//! Control-to-render message channel.
//!
//! The control thread pushes [`TimelineMessage`] snapshots into an `rtrb` ring
//! and the render thread drains them at the start of each render call.
//!
//! # Locking discipline
//!
//! The producer half belongs to the control thread and pushes without locking.
//! The consumer half sits behind a [`Mutex`] because *both* sides consume:
//! - The render thread drains with `try_lock()` and simply skips the refresh
//!   when the lock is busy. It never blocks.
//! - The control thread only takes the lock when the ring is full, to evict
//!   the oldest snapshots. Only the newest desired state matters, so dropping
//!   stale intermediates is safe.
//!
//! A skipped drain leaves the render thread at most one render period behind.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::time::DualTimeStamp;

/// Default number of snapshots the ring can hold.
pub const DEFAULT_MESSAGE_CAPACITY: usize = 32;

/// A by-value snapshot of the control thread's desired state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimelineMessage {
    pub loop_start: f64,
    pub loop_end: f64,
    pub base_time: DualTimeStamp,
    pub wait_start: DualTimeStamp,
}

/// Create a channel holding up to `capacity` snapshots.
pub(crate) fn message_channel(capacity: usize) -> (MessageSender, MessageReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity);
    let consumer = Arc::new(Mutex::new(consumer));
    (
        MessageSender {
            producer,
            consumer: Arc::clone(&consumer),
        },
        MessageReceiver { consumer },
    )
}

/// Control-thread end of the channel.
pub(crate) struct MessageSender {
    producer: Producer<TimelineMessage>,
    consumer: Arc<Mutex<Consumer<TimelineMessage>>>,
}

impl MessageSender {
    /// Enqueue a snapshot, evicting the oldest ones if the ring is full.
    ///
    /// May block briefly while the render thread holds the lock. Returns the
    /// number of snapshots evicted.
    pub fn send(&mut self, msg: TimelineMessage) -> usize {
        let mut pending = match self.producer.push(msg) {
            Ok(()) => return 0,
            Err(PushError::Full(m)) => m,
        };

        let mut consumer = self.consumer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut evicted = 0;
        loop {
            if consumer.pop().is_ok() {
                evicted += 1;
            }
            match self.producer.push(pending) {
                Ok(()) => break,
                Err(PushError::Full(m)) => pending = m,
            }
        }
        drop(consumer);

        tracing::trace!(evicted, "message ring full, dropped stale snapshots");
        evicted
    }

    /// Number of snapshots waiting to be drained.
    pub fn pending(&self) -> usize {
        self.producer.buffer().capacity() - self.producer.slots()
    }
}

/// Render-thread end of the channel.
pub(crate) struct MessageReceiver {
    consumer: Arc<Mutex<Consumer<TimelineMessage>>>,
}

impl MessageReceiver {
    /// Apply every pending snapshot in enqueue order.
    ///
    /// Returns `None` without blocking if the lock is contended, otherwise
    /// the number of snapshots applied.
    pub fn drain(&self, mut apply: impl FnMut(TimelineMessage)) -> Option<usize> {
        let mut consumer: MutexGuard<'_, _> = match self.consumer.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };

        let mut applied = 0;
        while let Ok(msg) = consumer.pop() {
            apply(msg);
            applied += 1;
        }
        Some(applied)
    }

    #[cfg(test)]
    pub(crate) fn lock_handle(&self) -> Arc<Mutex<Consumer<TimelineMessage>>> {
        Arc::clone(&self.consumer)
    }
}
