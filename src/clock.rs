//! Host clock access.
//!
//! Host time is a monotonic tick counter independent of the audio device.
//! On macOS the ticks are `mach_absolute_time` units (the CoreAudio host
//! timebase); on other Unix systems they are `CLOCK_MONOTONIC` nanoseconds;
//! anywhere else they are nanoseconds since the first clock read.

use std::sync::OnceLock;

/// Seconds per host tick.
///
/// Computed once from the platform timer metadata and published through a
/// [`OnceLock`], so every thread sees either nothing or the final value.
pub fn tick_duration() -> f64 {
    static TICK_DURATION: OnceLock<f64> = OnceLock::new();
    *TICK_DURATION.get_or_init(platform::tick_duration)
}

/// Current host time in ticks.
#[inline]
pub fn host_time_now() -> u64 {
    platform::now()
}

#[cfg(target_os = "macos")]
mod platform {
    #[repr(C)]
    struct MachTimebaseInfo {
        numer: u32,
        denom: u32,
    }

    #[link(name = "System", kind = "dylib")]
    extern "C" {
        fn mach_absolute_time() -> u64;
        fn mach_timebase_info(info: *mut MachTimebaseInfo) -> i32;
    }

    pub(super) fn now() -> u64 {
        unsafe { mach_absolute_time() }
    }

    pub(super) fn tick_duration() -> f64 {
        let mut info = MachTimebaseInfo { numer: 0, denom: 0 };
        let status = unsafe { mach_timebase_info(&mut info) };
        if status != 0 || info.denom == 0 {
            // assume nanosecond ticks
            return 1e-9;
        }
        info.numer as f64 / info.denom as f64 * 1e-9
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
mod platform {
    pub(super) fn now() -> u64 {
        let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        // CLOCK_MONOTONIC cannot fail with a valid pointer
        unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
    }

    pub(super) fn tick_duration() -> f64 {
        1e-9
    }
}

#[cfg(not(unix))]
mod platform {
    use std::sync::OnceLock;
    use std::time::Instant;

    fn epoch() -> Instant {
        static EPOCH: OnceLock<Instant> = OnceLock::new();
        *EPOCH.get_or_init(Instant::now)
    }

    pub(super) fn now() -> u64 {
        epoch().elapsed().as_nanos() as u64
    }

    pub(super) fn tick_duration() -> f64 {
        1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_duration_is_stable() {
        let first = tick_duration();
        assert!(first > 0.0);
        assert_eq!(first, tick_duration());
    }

    #[test]
    fn test_tick_duration_same_across_threads() {
        let handles: Vec<_> = (0..4).map(|_| std::thread::spawn(tick_duration)).collect();
        let expected = tick_duration();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_host_time_is_monotonic() {
        let a = host_time_now();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let b = host_time_now();
        assert!(b > a);
    }
}
