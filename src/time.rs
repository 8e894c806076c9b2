//! Dual-domain timestamps and conversion between the host and sample clocks.
//!
//! A [`DualTimeStamp`] may carry a sample-domain position, a host-domain tick
//! count, both, or neither. Conversions between the two domains go through an
//! *anchor*: one stamp with both domains populated that correlates the device
//! sample counter with the host clock for the whole session.

use crate::clock::{host_time_now, tick_duration};

/// A point in time expressed in the sample domain, the host domain, or both.
///
/// The default value has neither domain and is treated as "invalid".
///
/// ```
/// use sample_timeline::{DualTimeStamp, Domains};
///
/// let stamp = DualTimeStamp::from_sample(512.0);
/// assert!(stamp.is_sample_valid());
/// assert!(!stamp.is_host_valid());
/// assert!(matches!(stamp.domains(), Domains::Sample(s) if s == 512.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DualTimeStamp {
    sample: Option<f64>,
    host: Option<u64>,
}

/// Exhaustive view of which domains a [`DualTimeStamp`] carries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Domains {
    /// No domain is valid
    Neither,
    /// Only the sample domain is valid
    Sample(f64),
    /// Only the host domain is valid
    Host(u64),
    /// Both domains are valid
    Both { sample: f64, host: u64 },
}

impl DualTimeStamp {
    /// A stamp with neither domain valid.
    pub const INVALID: Self = Self { sample: None, host: None };

    /// Build a stamp from optional domain values.
    pub const fn new(sample: Option<f64>, host: Option<u64>) -> Self {
        Self { sample, host }
    }

    /// A stamp valid only in the sample domain.
    pub const fn from_sample(sample: f64) -> Self {
        Self { sample: Some(sample), host: None }
    }

    /// A stamp valid only in the host domain.
    pub const fn from_host(host: u64) -> Self {
        Self { sample: None, host: Some(host) }
    }

    /// A stamp valid in both domains.
    pub const fn with_sample_and_host(sample: f64, host: u64) -> Self {
        Self { sample: Some(sample), host: Some(host) }
    }

    /// The current host time as a host-only stamp.
    pub fn now() -> Self {
        Self::from_host(host_time_now())
    }

    #[inline]
    pub fn sample_time(&self) -> Option<f64> {
        self.sample
    }

    #[inline]
    pub fn host_time(&self) -> Option<u64> {
        self.host
    }

    #[inline]
    pub fn is_sample_valid(&self) -> bool {
        self.sample.is_some()
    }

    #[inline]
    pub fn is_host_valid(&self) -> bool {
        self.host.is_some()
    }

    /// At least one domain is valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.sample.is_some() || self.host.is_some()
    }

    /// Both domains are valid.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.sample.is_some() && self.host.is_some()
    }

    pub fn domains(&self) -> Domains {
        match (self.sample, self.host) {
            (None, None) => Domains::Neither,
            (Some(sample), None) => Domains::Sample(sample),
            (None, Some(host)) => Domains::Host(host),
            (Some(sample), Some(host)) => Domains::Both { sample, host },
        }
    }

    /// Move the stamp by `delta_samples` in every valid domain.
    ///
    /// The host domain moves by the equivalent number of ticks, rounded. A
    /// negative move larger than the current host value leaves the host
    /// component untouched instead of wrapping.
    pub fn offset(self, delta_samples: f64, sample_rate: f64) -> Self {
        let sample = self.sample.map(|s| s + delta_samples);
        let host = self.host.map(|h| {
            let ticks = samples_to_ticks(delta_samples, sample_rate);
            h.checked_add_signed(ticks).unwrap_or(h)
        });
        Self { sample, host }
    }

    /// Fill in the missing domain using `anchor` as the correlation point.
    ///
    /// Stamps that are already resolved come back unchanged. Calling this with
    /// an invalid stamp or an unresolved anchor is a caller bug; debug builds
    /// panic, release builds return the stamp as given.
    pub fn extrapolate(self, anchor: &DualTimeStamp, sample_rate: f64) -> Self {
        let Domains::Both { sample: anchor_sample, host: anchor_host } = anchor.domains() else {
            debug_assert!(false, "extrapolate needs a resolved anchor, got {:?}", anchor);
            return self;
        };

        match self.domains() {
            Domains::Neither => {
                debug_assert!(false, "extrapolate needs at least one valid domain");
                self
            }
            Domains::Both { .. } => self,
            Domains::Sample(sample) => {
                let ticks = samples_to_ticks(sample - anchor_sample, sample_rate);
                Self::with_sample_and_host(sample, anchor_host.saturating_add_signed(ticks))
            }
            Domains::Host(host) => {
                let seconds = safe_subtract(host, anchor_host) as f64 * tick_duration();
                Self::with_sample_and_host(anchor_sample + (seconds * sample_rate).round(), host)
            }
        }
    }
}

/// Signed difference `a - b` of two host times without unsigned underflow.
#[inline]
pub fn safe_subtract(a: u64, b: u64) -> i64 {
    if a >= b {
        (a - b) as i64
    } else {
        -((b - a) as i64)
    }
}

#[inline]
fn samples_to_ticks(samples: f64, sample_rate: f64) -> i64 {
    (samples / sample_rate / tick_duration()).round() as i64
}
