//! Monotonic time source and absolute-time arithmetic
//!
//! Every periodic task works in absolute instants on the monotonic clock:
//! activation times and deadlines are computed by adding offsets, never by
//! sleeping for relative amounts, so execution jitter does not accumulate.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

/// Resolution for [`Clock::systime`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Micro,
    Milli,
}

/// Monotonic clock anchored at the instant it was started
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    t0: Instant,
}

impl Clock {
    /// Start a clock at the current instant
    pub fn start() -> Self {
        Self { t0: Instant::now() }
    }

    /// Anchor instant
    #[inline]
    pub fn t0(&self) -> Instant {
        self.t0
    }

    /// Current instant on the monotonic clock
    #[inline]
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    /// Time elapsed since the anchor, in the requested unit
    pub fn systime(&self, unit: TimeUnit) -> u64 {
        self.since_start(Instant::now(), unit)
    }

    /// Offset of `t` from the anchor, in the requested unit (0 if `t` is earlier)
    pub fn since_start(&self, t: Instant, unit: TimeUnit) -> u64 {
        let elapsed = t.saturating_duration_since(self.t0);
        match unit {
            TimeUnit::Micro => u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            TimeUnit::Milli => u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

/// `t + ms` milliseconds
#[inline]
pub fn add_ms(t: Instant, ms: u64) -> Instant {
    t + Duration::from_millis(ms)
}

/// Three-way comparison of two absolute instants
#[inline]
pub fn time_cmp(a: Instant, b: Instant) -> Ordering {
    a.cmp(&b)
}

/// True iff `now` is strictly later than `deadline`
#[inline]
pub fn is_past(now: Instant, deadline: Instant) -> bool {
    time_cmp(now, deadline) == Ordering::Greater
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ms_is_exact() {
        let t = Instant::now();
        let later = add_ms(t, 40);
        assert_eq!(later.duration_since(t), Duration::from_millis(40));
        assert_eq!(add_ms(add_ms(t, 999), 1), add_ms(t, 1000));
    }

    #[test]
    fn test_time_cmp() {
        let t = Instant::now();
        let u = add_ms(t, 1);
        assert_eq!(time_cmp(t, u), Ordering::Less);
        assert_eq!(time_cmp(u, t), Ordering::Greater);
        assert_eq!(time_cmp(t, t), Ordering::Equal);
    }

    #[test]
    fn test_is_past_is_strict() {
        let t = Instant::now();
        assert!(!is_past(t, t));
        assert!(is_past(add_ms(t, 1), t));
        assert!(!is_past(t, add_ms(t, 1)));
    }

    #[test]
    fn test_systime_units() {
        let clock = Clock::start();
        let later = add_ms(clock.t0(), 1500);
        assert_eq!(clock.since_start(later, TimeUnit::Milli), 1500);
        assert_eq!(clock.since_start(later, TimeUnit::Micro), 1_500_000);
        // Instants before the anchor clamp to zero
        assert_eq!(clock.since_start(clock.t0(), TimeUnit::Milli), 0);
    }
}
