//! Linux-specific platform implementation.

use std::io;
use std::time::{Duration, Instant};

use libc::{
    CLOCK_MONOTONIC, EINTR, SCHED_FIFO, TIMER_ABSTIME, c_int, clock_gettime, clock_nanosleep,
    pthread_self, pthread_setschedparam, sched_param, timespec,
};

use super::SchedPolicy;

/// Remaining time below which we spin instead of sleeping
const SPIN_TAIL: Duration = Duration::from_micros(80);

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Move the calling thread into the fixed-priority class.
pub(crate) fn apply_priority(policy: SchedPolicy, priority: u8) -> io::Result<()> {
    if policy == SchedPolicy::Other {
        return Ok(());
    }

    let param = sched_param {
        sched_priority: c_int::from(priority),
    };
    // SAFETY: pthread_self() names the calling thread and `param` outlives the call.
    let rc = unsafe { pthread_setschedparam(pthread_self(), SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    Ok(())
}

/// Sleep until `target` on the monotonic clock.
///
/// Uses an absolute clock_nanosleep for the bulk of the wait and busy-spins
/// the final ~80 microseconds. Returns at once if `target` has already passed.
pub(crate) fn sleep_until(target: Instant) {
    // Read the raw clock first: the wake-up point lands no later than `target`
    let Some(base) = monotonic_now() else {
        spin_until(target);
        return;
    };
    let now = Instant::now();
    if target <= now {
        return;
    }

    let remaining = target.duration_since(now);
    if remaining > SPIN_TAIL {
        let wake = add_duration(base, remaining - SPIN_TAIL);
        loop {
            // SAFETY: `wake` is a valid timespec and a null remainder pointer is allowed.
            let rc = unsafe {
                clock_nanosleep(CLOCK_MONOTONIC, TIMER_ABSTIME, &wake, std::ptr::null_mut())
            };
            match rc {
                0 => break,
                // Same absolute target, so retrying cannot drift
                EINTR => continue,
                _ => {
                    log::trace!("clock_nanosleep returned {rc}");
                    break;
                }
            }
        }
    }

    spin_until(target);
}

fn spin_until(target: Instant) {
    while Instant::now() < target {
        std::hint::spin_loop();
    }
}

fn monotonic_now() -> Option<timespec> {
    let mut ts = timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec.
    let rc = unsafe { clock_gettime(CLOCK_MONOTONIC, &mut ts) };
    (rc == 0).then_some(ts)
}

fn add_duration(ts: timespec, d: Duration) -> timespec {
    let mut sec = ts.tv_sec as i64 + d.as_secs() as i64;
    let mut nsec = ts.tv_nsec as i64 + i64::from(d.subsec_nanos());
    if nsec >= NANOS_PER_SEC {
        sec += 1;
        nsec -= NANOS_PER_SEC;
    }
    timespec {
        tv_sec: sec as libc::time_t,
        tv_nsec: nsec as libc::c_long,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_duration_carries_nanoseconds() {
        let ts = timespec {
            tv_sec: 5,
            tv_nsec: 900_000_000,
        };
        let sum = add_duration(ts, Duration::from_millis(250));
        assert_eq!(sum.tv_sec, 6);
        assert_eq!(sum.tv_nsec, 150_000_000);
    }

    #[test]
    fn test_sleep_until_never_wakes_early() {
        for ms in [1, 3, 7] {
            let target = Instant::now() + Duration::from_millis(ms);
            sleep_until(target);
            assert!(Instant::now() >= target);
        }
    }

    #[test]
    fn test_past_target_returns_at_once() {
        let start = Instant::now();
        sleep_until(start);
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}
