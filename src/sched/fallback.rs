//! Fallback platform implementation for non-Linux systems.

use std::io;
use std::time::Instant;

use super::SchedPolicy;

/// Only the default OS class is available here.
pub(crate) fn apply_priority(policy: SchedPolicy, _priority: u8) -> io::Result<()> {
    match policy {
        SchedPolicy::Other => Ok(()),
        SchedPolicy::Fifo => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "fixed-priority scheduling is only available on Linux",
        )),
    }
}

/// Sleep until `target` using the standard library.
pub(crate) fn sleep_until(target: Instant) {
    let now = Instant::now();
    if target > now {
        std::thread::sleep(target - now);
    }
}
