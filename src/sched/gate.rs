//! Binary activation gate
//!
//! Closed at creation. `post` opens it, `wait` blocks until it is open and
//! closes it again on the way out.

use parking_lot::{Condvar, Mutex};

pub(crate) struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self {
            open: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Open the gate, waking one waiter.
    pub(crate) fn post(&self) {
        let mut open = self.open.lock();
        *open = true;
        self.cv.notify_one();
    }

    /// Block until the gate is open, then close it.
    pub(crate) fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cv.wait(&mut open);
        }
        *open = false;
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        *self.open.lock()
    }
}
