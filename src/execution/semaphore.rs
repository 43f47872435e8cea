use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A small, blocking counting semaphore bounding in-flight chunks.
pub struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        assert!(permits > 0, "permits must be > 0");
        Self {
            permits: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Acquire one permit, blocking until available.
    ///
    /// Returns the time spent waiting (zero if a permit was free).
    pub fn acquire(&self) -> Duration {
        let start = Instant::now();
        let mut permits = self.permits.lock().expect("semaphore mutex poisoned");
        if *permits > 0 {
            *permits -= 1;
            return Duration::ZERO;
        }
        permits = self
            .cv
            .wait_while(permits, |p| *p == 0)
            .expect("semaphore mutex poisoned");
        *permits -= 1;
        start.elapsed()
    }

    /// Release one permit.
    pub fn release(&self) {
        *self.permits.lock().expect("semaphore mutex poisoned") += 1;
        self.cv.notify_one();
    }
}
