use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Millisecond wall clock that never repeats or goes backwards within one process.
///
/// Every call returns `max(now_ms, previous + 1)`, so two mutations landing in the
/// same millisecond still get distinct, increasing `updated_at` values.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self { Self::default() }

    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self.last.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return DateTime::from_timestamp_millis(next).unwrap_or_else(Utc::now),
                Err(actual) => prev = actual,
            }
        }
    }
}
