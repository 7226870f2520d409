use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{GraphError, Result};

/// Millisecond clock that never hands out the same value twice.
///
/// Each tick is `max(wall_clock_ms, last + 1)`, so writes issued within one
/// millisecond still order deterministically.
#[derive(Debug, Default)]
pub(crate) struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn tick(&self) -> i64 {
        let now = wall_clock_ms();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Pushes the clock past an explicitly supplied timestamp.
    pub(crate) fn observe(&self, timestamp: i64) {
        self.last.fetch_max(timestamp, Ordering::AcqRel);
    }
}

/// Rejects an explicit timestamp the clock could not tick past.
pub(crate) fn check_explicit_timestamp(timestamp: Option<i64>) -> Result<()> {
    match timestamp {
        Some(ts) if ts == i64::MAX => Err(GraphError::InvalidArgument(format!(
            "explicit timestamp {ts} leaves no room for later commits"
        ))),
        _ => Ok(()),
    }
}

fn wall_clock_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
