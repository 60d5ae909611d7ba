//! Producer context stamped into every record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static NEXT_TID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static TID: u64 = NEXT_TID.fetch_add(1, Ordering::Relaxed);
}

/// Stable identifier of the calling thread. Never 0.
#[inline]
pub fn current_tid() -> u64 {
    TID.with(|tid| *tid)
}

/// Who wrote a record, and when.
#[derive(Debug, Clone, Copy)]
pub struct LogContext {
    /// Nanoseconds since `boot`.
    pub timestamp: u64,
    pub pid: u64,
    pub tid: u64,
}

impl LogContext {
    pub fn collect(boot: Instant) -> Self {
        Self {
            timestamp: boot.elapsed().as_nanos() as u64,
            pid: u64::from(std::process::id()),
            tid: current_tid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tid_is_stable_per_thread_and_unique() {
        let here = current_tid();
        assert_ne!(here, 0);
        assert_eq!(here, current_tid());
        let there = std::thread::spawn(current_tid).join().unwrap();
        assert_ne!(here, there);
    }
}
