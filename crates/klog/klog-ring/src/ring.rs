//! Ring geometry and cursor arithmetic.
//!
//! The ring is addressed by ever-increasing byte counters (`head`, `tail`
//! and each reader's private tail). A counter maps to a physical offset by
//! masking with `capacity - 1`, which is why the capacity must be a power
//! of two.

use klog_record::MAX_RECORD;

/// Default ring size in bytes (128 KiB).
pub const DEFAULT_CAPACITY: usize = 128 * 1024;

/// Configuration for the log's byte ring.
#[derive(Debug, Copy, Clone)]
pub struct RingConfig {
    /// Ring size in bytes. Power of two, at least one maximal record.
    pub capacity: usize,
}

impl RingConfig {
    /// Creates a ring configuration with the specified capacity.
    ///
    /// # Panics
    /// Panics if `capacity` is not a power of two or cannot hold a maximal
    /// record. Use [`RingConfig::is_valid_capacity`] to check first.
    ///
    /// # Example
    /// ```
    /// use klog_ring::RingConfig;
    /// let cfg = RingConfig::new(4096);
    /// assert_eq!(cfg.mask(), 4095);
    /// ```
    pub fn new(capacity: usize) -> Self {
        assert!(
            Self::is_valid_capacity(capacity),
            "capacity must be a power of two and at least {MAX_RECORD} bytes"
        );
        Self { capacity }
    }

    pub const fn is_valid_capacity(capacity: usize) -> bool {
        capacity.is_power_of_two() && capacity >= MAX_RECORD
    }

    /// Returns the bitmask for counter-to-offset conversion.
    #[inline(always)]
    pub fn mask(&self) -> u64 {
        (self.capacity as u64) - 1
    }

    /// Physical offset of a byte counter.
    ///
    /// ```text
    /// capacity = 4096, mask = 0xFFF
    /// counter =  100 → 100
    /// counter = 4096 → 0     (wraps around)
    /// counter = 5000 → 904
    /// ```
    #[inline(always)]
    pub fn index(&self, counter: u64) -> usize {
        (counter & self.mask()) as usize
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Returns the tail a reader should continue from.
///
/// A reader is lapped when its private tail lies before the oldest record
/// still in the ring, i.e. `head - tail < head - read_tail`. In that case it
/// snaps forward to the global tail; the skipped records show up as a jump in
/// sequence numbers on the next read.
///
/// ```text
/// head = 9000, tail = 5000, read_tail = 4000
///
/// live   = 9000 - 5000 = 4000
/// behind = 9000 - 4000 = 5000
/// 4000 < 5000, so the reader was lapped and resumes at 5000
/// ```
#[inline(always)]
pub fn resync_lapped(head: u64, tail: u64, read_tail: u64) -> u64 {
    if head.wrapping_sub(tail) < head.wrapping_sub(read_tail) {
        tail
    } else {
        read_tail
    }
}
