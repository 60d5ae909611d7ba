//! Wait/signal events backed by a process-wide scheduler lock.
//!
//! Every [`Event`] shares the same [`SchedulerLock`]. The lock records which
//! thread holds it, so code that may run with the lock already held (the log
//! write path) can pick [`Event::signal_locked`] instead of
//! [`Event::signal`], which would otherwise deadlock.
//!
//! # Reset Modes
//!
//! - **Auto**: a successful `wait` consumes the signal.
//! - **Manual**: the event stays signaled until `unsignal`.

use crate::context::current_tid;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// The scheduler-wide lock every event waits under.
pub static THREAD_LOCK: SchedulerLock = SchedulerLock::new();

/// A blocking lock that remembers its holder.
pub struct SchedulerLock {
    mutex: Mutex<()>,
    /// Thread id of the holder, 0 when free.
    holder: AtomicU64,
}

/// Proof that the current thread holds a [`SchedulerLock`].
pub struct SchedulerGuard<'a> {
    lock: &'a SchedulerLock,
    inner: Option<MutexGuard<'a, ()>>,
}

impl SchedulerLock {
    pub const fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            holder: AtomicU64::new(0),
        }
    }

    pub fn lock(&self) -> SchedulerGuard<'_> {
        let inner = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        self.holder.store(current_tid(), Ordering::Relaxed);
        SchedulerGuard {
            lock: self,
            inner: Some(inner),
        }
    }

    /// Whether the calling thread currently holds this lock.
    ///
    /// Only the holder ever stores its own id, so a match cannot be stale.
    #[inline]
    pub fn held_by_current(&self) -> bool {
        self.holder.load(Ordering::Relaxed) == current_tid()
    }
}

impl Default for SchedulerLock {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerGuard<'_> {
    fn wait(&mut self, cond: &Condvar) {
        self.lock.holder.store(0, Ordering::Relaxed);
        if let Some(inner) = self.inner.take() {
            let inner = cond.wait(inner).unwrap_or_else(PoisonError::into_inner);
            self.inner = Some(inner);
        }
        self.lock.holder.store(current_tid(), Ordering::Relaxed);
    }

    /// Returns `false` once `deadline` has passed.
    fn wait_until(&mut self, cond: &Condvar, deadline: Instant) -> bool {
        let Some(timeout) = deadline.checked_duration_since(Instant::now()) else {
            return false;
        };
        self.lock.holder.store(0, Ordering::Relaxed);
        if let Some(inner) = self.inner.take() {
            let (inner, _) = cond
                .wait_timeout(inner, timeout)
                .unwrap_or_else(PoisonError::into_inner);
            self.inner = Some(inner);
        }
        self.lock.holder.store(current_tid(), Ordering::Relaxed);
        true
    }
}

impl Drop for SchedulerGuard<'_> {
    fn drop(&mut self) {
        self.lock.holder.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reset {
    Auto,
    Manual,
}

pub struct Event {
    /// Only mutated while `THREAD_LOCK` is held.
    signaled: AtomicBool,
    cond: Condvar,
    reset: Reset,
}

impl Event {
    pub const fn new(reset: Reset) -> Self {
        Self {
            signaled: AtomicBool::new(false),
            cond: Condvar::new(),
            reset,
        }
    }

    /// Blocks until the event is signaled.
    pub fn wait(&self) {
        let mut guard = THREAD_LOCK.lock();
        while !self.signaled.load(Ordering::Relaxed) {
            guard.wait(&self.cond);
        }
        self.consume();
    }

    /// Blocks until the event is signaled or `deadline` passes.
    ///
    /// Returns `true` if the event was signaled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut guard = THREAD_LOCK.lock();
        while !self.signaled.load(Ordering::Relaxed) {
            if !guard.wait_until(&self.cond, deadline) {
                return false;
            }
        }
        self.consume();
        true
    }

    pub fn signal(&self) {
        let _guard = THREAD_LOCK.lock();
        self.signal_locked();
    }

    /// Signals the event from a context that already holds [`THREAD_LOCK`].
    pub fn signal_locked(&self) {
        debug_assert!(THREAD_LOCK.held_by_current(), "THREAD_LOCK not held");
        self.signaled.store(true, Ordering::Relaxed);
        match self.reset {
            Reset::Auto => self.cond.notify_one(),
            Reset::Manual => self.cond.notify_all(),
        }
    }

    pub fn unsignal(&self) {
        let _guard = THREAD_LOCK.lock();
        self.signaled.store(false, Ordering::Relaxed);
    }

    pub fn is_signaled(&self) -> bool {
        let _guard = THREAD_LOCK.lock();
        self.signaled.load(Ordering::Relaxed)
    }

    fn consume(&self) {
        if self.reset == Reset::Auto {
            self.signaled.store(false, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn auto_event_consumes_signal() {
        let ev = Event::new(Reset::Auto);
        ev.signal();
        ev.wait();
        assert!(!ev.is_signaled());
        assert!(!ev.wait_until(Instant::now() + Duration::from_millis(10)));
    }

    #[test]
    fn manual_event_stays_signaled() {
        let ev = Event::new(Reset::Manual);
        ev.signal();
        ev.wait();
        assert!(ev.is_signaled());
        ev.unsignal();
        assert!(!ev.is_signaled());
    }

    #[test]
    fn signal_wakes_waiting_thread() {
        let ev = Arc::new(Event::new(Reset::Auto));
        let waiter = {
            let ev = Arc::clone(&ev);
            std::thread::spawn(move || ev.wait_until(Instant::now() + Duration::from_secs(5)))
        };
        std::thread::sleep(Duration::from_millis(20));
        ev.signal();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn holder_is_tracked_per_thread() {
        assert!(!THREAD_LOCK.held_by_current());
        let guard = THREAD_LOCK.lock();
        assert!(THREAD_LOCK.held_by_current());
        let elsewhere = std::thread::spawn(|| THREAD_LOCK.held_by_current())
            .join()
            .unwrap();
        assert!(!elsewhere);

        let ev = Event::new(Reset::Auto);
        ev.signal_locked();
        drop(guard);
        assert!(!THREAD_LOCK.held_by_current());
        assert!(ev.is_signaled());
    }
}
