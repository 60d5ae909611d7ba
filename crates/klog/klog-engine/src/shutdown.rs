//! Stopping the background threads.
//!
//! Each thread has a latch. Whoever flips it first signals the thread's
//! wake event and joins; anyone arriving later just waits out the deadline,
//! because the first caller is presumably about to halt anyway.

use crate::thread::{KernelThread, ThreadError};
use klog_ring::Event;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::info;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ShutdownError {
    #[error("failed to join {name} thread")]
    Join {
        name: &'static str,
        #[source]
        source: ThreadError,
    },
}

/// A background thread plus the latch used to stop it.
pub(crate) struct ThreadSlot {
    name: &'static str,
    thread: Mutex<Option<KernelThread>>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ThreadSlot {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            thread: Mutex::new(None),
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// The latch handed to the thread body.
    pub(crate) fn latch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_requested)
    }

    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    pub(crate) fn install(&self, thread: KernelThread) {
        *self.lock() = Some(thread);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Requests the thread to stop, wakes it through `event` and joins it.
    ///
    /// A slot that never got a thread still has its latch set and returns
    /// `Ok`. A second request sleeps until `deadline` and returns `Ok`.
    pub(crate) fn shutdown(&self, event: &Event, deadline: Instant) -> Result<(), ShutdownError> {
        if self.shutdown_requested.swap(true, Ordering::AcqRel) {
            std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
            return Ok(());
        }

        event.signal();
        let Some(thread) = self.lock().take() else {
            return Ok(());
        };

        thread.join(deadline).map(|_| ()).map_err(|source| {
            info!("failed to join {} thread: {source}", self.name);
            ShutdownError::Join {
                name: self.name,
                source,
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<KernelThread>> {
        self.thread.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
