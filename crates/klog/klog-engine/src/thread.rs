//! Named OS threads that can be joined against a deadline.
//!
//! `std::thread::JoinHandle::join` blocks forever. Each [`KernelThread`]
//! publishes its exit through a manual-reset [`Event`] instead, so a joiner
//! can give up at a deadline and leave the thread detached.

use klog_ring::{Event, Reset};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ThreadError {
    #[error("thread did not exit before the deadline")]
    TimedOut,

    #[error("thread panicked")]
    Panicked,
}

/// Signals the exit event when the thread body returns or unwinds.
struct ExitSignal(Arc<Event>);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        self.0.signal();
    }
}

pub struct KernelThread {
    name: String,
    exited: Arc<Event>,
    handle: JoinHandle<i32>,
}

impl KernelThread {
    /// Starts `body` on a new thread called `name`. The return value of
    /// `body` is the thread's exit code.
    pub fn spawn<F>(name: &str, body: F) -> io::Result<Self>
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        let exited = Arc::new(Event::new(Reset::Manual));
        let signal = ExitSignal(Arc::clone(&exited));
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let _signal = signal;
                body()
            })?;

        Ok(Self {
            name: name.to_owned(),
            exited,
            handle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_exited(&self) -> bool {
        self.exited.is_signaled()
    }

    /// Waits for the thread to finish, giving up at `deadline`.
    ///
    /// On timeout the thread keeps running, detached.
    pub fn join(self, deadline: Instant) -> Result<i32, ThreadError> {
        if !self.exited.wait_until(deadline) {
            return Err(ThreadError::TimedOut);
        }
        self.handle.join().map_err(|_| ThreadError::Panicked)
    }
}
