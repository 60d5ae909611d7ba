//! Fan-out thread: turns the log's readiness event into reader callbacks.
//!
//! Producers only signal one event. Running the callbacks here keeps them
//! off the write path, which may not be allowed to block.

use klog_ring::Log;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub const NOTIFIER_THREAD_NAME: &str = "debuglog-notifier";

pub(crate) struct Notifier {
    pub(crate) log: Arc<Log>,
    pub(crate) shutdown_requested: Arc<AtomicBool>,
}

impl Notifier {
    pub(crate) fn run(self) -> i32 {
        debug!("{NOTIFIER_THREAD_NAME} running");
        while !self.shutdown_requested.load(Ordering::Acquire) {
            self.log.event().wait();
            self.log.notify_readers();
        }
        debug!("{NOTIFIER_THREAD_NAME} exiting");
        0
    }
}
