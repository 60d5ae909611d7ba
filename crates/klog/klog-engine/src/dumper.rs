//! Drain thread: copies every record to the console and serial outputs.
//!
//! The dumper owns a reader whose notify callback signals a private
//! auto-reset event. After each wake it drains the reader completely. Once
//! shutdown is requested it does one final drain, so everything logged
//! before shutdown started is emitted.

use klog_record::{Record, render_drop_notice, render_record};
use klog_ring::{Event, Log, LogError, Sink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

pub const DUMPER_THREAD_NAME: &str = "debuglog-dumper";

pub(crate) struct Dumper {
    pub(crate) log: Arc<Log>,
    /// `None` when console output is disabled.
    pub(crate) console: Option<Arc<dyn Sink>>,
    pub(crate) serial: bool,
    pub(crate) event: Arc<Event>,
    pub(crate) shutdown_requested: Arc<AtomicBool>,
}

impl Dumper {
    pub(crate) fn run(self) -> i32 {
        let wake = Arc::clone(&self.event);
        let mut reader = self.log.attach(Some(Box::new(move || wake.signal())));
        debug!("{DUMPER_THREAD_NAME} attached as {:?}", reader.id());

        let mut rec = Record::default();
        let mut expected_sequence = 0u64;
        let mut emitted = 0u64;
        let mut done = false;

        while !done {
            self.event.wait();
            // Sampled after the wake so a shutdown signal still gets one full
            // drain.
            done = self.shutdown_requested.load(Ordering::Acquire);

            loop {
                match reader.read(0, &mut rec) {
                    Ok(_) => {}
                    Err(LogError::ShouldWait) => break,
                    Err(e) => {
                        warn!("{DUMPER_THREAD_NAME}: {e}");
                        break;
                    }
                }

                let gap = rec.header.sequence - expected_sequence;
                if gap > 0 {
                    self.emit(&render_drop_notice(gap));
                }
                expected_sequence = rec.header.sequence + 1;

                self.emit(&render_record(&rec.header, rec.text()));
                emitted += 1;
            }
        }

        reader.disconnect();
        debug!("{DUMPER_THREAD_NAME} exiting after {emitted} records");
        0
    }

    fn emit(&self, line: &str) {
        if let Some(console) = &self.console {
            console.write_str(line);
        }
        if self.serial {
            self.log.serial_write(line);
        }
    }
}
