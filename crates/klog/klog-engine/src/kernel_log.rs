//! The assembled debug log: ring, notifier, dumper, and their shutdown.
//!
//! ```text
//!  producers ──write──► Log ──event──► notifier ──notify──► readers
//!                                                    │
//!                                                    └──► dumper ──► console / serial
//! ```

use crate::dumper::{DUMPER_THREAD_NAME, Dumper};
use crate::notifier::{NOTIFIER_THREAD_NAME, Notifier};
use crate::shutdown::{ShutdownError, ThreadSlot};
use crate::thread::KernelThread;
use klog_config::{ConfigError, KlogConfig};
use klog_record::Severity;
use klog_ring::{DlogReader, Event, Log, LogError, NotifyFn, Reset, Sink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{error, info, warn};

pub struct KernelLog {
    log: Arc<Log>,
    console: Arc<dyn Sink>,
    console_enabled: bool,
    serial_enabled: bool,
    dumper_wanted: bool,
    started: AtomicBool,
    notifier: ThreadSlot,
    dumper: ThreadSlot,
    dumper_event: Arc<Event>,
}

impl KernelLog {
    /// Builds the log described by `config`. No threads are started yet.
    ///
    /// `serial` also receives bypass-mode writes, so it is attached even
    /// when `config.serial` disables the dumper's serial output.
    pub fn new(
        config: &KlogConfig,
        console: Arc<dyn Sink>,
        serial: Arc<dyn Sink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let log = Arc::new(Log::new(config.ring(), serial));
        if config.bypass {
            log.enable_bypass_mode();
        }

        Ok(Self {
            log,
            console,
            console_enabled: config.console,
            serial_enabled: config.serial,
            dumper_wanted: config.wants_dumper(),
            started: AtomicBool::new(false),
            notifier: ThreadSlot::new(NOTIFIER_THREAD_NAME),
            dumper: ThreadSlot::new(DUMPER_THREAD_NAME),
            dumper_event: Arc::new(Event::new(Reset::Auto)),
        })
    }

    /// Starts the notifier, and the dumper if any output is enabled.
    ///
    /// Only the first call does anything.
    pub fn start_threads(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("debuglog threads already started");
            return;
        }
        if self.notifier.is_shutdown_requested() || self.dumper.is_shutdown_requested() {
            warn!("debuglog already shut down, not starting threads");
            return;
        }

        let notifier = Notifier {
            log: Arc::clone(&self.log),
            shutdown_requested: self.notifier.latch(),
        };
        match KernelThread::spawn(self.notifier.name(), move || notifier.run()) {
            Ok(thread) => self.notifier.install(thread),
            Err(e) => error!("failed to start {NOTIFIER_THREAD_NAME}: {e}"),
        }

        if !self.dumper_wanted {
            info!("no debuglog output enabled, {DUMPER_THREAD_NAME} not started");
            return;
        }

        let dumper = Dumper {
            log: Arc::clone(&self.log),
            console: self.console_enabled.then(|| Arc::clone(&self.console)),
            serial: self.serial_enabled,
            event: Arc::clone(&self.dumper_event),
            shutdown_requested: self.dumper.latch(),
        };
        match KernelThread::spawn(self.dumper.name(), move || dumper.run()) {
            Ok(thread) => self.dumper.install(thread),
            Err(e) => error!("failed to start {DUMPER_THREAD_NAME}: {e}"),
        }
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_running()
    }

    pub fn has_dumper(&self) -> bool {
        self.dumper.is_running()
    }

    /// The underlying ring.
    pub fn ring(&self) -> &Arc<Log> {
        &self.log
    }

    pub fn write(&self, severity: u8, flags: u8, text: &[u8]) -> Result<(), LogError> {
        self.log.write(severity, flags, text)
    }

    /// Logs `text`, sending it straight to serial if the ring refuses it.
    /// In panic mode it also goes to the console.
    pub fn log(&self, severity: Severity, text: &str) {
        if self.log.write(severity.into(), 0, text.as_bytes()).is_ok() {
            return;
        }
        if self.console_enabled && self.log.is_panicked() {
            self.console.write_str(text);
        }
        self.log.serial_write(text);
    }

    pub fn attach(&self, notify: Option<NotifyFn>) -> DlogReader {
        self.log.attach(notify)
    }

    /// Stops accepting records, then stops the notifier and the dumper, in
    /// that order.
    ///
    /// The dumper drains everything written before this call. Both joins are
    /// attempted; the first failure is returned.
    pub fn shutdown(&self, deadline: Instant) -> Result<(), ShutdownError> {
        info!("shutting down debuglog");
        self.log.shutdown();

        let notifier = self.notifier.shutdown(self.log.event(), deadline);
        let dumper = self.dumper.shutdown(&self.dumper_event, deadline);
        notifier.and(dumper)
    }

    pub fn force_panic_mode(&self) {
        self.log.force_panic_mode();
    }

    pub fn enable_bypass_mode(&self) {
        self.log.enable_bypass_mode();
    }

    /// Writes directly to the serial output.
    pub fn serial_write(&self, text: &str) {
        self.log.serial_write(text);
    }
}

static GLOBAL: OnceLock<KernelLog> = OnceLock::new();

/// Installs the process-wide log. Later calls return the existing one.
pub fn init_global(
    config: &KlogConfig,
    console: Arc<dyn Sink>,
    serial: Arc<dyn Sink>,
) -> Result<&'static KernelLog, ConfigError> {
    if let Some(existing) = GLOBAL.get() {
        warn!("global debuglog already initialized");
        return Ok(existing);
    }
    let log = KernelLog::new(config, console, serial)?;
    Ok(GLOBAL.get_or_init(|| log))
}

pub fn global() -> Option<&'static KernelLog> {
    GLOBAL.get()
}

/// Formats a message into a [`KernelLog`].
///
/// ```ignore
/// klog!(kernel_log, Severity::Info, "mounted {} volumes", n);
/// ```
#[macro_export]
macro_rules! klog {
    ($log:expr, $severity:expr, $($arg:tt)*) => {
        $log.log($severity, &::std::format!($($arg)*))
    };
}
