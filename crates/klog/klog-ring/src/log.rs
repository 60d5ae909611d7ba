//! The debug log: a byte ring of variable-length records shared by any number
//! of producers and a handful of readers.
//!
//! # Layout
//!
//! `head` and `tail` are ever-increasing byte counters; the physical offset is
//! `counter & (capacity - 1)`. `tail` is the oldest record still stored,
//! `head` is where the next record goes.
//!
//! ```text
//!       T                     T
//!  [....XXXX....]  [XX........XX]
//!           H         H
//! ```
//!
//! # Locking
//!
//! Two domains, never nested in opposite orders:
//! - `state` (spin lock): head, tail, data, sequence counter, shutdown flag.
//!   Held only for the memory copies of a single record.
//! - `readers` (blocking mutex): the reader registry. Held while notify
//!   callbacks run, which may do arbitrary work.
//!
//! Producers never block. When the ring is full the oldest records are
//! discarded to make room; readers learn about it from sequence gaps.

use crate::context::LogContext;
use crate::event::{Event, Reset, THREAD_LOCK};
use crate::reader::{DlogReader, NotifyFn, ReaderId};
use crate::ring::RingConfig;
use crate::sink::{SerialPort, Sink};
use klog_record::{
    HEADER_SIZE, MAX_DATA, Preamble, RecordError, RecordHeader, peek_preamble, wire_size,
    write_wrapped,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::debug;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LogError {
    /// The log has been shut down or frozen by a panic.
    #[error("debug log no longer accepts records")]
    BadState,

    /// No record is available right now.
    #[error("no record available")]
    ShouldWait,

    #[error("corrupt record in ring")]
    Corrupt(#[from] RecordError),
}

/// Point-in-time view of the ring counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStats {
    pub capacity: usize,
    pub head: u64,
    pub tail: u64,
    /// Sequence number the next record will get.
    pub next_sequence: u64,
    pub readers: usize,
}

impl LogStats {
    /// Bytes currently occupied by records.
    pub fn live_bytes(&self) -> u64 {
        self.head - self.tail
    }
}

pub(crate) struct LogState {
    pub(crate) data: Box<[u8]>,
    pub(crate) head: u64,
    pub(crate) tail: u64,
    sequence: u64,
    shutdown_requested: bool,
}

#[derive(Default)]
pub(crate) struct ReaderRegistry {
    next_id: u64,
    entries: BTreeMap<ReaderId, Option<NotifyFn>>,
}

impl ReaderRegistry {
    fn register(&mut self, notify: Option<NotifyFn>) -> ReaderId {
        let id = ReaderId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, notify);
        id
    }

    pub(crate) fn remove(&mut self, id: ReaderId) -> bool {
        self.entries.remove(&id).is_some()
    }

    fn notify(&self, id: ReaderId) {
        if let Some(Some(notify)) = self.entries.get(&id) {
            notify();
        }
    }

    fn notify_all(&self) {
        for notify in self.entries.values().flatten() {
            notify();
        }
    }
}

pub struct Log {
    pub(crate) config: RingConfig,
    pub(crate) state: spin::Mutex<LogState>,
    readers: Mutex<ReaderRegistry>,
    /// Signaled after every successful write.
    event: Event,
    panic: AtomicBool,
    bypass: AtomicBool,
    /// Mirrors `LogState::shutdown_requested` for the bypass path, which
    /// never takes the primary lock.
    shutdown: AtomicBool,
    serial: SerialPort,
    boot: Instant,
}

impl Log {
    /// Creates an empty log. `serial` receives bypass-mode writes and the
    /// dumper's output.
    pub fn new(config: RingConfig, serial: Arc<dyn Sink>) -> Self {
        Self {
            config,
            state: spin::Mutex::new(LogState {
                data: vec![0u8; config.capacity].into_boxed_slice(),
                head: 0,
                tail: 0,
                sequence: 0,
                shutdown_requested: false,
            }),
            readers: Mutex::new(ReaderRegistry::default()),
            event: Event::new(Reset::Auto),
            panic: AtomicBool::new(false),
            bypass: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            serial: SerialPort::new(serial),
            boot: Instant::now(),
        }
    }

    pub fn config(&self) -> RingConfig {
        self.config
    }

    /// Appends a record, discarding the oldest ones if there is no room.
    ///
    /// `text` is truncated to [`MAX_DATA`] bytes. Never blocks.
    ///
    /// # Errors
    /// [`LogError::BadState`] once the log is shut down or in panic mode.
    pub fn write(&self, severity: u8, flags: u8, text: &[u8]) -> Result<(), LogError> {
        let text = &text[..text.len().min(MAX_DATA)];

        if self.panic.load(Ordering::Acquire) || self.shutdown.load(Ordering::Acquire) {
            return Err(LogError::BadState);
        }
        if self.bypass.load(Ordering::Acquire) {
            self.serial_write(&String::from_utf8_lossy(text));
            return Ok(());
        }

        let wiresize = wire_size(text.len());
        let ctx = LogContext::collect(self.boot);
        let mut hdr = RecordHeader {
            preamble: Preamble::new(wiresize, HEADER_SIZE + text.len()).0,
            datalen: text.len() as u16,
            severity,
            flags,
            timestamp: ctx.timestamp,
            pid: ctx.pid,
            tid: ctx.tid,
            sequence: 0,
        };

        let holding_thread_lock = {
            let mut state = self.state.lock();
            if state.shutdown_requested {
                return Err(LogError::BadState);
            }
            hdr.sequence = state.sequence;

            let limit = (self.config.capacity - wiresize) as u64;
            while state.head - state.tail > limit {
                let oldest = peek_preamble(&state.data, self.config.index(state.tail));
                state.tail += oldest.fifo_len() as u64;
            }

            let offset = self.config.index(state.head);
            write_wrapped(&mut state.data, offset, &hdr.encode(), text);
            state.head += wiresize as u64;
            state.sequence += 1;

            // Sampled before the lock is released so it cannot be confused
            // with another thread taking THREAD_LOCK afterwards.
            THREAD_LOCK.held_by_current()
        };

        if holding_thread_lock {
            self.event.signal_locked();
        } else {
            self.event.signal();
        }
        Ok(())
    }

    /// Stops accepting records. Readers and threads are left alone.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown_requested = true;
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Freezes the log: every later write fails and output goes straight to
    /// serial. Irreversible.
    pub fn force_panic_mode(&self) {
        self.bypass.store(true, Ordering::Release);
        self.panic.store(true, Ordering::Release);
    }

    pub fn is_panicked(&self) -> bool {
        self.panic.load(Ordering::Acquire)
    }

    /// Routes writes directly to serial, skipping the ring.
    pub fn enable_bypass_mode(&self) {
        self.bypass.store(true, Ordering::Release);
    }

    pub fn is_bypass(&self) -> bool {
        self.bypass.load(Ordering::Acquire)
    }

    /// Writes to the serial collaborator through its serialization point.
    pub fn serial_write(&self, text: &str) {
        self.serial.write(text, self.is_bypass());
    }

    /// Readiness event, signaled after every successful write.
    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn stats(&self) -> LogStats {
        let readers = self.lock_readers().entries.len();
        let state = self.state.lock();
        LogStats {
            capacity: self.config.capacity,
            head: state.head,
            tail: state.tail,
            next_sequence: state.sequence,
            readers,
        }
    }

    /// Registers a new reader positioned at the oldest stored record.
    ///
    /// If the ring already holds records, `notify` is invoked once right away
    /// so the backlog is not missed.
    pub fn attach(self: &Arc<Self>, notify: Option<NotifyFn>) -> DlogReader {
        let mut readers = self.lock_readers();
        let id = readers.register(notify);

        let (tail, backlog) = {
            let state = self.state.lock();
            (state.tail, state.tail != state.head)
        };

        if backlog {
            readers.notify(id);
        }
        drop(readers);
        debug!(reader = id.0, tail, backlog, "reader attached");

        DlogReader::new(Arc::clone(self), id, tail)
    }

    /// Invokes every registered notify callback once, in attach order.
    pub fn notify_readers(&self) {
        self.lock_readers().notify_all();
    }

    pub(crate) fn lock_readers(&self) -> MutexGuard<'_, ReaderRegistry> {
        self.readers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
