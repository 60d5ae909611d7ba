//! Reader cursors.
//!
//! Each reader keeps a private tail counter into the shared ring. Reads never
//! block: when nothing is pending they return [`LogError::ShouldWait`] and the
//! caller waits on whatever its notify callback signals.

use crate::log::{Log, LogError};
use crate::ring::resync_lapped;
use klog_record::{MAX_RECORD, Record, peek_preamble, read_wrapped};
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback invoked when new records may be available.
pub type NotifyFn = Box<dyn Fn() + Send + Sync>;

/// Stable key of a reader in the log's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReaderId(pub(crate) u64);

/// A registered consumer of the log.
///
/// Must be [`disconnect`](DlogReader::disconnect)ed before it is dropped.
pub struct DlogReader {
    log: Arc<Log>,
    id: ReaderId,
    /// Byte counter of the next record this reader will return.
    tail: u64,
    connected: bool,
}

impl DlogReader {
    pub(crate) fn new(log: Arc<Log>, id: ReaderId, tail: u64) -> Self {
        Self {
            log,
            id,
            tail,
            connected: true,
        }
    }

    pub fn id(&self) -> ReaderId {
        self.id
    }

    pub fn log(&self) -> &Arc<Log> {
        &self.log
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Copies the next record's image into `out`.
    ///
    /// The preamble word of the copy is zeroed. Returns the number of
    /// meaningful bytes. `_flags` is accepted for interface compatibility;
    /// no filtering is done.
    ///
    /// If the writer lapped this reader, the reader resumes at the oldest
    /// stored record and the skipped records show up as a sequence gap.
    pub fn read_raw(&mut self, _flags: u32, out: &mut [u8; MAX_RECORD]) -> Result<usize, LogError> {
        let log = &*self.log;
        let state = log.state.lock();

        let rtail = resync_lapped(state.head, state.tail, self.tail);
        if rtail == state.head {
            self.tail = rtail;
            return Err(LogError::ShouldWait);
        }

        let offset = log.config.index(rtail);
        let preamble = peek_preamble(&state.data, offset);
        let actual = preamble.read_len();
        read_wrapped(&state.data, offset, &mut out[..actual]);
        self.tail = rtail + preamble.fifo_len() as u64;
        drop(state);

        out[..4].fill(0);
        Ok(actual)
    }

    /// Reads the next record into `record`. See [`DlogReader::read_raw`].
    pub fn read(&mut self, flags: u32, record: &mut Record) -> Result<usize, LogError> {
        let mut image = [0u8; MAX_RECORD];
        let actual = self.read_raw(flags, &mut image)?;
        record.fill_from(&image[..actual])?;
        Ok(actual)
    }

    /// Removes this reader from the log's registry. Idempotent.
    pub fn disconnect(&mut self) {
        if self.connected {
            self.log.lock_readers().remove(self.id);
            self.connected = false;
            debug!(reader = self.id.0, "reader disconnected");
        }
    }
}

impl Drop for DlogReader {
    fn drop(&mut self) {
        if self.connected {
            warn!(reader = self.id.0, "reader dropped while still attached");
            self.disconnect();
            debug_assert!(
                std::thread::panicking(),
                "DlogReader dropped without disconnect()"
            );
        }
    }
}
