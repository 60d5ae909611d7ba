//! Handle-based access to the log, as exposed to user space.
//!
//! A readable handle owns a reader; a write-only handle owns nothing. Reads
//! return the raw record image with the preamble word cleared.

use klog_record::{MAX_RECORD, Severity};
use klog_ring::{DlogReader, Log, LogError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// `create` flag requesting a readable handle.
pub const LOG_FLAG_READABLE: u32 = 0x4000_0000;

pub type Handle = u32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SyscallError {
    #[error("invalid handle")]
    BadHandle,

    #[error("no record available")]
    ShouldWait,

    #[error("handle lacks read rights")]
    AccessDenied,

    #[error("log no longer accepts records")]
    BadState,

    #[error("invalid arguments")]
    InvalidArgs,
}

impl From<LogError> for SyscallError {
    fn from(e: LogError) -> Self {
        match e {
            LogError::ShouldWait => SyscallError::ShouldWait,
            LogError::BadState | LogError::Corrupt(_) => SyscallError::BadState,
        }
    }
}

enum Entry {
    Reader(DlogReader),
    WriteOnly,
}

#[derive(Default)]
struct Handles {
    next: Handle,
    entries: HashMap<Handle, Entry>,
}

pub struct DebugLogTable {
    log: Arc<Log>,
    handles: Mutex<Handles>,
}

impl DebugLogTable {
    pub fn new(log: Arc<Log>) -> Self {
        Self {
            log,
            handles: Mutex::new(Handles {
                next: 1,
                entries: HashMap::new(),
            }),
        }
    }

    pub fn create(&self, flags: u32) -> Result<Handle, SyscallError> {
        if flags & !LOG_FLAG_READABLE != 0 {
            return Err(SyscallError::InvalidArgs);
        }
        let entry = if flags & LOG_FLAG_READABLE != 0 {
            Entry::Reader(self.log.attach(None))
        } else {
            Entry::WriteOnly
        };

        let mut handles = self.lock();
        let handle = handles.next;
        handles.next += 1;
        handles.entries.insert(handle, entry);
        Ok(handle)
    }

    /// Appends `bytes` as an Info record. The low byte of `flags` is stored
    /// as the record flags.
    pub fn write(&self, handle: Handle, flags: u32, bytes: &[u8]) -> Result<(), SyscallError> {
        if !self.lock().entries.contains_key(&handle) {
            return Err(SyscallError::BadHandle);
        }
        self.log
            .write(Severity::Info.into(), (flags & 0xFF) as u8, bytes)?;
        Ok(())
    }

    /// Copies the next record image into `buf`, truncated to its length.
    /// Returns the number of bytes copied.
    pub fn read(&self, handle: Handle, flags: u32, buf: &mut [u8]) -> Result<usize, SyscallError> {
        let mut handles = self.lock();
        let reader = match handles.entries.get_mut(&handle) {
            Some(Entry::Reader(reader)) => reader,
            Some(Entry::WriteOnly) => return Err(SyscallError::AccessDenied),
            None => return Err(SyscallError::BadHandle),
        };

        let mut image = [0u8; MAX_RECORD];
        let actual = reader.read_raw(flags, &mut image)?;
        drop(handles);

        let n = actual.min(buf.len());
        buf[..n].copy_from_slice(&image[..n]);
        Ok(n)
    }

    pub fn close(&self, handle: Handle) -> Result<(), SyscallError> {
        match self.lock().entries.remove(&handle) {
            Some(Entry::Reader(mut reader)) => {
                reader.disconnect();
                Ok(())
            }
            Some(Entry::WriteOnly) => Ok(()),
            None => Err(SyscallError::BadHandle),
        }
    }

    /// Writes straight to the serial output, bypassing the ring.
    pub fn debug_write(&self, bytes: &[u8]) {
        self.log.serial_write(&String::from_utf8_lossy(bytes));
    }

    fn lock(&self) -> MutexGuard<'_, Handles> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DebugLogTable {
    fn drop(&mut self) {
        let handles = self.handles.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, entry) in handles.entries.drain() {
            if let Entry::Reader(mut reader) = entry {
                reader.disconnect();
            }
        }
    }
}
