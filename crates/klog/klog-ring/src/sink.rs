//! Output collaborators: where rendered text ends up.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// A text output such as a console or a serial port.
pub trait Sink: Send + Sync {
    fn write_str(&self, text: &str);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn write_str(&self, _text: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_str(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl Sink for StderrSink {
    fn write_str(&self, text: &str) {
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(text.as_bytes());
        let _ = err.flush();
    }
}

/// Captures output in memory, one entry per `write_str` call.
#[derive(Debug, Default)]
pub struct MemorySink {
    writes: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Everything written so far, split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.writes()
            .concat()
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl Sink for MemorySink {
    fn write_str(&self, text: &str) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_owned());
    }
}

/// Single choke point for serial output.
///
/// Direct writes from producers (bypass mode) and the dumper's output must
/// not interleave. Normally a blocking mutex serializes them; in bypass mode
/// producers may sit in contexts that cannot block, so a spin lock is used.
pub struct SerialPort {
    sink: Arc<dyn Sink>,
    spin: spin::Mutex<()>,
    blocking: Mutex<()>,
}

impl SerialPort {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            sink,
            spin: spin::Mutex::new(()),
            blocking: Mutex::new(()),
        }
    }

    pub fn write(&self, text: &str, bypass: bool) {
        if bypass {
            let _guard = self.spin.lock();
            self.sink.write_str(text);
        } else {
            let _guard = self.blocking.lock().unwrap_or_else(PoisonError::into_inner);
            self.sink.write_str(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_splits_lines_across_writes() {
        let sink = MemorySink::new();
        sink.write_str("one\ntw");
        sink.write_str("o\nthree\n");
        assert_eq!(sink.writes().len(), 2);
        assert_eq!(sink.lines(), vec!["one", "two", "three"]);
    }

    #[test]
    fn serial_port_forwards_in_both_modes() {
        let sink = Arc::new(MemorySink::new());
        let port = SerialPort::new(sink.clone());
        port.write("a\n", false);
        port.write("b\n", true);
        assert_eq!(sink.lines(), vec!["a", "b"]);
    }
}
