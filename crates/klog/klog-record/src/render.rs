//! Console line rendering shared by the dumper and the bypass path.

use crate::header::RecordHeader;
use std::fmt::Write;

const NS_PER_SEC: u64 = 1_000_000_000;
const NS_PER_MSEC: u64 = 1_000_000;

/// Renders one record as `[sssss.mmm] ppppp:ttttt> text\n`.
///
/// A single trailing newline in the payload is dropped since the line
/// already ends in one.
pub fn render_record(header: &RecordHeader, text: &[u8]) -> String {
    let text = text.strip_suffix(b"\n").unwrap_or(text);
    let mut line = String::with_capacity(text.len() + 32);
    let _ = writeln!(
        line,
        "[{:05}.{:03}] {:05}:{:05}> {}",
        header.timestamp / NS_PER_SEC,
        (header.timestamp / NS_PER_MSEC) % 1000,
        header.pid,
        header.tid,
        String::from_utf8_lossy(text)
    );
    line
}

/// Synthetic line emitted when a reader observes a sequence gap.
pub fn render_drop_notice(gap: u64) -> String {
    format!("klog: dropped {gap} messages\n")
}
