mod header;
mod render;
mod severity;
mod wrap;

pub use header::{
    HEADER_SIZE, MAX_DATA, MAX_RECORD, Preamble, Record, RecordError, RecordHeader, align4,
    wire_size,
};
pub use render::{render_drop_notice, render_record};
pub use severity::Severity;
pub use wrap::{WrapCase, peek_preamble, read_wrapped, write_wrapped};
