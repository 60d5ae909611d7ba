mod context;
mod event;
mod log;
mod reader;
mod ring;
mod sink;

pub use context::{LogContext, current_tid};
pub use event::{Event, Reset, SchedulerGuard, SchedulerLock, THREAD_LOCK};
pub use log::{Log, LogError, LogStats};
pub use reader::{DlogReader, NotifyFn, ReaderId};
pub use ring::{DEFAULT_CAPACITY, RingConfig, resync_lapped};
pub use sink::{MemorySink, NullSink, SerialPort, Sink, StderrSink, StdoutSink};
