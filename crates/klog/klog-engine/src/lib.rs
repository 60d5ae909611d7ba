mod dumper;
mod kernel_log;
mod notifier;
mod shutdown;
mod syscall;
mod thread;

pub use dumper::DUMPER_THREAD_NAME;
pub use kernel_log::{KernelLog, global, init_global};
pub use notifier::NOTIFIER_THREAD_NAME;
pub use shutdown::ShutdownError;
pub use syscall::{DebugLogTable, Handle, LOG_FLAG_READABLE, SyscallError};
pub use thread::{KernelThread, ThreadError};
