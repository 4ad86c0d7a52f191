#![warn(clippy::all, rust_2018_idioms)]

/// Tracing macros that prefix the message with `[file:module:line]`.
///
/// Use these for free-form progress messages; use the plain `tracing` macros
/// with fields when the event carries structured data (stream names, error
/// codes, counts).
#[macro_export]
macro_rules! trace_debug {
    ($($arg:tt)*) => {
        tracing::debug!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! trace_info {
    ($($arg:tt)*) => {
        tracing::info!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! trace_warn {
    ($($arg:tt)*) => {
        tracing::warn!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! trace_error {
    ($($arg:tt)*) => {
        tracing::error!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

/*
Log level guidelines:

DEBUG: worker start/stop, per-stream evaluation, listing sizes
INFO:  session open/cancel, newly tailed streams and shards, closed shards
WARN:  a worker stopping early while the session continues
ERROR: failed backend calls (through log_backend_error), fatal tailer stops

Never log per emitted line; the output channel is the data path.
*/
