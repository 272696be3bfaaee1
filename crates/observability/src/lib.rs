//! Process-wide tracing setup shared by the invoiceflow binaries and tests.

pub mod subscriber;

pub use subscriber::{LOG_FORMAT_ENV, LogFormat, LogFormatError};

/// Initialize process-wide observability (tracing/logging).
///
/// The filter comes from `RUST_LOG` (default `info`) and the output format
/// from `INVOICEFLOW_LOG_FORMAT` (default JSON). Safe to call multiple times;
/// subsequent calls become no-ops.
pub fn init() {
    subscriber::init();
}
