//! logging — slog loggers for the optimization layer.
//!
//! The minimizer, line searcher, and gradient checker each hold a
//! [`slog::Logger`]. By default they get [`discard_logger`], so the library
//! is silent unless a caller installs a real drain. With the `obs_slog`
//! feature, [`terminal_logger`] builds the same asynchronous terminal drain
//! argmin's slog observer uses.
use slog::{Discard, Logger, o};

/// Logger that drops every record.
pub fn discard_logger() -> Logger {
    Logger::root(Discard, o!())
}

/// Asynchronous, human-readable logger writing to stderr.
#[cfg(feature = "obs_slog")]
pub fn terminal_logger() -> Logger {
    use slog::Drain;

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("component" => "rust_lbfgs"))
}
