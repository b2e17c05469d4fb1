#![deny(missing_docs)]
//! Shared logging utilities for the scrape watch workspace.
//!
//! This crate provides the `watch_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every message logged
//! through the macros is prefixed with the job context of the calling thread,
//! so lines emitted while a job is tracked read `[job <id>] ...`.

use std::cell::RefCell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Thread-local storage for the id of the job currently tracked.
    static JOB_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Sets the job context for the current thread.
/// The app loop calls this whenever the tracked job changes.
pub fn set_job_context(job_id: Option<&str>) {
    JOB_CONTEXT.with(|ctx| *ctx.borrow_mut() = job_id.map(ToOwned::to_owned));
}

/// Retrieves the job context for the current thread, if any.
pub fn job_context() -> Option<String> {
    JOB_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Returns the prefix the logging macros put in front of each message.
#[doc(hidden)]
pub fn context_prefix() -> String {
    JOB_CONTEXT.with(|ctx| match ctx.borrow().as_deref() {
        Some(job_id) => format!("[job {job_id}] "),
        None => String::new(),
    })
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! watch_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! watch_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! watch_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! watch_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! watch_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
