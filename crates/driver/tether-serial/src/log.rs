//! Leveled logging for the serial driver.
//!
//! The driver has no console of its own. The embedding system registers a
//! sink with [`set_log_fn`]; until then every message is discarded. Messages
//! above [`MAX_LOG_LEVEL`] are compiled out, and [`set_max_level`] filters
//! further at run time.

use core::fmt;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

// ---------------------------------------------------------------------------
// Log levels — lower = more severe
// ---------------------------------------------------------------------------

/// Log severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Something failed; the driver keeps running.
    Error = 0,
    /// Unexpected condition: unknown wake source, line errors.
    Warn = 1,
    /// Informational.
    Info = 2,
    /// State changes: initialization, backpressure.
    Debug = 3,
    /// Per-byte and per-invocation detail.
    Trace = 4,
}

impl LogLevel {
    /// Returns the human-readable name (fixed-width for aligned output).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN ",
            Self::Info => "INFO ",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Error,
            1 => Self::Warn,
            2 => Self::Info,
            3 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().trim_end())
    }
}

/// Most verbose level compiled in.
pub const MAX_LOG_LEVEL: LogLevel = if cfg!(debug_assertions) {
    LogLevel::Trace
} else {
    LogLevel::Debug
};

static MAX_LEVEL: AtomicU8 = AtomicU8::new(MAX_LOG_LEVEL as u8);

/// Sets the most verbose level emitted at run time. Levels above
/// [`MAX_LOG_LEVEL`] stay disabled.
pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Returns the run-time level filter.
#[must_use]
pub fn max_level() -> LogLevel {
    LogLevel::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Returns `true` if messages at `level` are emitted.
#[inline]
#[must_use]
pub fn enabled(level: LogLevel) -> bool {
    level <= MAX_LOG_LEVEL && level <= max_level()
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// The signature of the log sink.
pub type LogFn = fn(LogLevel, fmt::Arguments<'_>);

fn null_log(_level: LogLevel, _args: fmt::Arguments<'_>) {}

static LOG_FN: AtomicPtr<()> = AtomicPtr::new(null_log as *mut ());

/// Registers the log sink.
///
/// # Safety
///
/// The provided function must be safe to call from every context the driver
/// runs in (interrupt and peer-notification handlers). May be called more
/// than once. Uses `Release` ordering so subsequent loads see the new
/// function.
pub unsafe fn set_log_fn(f: LogFn) {
    LOG_FN.store(f as *mut (), Ordering::Release);
}

#[inline]
fn load_log_fn() -> LogFn {
    let ptr = LOG_FN.load(Ordering::Acquire);
    // SAFETY: We only ever store valid `LogFn` function pointers into LOG_FN.
    unsafe { core::mem::transmute::<*mut (), LogFn>(ptr) }
}

/// Implementation detail for [`slog!`]. Not public API.
#[doc(hidden)]
pub fn _log(level: LogLevel, args: fmt::Arguments<'_>) {
    load_log_fn()(level, args);
}

/// Logs a message at the given level.
#[macro_export]
macro_rules! slog {
    ($level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::log::enabled(level) {
            $crate::log::_log(level, format_args!($($arg)*));
        }
    }};
}

/// Logs an error-level message.
#[macro_export]
macro_rules! serr {
    ($($arg:tt)*) => { $crate::slog!($crate::log::LogLevel::Error, $($arg)*) };
}

/// Logs a warning-level message.
#[macro_export]
macro_rules! swarn {
    ($($arg:tt)*) => { $crate::slog!($crate::log::LogLevel::Warn, $($arg)*) };
}

/// Logs an info-level message.
#[macro_export]
macro_rules! sinfo {
    ($($arg:tt)*) => { $crate::slog!($crate::log::LogLevel::Info, $($arg)*) };
}

/// Logs a debug-level message.
#[macro_export]
macro_rules! sdebug {
    ($($arg:tt)*) => { $crate::slog!($crate::log::LogLevel::Debug, $($arg)*) };
}

/// Logs a trace-level message.
#[macro_export]
macro_rules! strace {
    ($($arg:tt)*) => { $crate::slog!($crate::log::LogLevel::Trace, $($arg)*) };
}
