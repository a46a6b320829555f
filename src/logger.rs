//! Kernel logging
//!
//! Leveled, module-tagged log lines written to the console:
//!
//! ```text
//! [WARN ] PIC: Unhandled IRQ 7...
//! [CRIT ] ISR: KERNEL PANIC!
//! ```
//!
//! Lines below the global minimum level are dropped before formatting.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Critical = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO ",
            LogLevel::Warn => "WARN ",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRIT ",
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Critical,
        }
    }
}

static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Debug as u8);

pub fn set_min_level(level: LogLevel) {
    MIN_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn min_level() -> LogLevel {
    LogLevel::from_raw(MIN_LEVEL.load(Ordering::Relaxed))
}

#[inline]
pub fn is_enabled(level: LogLevel) -> bool {
    level as u8 >= MIN_LEVEL.load(Ordering::Relaxed)
}

#[doc(hidden)]
pub fn _log(module: &str, level: LogLevel, args: fmt::Arguments) {
    if !is_enabled(level) {
        return;
    }
    crate::console::_print(format_args!("[{}] {}: {}\n", level.as_str(), module, args));
}

#[macro_export]
macro_rules! log_at {
    ($level:expr, $module:expr, $($arg:tt)*) => {
        $crate::logger::_log($module, $level, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($module:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::LogLevel::Debug, $module, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($module:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::LogLevel::Info, $module, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($module:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::LogLevel::Warn, $module, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_err {
    ($module:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::LogLevel::Error, $module, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_crit {
    ($module:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logger::LogLevel::Critical, $module, $($arg)*)
    };
}
