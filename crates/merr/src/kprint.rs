//! Leveled stderr logging.
//!
//! Encoding and formatting are silent on the happy path. They report
//! degradations (ids outside the table, corrupted offsets, scratch
//! exhaustion) at debug or trace level so a bad code can be traced back.
//!
//! # Environment Variables
//!
//! - `MERR_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace (or 0-5)
//! - `MERR_FLUSH_EPRINT=1` - flush stderr after each line
//!
//! ```ignore
//! use merr::{kdebug, kwarn};
//!
//! kdebug!("file id {} outside table of {}", id, len);
//! kwarn!("domain formatter already installed");
//! ```

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::env::{env_get_bool, env_get_opt};

/// Log levels, most severe first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

const LEVELS: [LogLevel; 6] = [
    LogLevel::Off,
    LogLevel::Error,
    LogLevel::Warn,
    LogLevel::Info,
    LogLevel::Debug,
    LogLevel::Trace,
];

impl LogLevel {
    /// Anything above `Trace` saturates to `Trace`.
    pub fn from_u8(v: u8) -> Self {
        LEVELS[(v as usize).min(LEVELS.len() - 1)]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return LEVELS.get(n as usize).copied().ok_or(());
        }
        LEVELS
            .iter()
            .copied()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

// ── State ─────────────────────────────────────────────────────────
//
// One byte: level in the low bits, then the flush and init flags.

const LEVEL_MASK: u8 = 0x07;
const FLUSH_BIT: u8 = 0x08;
const INIT_BIT: u8 = 0x80;

static STATE: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);

/// Current state, reading the environment on first use.
#[inline]
fn state() -> u8 {
    let s = STATE.load(Ordering::Relaxed);
    if s & INIT_BIT != 0 {
        return s;
    }
    init();
    STATE.load(Ordering::Relaxed)
}

/// Read `MERR_LOG_LEVEL` and `MERR_FLUSH_EPRINT`.
///
/// Runs once; a level already set through [`set_log_level`] is kept.
pub fn init() {
    let level = env_get_opt::<LogLevel>("MERR_LOG_LEVEL");
    let flush = env_get_bool("MERR_FLUSH_EPRINT", false);

    let _ = STATE.fetch_update(Ordering::SeqCst, Ordering::Relaxed, |s| {
        if s & INIT_BIT != 0 {
            return None;
        }
        let lvl = level.map_or(s & LEVEL_MASK, |l| l as u8);
        let flush = if flush { FLUSH_BIT } else { 0 };
        Some(INIT_BIT | flush | lvl)
    });
}

#[inline]
pub fn log_level() -> LogLevel {
    LogLevel::from_u8(state() & LEVEL_MASK)
}

#[inline]
pub fn flush_enabled() -> bool {
    state() & FLUSH_BIT != 0
}

/// Override the level, e.g. from a command-line flag. Wins over the environment.
pub fn set_log_level(level: LogLevel) {
    state();
    let _ = STATE.fetch_update(Ordering::SeqCst, Ordering::Relaxed, |s| {
        Some((s & !LEVEL_MASK) | level as u8)
    });
}

pub fn set_flush_enabled(enabled: bool) {
    state();
    if enabled {
        STATE.fetch_or(FLUSH_BIT, Ordering::SeqCst);
    } else {
        STATE.fetch_and(!FLUSH_BIT, Ordering::SeqCst);
    }
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= log_level()
}

/// Write one line under the stderr lock.
fn emit(label: Option<LogLevel>, args: fmt::Arguments<'_>) {
    let mut err = std::io::stderr().lock();
    let _ = match label {
        Some(level) => writeln!(err, "merr: {}: {}", level, args),
        None => writeln!(err, "{}", args),
    };
    if flush_enabled() {
        let _ = err.flush();
    }
}

#[doc(hidden)]
pub fn _kprintln_impl(args: fmt::Arguments<'_>) {
    emit(None, args);
}

#[doc(hidden)]
pub fn _klog_impl(level: LogLevel, args: fmt::Arguments<'_>) {
    if level_enabled(level) {
        emit(Some(level), args);
    }
}

// ── Macros ────────────────────────────────────────────────────────

/// Print a line to stderr, unconditionally.
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint::_kprintln_impl(format_args!(""))
    };
    ($($arg:tt)*) => {
        $crate::kprint::_kprintln_impl(format_args!($($arg)*))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __klog {
    ($level:ident, $($arg:tt)*) => {
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::$level, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! kerror { ($($arg:tt)*) => { $crate::__klog!(Error, $($arg)*) }; }

#[macro_export]
macro_rules! kwarn { ($($arg:tt)*) => { $crate::__klog!(Warn, $($arg)*) }; }

#[macro_export]
macro_rules! kinfo { ($($arg:tt)*) => { $crate::__klog!(Info, $($arg)*) }; }

#[macro_export]
macro_rules! kdebug { ($($arg:tt)*) => { $crate::__klog!(Debug, $($arg)*) }; }

#[macro_export]
macro_rules! ktrace { ($($arg:tt)*) => { $crate::__klog!(Trace, $($arg)*) }; }
