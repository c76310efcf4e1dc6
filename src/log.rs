//! File logger for dojo.
//!
//! Lines are appended to `~/.dojo/dojo.log` (or `$DOJO_LOG`) as
//!
//! ```text
//! [14:02:11.031] [DEBUG] agent=a1 task=t3 assigned
//! ```
//!
//! Scheduling call sites put the agent and task in front of the message as
//! `key=value` fields, so one agent's history can be pulled out with grep.
//! Until [`init`] runs every log call is a no-op and the message is never
//! formatted, so embedding the library costs nothing.
//!
//! The level defaults to INFO. `--debug` or `DOJO_DEBUG=1` raise it to DEBUG
//! and `DOJO_LOG_LEVEL` names one explicitly (`error` .. `trace`).

use crate::error::Error;
use std::fmt::{self, Display, Write as _};
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("Unknown log level: {}", s)))
    }
}

/// Pick the level from the CLI flag and the environment.
///
/// An explicit, parseable `DOJO_LOG_LEVEL` wins; otherwise debug mode from
/// either source means DEBUG and everything else INFO.
pub fn resolve_level(debug: bool, env_debug: Option<&str>, env_level: Option<&str>) -> LogLevel {
    if let Some(level) = env_level.and_then(|v| v.parse().ok()) {
        return level;
    }
    let env_debug = env_debug
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if debug || env_debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

/// Start logging to `$DOJO_LOG`, falling back to ~/.dojo/dojo.log.
///
/// Returns the file in use, or `None` if no location could be found.
pub fn init(debug: bool) -> Option<PathBuf> {
    let level = resolve_level(
        debug,
        std::env::var("DOJO_DEBUG").ok().as_deref(),
        std::env::var("DOJO_LOG_LEVEL").ok().as_deref(),
    );
    let path = std::env::var_os("DOJO_LOG")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".dojo").join("dojo.log")))?;
    init_at(path, level)
}

/// Start logging to `path` at `level`. Only the first call picks the file.
pub fn init_at(path: PathBuf, level: LogLevel) -> Option<PathBuf> {
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
    let _ = LOG_PATH.set(path);
    LOG_PATH.get().cloned()
}

/// True if a message at `level` would be written.
pub fn enabled(level: LogLevel) -> bool {
    LOG_PATH.get().is_some() && level as u8 <= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Append one `key=value ` field to a line prefix.
#[doc(hidden)]
pub fn push_field(prefix: &mut String, key: &str, value: &dyn Display) {
    let _ = write!(prefix, "{}={} ", key, value);
}

/// Write one line. Call through the `dlog*` macros, which check
/// [`enabled`] before formatting anything.
#[doc(hidden)]
pub fn write(level: LogLevel, fields: &str, msg: &str) {
    let Some(path) = LOG_PATH.get() else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let _ = writeln!(file, "[{}] [{}] {}{}", timestamp, level, fields, msg);
    }
}

/// Log at an explicit level, with optional leading `key = value` fields:
///
/// ```
/// dojo::dlog_at!(dojo::log::LogLevel::Debug, agent = "a1", task = "t1"; "assigned");
/// dojo::dlog_at!(dojo::log::LogLevel::Info, "{} agents", 3);
/// ```
#[macro_export]
macro_rules! dlog_at {
    ($level:expr, $($key:ident = $value:expr),+ ; $($arg:tt)*) => {
        if $crate::log::enabled($level) {
            let mut fields = String::new();
            $( $crate::log::push_field(&mut fields, stringify!($key), &$value); )+
            $crate::log::write($level, &fields, &format!($($arg)*));
        }
    };
    ($level:expr, $($arg:tt)*) => {
        if $crate::log::enabled($level) {
            $crate::log::write($level, "", &format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! dlog {
    ($($arg:tt)*) => {
        $crate::dlog_at!($crate::log::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! dlog_error {
    ($($arg:tt)*) => {
        $crate::dlog_at!($crate::log::LogLevel::Error, $($arg)*)
    };
}

#[macro_export]
macro_rules! dlog_warn {
    ($($arg:tt)*) => {
        $crate::dlog_at!($crate::log::LogLevel::Warn, $($arg)*)
    };
}

/// Only written in debug mode.
#[macro_export]
macro_rules! dlog_debug {
    ($($arg:tt)*) => {
        $crate::dlog_at!($crate::log::LogLevel::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! dlog_trace {
    ($($arg:tt)*) => {
        $crate::dlog_at!($crate::log::LogLevel::Trace, $($arg)*)
    };
}
