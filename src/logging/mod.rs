//! Leveled, named loggers
//!
//! A [`Logger`] emits `[timestamp][name][LEVEL] message` lines through a
//! [`LogSink`] when the message level is at or above its threshold. Loggers
//! for the application's subsystems live in a [`LoggerRegistry`] owned by
//! the composition root, and [`LogBridge`] routes `log` macro records from
//! library internals into them.

mod bridge;
mod registry;
mod sink;

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;

use crate::date::format_log_timestamp;
use crate::error::Error;

pub use bridge::LogBridge;
pub use registry::{
    FileFlagStore, FlagStore, LoggerRegistry, LoggingConfig, MemoryFlagStore, DEBUG_FLAG_FILE,
    SUBSYSTEMS,
};
pub use sink::{ConsoleSink, LogSink, MemorySink};

/// Name given to loggers created without one
pub const DEFAULT_LOGGER_NAME: &str = "App";

/// Message severity, ordered from most to least verbose
///
/// As a threshold, `None` suppresses everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    None = 4,
}

impl Level {
    pub fn from_u8(value: u8) -> Option<Level> {
        match value {
            0 => Some(Level::Debug),
            1 => Some(Level::Info),
            2 => Some(Level::Warn),
            3 => Some(Level::Error),
            4 => Some(Level::None),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::None => "NONE",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "none" | "off" => Ok(Level::None),
            other => Err(Error::Config(format!("unknown log level: {}", other))),
        }
    }
}

/// A named logger with a mutable threshold
///
/// Clones share the threshold, so a level change made through the registry
/// reaches every holder of that logger. Children get their own copy.
#[derive(Clone)]
pub struct Logger {
    name: String,
    level: Arc<AtomicU8>,
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .finish()
    }
}

/// Console logger named [`DEFAULT_LOGGER_NAME`] at WARN
impl Default for Logger {
    fn default() -> Self {
        Self::console(DEFAULT_LOGGER_NAME, Level::Warn)
    }
}

impl Logger {
    pub fn new(name: impl Into<String>, level: Level, sink: Arc<dyn LogSink>) -> Self {
        Self {
            name: name.into(),
            level: Arc::new(AtomicU8::new(level as u8)),
            sink,
        }
    }

    /// Logger writing to the process console
    pub fn console(name: impl Into<String>, level: Level) -> Self {
        Self::new(name, level, Arc::new(ConsoleSink::default()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or(Level::Warn)
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Set the threshold from a raw value; out-of-range values are ignored
    pub fn set_level_raw(&self, value: u8) {
        if let Some(level) = Level::from_u8(value) {
            self.set_level(level);
        }
    }

    /// Whether a message at `level` would be emitted
    pub fn enabled(&self, level: Level) -> bool {
        level != Level::None && level >= self.level()
    }

    pub fn log(&self, level: Level, message: impl Display) {
        if !self.enabled(level) {
            return;
        }
        let line = format!(
            "[{}][{}][{}] {}",
            format_log_timestamp(&Local::now()),
            self.name,
            level.label(),
            message
        );
        self.sink.emit(level, &line);
    }

    pub fn debug(&self, message: impl Display) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl Display) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl Display) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl Display) {
        self.log(Level::Error, message);
    }

    /// Run `f`, nesting its output under `label` when DEBUG is enabled
    ///
    /// `f` runs whether or not anything is printed.
    pub fn group<T>(&self, label: impl Display, f: impl FnOnce() -> T) -> T {
        if !self.enabled(Level::Debug) {
            return f();
        }
        self.sink.group_start(&format!("[{}] {}", self.name, label));
        let out = f();
        self.sink.group_end();
        out
    }

    /// Start a timer reported at DEBUG when finished
    ///
    /// When DEBUG is not enabled now, the timer is inert: no start time is
    /// taken and finishing it does nothing.
    pub fn time(&self, label: impl Into<String>) -> Timer {
        if !self.enabled(Level::Debug) {
            return Timer::inert();
        }
        Timer {
            running: Some((self.clone(), Instant::now())),
            label: label.into(),
        }
    }

    /// Logger named `parent:name` starting at this logger's current level
    pub fn child(&self, name: &str) -> Logger {
        Logger::new(format!("{}:{}", self.name, name), self.level(), Arc::clone(&self.sink))
    }
}

/// Pending measurement started by [`Logger::time`]
#[must_use = "a timer reports nothing until finished"]
#[derive(Debug)]
pub struct Timer {
    running: Option<(Logger, Instant)>,
    label: String,
}

impl Timer {
    fn inert() -> Self {
        Self {
            running: None,
            label: String::new(),
        }
    }

    /// Whether this timer measures anything
    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    pub fn finish(self) {
        if let Some((logger, started)) = self.running {
            let elapsed = started.elapsed().as_secs_f64() * 1000.0;
            logger.debug(format!("{}: {:.2}ms", self.label, elapsed));
        }
    }
}
