//! Destinations for formatted log lines

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::Level;

/// Receives fully formatted lines from loggers
pub trait LogSink: Send + Sync {
    fn emit(&self, level: Level, line: &str);

    /// Open a visual group; lines until the matching `group_end` nest under it
    fn group_start(&self, label: &str);

    fn group_end(&self);
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Writes DEBUG and INFO to stdout, WARN and ERROR to stderr
#[derive(Debug, Default)]
pub struct ConsoleSink {
    depth: AtomicUsize,
}

impl LogSink for ConsoleSink {
    fn emit(&self, level: Level, line: &str) {
        let pad = indent(self.depth.load(Ordering::Relaxed));
        match level {
            Level::Debug | Level::Info => println!("{}{}", pad, line),
            Level::Warn | Level::Error => eprintln!("{}{}", pad, line),
            Level::None => {}
        }
    }

    fn group_start(&self, label: &str) {
        println!("{}{}", indent(self.depth.fetch_add(1, Ordering::Relaxed)), label);
    }

    fn group_end(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| d.checked_sub(1));
    }
}

/// Keeps lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String)>>,
    depth: AtomicUsize,
}

impl MemorySink {
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.records().into_iter().map(|(_, line)| line).collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, level: Level, line: String) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, line));
    }
}

impl LogSink for MemorySink {
    fn emit(&self, level: Level, line: &str) {
        self.push(level, format!("{}{}", indent(self.depth.load(Ordering::Relaxed)), line));
    }

    fn group_start(&self, label: &str) {
        let depth = self.depth.fetch_add(1, Ordering::Relaxed);
        self.push(Level::Debug, format!("{}{}", indent(depth), label));
    }

    fn group_end(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| d.checked_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_indents_groups() {
        let sink = MemorySink::default();
        sink.group_start("outer");
        sink.emit(Level::Info, "a");
        sink.group_end();
        sink.group_end();
        sink.emit(Level::Warn, "b");

        assert_eq!(sink.lines(), vec!["outer", "  a", "b"]);
        assert_eq!(sink.records()[2].0, Level::Warn);
    }
}
