//! Route `log` records into the subsystem loggers

use super::{Level, Logger, LoggerRegistry};
use crate::error::{Error, Result};

/// `log::Log` implementation backed by a [`LoggerRegistry`]
///
/// Records are routed by target: `planner_export::render` to Render,
/// `planner_export::export` and `planner_export::surface` to Export,
/// `planner_export::planner` to Grid, everything else to App.
#[derive(Debug, Clone)]
pub struct LogBridge {
    app: Logger,
    grid: Logger,
    export: Logger,
    render: Logger,
}

fn level_of(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug | log::Level::Trace => Level::Debug,
    }
}

impl LogBridge {
    pub fn new(registry: &LoggerRegistry) -> Self {
        Self {
            app: registry.app(),
            grid: registry.grid(),
            export: registry.export(),
            render: registry.render(),
        }
    }

    fn route(&self, target: &str) -> &Logger {
        let module = target
            .strip_prefix("planner_export::")
            .and_then(|rest| rest.split("::").next());
        match module {
            Some("render") => &self.render,
            Some("export") | Some("surface") => &self.export,
            Some("planner") => &self.grid,
            _ => &self.app,
        }
    }

    /// Install as the process-wide `log` logger
    pub fn install(self) -> Result<()> {
        log::set_logger(Box::leak(Box::new(self)))
            .map_err(|e| Error::General(format!("failed to install logger: {}", e)))?;
        log::set_max_level(log::LevelFilter::Debug);
        Ok(())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.route(metadata.target()).enabled(level_of(metadata.level()))
    }

    fn log(&self, record: &log::Record<'_>) {
        let logger = self.route(record.target());
        logger.log(level_of(record.level()), record.args());
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LoggingConfig, MemoryFlagStore, MemorySink};
    use log::Log;
    use std::sync::Arc;

    fn bridge(sink: &Arc<MemorySink>, debug: bool) -> LogBridge {
        let config = LoggingConfig::new(Arc::new(MemoryFlagStore::new(debug)), sink.clone());
        LogBridge::new(&LoggerRegistry::new(config))
    }

    fn record<'a>(target: &'a str, level: log::Level, args: std::fmt::Arguments<'a>) -> log::Record<'a> {
        log::Record::builder()
            .target(target)
            .level(level)
            .args(args)
            .build()
    }

    #[test]
    fn test_records_routed_by_target() {
        let sink = Arc::new(MemorySink::default());
        let bridge = bridge(&sink, true);

        bridge.log(&record("planner_export::render", log::Level::Debug, format_args!("drawn")));
        bridge.log(&record("planner_export::deps", log::Level::Info, format_args!("fonts")));
        bridge.log(&record("usvg::parser", log::Level::Warn, format_args!("odd")));

        let lines = sink.lines();
        assert!(lines[0].ends_with("[Render][DEBUG] drawn"));
        assert!(lines[1].ends_with("[App][INFO] fonts"));
        assert!(lines[2].ends_with("[App][WARN] odd"));
    }

    #[test]
    fn test_bridge_respects_thresholds() {
        let sink = Arc::new(MemorySink::default());
        let bridge = bridge(&sink, false);

        let meta = log::Metadata::builder()
            .target("planner_export::export")
            .level(log::Level::Info)
            .build();
        assert!(!bridge.enabled(&meta));

        bridge.log(&record("planner_export::export", log::Level::Debug, format_args!("hidden")));
        assert!(sink.lines().is_empty());
    }
}
