//! Integration tests for leveled loggers and the persisted debug mode

use std::sync::Arc;

use planner_export::logging::{
    FileFlagStore, Level, Logger, LoggerRegistry, LoggingConfig, MemorySink, DEBUG_FLAG_FILE,
};
use tempfile::TempDir;

fn registry_in(dir: &TempDir, sink: Arc<MemorySink>) -> LoggerRegistry {
    let store = Arc::new(FileFlagStore::new(dir.path()));
    LoggerRegistry::new(LoggingConfig::new(store, sink))
}

#[test]
fn test_warn_logger_suppresses_debug_and_info() {
    let sink = Arc::new(MemorySink::default());
    let logger = Logger::new("Export", Level::Warn, sink.clone());

    logger.debug("cells measured");
    logger.info("export started");
    logger.warn("legend has no area");
    logger.error("export failed");

    let records = sink.records();
    let levels: Vec<Level> = records.iter().map(|(level, _)| *level).collect();
    assert_eq!(levels, vec![Level::Warn, Level::Error]);
    assert!(records[0].1.ends_with("[Export][WARN] legend has no area"));
}

#[test]
fn test_raising_threshold_to_none_suppresses_everything() {
    let sink = Arc::new(MemorySink::default());
    let logger = Logger::new("App", Level::Warn, sink.clone());
    logger.set_level(Level::None);

    logger.debug("a");
    logger.info("b");
    logger.warn("c");
    logger.error("d");
    logger.group("nothing shown", || logger.error("still nothing"));

    assert!(sink.records().is_empty());
}

#[test]
fn test_child_of_info_logger() {
    let sink = Arc::new(MemorySink::default());
    let grid = Logger::new("Grid", Level::Info, sink.clone());
    let child = grid.child("Cells");

    assert_eq!(child.name(), "Grid:Cells");
    child.debug("hidden");
    child.info("shown");

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[Grid:Cells][INFO] shown"));
}

#[test]
fn test_inert_timer_emits_nothing() {
    let sink = Arc::new(MemorySink::default());
    let logger = Logger::new("Render", Level::Info, sink.clone());

    let timer = logger.time("rasterize");
    assert!(!timer.is_active());
    logger.set_level(Level::Debug);
    timer.finish();

    assert!(sink.records().is_empty());
}

#[test]
fn test_active_timer_reports_elapsed() {
    let sink = Arc::new(MemorySink::default());
    let logger = Logger::new("Render", Level::Debug, sink.clone());

    let timer = logger.time("rasterize");
    assert!(timer.is_active());
    timer.finish();

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[Render][DEBUG] rasterize: "));
    assert!(lines[0].ends_with("ms"));
}

#[test]
fn test_debug_mode_reaches_fresh_loggers() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::default());
    let registry = registry_in(&dir, sink.clone());

    assert_eq!(registry.create("Sync").level(), Level::Warn);
    registry.enable_debug_mode();

    assert!(dir.path().join(DEBUG_FLAG_FILE).exists());
    assert_eq!(registry.export().level(), Level::Debug);
    assert_eq!(registry.create("Sync").level(), Level::Debug);

    // A later run reading the same state starts at DEBUG
    let next_run = registry_in(&dir, sink);
    assert!(next_run.debug_mode_persisted());
    assert_eq!(next_run.grid().level(), Level::Debug);
}

#[test]
fn test_disable_debug_mode_clears_state() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir, Arc::new(MemorySink::default()));
    let held = registry.render();

    registry.enable_debug_mode();
    assert_eq!(held.level(), Level::Debug);

    registry.disable_debug_mode();
    assert_eq!(held.level(), Level::Warn);
    assert!(!dir.path().join(DEBUG_FLAG_FILE).exists());
    assert_eq!(registry_in(&dir, Arc::new(MemorySink::default())).app().level(), Level::Warn);
}

#[test]
fn test_explicit_debug_flag_overrides_persisted_state() {
    let dir = TempDir::new().unwrap();
    registry_in(&dir, Arc::new(MemorySink::default())).enable_debug_mode();

    let store = Arc::new(FileFlagStore::new(dir.path()));
    let config = LoggingConfig::new(store, Arc::new(MemorySink::default())).with_explicit_debug(Some(false));
    let registry = LoggerRegistry::new(config);

    assert_eq!(registry.app().level(), Level::Warn);
    assert!(registry.debug_mode_persisted());
}

#[test]
fn test_unwritable_state_dir_keeps_logging() {
    let dir = TempDir::new().unwrap();
    // A file where the state directory should be makes persistence fail
    let blocker = dir.path().join("state");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let sink = Arc::new(MemorySink::default());
    let store = Arc::new(FileFlagStore::new(&blocker));
    let registry = LoggerRegistry::new(LoggingConfig::new(store, sink.clone()));

    registry.enable_debug_mode();

    assert_eq!(registry.app().level(), Level::Debug);
    assert!(sink
        .lines()
        .iter()
        .any(|l| l.contains("[App][WARN] could not persist debug mode")));
}
