//! Subsystem loggers and the persisted debug opt-in

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{ConsoleSink, Level, LogSink, Logger};
use crate::error::Result;

/// Names of the predefined subsystem loggers
pub const SUBSYSTEMS: [&str; 4] = ["App", "Grid", "Export", "Render"];

/// File whose presence in the state directory records the debug opt-in
pub const DEBUG_FLAG_FILE: &str = "debug-mode";

/// Durable storage for the debug opt-in
pub trait FlagStore: Send + Sync {
    fn load(&self) -> bool;
    fn store(&self, enabled: bool) -> Result<()>;
}

/// Opt-in kept as a flag file under a state directory
#[derive(Debug, Clone)]
pub struct FileFlagStore {
    path: PathBuf,
}

impl FileFlagStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(DEBUG_FLAG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FlagStore for FileFlagStore {
    fn load(&self) -> bool {
        self.path.is_file()
    }

    fn store(&self, enabled: bool) -> Result<()> {
        if enabled {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, b"1\n")?;
        } else {
            match fs::remove_file(&self.path) {
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Opt-in kept in memory for the life of the process
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    enabled: AtomicBool,
}

impl MemoryFlagStore {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }
}

impl FlagStore for MemoryFlagStore {
    fn load(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn store(&self, enabled: bool) -> Result<()> {
        self.enabled.store(enabled, Ordering::Relaxed);
        Ok(())
    }
}

/// How default logger levels are chosen, resolved once at startup
#[derive(Clone)]
pub struct LoggingConfig {
    /// Explicit debug flag from the command line or environment
    pub explicit_debug: Option<bool>,
    pub store: Arc<dyn FlagStore>,
    pub sink: Arc<dyn LogSink>,
}

impl LoggingConfig {
    pub fn new(store: Arc<dyn FlagStore>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            explicit_debug: None,
            store,
            sink,
        }
    }

    /// Console output with the opt-in stored under `state_dir`
    pub fn console(state_dir: &Path) -> Self {
        Self::new(
            Arc::new(FileFlagStore::new(state_dir)),
            Arc::new(ConsoleSink::default()),
        )
    }

    pub fn with_explicit_debug(mut self, explicit_debug: Option<bool>) -> Self {
        self.explicit_debug = explicit_debug;
        self
    }

    /// Explicit flag first, then the persisted opt-in, then WARN
    pub fn default_level(&self) -> Level {
        match self.explicit_debug {
            Some(true) => Level::Debug,
            Some(false) => Level::Warn,
            None if self.store.load() => Level::Debug,
            None => Level::Warn,
        }
    }
}

/// The application's named loggers
#[derive(Clone)]
pub struct LoggerRegistry {
    config: LoggingConfig,
    subsystems: Vec<Logger>,
}

impl std::fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("explicit_debug", &self.config.explicit_debug)
            .field("subsystems", &self.subsystems)
            .finish()
    }
}

impl LoggerRegistry {
    pub fn new(config: LoggingConfig) -> Self {
        let level = config.default_level();
        let subsystems = SUBSYSTEMS
            .iter()
            .map(|name| Logger::new(*name, level, Arc::clone(&config.sink)))
            .collect();
        Self { config, subsystems }
    }

    /// A predefined subsystem logger
    pub fn get(&self, name: &str) -> Option<Logger> {
        self.subsystems.iter().find(|l| l.name() == name).cloned()
    }

    fn subsystem(&self, index: usize) -> Logger {
        self.subsystems[index].clone()
    }

    pub fn app(&self) -> Logger {
        self.subsystem(0)
    }

    pub fn grid(&self) -> Logger {
        self.subsystem(1)
    }

    pub fn export(&self) -> Logger {
        self.subsystem(2)
    }

    pub fn render(&self) -> Logger {
        self.subsystem(3)
    }

    /// A fresh logger; its level is resolved now, consulting the opt-in
    pub fn create(&self, name: &str) -> Logger {
        Logger::new(name, self.config.default_level(), Arc::clone(&self.config.sink))
    }

    pub fn debug_mode_persisted(&self) -> bool {
        self.config.store.load()
    }

    /// Set every subsystem logger to DEBUG and persist the opt-in
    pub fn enable_debug_mode(&self) {
        self.set_all(Level::Debug);
        if let Err(e) = self.config.store.store(true) {
            self.app().warn(format!("could not persist debug mode: {}", e));
        }
        self.app().info("debug mode enabled");
    }

    /// Set every subsystem logger back to WARN and clear the opt-in
    pub fn disable_debug_mode(&self) {
        self.set_all(Level::Warn);
        if let Err(e) = self.config.store.store(false) {
            self.app().warn(format!("could not clear debug mode: {}", e));
        }
    }

    fn set_all(&self, level: Level) {
        for logger in &self.subsystems {
            logger.set_level(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use tempfile::TempDir;

    fn config(persisted: bool) -> LoggingConfig {
        LoggingConfig::new(
            Arc::new(MemoryFlagStore::new(persisted)),
            Arc::new(MemorySink::default()),
        )
    }

    #[test]
    fn test_default_level_resolution() {
        assert_eq!(config(false).default_level(), Level::Warn);
        assert_eq!(config(true).default_level(), Level::Debug);
        assert_eq!(
            config(false).with_explicit_debug(Some(true)).default_level(),
            Level::Debug
        );
        // explicit flag beats the persisted opt-in
        assert_eq!(
            config(true).with_explicit_debug(Some(false)).default_level(),
            Level::Warn
        );
    }

    #[test]
    fn test_subsystems_exist() {
        let registry = LoggerRegistry::new(config(false));
        for name in SUBSYSTEMS {
            assert_eq!(registry.get(name).unwrap().name(), name);
        }
        assert!(registry.get("Storage").is_none());
        assert_eq!(registry.export().name(), "Export");
    }

    #[test]
    fn test_toggle_updates_held_loggers() {
        let registry = LoggerRegistry::new(config(false));
        let held = registry.render();
        assert_eq!(held.level(), Level::Warn);

        registry.enable_debug_mode();
        assert_eq!(held.level(), Level::Debug);
        assert!(registry.debug_mode_persisted());

        registry.disable_debug_mode();
        assert_eq!(held.level(), Level::Warn);
        assert!(!registry.debug_mode_persisted());
    }

    #[test]
    fn test_file_flag_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FileFlagStore::new(&temp.path().join("state"));
        assert!(!store.load());

        store.store(true).unwrap();
        assert!(store.load());
        assert!(store.path().is_file());

        store.store(false).unwrap();
        assert!(!store.load());
        // clearing twice is fine
        store.store(false).unwrap();
    }
}
