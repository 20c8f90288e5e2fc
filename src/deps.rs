//! Rendering dependencies loaded on first use
//!
//! The rasterizer needs a font database before it can draw any text. Loading
//! one scans the filesystem, so it happens once per loader and the result is
//! shared by every export that follows.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use tokio::sync::OnceCell;
use usvg::fontdb::Database;

use crate::error::{Error, Result};

/// Concrete families tried, in order, for the generic `sans-serif` family
const SANS_SERIF_PREFERENCE: [&str; 3] = ["Helvetica", "Arial", "Liberation Sans"];

/// Where rendering dependencies come from
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyConfig {
    /// Scan the platform's font directories
    pub load_system_fonts: bool,
    /// Additional directories to scan for font files
    pub font_dirs: Vec<PathBuf>,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            load_system_fonts: true,
            font_dirs: Vec::new(),
        }
    }
}

/// Loaded rendering dependencies
#[derive(Clone)]
pub struct RenderDeps {
    pub fontdb: Arc<Database>,
}

impl std::fmt::Debug for RenderDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDeps")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

/// Loads [`RenderDeps`] at most once
///
/// Only a successful load is cached. A failed load is reported to the caller
/// and attempted again on the next call.
#[derive(Debug)]
pub struct DependencyLoader {
    config: DependencyConfig,
    cell: OnceCell<RenderDeps>,
}

impl DependencyLoader {
    pub fn new(config: DependencyConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Process-wide loader with the default configuration
    pub fn shared() -> Arc<DependencyLoader> {
        static SHARED: OnceLock<Arc<DependencyLoader>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(DependencyLoader::new(DependencyConfig::default()))))
    }

    pub fn config(&self) -> &DependencyConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Load the dependencies unless a previous call already did
    pub async fn ensure_loaded(&self) -> Result<&RenderDeps> {
        self.cell
            .get_or_try_init(|| async {
                let config = self.config.clone();
                let deps = tokio::task::spawn_blocking(move || load(&config))
                    .await
                    .map_err(|e| Error::DependencyLoad(format!("loader task failed: {}", e)))??;
                log::info!(
                    target: "planner_export::deps",
                    "loaded {} font faces",
                    deps.fontdb.len()
                );
                Ok::<_, Error>(deps)
            })
            .await
    }
}

fn load(config: &DependencyConfig) -> Result<RenderDeps> {
    let mut db = Database::new();

    if config.load_system_fonts {
        db.load_system_fonts();
    }

    for dir in &config.font_dirs {
        if !dir.is_dir() {
            return Err(Error::DependencyLoad(format!(
                "font directory {} does not exist",
                dir.display()
            )));
        }
        db.load_fonts_dir(dir);
    }

    apply_sans_serif_family(&mut db);

    Ok(RenderDeps {
        fontdb: Arc::new(db),
    })
}

/// Map `sans-serif` to the first preferred family that is installed
fn apply_sans_serif_family(db: &mut Database) {
    let available: HashSet<String> = db
        .faces()
        .flat_map(|face| face.families.iter().map(|(family, _)| family.clone()))
        .collect();

    if let Some(family) = SANS_SERIF_PREFERENCE
        .iter()
        .find(|family| available.contains(**family))
    {
        log::debug!(target: "planner_export::deps", "sans-serif resolves to {}", family);
        db.set_sans_serif_family(*family);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_system_fonts() -> DependencyConfig {
        DependencyConfig {
            load_system_fonts: false,
            font_dirs: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_load_is_cached() {
        let loader = DependencyLoader::new(no_system_fonts());
        assert!(!loader.is_loaded());

        let first = Arc::clone(&loader.ensure_loaded().await.unwrap().fontdb);
        let second = Arc::clone(&loader.ensure_loaded().await.unwrap().fontdb);

        assert!(loader.is_loaded());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_missing_font_dir_fails_and_is_not_cached() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("fonts");
        let loader = DependencyLoader::new(DependencyConfig {
            load_system_fonts: false,
            font_dirs: vec![missing.clone()],
        });

        let err = loader.ensure_loaded().await.unwrap_err();
        assert!(matches!(err, Error::DependencyLoad(_)));
        assert!(!loader.is_loaded());

        // an empty directory loads fine on the next attempt
        std::fs::create_dir(&missing).unwrap();
        assert!(loader.ensure_loaded().await.is_ok());
        assert!(loader.is_loaded());
    }

    #[test]
    fn test_shared_loader_is_one_instance() {
        assert!(Arc::ptr_eq(&DependencyLoader::shared(), &DependencyLoader::shared()));
    }
}
