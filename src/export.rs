//! Planner export pipeline
//!
//! Two entry points share one pipeline:
//!
//! - [`Exporter::export_grid`] exports grid content handed in by the caller.
//! - [`Exporter::export_print_view`] locates the print container already
//!   present in the host document.
//!
//! Either way the content is copied (unwrapping shadow roots), mounted on an
//! [`IsolatedSurface`] together with the host's style sheets and the
//! [`VisualPolicy`], rasterized after a settle delay and embedded in a
//! one-page PDF. The surface is detached when the pipeline returns, on
//! success and on failure alike.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;

use crate::date::format_export_timestamp;
use crate::deps::{DependencyConfig, DependencyLoader};
use crate::dom::{Element, HostDocument};
use crate::error::{Error, Result};
use crate::layout::PageLayout;
use crate::logging::Logger;
use crate::pdf::{compose_page, PageContent};
use crate::planner::{PRINT_CONTAINER_ID, PRINT_LEGEND_ID};
use crate::render::{Bitmap, RasterOptions, Rasterizer, Region, SvgRasterizer};
use crate::style::VisualPolicy;
use crate::surface::IsolatedSurface;

/// Id of the surface region holding the grid copy
pub const CONTENT_REGION_ID: &str = "export-content";
/// Id of the surface region holding the legend copy, present only with a legend
pub const LEGEND_REGION_ID: &str = "export-legend";

/// Longest settle delay accepted by [`ExportConfig::validate`]
pub const MAX_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Export settings, fixed for the life of an [`Exporter`]
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub layout: PageLayout,
    pub policy: VisualPolicy,
    pub raster: RasterOptions,
    /// Wait between surface load and rasterization
    pub settle_delay: Duration,
    pub deps: DependencyConfig,
    pub print_container_id: String,
    pub print_legend_id: String,
    /// Page title; defaults to "Year Planner {year}"
    pub title: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            layout: PageLayout::default(),
            policy: VisualPolicy::default(),
            raster: RasterOptions::default(),
            settle_delay: Duration::from_millis(1000),
            deps: DependencyConfig::default(),
            print_container_id: PRINT_CONTAINER_ID.to_string(),
            print_legend_id: PRINT_LEGEND_ID.to_string(),
            title: None,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        self.raster.validate()?;

        if self.settle_delay > MAX_SETTLE_DELAY {
            return Err(Error::Config(format!(
                "settle delay of {}ms exceeds {}ms",
                self.settle_delay.as_millis(),
                MAX_SETTLE_DELAY.as_millis()
            )));
        }

        let body = self.layout.body_area();
        if body.width <= 0.0 || body.height <= 0.0 {
            return Err(Error::Config(
                "page layout leaves no room for the grid".to_string(),
            ));
        }

        if self.print_container_id.is_empty() {
            return Err(Error::Config("print container id is empty".to_string()));
        }
        Ok(())
    }
}

/// Content handed to [`Exporter::export_grid`]
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub year: i32,
    pub grid: &'a Element,
    pub legend: Option<&'a Element>,
}

impl<'a> ExportRequest<'a> {
    pub fn new(year: i32, grid: &'a Element) -> Self {
        Self {
            year,
            grid,
            legend: None,
        }
    }

    pub fn with_legend(mut self, legend: &'a Element) -> Self {
        self.legend = Some(legend);
        self
    }
}

/// A finished export
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    /// Serialized PDF; never empty
    pub bytes: Vec<u8>,
    /// Suggested download name, `year-planner-{year}.pdf`
    pub file_name: String,
    /// The grid as rasterized before embedding
    pub grid_bitmap: Bitmap,
}

impl ExportedDocument {
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Runs exports against host documents
pub struct Exporter {
    config: ExportConfig,
    logger: Logger,
    rasterizer: Option<Arc<dyn Rasterizer>>,
    loader: Arc<DependencyLoader>,
}

impl Exporter {
    /// Exporter rasterizing with [`SvgRasterizer`]
    ///
    /// With the default dependency configuration the process-wide loader is
    /// used, so fonts are loaded once no matter how many exporters exist.
    pub fn new(config: ExportConfig, logger: Logger) -> Self {
        let loader = if config.deps == DependencyConfig::default() {
            DependencyLoader::shared()
        } else {
            Arc::new(DependencyLoader::new(config.deps.clone()))
        };
        Self {
            config,
            logger,
            rasterizer: None,
            loader,
        }
    }

    /// Use `rasterizer` instead of the default; dependencies are not loaded
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_dependency_loader(mut self, loader: Arc<DependencyLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export the grid (and legend) given in `request`
    pub async fn export_grid(
        &self,
        host: &HostDocument,
        request: ExportRequest<'_>,
    ) -> Result<ExportedDocument> {
        let grid = request.grid.export_copy();
        let legend = request.legend.map(Element::export_copy);

        self.run(host, request.year, grid, legend)
            .await
            .map_err(|e| self.failed(request.year, e))
    }

    /// Export the print container already present in `host`
    pub async fn export_print_view(&self, host: &HostDocument, year: i32) -> Result<ExportedDocument> {
        let result: Result<ExportedDocument> = async {
            let container = host
                .find_by_id(&self.config.print_container_id)
                .ok_or_else(|| Error::ContainerNotFound(self.config.print_container_id.clone()))?;
            let legend = host
                .find_by_id(&self.config.print_legend_id)
                .map(Element::export_copy);

            self.run(host, year, container.export_copy(), legend).await
        }
        .await;

        result.map_err(|e| self.failed(year, e))
    }

    fn failed(&self, year: i32, error: Error) -> Error {
        self.logger.error(format!("export of {} failed: {}", year, error));
        error
    }

    async fn rasterizer(&self) -> Result<Arc<dyn Rasterizer>> {
        if let Some(rasterizer) = &self.rasterizer {
            return Ok(Arc::clone(rasterizer));
        }
        let deps = self.loader.ensure_loaded().await?;
        Ok(Arc::new(SvgRasterizer::new(Arc::clone(&deps.fontdb))))
    }

    /// Build the surface container: content region, then legend region
    fn container(&self, grid: Vec<Element>, legend: Option<Vec<Element>>) -> Element {
        let mut content = Element::new("div")
            .with_id(CONTENT_REGION_ID)
            .with_children(grid);
        content.flatten_shadow_roots();

        let mut container = Element::new("div")
            .with_class("export-container")
            .with_child(content);

        if let Some(legend) = legend {
            let mut region = Element::new("div")
                .with_id(LEGEND_REGION_ID)
                .with_style("padding", "2mm")
                .with_children(legend);
            region.flatten_shadow_roots();
            container.children.push(region);
        }

        self.config.policy.apply_overrides(&mut container);
        container
    }

    async fn run(
        &self,
        host: &HostDocument,
        year: i32,
        grid: Vec<Element>,
        legend: Option<Vec<Element>>,
    ) -> Result<ExportedDocument> {
        self.config.validate()?;
        let timer = self.logger.time(format!("export {}", year));

        let rasterizer = self.rasterizer().await?;

        let viewport = self.config.layout.content_width().px() as f32;
        let mut surface = IsolatedSurface::attach(host, viewport)?;
        surface.inject_host_stylesheets(host);
        surface.inject_stylesheet(self.config.policy.stylesheet());

        let has_legend = legend.is_some();
        surface.mount(self.container(grid, legend));

        let scene = surface.load().await?;
        self.logger.debug(format!(
            "surface {} ready, settling for {}ms",
            surface.id().0,
            self.config.settle_delay.as_millis()
        ));
        tokio::time::sleep(self.config.settle_delay).await;

        let content = scene
            .anchor(CONTENT_REGION_ID)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| Error::Surface("grid content has no area".to_string()))?;
        let legend_region: Option<Region> = if has_legend {
            // The region is padded, so judge it by what its content paints
            let region = scene
                .anchor(LEGEND_REGION_ID)
                .filter(|r| !r.is_empty() && scene.paints_within(r));
            if region.is_none() {
                self.logger.debug("legend has no area, leaving it out");
            }
            region
        } else {
            None
        };

        let raster = self.config.raster.clone();
        let layout = self.config.layout.clone();
        let title = self
            .config
            .title
            .clone()
            .unwrap_or_else(|| format!("Year Planner {}", year));
        let timestamp = format_export_timestamp(&Local::now());
        let caption = format!(
            "Year planner {} - generated by planner-export {}",
            year,
            env!("CARGO_PKG_VERSION")
        );

        let (bytes, grid_bitmap) = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, Bitmap)> {
            let grid = rasterizer.rasterize(&scene, &content, &raster)?;
            let legend = legend_region
                .map(|region| rasterizer.rasterize(&scene, &region, &raster))
                .transpose()?;
            let page = PageContent {
                title,
                timestamp,
                grid,
                legend,
                caption,
            };
            let bytes = compose_page(&layout, &page)?;
            Ok((bytes, page.grid))
        })
        .await
        .map_err(|e| Error::Render(format!("rasterizer task failed: {}", e)))??;

        drop(surface);

        if bytes.is_empty() {
            return Err(Error::Render("composed document is empty".to_string()));
        }

        self.logger.info(format!(
            "exported {} ({} bytes, grid {}x{} px)",
            year,
            bytes.len(),
            grid_bitmap.width,
            grid_bitmap.height
        ));
        timer.finish();

        Ok(ExportedDocument {
            bytes,
            file_name: format!("year-planner-{}.pdf", year),
            grid_bitmap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemorySink};
    use crate::planner::{build_legend, build_year_grid, Category};
    use crate::render::Scene;
    use std::sync::Mutex;

    /// Records the regions it is asked to paint and returns flat bitmaps
    #[derive(Default)]
    struct RecordingRasterizer {
        calls: Mutex<Vec<(Region, usize)>>,
    }

    impl Rasterizer for RecordingRasterizer {
        fn rasterize(&self, scene: &Scene, region: &Region, _: &RasterOptions) -> Result<Bitmap> {
            self.calls.lock().unwrap().push((*region, scene.items.len()));
            Ok(Bitmap::filled(region.width as u32, region.height as u32, [255, 255, 255]))
        }
    }

    fn exporter(rasterizer: Arc<dyn Rasterizer>) -> (Exporter, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let config = ExportConfig {
            settle_delay: Duration::ZERO,
            ..Default::default()
        };
        let exporter = Exporter::new(config, Logger::new("Export", Level::Debug, sink.clone()))
            .with_rasterizer(rasterizer);
        (exporter, sink)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ExportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settle_delay, Duration::from_millis(1000));
        assert_eq!(config.raster.scale, 2.0);
    }

    #[test]
    fn test_validate_rejects_long_settle_delay() {
        let config = ExportConfig {
            settle_delay: Duration::from_secs(60),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_container_regions() {
        let (exporter, _) = exporter(Arc::new(RecordingRasterizer::default()));
        let grid = build_year_grid(2025, &[], None);

        let without = exporter.container(grid.export_copy(), None);
        assert!(without.find_by_id(CONTENT_REGION_ID).is_some());
        assert!(without.find_by_id(LEGEND_REGION_ID).is_none());

        let legend = build_legend(&[Category::Holiday]);
        let with = exporter.container(grid.export_copy(), Some(legend.export_copy()));
        assert!(with.find_by_id(LEGEND_REGION_ID).is_some());
        // overrides reached the mounted copy
        assert_eq!(with.count_class("day-cell"), 365);
        let row = &with.find_by_id(CONTENT_REGION_ID).unwrap().children[0].children[0];
        assert_eq!(row.style("display"), Some("flex"));
    }

    #[tokio::test]
    async fn test_export_grid_logs_and_names_file() {
        let recorder = Arc::new(RecordingRasterizer::default());
        let (exporter, sink) = exporter(recorder.clone());
        let host = HostDocument::new(Element::new("body"));
        let grid = build_year_grid(2025, &[], None);

        let doc = exporter
            .export_grid(&host, ExportRequest::new(2025, &grid))
            .await
            .unwrap();

        assert_eq!(doc.file_name, "year-planner-2025.pdf");
        assert!(!doc.bytes.is_empty());
        assert_eq!(recorder.calls.lock().unwrap().len(), 1);
        assert!(sink.lines().iter().any(|l| l.contains("[Export][INFO] exported 2025")));
    }

    #[tokio::test]
    async fn test_missing_container_is_logged_and_returned() {
        let (exporter, sink) = exporter(Arc::new(RecordingRasterizer::default()));
        let host = HostDocument::new(Element::new("body"));

        let err = exporter.export_print_view(&host, 2025).await.unwrap_err();
        assert!(matches!(err, Error::ContainerNotFound(ref id) if id == PRINT_CONTAINER_ID));
        assert!(sink.lines().iter().any(|l| l.contains("[ERROR] export of 2025 failed")));
        assert_eq!(host.attached_surfaces(), 0);
    }
}
