//! Planner Export Library
//!
//! Exports a rendered year-planner grid as a one-page landscape PDF and
//! provides the leveled loggers the planner application uses:
//!
//! - Copy grid content out of its host page, unwrapping shadow roots
//! - Lay out and rasterize it on an isolated surface under a fixed visual policy
//! - Compose an A3 landscape page with header, grid, legend strip and footer
//! - Log through named, leveled loggers with a persisted debug opt-in
//!
//! # Example
//!
//! ```no_run
//! use planner_export::export::{ExportConfig, ExportRequest, Exporter};
//! use planner_export::dom::{Element, HostDocument};
//! use planner_export::logging::{Level, Logger};
//! use planner_export::planner::build_year_grid;
//!
//! # async fn run() -> planner_export::Result<()> {
//! let host = HostDocument::new(Element::new("body"));
//! let grid = build_year_grid(2025, &[], None);
//!
//! let exporter = Exporter::new(ExportConfig::default(), Logger::console("Export", Level::Warn));
//! let doc = exporter.export_grid(&host, ExportRequest::new(2025, &grid)).await?;
//! doc.save(std::path::Path::new(&doc.file_name))?;
//! # Ok(())
//! # }
//! ```

pub mod date;
pub mod deps;
pub mod dom;
pub mod error;
pub mod export;
pub mod layout;
pub mod logging;
pub mod pdf;
pub mod planner;
pub mod render;
pub mod style;
pub mod surface;

// Re-export commonly used items
pub use error::{Error, Result};
pub use export::{ExportConfig, ExportRequest, ExportedDocument, Exporter};
pub use logging::{Level, Logger, LoggerRegistry};
