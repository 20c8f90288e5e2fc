//! Error types for the planner export library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the planner export library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Planner entry file could not be parsed
    #[error("Invalid planner entries: {0}")]
    Json(#[from] serde_json::Error),

    /// Date parsing error
    #[error("Invalid date expression: {0}")]
    InvalidDateExpression(String),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern
    #[error("No PDF files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// Rendering dependencies (font database) could not be loaded
    #[error("Failed to load rendering dependencies: {0}")]
    DependencyLoad(String),

    /// The isolated rendering surface never produced a layout
    #[error("Rendering surface failed: {0}")]
    Surface(String),

    /// Rasterization failed
    #[error("Rasterization failed: {0}")]
    Render(String),

    /// The print-view container is not present in the host document
    #[error("Container not found in host document: #{0}")]
    ContainerNotFound(String),

    /// Invalid export configuration
    #[error("Invalid export configuration: {0}")]
    Config(String),

    /// General error
    #[error("{0}")]
    General(String),
}
