//! PDF composition and inspection

pub mod compose;
pub mod metadata;

// Re-export commonly used items
pub use compose::{compose_page, PageContent};
pub use metadata::{extract_metadata, inspect_document, DocumentInfo};
