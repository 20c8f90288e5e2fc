//! PDF metadata extraction

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};

const MM_PER_PT: f64 = 25.4 / 72.0;

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog_id = match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => *id,
        Ok(_) => return Err(Error::General("Root is not a reference".to_string())),
        Err(_) => return Err(Error::General("No Root in trailer".to_string())),
    };

    let catalog = doc.get_dictionary(catalog_id)?;
    let pages_id = match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(Error::General("No Pages reference in catalog".to_string())),
    };

    match doc.get_dictionary(pages_id)?.get(b"Count") {
        Ok(Object::Integer(n)) => Ok(*n as usize),
        _ => Err(Error::General("Count is not an integer".to_string())),
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Size of the first page in millimetres, from its MediaBox
fn first_page_size(doc: &Document) -> Option<(f64, f64)> {
    let page_id = *doc.get_pages().values().next()?;
    let media_box = doc.get_dictionary(page_id).ok()?.get(b"MediaBox").ok()?;
    let values: Vec<f64> = media_box.as_array().ok()?.iter().filter_map(number).collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => Some(((x1 - x0) * MM_PER_PT, (y1 - y0) * MM_PER_PT)),
        _ => None,
    }
}

fn info_title(doc: &Document) -> Option<String> {
    let info_id = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => *id,
        _ => return None,
    };
    let title = doc.get_dictionary(info_id).ok()?.get(b"Title").ok()?;
    String::from_utf8(title.as_str().ok()?.to_vec()).ok()
}

fn count_images(doc: &Document) -> usize {
    doc.objects
        .values()
        .filter(|obj| match obj {
            Object::Stream(stream) => matches!(
                stream.dict.get(b"Subtype"),
                Ok(Object::Name(name)) if name.as_slice() == b"Image"
            ),
            _ => false,
        })
        .count()
}

/// Summary of an exported planner document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub page_count: usize,
    /// Width and height of the first page in millimetres
    pub page_size_mm: Option<(f64, f64)>,
    pub title: Option<String>,
    /// Number of image XObjects in the document
    pub image_count: usize,
}

/// Inspect a PDF held in memory
pub fn inspect_document(bytes: &[u8]) -> Result<DocumentInfo> {
    let doc = Document::load_mem(bytes)?;
    Ok(DocumentInfo {
        page_count: count_pages_from_catalog(&doc)?,
        page_size_mm: first_page_size(&doc),
        title: info_title(&doc),
        image_count: count_images(&doc),
    })
}

/// Inspect a PDF file
pub fn extract_metadata(path: &Path) -> Result<DocumentInfo> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    inspect_document(&bytes)
}
