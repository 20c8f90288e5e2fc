//! One-page planner document composition using lopdf
//!
//! The page carries a header band (title and export timestamp), the grid
//! bitmap, an optional legend strip beneath it and a footer caption. Text is
//! drawn with the standard Helvetica fonts so nothing has to be embedded.

use chrono::Local;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::error::{Error, Result};
use crate::layout::{place_image, PageLayout, Rect};
use crate::render::Bitmap;

const PT_PER_MM: f64 = 72.0 / 25.4;

/// Everything drawn on the exported page
#[derive(Debug, Clone)]
pub struct PageContent {
    pub title: String,
    /// Export time, already formatted for display
    pub timestamp: String,
    pub grid: Bitmap,
    pub legend: Option<Bitmap>,
    pub caption: String,
}

/// Escape special characters for PDF literal strings
///
/// Characters outside printable ASCII are replaced, since the standard
/// fonts are used with WinAnsiEncoding and single-byte strings.
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect::<String>()
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Rough Helvetica advance; average glyph width is about half an em
fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.5
}

/// Converts top-left millimetre coordinates into PDF user space
struct PageSpace {
    height_pt: f64,
}

impl PageSpace {
    fn x(&self, mm: f64) -> f64 {
        mm * PT_PER_MM
    }

    /// PDF y of the line `mm` millimetres below the top edge
    fn y(&self, mm: f64) -> f64 {
        self.height_pt - mm * PT_PER_MM
    }

    fn len(&self, mm: f64) -> f64 {
        mm * PT_PER_MM
    }
}

fn standard_font(doc: &mut Document, base_font: &str) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(Object::Dictionary(font))
}

/// Add `bitmap` as an RGB image XObject, composited onto white
fn add_image(doc: &mut Document, bitmap: &Bitmap) -> ObjectId {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(bitmap.width as i64));
    dict.set("Height", Object::Integer(bitmap.height as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    doc.add_object(Stream::new(dict, bitmap.to_rgb()))
}

fn text_line(content: &mut String, font: &str, size: f32, x: f64, y: f64, text: &str) {
    content.push_str("BT\n");
    content.push_str(&format!("/{} {} Tf\n", font, size));
    content.push_str(&format!("1 0 0 1 {:.2} {:.2} Tm\n", x, y));
    content.push_str(&format!("({}) Tj\n", escape_pdf_string(text)));
    content.push_str("ET\n");
}

fn draw_image(content: &mut String, space: &PageSpace, name: &str, rect: Rect) {
    content.push_str(&format!(
        "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ\n",
        space.len(rect.width),
        space.len(rect.height),
        space.x(rect.x),
        space.y(rect.bottom()),
        name
    ));
}

/// Generate the page content stream
fn page_content(
    layout: &PageLayout,
    content: &PageContent,
    grid_rect: Rect,
    legend_rect: Option<Rect>,
) -> String {
    let space = PageSpace {
        height_pt: layout.page.height.pt(),
    };
    let mut out = String::new();
    out.push_str("0 g\n");

    // Header: title on the left, timestamp on the right, rule underneath
    let header = layout.header_band();
    let title_baseline = space.y(header.y) - layout.title_font_size as f64;
    text_line(
        &mut out,
        "F2",
        layout.title_font_size,
        space.x(header.x),
        title_baseline,
        &content.title,
    );

    let stamp = format!("Exported {}", content.timestamp);
    let stamp_width = estimate_text_width(&stamp, layout.timestamp_font_size) as f64;
    text_line(
        &mut out,
        "F1",
        layout.timestamp_font_size,
        space.x(header.right()) - stamp_width,
        title_baseline,
        &stamp,
    );

    out.push_str(&format!(
        "0.8 G\n0.5 w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\n",
        space.x(header.x),
        space.y(header.bottom()) + 4.0,
        space.x(header.right()),
        space.y(header.bottom()) + 4.0
    ));

    draw_image(&mut out, &space, "Im1", grid_rect);
    if let Some(rect) = legend_rect {
        draw_image(&mut out, &space, "Im2", rect);
    }

    // Footer caption, centered
    let footer = layout.footer_band();
    let caption_width = estimate_text_width(&content.caption, layout.caption_font_size) as f64;
    out.push_str("0.4 g\n");
    text_line(
        &mut out,
        "F1",
        layout.caption_font_size,
        space.x(footer.x) + (space.len(footer.width) - caption_width) / 2.0,
        space.y(footer.bottom()) + 2.0,
        &content.caption,
    );

    out
}

fn literal(s: &str) -> Object {
    Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
}

/// Compose the single-page planner document and serialize it
pub fn compose_page(layout: &PageLayout, content: &PageContent) -> Result<Vec<u8>> {
    if content.grid.is_empty() {
        return Err(Error::Render("grid bitmap is empty".to_string()));
    }
    let legend = content.legend.as_ref().filter(|b| !b.is_empty());

    let (grid_area, legend_area) = layout.split_body(legend.map(|b| (b.width, b.height)));
    let grid_rect = place_image(grid_area, content.grid.width, content.grid.height);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = standard_font(&mut doc, "Helvetica");
    let bold = standard_font(&mut doc, "Helvetica-Bold");

    let mut xobjects = Dictionary::new();
    xobjects.set("Im1", Object::Reference(add_image(&mut doc, &content.grid)));
    if let Some(bitmap) = legend {
        xobjects.set("Im2", Object::Reference(add_image(&mut doc, bitmap)));
    }

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(regular));
    fonts.set("F2", Object::Reference(bold));

    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    resources.set("XObject", Object::Dictionary(xobjects));
    let resources_id = doc.add_object(Object::Dictionary(resources));

    let stream = page_content(layout, content, grid_rect, legend_area);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), stream.into_bytes()));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(layout.page.width.pt() as f32),
            Object::Real(layout.page.height.pt() as f32),
        ]),
    );
    page.set("Resources", Object::Reference(resources_id));
    page.set("Contents", Object::Reference(content_id));
    let page_id = doc.add_object(Object::Dictionary(page));

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages.set("Count", Object::Integer(1));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut info = Dictionary::new();
    info.set("Title", literal(&content.title));
    info.set("Producer", literal(concat!("planner-export ", env!("CARGO_PKG_VERSION"))));
    info.set(
        "CreationDate",
        literal(&Local::now().format("D:%Y%m%d%H%M%S").to_string()),
    );
    let info_id = doc.add_object(Object::Dictionary(info));
    doc.trailer.set("Info", Object::Reference(info_id));

    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::inspect_document;

    fn content(legend: Option<Bitmap>) -> PageContent {
        PageContent {
            title: "Year Planner 2025".to_string(),
            timestamp: "2025-01-02 09:30".to_string(),
            grid: Bitmap::filled(400, 200, [200, 220, 255]),
            legend,
            caption: "Generated by planner-export".to_string(),
        }
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("a (b) \\c"), "a \\(b\\) \\\\c");
        assert_eq!(escape_pdf_string("Café"), "Caf?");
    }

    #[test]
    fn test_page_content_places_text_and_images() {
        let layout = PageLayout::default();
        let rect = Rect::new(10.0, 25.0, 400.0, 200.0);
        let stream = page_content(&layout, &content(None), rect, None);

        assert!(stream.contains("(Year Planner 2025) Tj"));
        assert!(stream.contains("(Exported 2025-01-02 09:30) Tj"));
        assert!(stream.contains("/Im1 Do"));
        assert!(!stream.contains("/Im2 Do"));
        assert!(stream.contains("/F2 14 Tf"));
    }

    #[test]
    fn test_compose_a3_landscape() {
        let bytes = compose_page(&PageLayout::default(), &content(None)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let info = inspect_document(&bytes).unwrap();
        assert_eq!(info.page_count, 1);
        let (w, h) = info.page_size_mm.unwrap();
        assert!((w - 420.0).abs() < 0.5);
        assert!((h - 297.0).abs() < 0.5);
        assert_eq!(info.title.as_deref(), Some("Year Planner 2025"));
        assert_eq!(info.image_count, 1);
    }

    #[test]
    fn test_compose_with_legend_adds_second_image() {
        let legend = Bitmap::filled(300, 20, [255, 255, 255]);
        let bytes = compose_page(&PageLayout::default(), &content(Some(legend))).unwrap();
        assert_eq!(inspect_document(&bytes).unwrap().image_count, 2);
    }

    #[test]
    fn test_compose_rejects_empty_grid() {
        let mut page = content(None);
        page.grid = Bitmap::filled(0, 0, [0, 0, 0]);
        assert!(matches!(
            compose_page(&PageLayout::default(), &page),
            Err(Error::Render(_))
        ));
    }
}
