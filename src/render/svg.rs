//! SVG-backed rasterizer
//!
//! The scene is serialized to an SVG document carrying the injected style
//! sheets, parsed by `usvg` against the loaded font database and painted by
//! `resvg` onto an opaque pixmap.

use std::fmt::Write as _;
use std::sync::Arc;

use resvg::tiny_skia::{Color, Pixmap, Transform};
use usvg::fontdb::Database;

use super::{Bitmap, BoxItem, Rasterizer, RasterOptions, Region, Scene, SceneItem, TextItem};
use crate::error::{Error, Result};

/// Largest bitmap edge we are willing to allocate, in pixels
const MAX_EDGE: u32 = 16_384;

/// Escape text for use in XML content and attribute values
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Path of a box with independent corner radii
fn rounded_path(rect: &Region, radii: [f32; 4]) -> String {
    let limit = rect.width.min(rect.height) / 2.0;
    let [tl, tr, br, bl] = radii.map(|r| r.clamp(0.0, limit.max(0.0)));
    let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);

    format!(
        "M{x0} {y} H{x1} Q{xr} {y} {xr} {y1} V{y2} Q{xr} {yb} {x2} {yb} H{x3} Q{x} {yb} {x} {y3} V{y4} Q{x} {y} {x0} {y} Z",
        x0 = x + tl,
        x1 = x + w - tr,
        xr = x + w,
        y1 = y + tr,
        y2 = y + h - br,
        yb = y + h,
        x2 = x + w - br,
        x3 = x + bl,
        y3 = y + h - bl,
        y4 = y + tl,
        x = x,
        y = y,
    )
}

fn class_attr(classes: &[String]) -> String {
    if classes.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", escape_xml(&classes.join(" ")))
    }
}

fn write_box(out: &mut String, item: &BoxItem) {
    let fill = item.fill.as_deref().unwrap_or("none");
    let _ = write!(
        out,
        "<path{} d=\"{}\" fill=\"{}\"",
        class_attr(&item.classes),
        rounded_path(&item.rect, item.radii),
        escape_xml(fill)
    );
    if let Some(stroke) = &item.stroke {
        let _ = write!(out, " stroke=\"{}\" stroke-width=\"0.75\"", escape_xml(stroke));
    }
    out.push_str("/>\n");
}

fn write_text(out: &mut String, item: &TextItem) {
    let _ = writeln!(
        out,
        "<text{} x=\"{}\" y=\"{}\" font-size=\"{}\" font-family=\"sans-serif\" fill=\"{}\">{}</text>",
        class_attr(&item.classes),
        item.x,
        item.y,
        item.font_size,
        escape_xml(&item.color),
        escape_xml(&item.text)
    );
}

/// Serialize the part of `scene` inside `region` to an SVG document
///
/// Box and text elements keep their element classes so the injected style
/// sheets match them. Inline presentation attributes carry the values set
/// by direct style mutation.
pub fn scene_to_svg(scene: &Scene, region: &Region, background: [u8; 3]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"{x} {y} {w} {h}\">",
        x = region.x,
        y = region.y,
        w = region.width,
        h = region.height,
    );

    if !scene.stylesheets.is_empty() {
        out.push_str("<style><![CDATA[\n");
        for sheet in &scene.stylesheets {
            out.push_str(&sheet.replace("]]>", "]]]]><![CDATA[>"));
            out.push('\n');
        }
        out.push_str("]]></style>\n");
    }

    let _ = writeln!(
        out,
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"#{:02x}{:02x}{:02x}\"/>",
        region.x, region.y, region.width, region.height, background[0], background[1], background[2]
    );

    for item in &scene.items {
        match item {
            SceneItem::Box(b) => write_box(&mut out, b),
            SceneItem::Text(t) => write_text(&mut out, t),
        }
    }

    out.push_str("</svg>\n");
    out
}

/// Rasterizer built on `usvg` and `resvg`
#[derive(Clone)]
pub struct SvgRasterizer {
    fontdb: Arc<Database>,
}

impl SvgRasterizer {
    pub fn new(fontdb: Arc<Database>) -> Self {
        Self { fontdb }
    }

    /// Rasterizer without any fonts; text runs are skipped
    pub fn without_fonts() -> Self {
        Self::new(Arc::new(Database::new()))
    }
}

impl std::fmt::Debug for SvgRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgRasterizer")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

impl Rasterizer for SvgRasterizer {
    fn rasterize(&self, scene: &Scene, region: &Region, options: &RasterOptions) -> Result<Bitmap> {
        options.validate()?;
        if region.is_empty() {
            return Err(Error::Render("region to rasterize is empty".to_string()));
        }

        let width = (region.width * options.scale).ceil() as u32;
        let height = (region.height * options.scale).ceil() as u32;
        if width > MAX_EDGE || height > MAX_EDGE {
            return Err(Error::Render(format!(
                "bitmap of {}x{} exceeds the {} pixel limit",
                width, height, MAX_EDGE
            )));
        }

        let svg = scene_to_svg(scene, region, options.background);

        let mut usvg_options = usvg::Options::default();
        usvg_options.fontdb = Arc::clone(&self.fontdb);
        let tree = usvg::Tree::from_str(&svg, &usvg_options)
            .map_err(|e| Error::Render(format!("failed to parse surface: {}", e)))?;

        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| Error::Render(format!("failed to allocate {}x{} pixmap", width, height)))?;
        let [r, g, b] = options.background;
        pixmap.fill(Color::from_rgba8(r, g, b, 255));

        resvg::render(&tree, Transform::from_scale(options.scale, options.scale), &mut pixmap.as_mut());

        let rgba = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();

        log::debug!(
            target: "planner_export::render",
            "rasterized {}x{} region at {}x into {}x{} pixels",
            region.width,
            region.height,
            options.scale,
            width,
            height
        );

        Ok(Bitmap { width, height, rgba })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_box(fill: &str, classes: &[&str]) -> Scene {
        Scene {
            width: 40.0,
            height: 20.0,
            stylesheets: Vec::new(),
            items: vec![SceneItem::Box(BoxItem {
                rect: Region::new(0.0, 0.0, 20.0, 20.0),
                fill: Some(fill.to_string()),
                stroke: None,
                radii: [0.0; 4],
                classes: classes.iter().map(|c| c.to_string()).collect(),
            })],
            anchors: Default::default(),
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_rounded_path_clamps_radii() {
        let path = rounded_path(&Region::new(0.0, 0.0, 10.0, 4.0), [10.0, 0.0, 0.0, 0.0]);
        assert!(path.starts_with("M2 0"));
    }

    #[test]
    fn test_svg_keeps_classes_and_stylesheets() {
        let mut scene = scene_with_box("#ffffff", &["grid-cell", "weekend"]);
        scene.stylesheets.push("path.weekend { fill: #f3f4f6; }".to_string());
        let svg = scene_to_svg(&scene, &Region::new(0.0, 0.0, 40.0, 20.0), [255, 255, 255]);

        assert!(svg.contains("class=\"grid-cell weekend\""));
        assert!(svg.contains("<style><![CDATA["));
        assert!(svg.contains("path.weekend"));
        assert!(svg.contains("viewBox=\"0 0 40 20\""));
    }

    #[test]
    fn test_rasterize_paints_background_and_boxes() {
        let scene = scene_with_box("#ff0000", &[]);
        let rasterizer = SvgRasterizer::without_fonts();
        let options = RasterOptions::default();

        let bitmap = rasterizer
            .rasterize(&scene, &Region::new(0.0, 0.0, 40.0, 20.0), &options)
            .expect("rasterize");

        assert_eq!((bitmap.width, bitmap.height), (80, 40));
        assert_eq!(bitmap.pixel(10, 10), Some([255, 0, 0, 255]));
        // transparent areas show the opaque white fill
        assert_eq!(bitmap.pixel(70, 30), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_injected_stylesheet_applies() {
        let mut scene = scene_with_box("#ffffff", &["weekend"]);
        scene.stylesheets.push(".weekend { fill: #0000ff; }".to_string());
        let rasterizer = SvgRasterizer::without_fonts();

        let bitmap = rasterizer
            .rasterize(&scene, &Region::new(0.0, 0.0, 20.0, 20.0), &RasterOptions { scale: 1.0, ..Default::default() })
            .expect("rasterize");
        assert_eq!(bitmap.pixel(10, 10), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_rasterize_rejects_empty_region() {
        let scene = scene_with_box("#ff0000", &[]);
        let result = SvgRasterizer::without_fonts().rasterize(
            &scene,
            &Region::new(0.0, 0.0, 0.0, 10.0),
            &RasterOptions::default(),
        );
        assert!(matches!(result, Err(Error::Render(_))));
    }
}
