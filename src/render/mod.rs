//! Rendering of mounted content into bitmaps
//!
//! Layout turns an element tree into a [`Scene`] of boxes and text runs.
//! A [`Rasterizer`] turns a region of that scene into a [`Bitmap`].

pub mod layout;
pub mod svg;

use std::collections::BTreeMap;

use crate::error::{Error, Result};

pub use layout::layout;
pub use svg::SvgRasterizer;

/// Rectangle in CSS pixels, origin at the top-left of the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Whether the two regions share a non-empty area
    pub fn overlaps(&self, other: &Region) -> bool {
        let w = (self.x + self.width).min(other.x + other.width) - self.x.max(other.x);
        let h = (self.y + self.height).min(other.y + other.height) - self.y.max(other.y);
        w > 0.0 && h > 0.0
    }
}

/// A filled and/or stroked box
#[derive(Debug, Clone, PartialEq)]
pub struct BoxItem {
    pub rect: Region,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    /// Corner radii: top-left, top-right, bottom-right, bottom-left
    pub radii: [f32; 4],
    pub classes: Vec<String>,
}

/// A single line of text; `y` is the baseline
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub color: String,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneItem {
    Box(BoxItem),
    Text(TextItem),
}

/// Laid-out surface content, in paint order
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    /// Style sheets injected into the surface, in injection order
    pub stylesheets: Vec<String>,
    pub items: Vec<SceneItem>,
    /// Rectangles of elements that carry an id
    pub anchors: BTreeMap<String, Region>,
}

impl Scene {
    pub fn anchor(&self, id: &str) -> Option<Region> {
        self.anchors.get(id).copied()
    }

    /// Items whose classes include `class`
    pub fn items_with_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a SceneItem> + 'a {
        self.items.iter().filter(move |item| {
            let classes = match item {
                SceneItem::Box(b) => &b.classes,
                SceneItem::Text(t) => &t.classes,
            };
            classes.iter().any(|c| c == class)
        })
    }

    /// Whether anything visible is painted inside `region`
    pub fn paints_within(&self, region: &Region) -> bool {
        self.items.iter().any(|item| match item {
            SceneItem::Box(b) => !b.rect.is_empty() && b.rect.overlaps(region),
            SceneItem::Text(t) => !t.text.trim().is_empty() && region.contains_point(t.x, t.y),
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextItem> {
        self.items.iter().filter_map(|item| match item {
            SceneItem::Text(t) => Some(t),
            SceneItem::Box(_) => None,
        })
    }
}

/// Options for one rasterization call
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Upscaling factor applied for print sharpness
    pub scale: f32,
    /// Opaque fill painted under the content
    pub background: [u8; 3],
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: [255, 255, 255],
        }
    }
}

impl RasterOptions {
    pub const MIN_SCALE: f32 = 1.0;
    pub const MAX_SCALE: f32 = 4.0;

    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_SCALE..=Self::MAX_SCALE).contains(&self.scale) {
            return Err(Error::Config(format!(
                "raster scale {} outside {}..={}",
                self.scale,
                Self::MIN_SCALE,
                Self::MAX_SCALE
            )));
        }
        Ok(())
    }
}

/// Renders a region of a scene into a bitmap
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, scene: &Scene, region: &Region, options: &RasterOptions) -> Result<Bitmap>;
}

/// RGBA image with straight (non-premultiplied) alpha
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Bitmap {
    /// Create a bitmap filled with one opaque colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let rgba = std::iter::repeat([rgb[0], rgb[1], rgb[2], 255])
            .take(width as usize * height as usize)
            .flatten()
            .collect();
        Self { width, height, rgba }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.rgba.is_empty()
    }

    /// RGB bytes composited onto white
    pub fn to_rgb(&self) -> Vec<u8> {
        self.rgba
            .chunks_exact(4)
            .flat_map(|px| {
                let a = px[3] as u32;
                let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
                [blend(px[0]), blend(px[1]), blend(px[2])]
            })
            .collect()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| Error::Render(format!("PNG header: {}", e)))?;
            writer
                .write_image_data(&self.rgba)
                .map_err(|e| Error::Render(format!("PNG data: {}", e)))?;
        }
        Ok(out)
    }
}
