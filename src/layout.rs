//! Page layout calculations

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Create a length from points (1/72 inch)
    pub fn from_pt(pt: f64) -> Self {
        Length(pt * 25.4 / 72.0)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }

    /// Get the value in CSS pixels (1/96 inch)
    pub fn px(&self) -> f64 {
        self.0 * 96.0 / 25.4
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// A3 in landscape orientation (420mm × 297mm)
    pub fn a3_landscape() -> Self {
        Self {
            width: Length::from_mm(420.0),
            height: Length::from_mm(297.0),
        }
    }
}

/// Margins for page content
#[derive(Debug, Clone, Copy)]
pub struct Margins {
    pub top: Length,
    pub bottom: Length,
    pub left: Length,
    pub right: Length,
}

impl Margins {
    /// Create margins with same value on all sides
    pub fn uniform(margin: Length) -> Self {
        Self {
            top: margin,
            bottom: margin,
            left: margin,
            right: margin,
        }
    }
}

/// Axis-aligned rectangle in millimeters, origin at the top-left of the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Fixed layout of the exported planner page
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page: PageDimensions,
    pub margins: Margins,
    /// Band at the top holding the title and export timestamp
    pub header_height: Length,
    /// Band at the bottom holding the caption
    pub footer_height: Length,
    /// Upper bound for the legend strip beneath the grid
    pub max_legend_height: Length,
    /// Gap between the grid and the legend strip
    pub legend_gap: Length,
    pub title_font_size: f32,
    pub timestamp_font_size: f32,
    pub caption_font_size: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page: PageDimensions::a3_landscape(),
            margins: Margins::uniform(Length::from_mm(10.0)),
            header_height: Length::from_mm(15.0),
            footer_height: Length::from_mm(6.0),
            max_legend_height: Length::from_mm(25.0),
            legend_gap: Length::from_mm(3.0),
            title_font_size: 14.0,
            timestamp_font_size: 8.0,
            caption_font_size: 7.0,
        }
    }
}

impl PageLayout {
    /// Width available between the left and right margins
    pub fn content_width(&self) -> Length {
        Length::from_mm(self.page.width.mm() - self.margins.left.mm() - self.margins.right.mm())
    }

    /// Header band directly below the top margin
    pub fn header_band(&self) -> Rect {
        Rect::new(
            self.margins.left.mm(),
            self.margins.top.mm(),
            self.content_width().mm(),
            self.header_height.mm(),
        )
    }

    /// Footer band directly above the bottom margin
    pub fn footer_band(&self) -> Rect {
        let y = self.page.height.mm() - self.margins.bottom.mm() - self.footer_height.mm();
        Rect::new(
            self.margins.left.mm(),
            y,
            self.content_width().mm(),
            self.footer_height.mm(),
        )
    }

    /// Area between the header and footer bands, shared by grid and legend
    pub fn body_area(&self) -> Rect {
        let header = self.header_band();
        let footer = self.footer_band();
        Rect::new(
            header.x,
            header.bottom(),
            header.width,
            (footer.y - header.bottom()).max(0.0),
        )
    }

    /// Split the body area into the grid area and an optional legend strip
    ///
    /// The legend strip keeps the aspect ratio of its bitmap, limited to
    /// `max_legend_height`, and sits at the bottom of the body area.
    pub fn split_body(&self, legend_pixels: Option<(u32, u32)>) -> (Rect, Option<Rect>) {
        let body = self.body_area();
        let Some((w, h)) = legend_pixels else {
            return (body, None);
        };

        let legend = place_image(
            Rect::new(body.x, body.y, body.width, self.max_legend_height.mm()),
            w,
            h,
        );
        let legend = Rect::new(legend.x, body.bottom() - legend.height, legend.width, legend.height);
        let grid_height = (legend.y - self.legend_gap.mm() - body.y).max(0.0);

        (Rect::new(body.x, body.y, body.width, grid_height), Some(legend))
    }
}

/// Fit an image of `pixel_width × pixel_height` into `area`
///
/// The aspect ratio is preserved and the image is anchored at the top-left
/// corner of the area. Images smaller than the area are not upscaled past it.
pub fn place_image(area: Rect, pixel_width: u32, pixel_height: u32) -> Rect {
    if pixel_width == 0 || pixel_height == 0 || area.width <= 0.0 || area.height <= 0.0 {
        return Rect::new(area.x, area.y, 0.0, 0.0);
    }

    let aspect = pixel_width as f64 / pixel_height as f64;
    let (width, height) = if area.width / aspect <= area.height {
        (area.width, area.width / aspect)
    } else {
        (area.height * aspect, area.height)
    };

    Rect::new(area.x, area.y, width, height)
}
