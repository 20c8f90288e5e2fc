//! Visual policy applied while rasterizing the planner
//!
//! One [`VisualPolicy`] drives both ways the fixed print styling reaches the
//! surface: as injected style rules ([`VisualPolicy::stylesheet`]) and as
//! direct mutation of the mounted copy ([`VisualPolicy::apply_overrides`]).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::dom::Element;
use crate::layout::Length;
use crate::planner::Category;

/// Background and accent colour of one item category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryColors {
    pub background: String,
    pub accent: String,
}

impl CategoryColors {
    fn new(background: &str, accent: &str) -> Self {
        Self {
            background: background.to_string(),
            accent: accent.to_string(),
        }
    }
}

/// Fixed physical styling of the exported grid
#[derive(Debug, Clone)]
pub struct VisualPolicy {
    pub day_cell_width: Length,
    pub day_cell_height: Length,
    /// Row height of the header row and of month label cells
    pub header_row_height: Length,
    pub month_label_width: Length,
    /// Item body text size in points
    pub item_font_size: f32,
    /// Icon size in points
    pub icon_font_size: f32,
    pub item_height: Length,
    pub item_radius: Length,
    pub cell_border: String,
    pub cell_fill: String,
    pub empty_fill: String,
    pub weekend_fill: String,
    pub today_fill: String,
    pub muted_text: String,
    pub palette: BTreeMap<Category, CategoryColors>,
}

impl Default for VisualPolicy {
    fn default() -> Self {
        let palette = BTreeMap::from([
            (Category::Event, CategoryColors::new("#dbeafe", "#1d4ed8")),
            (Category::Holiday, CategoryColors::new("#fee2e2", "#b91c1c")),
            (Category::Birthday, CategoryColors::new("#fce7f3", "#be185d")),
            (Category::Deadline, CategoryColors::new("#fef3c7", "#b45309")),
            (Category::Vacation, CategoryColors::new("#dcfce7", "#15803d")),
        ]);

        Self {
            day_cell_width: Length::from_mm(10.0),
            day_cell_height: Length::from_mm(20.0),
            header_row_height: Length::from_mm(20.0),
            month_label_width: Length::from_mm(20.0),
            item_font_size: 6.0,
            icon_font_size: 5.0,
            item_height: Length::from_mm(3.4),
            item_radius: Length::from_mm(1.0),
            cell_border: "#d1d5db".to_string(),
            cell_fill: "#ffffff".to_string(),
            empty_fill: "#f9fafb".to_string(),
            weekend_fill: "#f3f4f6".to_string(),
            today_fill: "#fef9c3".to_string(),
            muted_text: "#6b7280".to_string(),
            palette,
        }
    }
}

fn mm(length: Length) -> String {
    format!("{}mm", length.mm())
}

fn pt(size: f32) -> String {
    format!("{}pt", size)
}

impl VisualPolicy {
    /// Colours for `category`, falling back to the event colours
    pub fn colors(&self, category: Category) -> CategoryColors {
        self.palette
            .get(&category)
            .or_else(|| self.palette.get(&Category::Event))
            .cloned()
            .unwrap_or_else(|| CategoryColors::new("#e5e7eb", "#111827"))
    }

    /// Style rules injected into the rendering surface
    ///
    /// Selectors target the boxes (`path`) and text runs (`text`) the
    /// rasterizer emits, by the classes carried over from the element tree.
    /// Later rules win, so weekend and today come after the plain cell fill.
    pub fn stylesheet(&self) -> String {
        let mut css = String::new();
        let _ = writeln!(css, "path.grid-cell {{ stroke: {}; }}", self.cell_border);
        let _ = writeln!(css, "path.day-cell, path.header-cell, path.month-label {{ fill: {}; }}", self.cell_fill);
        let _ = writeln!(css, "path.empty-cell {{ fill: {}; }}", self.empty_fill);
        let _ = writeln!(css, "path.weekend {{ fill: {}; }}", self.weekend_fill);
        let _ = writeln!(css, "path.today {{ fill: {}; }}", self.today_fill);
        for (category, colors) in &self.palette {
            let _ = writeln!(
                css,
                "path.category-{} {{ fill: {}; stroke: {}; }}",
                category.as_str(),
                colors.background,
                colors.accent
            );
        }
        let _ = writeln!(css, "text.item-label, text.day-number {{ font-size: {}; }}", pt(self.item_font_size));
        let _ = writeln!(css, "text.item-icon {{ font-size: {}; }}", pt(self.icon_font_size));
        css
    }

    /// Force the fixed print styling onto a mounted copy of the grid
    pub fn apply_overrides(&self, root: &mut Element) {
        root.walk_mut(&mut |el| self.override_element(el));
    }

    fn override_element(&self, el: &mut Element) {
        if el.has_class("grid-row") || el.has_class("legend") || el.has_class("legend-item") {
            el.set_style("display", "flex");
        }

        if el.has_class("grid-cell") {
            el.set_style("display", "block");
            el.set_style("visibility", "visible");
            el.set_style("border-color", self.cell_border.as_str());
            el.set_style("background", self.cell_fill.as_str());
        }

        if el.has_class("day-cell") || el.has_class("empty-cell") {
            el.set_style("width", mm(self.day_cell_width));
            el.set_style("height", mm(self.day_cell_height));
        }
        if el.has_class("header-cell") {
            el.set_style("width", mm(self.day_cell_width));
            el.set_style("height", mm(self.header_row_height));
        }
        if el.has_class("month-label") {
            el.set_style("width", mm(self.month_label_width));
            el.set_style("height", mm(self.header_row_height));
            el.set_style("font-size", pt(self.item_font_size));
        }
        if el.has_class("empty-cell") {
            el.set_style("background", self.empty_fill.as_str());
        }
        if el.has_class("weekend") {
            el.set_style("background", self.weekend_fill.as_str());
        }
        if el.has_class("today") {
            el.set_style("background", self.today_fill.as_str());
        }

        if el.has_class("day-number") {
            el.set_style("font-size", pt(self.item_font_size));
            el.set_style("color", self.muted_text.as_str());
        }

        if el.has_class("planner-item") {
            let category = el
                .attr("data-category")
                .and_then(|c| c.parse().ok())
                .unwrap_or(Category::Event);
            let colors = self.colors(category);
            let radius = mm(self.item_radius);

            el.set_style("font-size", pt(self.item_font_size));
            el.set_style("height", mm(self.item_height));
            el.set_style("background", colors.background);
            el.set_style("border-color", colors.accent.as_str());
            el.set_style("color", colors.accent);
            for corner in ["top-left", "bottom-left", "top-right", "bottom-right"] {
                el.set_style(format!("border-{}-radius", corner), radius.as_str());
            }
            if el.has_class("continues-before") {
                el.set_style("border-top-left-radius", "0");
                el.set_style("border-bottom-left-radius", "0");
            }
            if el.has_class("continues-after") {
                el.set_style("border-top-right-radius", "0");
                el.set_style("border-bottom-right-radius", "0");
            }
        }

        if el.has_class("item-label") {
            el.set_style("font-size", pt(self.item_font_size));
        }
        if el.has_class("item-icon") {
            el.set_style("font-size", pt(self.icon_font_size));
            el.set_style("position", "absolute");
            el.set_style("top", "0.3mm");
            el.set_style("right", "0.5mm");
        }

        if el.has_class("legend-swatch") {
            let category = el
                .attr("data-category")
                .and_then(|c| c.parse().ok())
                .unwrap_or(Category::Event);
            let colors = self.colors(category);
            el.set_style("width", "4mm");
            el.set_style("height", "4mm");
            el.set_style("background", colors.background);
            el.set_style("border-color", colors.accent);
        }
        if el.has_class("legend-label") {
            el.set_style("font-size", pt(self.item_font_size + 2.0));
        }
    }
}
