//! Reference year grid
//!
//! Produces the rendered planner content the exporter consumes: a
//! `year-planner` element whose shadow root holds one header row and twelve
//! month rows of 31 day cells each.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::date::{days_in_month, is_weekend};
use crate::dom::{Element, HostDocument};
use crate::error::{Error, Result};

/// Id of the container the print view locates in the host page
pub const PRINT_CONTAINER_ID: &str = "year-planner-print";
/// Id of the legend the print view picks up when present
pub const PRINT_LEGEND_ID: &str = "year-planner-legend";

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Kind of planner entry; drives colours and icons
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Event,
    Holiday,
    Birthday,
    Deadline,
    Vacation,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Event,
        Category::Holiday,
        Category::Birthday,
        Category::Deadline,
        Category::Vacation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Event => "event",
            Category::Holiday => "holiday",
            Category::Birthday => "birthday",
            Category::Deadline => "deadline",
            Category::Vacation => "vacation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Event => "Event",
            Category::Holiday => "Holiday",
            Category::Birthday => "Birthday",
            Category::Deadline => "Deadline",
            Category::Vacation => "Vacation",
        }
    }

    /// Indicator drawn in the corner of an item, if any
    pub fn icon(&self) -> Option<&'static str> {
        match self {
            Category::Holiday => Some("*"),
            Category::Birthday => Some("+"),
            Category::Deadline => Some("!"),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::General(format!("Unknown category: {}", s)))
    }
}

/// One entry shown on the planner, possibly spanning several days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerEntry {
    pub title: String,
    pub start: NaiveDate,
    /// Inclusive; defaults to `start`
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default = "default_category")]
    pub category: Category,
}

fn default_category() -> Category {
    Category::Event
}

impl PlannerEntry {
    pub fn new(title: impl Into<String>, start: NaiveDate, category: Category) -> Self {
        Self {
            title: title.into(),
            start,
            end: None,
            category,
        }
    }

    pub fn until(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.filter(|e| *e >= self.start).unwrap_or(self.start)
    }

    fn covers(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.last_day()
    }
}

/// Load planner entries from a JSON array
pub fn load_entries(path: &Path) -> Result<Vec<PlannerEntry>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn cell(kind: &str) -> Element {
    Element::new("div").with_class("grid-cell").with_class(kind)
}

fn header_row() -> Element {
    let days = (1..=31).map(|d| cell("header-cell").with_text(d.to_string()));
    Element::new("div")
        .with_class("grid-row")
        .with_class("header-row")
        .with_child(cell("month-label"))
        .with_children(days)
}

fn item_segment(entry: &PlannerEntry, day: NaiveDate) -> Element {
    let mut item = Element::new("div")
        .with_class("planner-item")
        .with_class(format!("category-{}", entry.category))
        .with_attr("data-category", entry.category.as_str())
        .with_attr("title", entry.title.as_str());

    let continues_before = day > entry.start && day.day() > 1;
    let continues_after =
        day < entry.last_day() && day.day() < days_in_month(day.year(), day.month());
    if continues_before {
        item.add_class("continues-before");
    }
    if continues_after {
        item.add_class("continues-after");
    }

    // Label only where the segment starts a visible run
    if !continues_before {
        item = item.with_child(Element::new("span").with_class("item-label").with_text(entry.title.as_str()));
    }
    if let Some(icon) = entry.category.icon() {
        item = item.with_child(Element::new("span").with_class("item-icon").with_text(icon));
    }
    item
}

fn day_cell(date: NaiveDate, entries: &[PlannerEntry], today: Option<NaiveDate>) -> Element {
    let mut el = cell("day-cell")
        .with_attr("data-date", date.format("%Y-%m-%d").to_string())
        .with_child(Element::new("span").with_class("day-number").with_text(date.day().to_string()));
    if is_weekend(date) {
        el.add_class("weekend");
    }
    if today == Some(date) {
        el.add_class("today");
    }
    for entry in entries.iter().filter(|e| e.covers(date)) {
        el.children.push(item_segment(entry, date));
    }
    el
}

fn month_row(year: i32, month: u32, entries: &[PlannerEntry], today: Option<NaiveDate>) -> Element {
    let length = days_in_month(year, month);
    let mut row = Element::new("div")
        .with_class("grid-row")
        .with_class("month-row")
        .with_attr("data-month", month.to_string())
        .with_child(cell("month-label").with_text(MONTH_NAMES[(month - 1) as usize]));

    for day in 1..=31 {
        let el = match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) if day <= length => day_cell(date, entries, today),
            _ => cell("empty-cell"),
        };
        row.children.push(el);
    }
    row
}

/// Build the rendered grid for `year`
///
/// The grid content sits behind a shadow root, the way the planner's
/// custom element renders it.
pub fn build_year_grid(year: i32, entries: &[PlannerEntry], today: Option<NaiveDate>) -> Element {
    let mut rows = vec![header_row()];
    rows.extend((1..=12).map(|m| month_row(year, m, entries, today)));

    Element::new("year-planner")
        .with_attr("data-year", year.to_string())
        .with_shadow_root(vec![Element::new("div").with_class("planner-grid").with_children(rows)])
}

/// Legend listing `categories` with their swatches
pub fn build_legend(categories: &[Category]) -> Element {
    let items = categories.iter().map(|c| {
        Element::new("div")
            .with_class("legend-item")
            .with_child(
                Element::new("span")
                    .with_class("legend-swatch")
                    .with_attr("data-category", c.as_str()),
            )
            .with_child(Element::new("span").with_class("legend-label").with_text(c.label()))
    });
    Element::new("div").with_class("legend").with_children(items)
}

/// Categories used by `entries`, in legend order
pub fn used_categories(entries: &[PlannerEntry]) -> Vec<Category> {
    Category::ALL
        .into_iter()
        .filter(|c| entries.iter().any(|e| e.category == *c))
        .collect()
}

/// Host page as laid out for printing, with the well-known containers
pub fn print_view_document(
    year: i32,
    entries: &[PlannerEntry],
    today: Option<NaiveDate>,
    with_legend: bool,
) -> HostDocument {
    let mut body = Element::new("body").with_child(
        Element::new("main")
            .with_id(PRINT_CONTAINER_ID)
            .with_child(build_year_grid(year, entries, today)),
    );
    if with_legend {
        let categories = used_categories(entries);
        body.children
            .push(build_legend(&categories).with_id(PRINT_LEGEND_ID));
    }
    HostDocument::new(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn span(start: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
        (start, start + chrono::Duration::days(days - 1))
    }

    fn rows(grid: &Element) -> &[Element] {
        let root = grid.shadow_root.as_ref().expect("shadow root");
        &root.children[0].children
    }

    #[test]
    fn test_grid_has_header_and_twelve_months() {
        let grid = build_year_grid(2026, &[], None);
        let rows = rows(&grid);
        assert_eq!(rows.len(), 13);
        assert!(rows[0].has_class("header-row"));
        assert!(rows.iter().all(|r| r.children.len() == 32));
    }

    #[test]
    fn test_short_months_pad_with_empty_cells() {
        let grid = build_year_grid(2025, &[], None);
        let february = &rows(&grid)[2];
        let empty = february.children.iter().filter(|c| c.has_class("empty-cell")).count();
        assert_eq!(empty, 3);
    }

    #[test]
    fn test_weekend_and_today_classes() {
        let today = date(2026, 10, 18);
        let grid = build_year_grid(2026, &[], Some(today));
        let october = &rows(&grid)[10];
        let cell = &october.children[18];
        assert_eq!(cell.attr("data-date"), Some("2026-10-18"));
        assert!(cell.has_class("weekend"));
        assert!(cell.has_class("today"));
        assert_eq!(grid.count_class("today"), 1);
        // 2026 has 104 weekend days
        assert_eq!(grid.count_class("weekend"), 104);
    }

    #[test]
    fn test_multi_day_entry_segments() {
        let (start, end) = span(date(2026, 7, 10), 3);
        let entry = PlannerEntry::new("Trip", start, Category::Vacation).until(end);
        let grid = build_year_grid(2026, &[entry], None);
        let july = &rows(&grid)[7];

        let segments: Vec<&Element> = (10..=12)
            .map(|d| &july.children[d].children[1])
            .collect();
        assert!(segments[0].has_class("continues-after"));
        assert!(!segments[0].has_class("continues-before"));
        assert!(segments[1].has_class("continues-before"));
        assert!(segments[1].has_class("continues-after"));
        assert!(segments[2].has_class("continues-before"));
        assert!(!segments[2].has_class("continues-after"));

        // the label appears once per run
        assert_eq!(grid.count_class("item-label"), 1);
    }

    #[test]
    fn test_span_breaks_at_month_boundary() {
        let entry = PlannerEntry::new("Conference", date(2026, 1, 31), Category::Event)
            .until(date(2026, 2, 1));
        let grid = build_year_grid(2026, &[entry], None);
        let rows = rows(&grid);

        let jan31 = &rows[1].children[31].children[1];
        let feb1 = &rows[2].children[1].children[1];
        assert!(!jan31.has_class("continues-after"));
        assert!(!feb1.has_class("continues-before"));
        assert_eq!(grid.count_class("item-label"), 2);
    }

    #[test]
    fn test_icons_for_marked_categories() {
        let entries = vec![
            PlannerEntry::new("New Year", date(2026, 1, 1), Category::Holiday),
            PlannerEntry::new("Standup", date(2026, 1, 2), Category::Event),
        ];
        let grid = build_year_grid(2026, &entries, None);
        assert_eq!(grid.count_class("item-icon"), 1);
    }

    #[test]
    fn test_legend_lists_used_categories() {
        let entries = vec![
            PlannerEntry::new("A", date(2026, 1, 1), Category::Deadline),
            PlannerEntry::new("B", date(2026, 1, 2), Category::Holiday),
        ];
        let categories = used_categories(&entries);
        assert_eq!(categories, vec![Category::Holiday, Category::Deadline]);
        let legend = build_legend(&categories);
        assert_eq!(legend.count_class("legend-item"), 2);
    }

    #[test]
    fn test_print_view_document_containers() {
        let doc = print_view_document(2026, &[], None, false);
        assert!(doc.find_by_id(PRINT_CONTAINER_ID).is_some());
        assert!(doc.find_by_id(PRINT_LEGEND_ID).is_none());

        let doc = print_view_document(2026, &[], None, true);
        assert!(doc.find_by_id(PRINT_LEGEND_ID).is_some());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Holiday".parse::<Category>().unwrap(), Category::Holiday);
        assert!("meeting".parse::<Category>().is_err());
    }

    #[test]
    fn test_load_entries_from_json() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("entries.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "Launch", "start": "2026-03-02", "category": "deadline"},
                {"title": "Offsite", "start": "2026-05-11", "end": "2026-05-13"}
            ]"#,
        )
        .unwrap();

        let entries = load_entries(&path).expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category, Category::Deadline);
        assert_eq!(entries[1].category, Category::Event);
        assert_eq!(entries[1].last_day(), date(2026, 5, 13));
    }

    #[test]
    fn test_load_entries_missing_file() {
        let result = load_entries(Path::new("missing-entries.json"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
