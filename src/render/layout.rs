//! Box layout for mounted element trees
//!
//! Only what the planner markup needs: vertical block flow, `display:flex`
//! rows, explicit sizes, uniform padding, `gap`, absolutely positioned
//! overlays and inherited font size and colour.

use super::{BoxItem, Region, Scene, SceneItem, TextItem};
use crate::dom::Element;

const DEFAULT_FONT_SIZE: f32 = 12.0;
const DEFAULT_COLOR: &str = "#111827";
/// Average advance of a sans-serif glyph, in em
const AVERAGE_ADVANCE: f32 = 0.55;
const LINE_HEIGHT: f32 = 1.25;

/// Parse a CSS length into CSS pixels
///
/// Accepts `mm`, `cm`, `in`, `pt`, `px` and unitless numbers (pixels).
pub fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    let units: [(&str, f32); 5] = [
        ("mm", 96.0 / 25.4),
        ("cm", 96.0 / 2.54),
        ("in", 96.0),
        ("pt", 96.0 / 72.0),
        ("px", 1.0),
    ];
    for (suffix, factor) in units {
        if let Some(number) = value.strip_suffix(suffix) {
            return number.trim().parse::<f32>().ok().map(|n| n * factor);
        }
    }
    value.parse::<f32>().ok()
}

fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * AVERAGE_ADVANCE
}

#[derive(Debug, Clone)]
struct Inherited {
    font_size: f32,
    color: String,
}

struct Node<'a> {
    el: &'a Element,
    width: f32,
    height: f32,
    padding: f32,
    gap: f32,
    horizontal: bool,
    visible: bool,
    font_size: f32,
    color: String,
    text_size: Option<(f32, f32)>,
    flow: Vec<Node<'a>>,
    absolute: Vec<Node<'a>>,
}

fn is_absolute(el: &Element) -> bool {
    el.style("position") == Some("absolute")
}

fn build<'a>(el: &'a Element, inherited: &Inherited, stretch_to: Option<f32>) -> Option<Node<'a>> {
    if el.style("display") == Some("none") {
        return None;
    }

    let font_size = el
        .style("font-size")
        .and_then(parse_length)
        .unwrap_or(inherited.font_size);
    let color = el.style("color").unwrap_or(inherited.color.as_str()).to_string();
    let horizontal = el.style("display") == Some("flex");
    let padding = el.style("padding").and_then(parse_length).unwrap_or(0.0);
    let gap = el.style("gap").and_then(parse_length).unwrap_or(0.0);
    let explicit_width = el.style("width").and_then(parse_length);
    let explicit_height = el.style("height").and_then(parse_length);

    let own = Inherited {
        font_size,
        color: color.clone(),
    };
    let text_size = el
        .text
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| (estimate_text_width(t, font_size), font_size * LINE_HEIGHT));

    // Block children in a vertical flow stretch to the content box
    let inner_width = explicit_width
        .or(if horizontal { None } else { stretch_to })
        .map(|w| (w - 2.0 * padding).max(0.0));
    let child_stretch = if horizontal { None } else { inner_width };

    let mut flow = Vec::new();
    let mut absolute = Vec::new();
    for child in &el.children {
        if is_absolute(child) {
            absolute.extend(build(child, &own, None));
        } else {
            flow.extend(build(child, &own, child_stretch));
        }
    }

    let (text_w, text_h) = text_size.unwrap_or((0.0, 0.0));
    let gaps = gap * flow.len().saturating_sub(1) as f32;
    let (content_w, content_h) = if horizontal {
        let w = text_w + flow.iter().map(|n| n.width).sum::<f32>() + gaps;
        let h = flow.iter().map(|n| n.height).fold(text_h, f32::max);
        (w, h)
    } else {
        let w = flow.iter().map(|n| n.width).fold(text_w, f32::max);
        let h = text_h + flow.iter().map(|n| n.height).sum::<f32>() + gaps;
        (w, h)
    };

    let width = explicit_width
        .or(if horizontal { None } else { stretch_to })
        .unwrap_or(content_w + 2.0 * padding);
    let height = explicit_height.unwrap_or(content_h + 2.0 * padding);

    Some(Node {
        el,
        width,
        height,
        padding,
        gap,
        horizontal,
        visible: el.style("visibility") != Some("hidden"),
        font_size,
        color,
        text_size,
        flow,
        absolute,
    })
}

fn corner(el: &Element, name: &str, fallback: f32) -> f32 {
    el.style(&format!("border-{}-radius", name))
        .and_then(parse_length)
        .unwrap_or(fallback)
}

fn emit(node: &Node<'_>, x: f32, y: f32, scene: &mut Scene) {
    let el = node.el;
    let rect = Region::new(x, y, node.width, node.height);

    if let Some(id) = &el.id {
        scene.anchors.insert(id.clone(), rect);
    }

    if node.visible {
        let fill = el.style("background").map(str::to_string);
        let stroke = el.style("border-color").map(str::to_string);
        if fill.is_some() || stroke.is_some() {
            let base = el.style("border-radius").and_then(parse_length).unwrap_or(0.0);
            scene.items.push(SceneItem::Box(BoxItem {
                rect,
                fill,
                stroke,
                radii: [
                    corner(el, "top-left", base),
                    corner(el, "top-right", base),
                    corner(el, "bottom-right", base),
                    corner(el, "bottom-left", base),
                ],
                classes: el.classes.clone(),
            }));
        }
    }

    let mut cursor_x = x + node.padding;
    let mut cursor_y = y + node.padding;

    if let (Some(text), Some((w, h))) = (el.text.as_deref(), node.text_size) {
        if node.visible {
            scene.items.push(SceneItem::Text(TextItem {
                x: cursor_x,
                y: cursor_y + node.font_size * 0.9,
                text: text.to_string(),
                font_size: node.font_size,
                color: node.color.clone(),
                classes: el.classes.clone(),
            }));
        }
        if node.horizontal {
            cursor_x += w;
        } else {
            cursor_y += h;
        }
    }

    for child in &node.flow {
        emit(child, cursor_x, cursor_y, scene);
        if node.horizontal {
            cursor_x += child.width + node.gap;
        } else {
            cursor_y += child.height + node.gap;
        }
    }

    for child in &node.absolute {
        let style_len = |prop: &str| child.el.style(prop).and_then(parse_length);
        let left = style_len("left")
            .or_else(|| style_len("right").map(|r| node.width - r - child.width))
            .unwrap_or(0.0);
        let top = style_len("top")
            .or_else(|| style_len("bottom").map(|b| node.height - b - child.height))
            .unwrap_or(0.0);
        emit(child, x + left, y + top, scene);
    }
}

/// Lay out `root` at the top-left of a surface `viewport_width` pixels wide
///
/// The scene height is the root's height. Elements hidden with
/// `display:none` produce nothing; `visibility:hidden` keeps their space.
pub fn layout(root: &Element, viewport_width: f32) -> Scene {
    let inherited = Inherited {
        font_size: DEFAULT_FONT_SIZE,
        color: DEFAULT_COLOR.to_string(),
    };
    let mut scene = Scene {
        width: viewport_width,
        ..Default::default()
    };

    if let Some(node) = build(root, &inherited, Some(viewport_width)) {
        scene.width = scene.width.max(node.width);
        scene.height = node.height;
        emit(&node, 0.0, 0.0, &mut scene);
    }
    scene
}
