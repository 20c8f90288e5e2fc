//! Element tree of the host page
//!
//! The planner's rendered content is handed to the exporter as a small
//! element tree. An element may carry a shadow root: an isolation boundary
//! whose children are hidden from normal traversal and must be unwrapped
//! explicitly before export.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A node of the rendered content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    /// Inline style declarations, e.g. `width -> 10mm`
    pub style: BTreeMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Element>,
    pub shadow_root: Option<ShadowRoot>,
}

/// Encapsulated content attached to an element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadowRoot {
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_style(property, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attach a shadow root holding `children`
    pub fn with_shadow_root(mut self, children: Vec<Element>) -> Self {
        self.shadow_root = Some(ShadowRoot { children });
        self
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.style.get(property).map(String::as_str)
    }

    pub fn set_style(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.style.insert(property.into(), value.into());
    }

    /// Copies of this element's content for mounting elsewhere
    ///
    /// If the element has a shadow root, its inner children are returned.
    /// Otherwise the element itself is copied.
    pub fn export_copy(&self) -> Vec<Element> {
        match &self.shadow_root {
            Some(root) => root.children.clone(),
            None => vec![self.clone()],
        }
    }

    /// Replace every shadow root in this subtree with the content it renders
    pub fn flatten_shadow_roots(&mut self) {
        if let Some(root) = self.shadow_root.take() {
            self.children = root.children;
        }
        for child in &mut self.children {
            child.flatten_shadow_roots();
        }
    }

    /// Find an element by id in the light tree (shadow roots are not entered)
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_id(id))
    }

    /// Visit this element and every light-tree descendant, depth first
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    /// Count elements carrying `class`, including shadow content
    pub fn count_class(&self, class: &str) -> usize {
        let own = usize::from(self.has_class(class));
        let light: usize = self.children.iter().map(|c| c.count_class(class)).sum();
        let shadow: usize = self
            .shadow_root
            .iter()
            .flat_map(|r| r.children.iter())
            .map(|c| c.count_class(class))
            .sum();
        own + light + shadow
    }
}

/// Identifier of a rendering surface attached to a host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub u64);

#[derive(Debug, Default)]
struct SurfaceTable {
    next_id: AtomicU64,
    attached: Mutex<BTreeSet<SurfaceId>>,
}

/// The live page the planner is rendered into
#[derive(Debug, Clone)]
pub struct HostDocument {
    stylesheets: Vec<String>,
    body: Element,
    surfaces: Arc<SurfaceTable>,
}

impl HostDocument {
    pub fn new(body: Element) -> Self {
        Self {
            stylesheets: Vec::new(),
            body,
            surfaces: Arc::new(SurfaceTable::default()),
        }
    }

    pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.stylesheets.push(css.into());
        self
    }

    /// The host's style sheets, in document order
    pub fn stylesheets(&self) -> &[String] {
        &self.stylesheets
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.body.find_by_id(id)
    }

    /// Number of rendering surfaces currently attached
    pub fn attached_surfaces(&self) -> usize {
        self.surfaces
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Attach a new surface; it stays attached until the guard is dropped
    pub fn attach_surface(&self) -> Attachment {
        let id = SurfaceId(self.surfaces.next_id.fetch_add(1, Ordering::Relaxed));
        self.surfaces
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        Attachment {
            id,
            table: Arc::clone(&self.surfaces),
        }
    }
}

/// Keeps a surface attached to its host document
#[derive(Debug)]
pub struct Attachment {
    id: SurfaceId,
    table: Arc<SurfaceTable>,
}

impl Attachment {
    pub fn id(&self) -> SurfaceId {
        self.id
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.table
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
