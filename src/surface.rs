//! Isolated, off-screen rendering surface
//!
//! A surface is attached to a host document for as long as it lives and
//! detaches itself when dropped, so an export that fails or is abandoned
//! halfway never leaves one behind.

use crate::dom::{Attachment, Element, HostDocument, SurfaceId};
use crate::error::{Error, Result};
use crate::render::{layout, Scene};

/// A detached document context that content is mounted into for capture
#[derive(Debug)]
pub struct IsolatedSurface {
    attachment: Attachment,
    viewport_width: f32,
    stylesheets: Vec<String>,
    body: Vec<Element>,
}

impl IsolatedSurface {
    /// Attach a fresh, empty surface `viewport_width` CSS pixels wide
    pub fn attach(host: &HostDocument, viewport_width: f32) -> Result<Self> {
        if !(viewport_width.is_finite() && viewport_width > 0.0) {
            return Err(Error::Surface(format!(
                "invalid viewport width {}",
                viewport_width
            )));
        }
        Ok(Self {
            attachment: host.attach_surface(),
            viewport_width,
            stylesheets: Vec::new(),
            body: Vec::new(),
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.attachment.id()
    }

    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Add a style sheet after the ones already injected
    pub fn inject_stylesheet(&mut self, css: impl Into<String>) {
        self.stylesheets.push(css.into());
    }

    /// Copy every host style sheet into the surface, in document order
    pub fn inject_host_stylesheets(&mut self, host: &HostDocument) {
        self.stylesheets.extend(host.stylesheets().iter().cloned());
    }

    pub fn stylesheets(&self) -> &[String] {
        &self.stylesheets
    }

    /// Append `element` to the surface body
    pub fn mount(&mut self, element: Element) {
        self.body.push(element);
    }

    /// Wait for the surface to finish its initial layout
    ///
    /// Layout runs on the blocking pool. A surface with nothing mounted, or
    /// whose content lays out to zero height, fails with [`Error::Surface`].
    pub async fn load(&self) -> Result<Scene> {
        if self.body.is_empty() {
            return Err(Error::Surface("nothing mounted on the surface".to_string()));
        }

        let width = self.viewport_width;
        let root = Element::new("body")
            .with_style("width", format!("{}px", width))
            .with_children(self.body.iter().cloned());
        let stylesheets = self.stylesheets.clone();

        let scene = tokio::task::spawn_blocking(move || {
            let mut scene = layout(&root, width);
            scene.stylesheets = stylesheets;
            scene
        })
        .await
        .map_err(|e| Error::Surface(format!("layout task failed: {}", e)))?;

        if scene.height <= 0.0 {
            return Err(Error::Surface("mounted content has no height".to_string()));
        }

        log::debug!(
            target: "planner_export::render",
            "surface {} loaded: {}x{} px, {} items",
            self.id().0,
            scene.width,
            scene.height,
            scene.items.len()
        );
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> HostDocument {
        HostDocument::new(Element::new("body")).with_stylesheet(".host { fill: #000; }")
    }

    #[test]
    fn test_surface_detaches_on_drop() {
        let host = host();
        let surface = IsolatedSurface::attach(&host, 800.0).unwrap();
        assert_eq!(host.attached_surfaces(), 1);
        drop(surface);
        assert_eq!(host.attached_surfaces(), 0);
    }

    #[test]
    fn test_attach_rejects_zero_width() {
        let host = host();
        let result = IsolatedSurface::attach(&host, 0.0);
        assert!(matches!(result, Err(Error::Surface(_))));
        assert_eq!(host.attached_surfaces(), 0);
    }

    #[tokio::test]
    async fn test_load_empty_surface_fails() {
        let host = host();
        let surface = IsolatedSurface::attach(&host, 800.0).unwrap();
        assert!(matches!(surface.load().await, Err(Error::Surface(_))));
    }

    #[tokio::test]
    async fn test_load_carries_stylesheets_in_order() {
        let host = host();
        let mut surface = IsolatedSurface::attach(&host, 400.0).unwrap();
        surface.inject_host_stylesheets(&host);
        surface.inject_stylesheet(".policy { fill: #fff; }");
        surface.mount(
            Element::new("div")
                .with_id("content")
                .with_style("height", "40px")
                .with_style("background", "#eee"),
        );

        let scene = surface.load().await.unwrap();
        assert_eq!(scene.stylesheets.len(), 2);
        assert!(scene.stylesheets[0].contains(".host"));
        assert!(scene.stylesheets[1].contains(".policy"));

        let content = scene.anchor("content").unwrap();
        assert_eq!(content.width, 400.0);
        assert_eq!(content.height, 40.0);
    }

    #[tokio::test]
    async fn test_load_zero_height_content_fails() {
        let host = host();
        let mut surface = IsolatedSurface::attach(&host, 400.0).unwrap();
        surface.mount(Element::new("div").with_style("display", "none"));
        assert!(matches!(surface.load().await, Err(Error::Surface(_))));
    }
}
