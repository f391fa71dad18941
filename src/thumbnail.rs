//! Thumbnail capability — previews derived from the currently rendered document.
//!
//! The host owns rendering; this module only sees the markup of the mounted
//! diagram through a [`RenderSurface`] and wraps it in a scaled SVG data URI.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::config::ThumbnailConfig;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// The host's current on-screen document.
pub trait RenderSurface: Send + Sync {
    /// Inner markup of the element with `element_id`, or `None` when it is not mounted.
    fn inner_markup(&self, element_id: &str) -> Option<String>;
}

/// Produces a preview image of the currently rendered document.
pub trait ThumbnailRenderer: Send + Sync {
    /// Render a `data:` URI. Never fails: an unmounted target yields an empty image.
    fn render_thumbnail(&self) -> String;
}

/// In-memory render surface, updated by whoever mirrors the host's view.
#[derive(Default)]
pub struct MemorySurface {
    elements: RwLock<HashMap<String, String>>,
}

impl MemorySurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the markup of `element_id`.
    pub fn mount(&self, element_id: &str, markup: impl Into<String>) {
        let mut elements = self.elements.write().unwrap_or_else(|e| e.into_inner());
        elements.insert(element_id.to_string(), markup.into());
    }

    pub fn unmount(&self, element_id: &str) {
        let mut elements = self.elements.write().unwrap_or_else(|e| e.into_inner());
        elements.remove(element_id);
    }
}

impl RenderSurface for MemorySurface {
    fn inner_markup(&self, element_id: &str) -> Option<String> {
        let elements = self.elements.read().unwrap_or_else(|e| e.into_inner());
        elements.get(element_id).cloned()
    }
}

/// Wraps the target element's markup in a fixed-size SVG.
pub struct SvgThumbnailRenderer {
    surface: Arc<dyn RenderSurface>,
    config: ThumbnailConfig,
}

impl SvgThumbnailRenderer {
    pub fn new(surface: Arc<dyn RenderSurface>, config: ThumbnailConfig) -> Self {
        Self { surface, config }
    }

    fn svg(&self, inner: &str) -> String {
        let c = &self.config;
        format!(
            r#"<svg xmlns="{SVG_NS}" viewBox="0 0 {} {}" width="{}" height="{}" style="background-color: {};">{inner}</svg>"#,
            c.view_box_width, c.view_box_height, c.width, c.height, c.background,
        )
    }
}

impl ThumbnailRenderer for SvgThumbnailRenderer {
    fn render_thumbnail(&self) -> String {
        let inner = self.surface.inner_markup(&self.config.target_id);
        if inner.is_none() {
            tracing::debug!(target_id = %self.config.target_id, "Render target not mounted, using empty thumbnail");
        }
        let svg = self.svg(inner.as_deref().unwrap_or(""));
        format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
    }
}
