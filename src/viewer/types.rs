//! Core types for page rendering

use std::sync::Arc;

use super::coords::DocRect;

/// Viewport dimensions in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// One extracted text span with its document-space bounding box
#[derive(Clone, Debug, PartialEq)]
pub struct TextSpan {
    /// Bounding box in document space (scale 1)
    pub bounds: DocRect,
    /// Text content of the span
    pub text: String,
}

/// Raw rendered page image.
///
/// RGB pixel data sized to the viewport at the scale it was rendered with.
/// This is the intermediate format between the rendering engine and
/// whatever surface displays it.
#[derive(Clone)]
pub struct RasterData {
    /// Raw RGB pixel data (3 bytes per pixel: R, G, B)
    pub pixels: Vec<u8>,
    /// Image width in pixels
    pub width_px: u32,
    /// Image height in pixels
    pub height_px: u32,
}

impl std::fmt::Debug for RasterData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterData")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// One rendered page held in cache.
///
/// Raster and text spans are evicted together; text spans are populated
/// lazily, at most once while the entry stays cached.
#[derive(Clone, Debug)]
pub struct PageEntry {
    /// Page number (1-based)
    pub page: u32,
    /// Rendered bitmap
    pub raster: Arc<RasterData>,
    /// Scale factor the raster was produced at; the entry is stale once
    /// this no longer matches the viewer scale
    pub rendered_scale: f32,
    /// Extracted text geometry, populated once per cached entry
    pub text_spans: Option<Vec<TextSpan>>,
}

impl PageEntry {
    #[must_use]
    pub fn new(page: u32, raster: RasterData, rendered_scale: f32) -> Self {
        Self {
            page,
            raster: Arc::new(raster),
            rendered_scale,
            text_spans: None,
        }
    }

    /// Whether the raster matches the given viewer scale
    #[must_use]
    pub fn matches_scale(&self, scale: f32) -> bool {
        (self.rendered_scale - scale).abs() <= f32::EPSILON
    }
}
