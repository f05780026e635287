//! Rendering engine capability trait
//!
//! The viewer core does not parse documents or rasterize fonts; it consumes
//! a rendering capability through this trait. Each render worker owns its
//! own engine instance, built by a shared factory.

use std::sync::Arc;

use super::request::{RenderFault, RenderParams};
use super::types::{RasterData, TextSpan};

/// A document rendering capability
pub trait RenderEngine: Send {
    /// Total number of pages in the open document
    fn page_count(&self) -> u32;

    /// Render page `page` (1-based) into a raster sized to the viewport at
    /// the given scale
    fn render_page(&mut self, page: u32, params: &RenderParams) -> Result<RasterData, RenderFault>;

    /// Extract ordered text spans with document-space bounding boxes
    fn extract_text(&mut self, page: u32) -> Result<Vec<TextSpan>, RenderFault>;
}

/// Builds one engine instance per worker thread
pub type EngineFactory =
    Arc<dyn Fn() -> Result<Box<dyn RenderEngine>, RenderFault> + Send + Sync>;
