//! Viewer state management
//!
//! Every page or scale change funnels through [`ViewerState::apply`], the
//! single scheduling entry point. The returned effects are executed by the
//! session; no other path may trigger a render, which preserves the
//! single-active-render invariant.

use super::request::RenderParams;
use super::types::Viewport;
use super::zoom::Zoom;

/// Current navigation/zoom state for an open document
#[derive(Clone, Debug)]
pub struct ViewerState {
    /// Current page (1-based)
    pub current_page: u32,

    /// Total page count
    pub page_count: u32,

    /// Zoom state
    pub zoom: Zoom,

    /// Current viewport dimensions in pixels
    pub viewport: Viewport,
}

impl ViewerState {
    /// Create state for a document with the given page count
    #[must_use]
    pub fn new(page_count: u32, viewport: Viewport) -> Self {
        Self {
            current_page: 1,
            page_count,
            zoom: Zoom::default(),
            viewport,
        }
    }

    /// Current scale factor
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.zoom.factor()
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::GoToPage(page) => self.go_to(page),

            Command::NextPage => self.go_to(self.current_page.saturating_add(1)),

            Command::PrevPage => self.go_to(self.current_page.saturating_sub(1).max(1)),

            Command::ZoomIn => {
                if self.zoom.step_in() {
                    vec![Effect::RenderCurrentPage, Effect::UpdatePrefetch]
                } else {
                    vec![]
                }
            }

            Command::ZoomOut => {
                if self.zoom.step_out() {
                    vec![Effect::RenderCurrentPage, Effect::UpdatePrefetch]
                } else {
                    vec![]
                }
            }

            Command::SetScale(scale) => {
                if self.zoom.set(scale) {
                    vec![Effect::RenderCurrentPage, Effect::UpdatePrefetch]
                } else {
                    vec![]
                }
            }

            Command::SetViewport(viewport) => {
                if self.viewport != viewport {
                    self.viewport = viewport;
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::SetPageCount(count) => {
                self.page_count = count;
                if count > 0 && self.current_page > count {
                    self.current_page = count;
                }
                vec![]
            }

            Command::Retry => {
                vec![Effect::ClearError, Effect::RenderCurrentPage]
            }
        }
    }

    fn go_to(&mut self, page: u32) -> Vec<Effect> {
        if self.page_count == 0 {
            return vec![];
        }

        let clamped = page.clamp(1, self.page_count);
        if self.current_page == clamped {
            return vec![];
        }

        self.current_page = clamped;
        // Evict before issuing the new neighborhood's prefetches, so a
        // prefetch landing for the new current page is never a victim of
        // the navigation that asked for it.
        vec![
            Effect::EvictCache,
            Effect::RenderCurrentPage,
            Effect::UpdatePrefetch,
        ]
    }

    /// Get render parameters from current state
    #[must_use]
    pub fn render_params(&self) -> RenderParams {
        RenderParams {
            scale: self.scale(),
            viewport: self.viewport,
        }
    }
}

/// Commands that modify viewer state
#[derive(Clone, Copy, Debug)]
pub enum Command {
    /// Go to a specific page (1-based, clamped)
    GoToPage(u32),
    /// Advance one page
    NextPage,
    /// Go back one page
    PrevPage,
    /// Zoom in one step
    ZoomIn,
    /// Zoom out one step
    ZoomOut,
    /// Set the scale factor directly
    SetScale(f32),
    /// Set the viewport dimensions
    SetViewport(Viewport),
    /// Update the page count
    SetPageCount(u32),
    /// Retry after a render failure
    Retry,
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Render the current page
    RenderCurrentPage,
    /// Run cache eviction around the current page
    EvictCache,
    /// Refresh prefetch of neighboring pages
    UpdatePrefetch,
    /// Clear the viewer error state
    ClearError,
}
