//! Render request and response types

use super::types::{PageEntry, TextSpan, Viewport};

/// Unique identifier for render requests.
///
/// Completion handlers compare the token carried by a response against the
/// currently active one and discard results for superseded tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Parameters for rendering a page
#[derive(Clone, Copy, Debug)]
pub struct RenderParams {
    /// User-specified scale factor
    pub scale: f32,
    /// Viewport dimensions in pixels
    pub viewport: Viewport,
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Render a page (high priority)
    Page {
        id: RequestId,
        page: u32,
        params: RenderParams,
    },

    /// Prefetch a neighboring page (low priority)
    Prefetch {
        id: RequestId,
        page: u32,
        params: RenderParams,
    },

    /// Extract text spans for a page
    ExtractText { id: RequestId, page: u32 },

    /// Cancel a pending request (advisory; correctness comes from
    /// discarding superseded results, not from this being honored)
    Cancel(RequestId),

    /// Shutdown the worker
    Shutdown,
}

/// Errors from render workers
#[derive(Clone, Debug, thiserror::Error)]
pub enum RenderFault {
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },

    #[error("render engine: {detail}")]
    Engine { detail: String },
}

impl RenderFault {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine { detail: msg.into() }
    }
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Rendered page data
    Page {
        id: RequestId,
        page: u32,
        entry: PageEntry,
    },

    /// Extracted text geometry for a page
    TextSpans {
        id: RequestId,
        page: u32,
        spans: Vec<TextSpan>,
    },

    /// Request was cancelled - not an error, silently discarded
    Cancelled(RequestId),

    /// Error during rendering
    Error { id: RequestId, fault: RenderFault },
}
