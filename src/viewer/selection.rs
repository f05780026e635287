//! Selection state machine
//!
//! Turns pointer drags and native text selections into annotation
//! candidates. The live rectangle stays in viewport space while dragging;
//! conversion to document space happens once, at drag end, using the scale
//! captured when the drag started.

use super::coords::{
    self, ClientPoint, DocRect, ViewPoint, ViewRect,
};
use super::MIN_DRAG_PX;
use crate::annotations::{AnnotationDraft, AnnotationKind, Rgb};

/// Active drawing tool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    /// No tool: native text selection is live
    #[default]
    None,
    /// Region marker (confirmed with a color before commit)
    Region,
    /// Area highlight (confirmed with a color before commit)
    Highlight,
    /// Margin note anchor (commits immediately)
    Note,
    /// Clipping area (commits immediately)
    Clip,
}

impl Tool {
    /// Whether pointer drags draw with this tool
    #[must_use]
    pub fn draws(self) -> bool {
        !matches!(self, Tool::None)
    }

    /// Region-style tools show a confirmation affordance; note/clip tools
    /// commit with the currently selected color as soon as the drag ends.
    #[must_use]
    pub fn needs_confirmation(self) -> bool {
        matches!(self, Tool::Region | Tool::Highlight)
    }

    fn kind(self) -> Option<AnnotationKind> {
        match self {
            Tool::None => None,
            Tool::Region => Some(AnnotationKind::Region),
            Tool::Highlight => Some(AnnotationKind::Highlight),
            Tool::Note => Some(AnnotationKind::Note),
            Tool::Clip => Some(AnnotationKind::Clip),
        }
    }
}

/// What kind of selection is awaiting confirmation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionKind {
    Region(AnnotationKind),
    Text,
}

/// Transient selection awaiting user confirmation; never persisted.
///
/// At most one exists per viewer; starting a new drag or text selection
/// implicitly cancels the prior one.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingSelection {
    pub kind: SelectionKind,
    /// Selected rectangle in document space
    pub document_rect: DocRect,
    /// Where to anchor the confirmation affordance, in viewport space
    /// (centered above the selection)
    pub anchor: ViewPoint,
    /// Page the selection was made on
    pub page_number: u32,
    /// Captured text, for text selections
    pub raw_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
enum Phase {
    Idle,
    Dragging {
        start: ViewPoint,
        live: ViewRect,
        scale: f32,
        page: u32,
    },
    PendingConfirm(PendingSelection),
    TextPending(PendingSelection),
}

/// Outcome of a selection-ending event
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionOutcome {
    /// Nothing happened (no tool, drag below threshold, ...)
    Ignored,
    /// A pending selection now awaits confirmation
    Pending,
    /// The selection committed immediately (note/clip tools)
    Committed(AnnotationDraft),
}

/// Pointer/text-selection state machine
#[derive(Debug, Default)]
pub struct SelectionController {
    tool: Tool,
    color: Rgb,
    phase: Phase,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

impl SelectionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools, discarding any in-progress or pending selection
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.phase = Phase::Idle;
    }

    #[must_use]
    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    /// Begin a drag. Returns false when no drawing tool is active.
    ///
    /// Any prior pending selection is implicitly cancelled.
    pub fn pointer_down(
        &mut self,
        client: ClientPoint,
        origin: ClientPoint,
        scale: f32,
        page: u32,
    ) -> bool {
        if !self.tool.draws() {
            return false;
        }

        let start = coords::client_to_view(client, origin);
        self.phase = Phase::Dragging {
            start,
            live: ViewRect::from_corners(start, start),
            scale,
            page,
        };
        true
    }

    /// Update the live rectangle during a drag
    pub fn pointer_move(&mut self, client: ClientPoint, origin: ClientPoint) {
        if let Phase::Dragging { start, live, .. } = &mut self.phase {
            *live = ViewRect::from_corners(*start, coords::client_to_view(client, origin));
        }
    }

    /// End a drag.
    ///
    /// Drags whose width or height is at or below the minimum threshold are
    /// silently dropped - no annotation, no error.
    pub fn pointer_up(&mut self) -> SelectionOutcome {
        let Phase::Dragging { live, scale, page, .. } = self.phase.clone() else {
            return SelectionOutcome::Ignored;
        };
        self.phase = Phase::Idle;

        if live.width <= MIN_DRAG_PX || live.height <= MIN_DRAG_PX {
            return SelectionOutcome::Ignored;
        }

        let Some(kind) = self.tool.kind() else {
            return SelectionOutcome::Ignored;
        };

        let document_rect = coords::view_to_document(live, scale);
        if self.tool.needs_confirmation() {
            self.phase = Phase::PendingConfirm(PendingSelection {
                kind: SelectionKind::Region(kind),
                document_rect,
                anchor: anchor_above(live),
                page_number: page,
                raw_text: None,
            });
            return SelectionOutcome::Pending;
        }

        SelectionOutcome::Committed(AnnotationDraft {
            kind,
            page_number: page,
            position: document_rect,
            color: self.color,
            text_content: None,
        })
    }

    /// Record a native text selection.
    ///
    /// `fragments` are the selection's rectangles in viewport space, one
    /// per line fragment; the pending rectangle encloses them all. Only
    /// applies while no drawing tool is active and the text is non-empty.
    pub fn text_selected(
        &mut self,
        fragments: &[ViewRect],
        text: &str,
        scale: f32,
        page: u32,
    ) -> SelectionOutcome {
        if self.tool.draws() {
            return SelectionOutcome::Ignored;
        }

        let trimmed = text.trim();
        let Some((first, rest)) = fragments.split_first() else {
            return SelectionOutcome::Ignored;
        };
        if trimmed.is_empty() {
            return SelectionOutcome::Ignored;
        }

        let enclosing = rest.iter().fold(*first, |acc, r| acc.union(r));
        self.phase = Phase::TextPending(PendingSelection {
            kind: SelectionKind::Text,
            document_rect: coords::view_to_document(enclosing, scale),
            anchor: anchor_above(enclosing),
            page_number: page,
            raw_text: Some(trimmed.to_string()),
        });
        SelectionOutcome::Pending
    }

    /// Confirm the pending selection with the chosen color
    pub fn confirm(&mut self, color: Rgb) -> Option<AnnotationDraft> {
        let pending = match std::mem::take(&mut self.phase) {
            Phase::PendingConfirm(pending) | Phase::TextPending(pending) => pending,
            other => {
                self.phase = other;
                return None;
            }
        };

        let kind = match pending.kind {
            SelectionKind::Region(kind) => kind,
            SelectionKind::Text => AnnotationKind::TextHighlight,
        };
        Some(AnnotationDraft {
            kind,
            page_number: pending.page_number,
            position: pending.document_rect,
            color,
            text_content: pending.raw_text,
        })
    }

    /// Discard the pending selection, creating nothing
    pub fn cancel(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Pending selection awaiting confirmation, if any
    #[must_use]
    pub fn pending(&self) -> Option<&PendingSelection> {
        match &self.phase {
            Phase::PendingConfirm(p) | Phase::TextPending(p) => Some(p),
            _ => None,
        }
    }

    /// Live rectangle of an in-progress drag, for the selection overlay
    #[must_use]
    pub fn live_rect(&self) -> Option<ViewRect> {
        match &self.phase {
            Phase::Dragging { live, .. } => Some(*live),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }
}

fn anchor_above(rect: ViewRect) -> ViewPoint {
    ViewPoint::new(rect.x + rect.width / 2.0, rect.y)
}
