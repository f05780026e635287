//! Viewer session - wires the pipeline together for one open document
//!
//! Owns the navigation state machine, the render scheduler, the selection
//! controller, and the annotation store, and routes between them. This is
//! the only place effects get executed, keeping every render request on
//! the single scheduling path.

use log::{error, warn};

use super::coords::{ClientPoint, ViewRect};
use super::engine::EngineFactory;
use super::request::RenderFault;
use super::scheduler::{RenderScheduler, SchedulerConfig, SchedulerEvent};
use super::selection::{SelectionController, SelectionOutcome, Tool};
use super::state::{Command, Effect, ViewerState};
use super::types::Viewport;
use crate::annotations::{Annotation, AnnotationDraft, AnnotationStore, Rgb};
use crate::persistence::AnnotationBackend;

/// One open document: rendering pipeline plus annotation state
pub struct ViewerSession {
    document_id: String,
    user_id: String,
    state: ViewerState,
    scheduler: RenderScheduler,
    selection: SelectionController,
    annotations: AnnotationStore,
    backend: Box<dyn AnnotationBackend>,
}

impl ViewerSession {
    /// Open a document through the given engine factory and persistence
    /// collaborator.
    pub fn new(
        document_id: impl Into<String>,
        user_id: impl Into<String>,
        factory: EngineFactory,
        backend: Box<dyn AnnotationBackend>,
        viewport: Viewport,
        config: SchedulerConfig,
    ) -> Result<Self, RenderFault> {
        let scheduler = RenderScheduler::with_config(factory, config)?;
        let state = ViewerState::new(scheduler.page_count(), viewport);

        Ok(Self {
            document_id: document_id.into(),
            user_id: user_id.into(),
            state,
            scheduler,
            selection: SelectionController::new(),
            annotations: AnnotationStore::new(),
            backend,
        })
    }

    /// Load persisted annotations and kick off the first render.
    ///
    /// A failed load degrades to an empty annotation set; document display
    /// is never blocked on persistence.
    pub fn open(&mut self) {
        match self.backend.load(&self.document_id) {
            Ok(annotations) => self.annotations.replace_all(annotations),
            Err(e) => {
                warn!(
                    "failed to load annotations for {}: {e:#}",
                    self.document_id
                );
                self.annotations.clear_all();
            }
        }

        self.handle_effects(vec![Effect::RenderCurrentPage, Effect::UpdatePrefetch]);
    }

    /// Apply a navigation/zoom command
    pub fn apply(&mut self, cmd: Command) {
        let effects = self.state.apply(cmd);
        self.handle_effects(effects);
    }

    fn handle_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RenderCurrentPage => {
                    let displayed_from_cache = self
                        .scheduler
                        .show_page(self.state.current_page, self.state.render_params());
                    if displayed_from_cache {
                        self.scheduler.ensure_text_spans(self.state.current_page);
                    }
                }

                Effect::EvictCache => {
                    self.scheduler.evict(self.state.current_page);
                }

                Effect::UpdatePrefetch => {
                    self.scheduler
                        .schedule_prefetch(self.state.current_page, self.state.render_params());
                }

                Effect::ClearError => {
                    self.scheduler.clear_error();
                }
            }
        }
    }

    /// Drain completed render responses and follow up on them
    pub fn pump(&mut self) -> Vec<SchedulerEvent> {
        let events = self
            .scheduler
            .poll_responses(self.state.current_page, self.state.scale());

        for event in &events {
            if let SchedulerEvent::PageDisplayed(page) = event {
                self.scheduler
                    .schedule_prefetch(*page, self.state.render_params());
                self.scheduler.ensure_text_spans(*page);
            }
        }

        events
    }

    // --- selection -----------------------------------------------------

    pub fn set_tool(&mut self, tool: Tool) {
        self.selection.set_tool(tool);
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.selection.set_color(color);
    }

    /// Pointer pressed; `origin` is the page container's client position
    pub fn pointer_down(&mut self, client: ClientPoint, origin: ClientPoint) -> bool {
        self.selection.pointer_down(
            client,
            origin,
            self.state.scale(),
            self.state.current_page,
        )
    }

    pub fn pointer_move(&mut self, client: ClientPoint, origin: ClientPoint) {
        self.selection.pointer_move(client, origin);
    }

    /// Pointer released; note/clip drags commit straight into the store
    pub fn pointer_up(&mut self) -> SelectionOutcome {
        let outcome = self.selection.pointer_up();
        if let SelectionOutcome::Committed(draft) = &outcome {
            self.commit(draft.clone());
        }
        outcome
    }

    /// Native text selection changed (viewport-space fragment rects)
    pub fn text_selected(&mut self, fragments: &[ViewRect], text: &str) -> SelectionOutcome {
        self.selection.text_selected(
            fragments,
            text,
            self.state.scale(),
            self.state.current_page,
        )
    }

    /// Confirm the pending selection with the chosen color
    pub fn confirm_pending(&mut self, color: Rgb) -> Option<&Annotation> {
        let draft = self.selection.confirm(color)?;
        Some(self.commit(draft))
    }

    /// Discard the pending selection
    pub fn cancel_pending(&mut self) {
        self.selection.cancel();
    }

    fn commit(&mut self, draft: AnnotationDraft) -> &Annotation {
        let id = self.annotations.add(draft).id.clone();
        self.persist();
        self.annotations
            .iter()
            .find(|a| a.id == id)
            .expect("annotation just added")
    }

    // --- annotations ---------------------------------------------------

    /// Send the full current set to the persistence collaborator.
    ///
    /// Failures are logged, never rolled back: the local set stays as-is
    /// and the next successful save re-transmits everything.
    pub fn persist(&mut self) {
        if let Err(e) = self.backend.save(
            &self.document_id,
            &self.user_id,
            self.annotations.annotations(),
        ) {
            error!(
                "failed to save annotations for {}: {e:#}",
                self.document_id
            );
        }
    }

    pub fn remove_annotation(&mut self, id: &str) -> bool {
        let removed = self.annotations.remove(id).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Annotations on the given page, in insertion order
    pub fn annotations_on(&self, page: u32) -> impl Iterator<Item = &Annotation> {
        self.annotations.by_page(page)
    }

    // --- accessors -----------------------------------------------------

    #[must_use]
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.state.current_page
    }

    #[must_use]
    pub fn displayed_page(&self) -> Option<u32> {
        self.scheduler.displayed_page()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.scheduler.last_error()
    }

    #[must_use]
    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    #[must_use]
    pub fn store(&self) -> &AnnotationStore {
        &self.annotations
    }
}
