//! Render scheduler - owns the worker pool, the page cache, and the
//! single-active-render invariant
//!
//! At most one render may mutate the displayed page at any time. Issuing a
//! new foreground render cancels the previous one without waiting for its
//! teardown; whatever the cancelled render produces is discarded when its
//! token no longer matches the active one. Prefetches carry their own
//! tokens, populate the cache only, and never touch the displayed page.

use std::collections::HashMap;

use flume::{Receiver, Sender};
use log::{debug, error, warn};

use super::cache::PageCache;
use super::engine::EngineFactory;
use super::request::{RenderFault, RenderParams, RenderRequest, RenderResponse, RequestId};
use super::worker::render_worker;
use super::{DEFAULT_CACHE_CAPACITY, DEFAULT_PREFETCH_RADIUS, DEFAULT_WORKERS};

/// Scheduler configuration
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// Number of render worker threads
    pub workers: usize,
    /// Page cache capacity
    pub cache_capacity: usize,
    /// How many pages on each side of the current one to prefetch
    pub prefetch_radius: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            prefetch_radius: DEFAULT_PREFETCH_RADIUS,
        }
    }
}

/// Events surfaced to the caller when polling responses
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// The displayed page changed to a freshly rendered one
    PageDisplayed(u32),
    /// The active render failed (cancellations do not produce this)
    RenderFailed(String),
}

#[derive(Clone, Copy, Debug)]
struct ActiveRender {
    id: RequestId,
    page: u32,
}

/// Manages rendering with worker threads and a proximity cache
pub struct RenderScheduler {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    active_request: Option<ActiveRender>,
    prefetch_in_flight: HashMap<RequestId, u32>,
    extract_in_flight: HashMap<RequestId, u32>,
    cache: PageCache,
    displayed_page: Option<u32>,
    last_error: Option<String>,
    page_count: u32,
    prefetch_radius: u32,
    workers: usize,
}

impl RenderScheduler {
    /// Create a scheduler with default configuration
    pub fn new(factory: EngineFactory) -> Result<Self, RenderFault> {
        Self::with_config(factory, SchedulerConfig::default())
    }

    /// Create a scheduler with custom configuration.
    ///
    /// The factory is invoked once up front to read document metadata and
    /// then once per worker thread, each worker owning its own engine.
    pub fn with_config(factory: EngineFactory, config: SchedulerConfig) -> Result<Self, RenderFault> {
        let page_count = factory()?.page_count();

        // Flume gives us MPMC channels: multiple workers pull from one
        // shared request queue, which std/tokio mpsc receivers cannot do.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let workers = config.workers.max(1);
        for _ in 0..workers {
            let factory = factory.clone();
            let rx = request_rx.clone();
            let tx = response_tx.clone();

            std::thread::spawn(move || {
                render_worker(&factory, &rx, &tx);
            });
        }

        Ok(Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            active_request: None,
            prefetch_in_flight: HashMap::new(),
            extract_in_flight: HashMap::new(),
            cache: PageCache::new(config.cache_capacity),
            displayed_page: None,
            last_error: None,
            page_count,
            prefetch_radius: config.prefetch_radius,
            workers,
        })
    }

    /// Total pages in the open document
    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Show a page: display it straight from cache when fresh, otherwise
    /// issue a foreground render that supersedes any active one.
    ///
    /// Returns true when the page was displayed immediately from cache.
    pub fn show_page(&mut self, page: u32, params: RenderParams) -> bool {
        if self.cache.is_fresh(page, params.scale) {
            self.supersede_active();
            self.displayed_page = Some(page);
            self.last_error = None;
            return true;
        }

        self.request_render(page, params);
        false
    }

    /// Issue a foreground render, cancelling any active one.
    ///
    /// Cancellation is fire-and-forget: the next render starts without
    /// waiting for the previous one's teardown.
    pub fn request_render(&mut self, page: u32, params: RenderParams) -> RequestId {
        self.supersede_active();

        let id = self.next_id();
        let _ = self
            .request_tx
            .send(RenderRequest::Page { id, page, params });
        self.active_request = Some(ActiveRender { id, page });

        id
    }

    fn supersede_active(&mut self) {
        if let Some(active) = self.active_request.take() {
            debug!(
                "superseding render {:?} of page {}",
                active.id, active.page
            );
            let _ = self.request_tx.send(RenderRequest::Cancel(active.id));
        }
    }

    /// Queue background renders for the neighbors of `current`.
    ///
    /// Prefetches are subordinate to the foreground render: they never
    /// cancel it and their results only ever land in the cache.
    pub fn schedule_prefetch(&mut self, current: u32, params: RenderParams) {
        if self.page_count == 0 {
            return;
        }

        for offset in 1..=self.prefetch_radius {
            let ahead = current.saturating_add(offset);
            if ahead <= self.page_count {
                self.maybe_prefetch(ahead, params);
            }
            if current > offset {
                self.maybe_prefetch(current - offset, params);
            }
        }
    }

    fn maybe_prefetch(&mut self, page: u32, params: RenderParams) {
        if self.cache.is_fresh(page, params.scale) || self.is_page_in_flight(page) {
            return;
        }

        let id = self.next_id();
        let _ = self
            .request_tx
            .send(RenderRequest::Prefetch { id, page, params });
        self.prefetch_in_flight.insert(id, page);
    }

    /// Request text geometry for a cached page that lacks it.
    ///
    /// Spans are extracted at most once per cached entry; re-renders of the
    /// same page reset the entry and extraction happens again on demand.
    pub fn ensure_text_spans(&mut self, page: u32) {
        let needs_spans = self
            .cache
            .get(page)
            .is_some_and(|entry| entry.text_spans.is_none());
        if !needs_spans || self.extract_in_flight.values().any(|&p| p == page) {
            return;
        }

        let id = self.next_id();
        let _ = self.request_tx.send(RenderRequest::ExtractText { id, page });
        self.extract_in_flight.insert(id, page);
    }

    fn is_page_in_flight(&self, page: u32) -> bool {
        self.active_request.is_some_and(|a| a.page == page)
            || self.prefetch_in_flight.values().any(|&p| p == page)
    }

    /// Drain completed responses, applying the discard-on-mismatch rule.
    ///
    /// `current_page` and `scale` are the viewer's current navigation
    /// state; results rendered for a superseded token or at a stale scale
    /// are dropped without touching the displayed page.
    pub fn poll_responses(&mut self, current_page: u32, scale: f32) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();

        while let Ok(response) = self.response_rx.try_recv() {
            match response {
                RenderResponse::Page { id, page, entry } => {
                    if self.active_request.is_some_and(|a| a.id == id) {
                        self.active_request = None;
                        if entry.matches_scale(scale) {
                            self.cache.put(page, entry);
                            self.cache.evict(current_page);
                            self.displayed_page = Some(page);
                            self.last_error = None;
                            events.push(SchedulerEvent::PageDisplayed(page));
                        } else {
                            debug!("discarding render of page {page}: scale changed in flight");
                        }
                    } else if self.prefetch_in_flight.remove(&id).is_some() {
                        if entry.matches_scale(scale) {
                            self.cache.put(page, entry);
                            self.cache.evict(current_page);
                        } else {
                            debug!("discarding prefetch of page {page}: scale changed in flight");
                        }
                    } else {
                        debug!("discarding superseded render of page {page}");
                    }
                }

                RenderResponse::TextSpans { id, page, spans } => {
                    self.extract_in_flight.remove(&id);
                    self.cache.set_text_spans(page, spans);
                }

                RenderResponse::Cancelled(id) => {
                    // Not an error: no state change beyond bookkeeping.
                    self.prefetch_in_flight.remove(&id);
                    self.extract_in_flight.remove(&id);
                }

                RenderResponse::Error { id, fault } => {
                    if self.active_request.is_some_and(|a| a.id == id) {
                        self.active_request = None;
                        let detail = fault.to_string();
                        error!("render failed: {detail}");
                        self.last_error = Some(detail.clone());
                        events.push(SchedulerEvent::RenderFailed(detail));
                    } else if let Some(page) = self.prefetch_in_flight.remove(&id) {
                        warn!("prefetch of page {page} failed: {fault}");
                    } else if let Some(page) = self.extract_in_flight.remove(&id) {
                        warn!("text extraction for page {page} failed: {fault}");
                    } else {
                        debug!("error for superseded request {id:?}: {fault}");
                    }
                }
            }
        }

        events
    }

    /// Run cache eviction around the current page
    pub fn evict(&mut self, current: u32) {
        self.cache.evict(current);
    }

    /// Clear the viewer-level error state (a retry is about to be issued)
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Page currently backing the display, if any render has completed
    #[must_use]
    pub fn displayed_page(&self) -> Option<u32> {
        self.displayed_page
    }

    /// Human-readable cause of the last foreground render failure
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether a foreground render is outstanding
    #[must_use]
    pub fn is_render_active(&self) -> bool {
        self.active_request.is_some()
    }

    /// Read access to the page cache
    #[must_use]
    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Condvar, Mutex};
    use std::time::{Duration, Instant};

    use super::*;
    use crate::viewer::coords::DocRect;
    use crate::viewer::engine::RenderEngine;
    use crate::viewer::types::{RasterData, TextSpan, Viewport};

    /// Blocks renders of specific pages until released by the test
    #[derive(Default)]
    struct Gate {
        released: Mutex<HashSet<u32>>,
        signal: Condvar,
    }

    impl Gate {
        fn release(&self, page: u32) {
            let mut released = self
                .released
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            released.insert(page);
            self.signal.notify_all();
        }

        fn wait_for(&self, page: u32) {
            let mut released = self
                .released
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            while !released.contains(&page) {
                released = self
                    .signal
                    .wait(released)
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
            }
        }
    }

    struct StubEngine {
        pages: u32,
        gate: Option<Arc<Gate>>,
        fail_once: Arc<Mutex<HashSet<u32>>>,
    }

    impl RenderEngine for StubEngine {
        fn page_count(&self) -> u32 {
            self.pages
        }

        fn render_page(
            &mut self,
            page: u32,
            params: &RenderParams,
        ) -> Result<RasterData, RenderFault> {
            if let Some(gate) = &self.gate {
                gate.wait_for(page);
            }

            let should_fail = self
                .fail_once
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(&page);
            if should_fail {
                return Err(RenderFault::engine(format!("scripted failure on page {page}")));
            }

            let width = params.viewport.width as u32;
            let height = params.viewport.height as u32;
            Ok(RasterData {
                pixels: vec![page as u8; (width * height * 3) as usize],
                width_px: width,
                height_px: height,
            })
        }

        fn extract_text(&mut self, page: u32) -> Result<Vec<TextSpan>, RenderFault> {
            Ok(vec![TextSpan {
                bounds: DocRect::new(0.0, 0.0, 100.0, 12.0),
                text: format!("text of page {page}"),
            }])
        }
    }

    struct Fixture {
        gate: Option<Arc<Gate>>,
        fail_once: Arc<Mutex<HashSet<u32>>>,
    }

    impl Fixture {
        fn factory(&self, pages: u32) -> EngineFactory {
            let gate = self.gate.clone();
            let fail_once = self.fail_once.clone();
            Arc::new(move || {
                Ok(Box::new(StubEngine {
                    pages,
                    gate: gate.clone(),
                    fail_once: fail_once.clone(),
                }) as Box<dyn RenderEngine>)
            })
        }
    }

    fn plain_fixture() -> Fixture {
        Fixture {
            gate: None,
            fail_once: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn params() -> RenderParams {
        RenderParams {
            scale: 1.0,
            viewport: Viewport::new(80.0, 60.0),
        }
    }

    fn pump_until(
        scheduler: &mut RenderScheduler,
        current: u32,
        scale: f32,
        mut cond: impl FnMut(&RenderScheduler) -> bool,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            scheduler.poll_responses(current, scale);
            if cond(scheduler) {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("scheduler condition not met before deadline");
    }

    #[test]
    fn renders_and_displays_requested_page() {
        let fixture = plain_fixture();
        let mut scheduler = RenderScheduler::new(fixture.factory(10)).unwrap();

        scheduler.show_page(1, params());
        pump_until(&mut scheduler, 1, 1.0, |s| s.displayed_page() == Some(1));

        assert!(scheduler.cache().is_fresh(1, 1.0));
        assert!(scheduler.last_error().is_none());
    }

    #[test]
    fn cached_fresh_page_displays_without_render() {
        let fixture = plain_fixture();
        let mut scheduler = RenderScheduler::new(fixture.factory(10)).unwrap();

        scheduler.show_page(2, params());
        pump_until(&mut scheduler, 2, 1.0, |s| s.displayed_page() == Some(2));

        assert!(scheduler.show_page(2, params()));
        assert!(!scheduler.is_render_active());
    }

    #[test]
    fn prefetch_fills_neighborhood_within_capacity() {
        let fixture = plain_fixture();
        let mut scheduler = RenderScheduler::with_config(
            fixture.factory(10),
            SchedulerConfig {
                workers: 2,
                cache_capacity: 5,
                prefetch_radius: 2,
            },
        )
        .unwrap();

        scheduler.show_page(5, params());
        scheduler.schedule_prefetch(5, params());
        pump_until(&mut scheduler, 5, 1.0, |s| s.cache().len() == 5);

        assert_eq!(scheduler.cache().pages(), vec![3, 4, 5, 6, 7]);
        assert_eq!(scheduler.displayed_page(), Some(5));
    }

    #[test]
    fn superseded_render_never_overwrites_newer_page() {
        let gate = Arc::new(Gate::default());
        let fixture = Fixture {
            gate: Some(gate.clone()),
            fail_once: Arc::new(Mutex::new(HashSet::new())),
        };
        let mut scheduler = RenderScheduler::with_config(
            fixture.factory(10),
            SchedulerConfig {
                workers: 2,
                cache_capacity: 5,
                prefetch_radius: 0,
            },
        )
        .unwrap();

        gate.release(2);
        scheduler.show_page(1, params());
        scheduler.show_page(2, params());

        // Page 2 resolves first even though page 1 was requested first.
        pump_until(&mut scheduler, 2, 1.0, |s| s.displayed_page() == Some(2));

        // Let the superseded page-1 render finish late; it must be dropped.
        gate.release(1);
        let settle = Instant::now() + Duration::from_millis(200);
        while Instant::now() < settle {
            scheduler.poll_responses(2, 1.0);
            assert_eq!(scheduler.displayed_page(), Some(2));
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(scheduler.last_error().is_none());
    }

    #[test]
    fn render_failure_sets_error_and_retry_recovers() {
        let fixture = plain_fixture();
        fixture
            .fail_once
            .lock()
            .unwrap()
            .insert(3);
        let mut scheduler = RenderScheduler::new(fixture.factory(10)).unwrap();

        scheduler.show_page(3, params());
        pump_until(&mut scheduler, 3, 1.0, |s| s.last_error().is_some());

        assert!(scheduler.last_error().unwrap().contains("page 3"));
        assert_eq!(scheduler.displayed_page(), None);
        assert!(!scheduler.is_render_active());

        scheduler.clear_error();
        scheduler.show_page(3, params());
        pump_until(&mut scheduler, 3, 1.0, |s| s.displayed_page() == Some(3));
        assert!(scheduler.last_error().is_none());
    }

    #[test]
    fn text_spans_extracted_once_per_entry() {
        let fixture = plain_fixture();
        let mut scheduler = RenderScheduler::new(fixture.factory(10)).unwrap();

        scheduler.show_page(1, params());
        pump_until(&mut scheduler, 1, 1.0, |s| s.displayed_page() == Some(1));

        scheduler.ensure_text_spans(1);
        pump_until(&mut scheduler, 1, 1.0, |s| {
            s.cache()
                .get(1)
                .is_some_and(|e| e.text_spans.is_some())
        });

        // Second call must not issue another extraction.
        scheduler.ensure_text_spans(1);
        assert!(scheduler.extract_in_flight.is_empty());
    }

    #[test]
    fn prefetch_landing_after_zoom_is_discarded_not_cached() {
        let gate = Arc::new(Gate::default());
        let fixture = Fixture {
            gate: Some(gate.clone()),
            fail_once: Arc::new(Mutex::new(HashSet::new())),
        };
        let mut scheduler = RenderScheduler::with_config(
            fixture.factory(10),
            SchedulerConfig {
                workers: 2,
                cache_capacity: 5,
                prefetch_radius: 1,
            },
        )
        .unwrap();

        gate.release(1);
        scheduler.show_page(1, params());
        pump_until(&mut scheduler, 1, 1.0, |s| s.displayed_page() == Some(1));

        // Prefetch of page 2 goes out at scale 1.0 and stalls in the worker.
        scheduler.schedule_prefetch(1, params());
        assert_eq!(scheduler.prefetch_in_flight.len(), 1);

        // Zoom while the prefetch is still in flight, then let it finish.
        let zoomed = RenderParams {
            scale: 1.5,
            ..params()
        };
        scheduler.show_page(1, zoomed);
        gate.release(2);
        pump_until(&mut scheduler, 1, 1.5, |s| {
            s.prefetch_in_flight.is_empty() && !s.is_render_active()
        });

        // The stale-scale prefetch result was dropped, not cached.
        assert!(!scheduler.cache().contains(2));
        assert!(scheduler.cache().is_fresh(1, 1.5));
    }

    #[test]
    fn zoom_rerenders_current_page_in_place() {
        let fixture = plain_fixture();
        let mut scheduler = RenderScheduler::new(fixture.factory(10)).unwrap();

        scheduler.show_page(4, params());
        pump_until(&mut scheduler, 4, 1.0, |s| s.displayed_page() == Some(4));

        let zoomed = RenderParams {
            scale: 1.5,
            ..params()
        };
        assert!(!scheduler.cache().is_fresh(4, 1.5));
        scheduler.show_page(4, zoomed);
        pump_until(&mut scheduler, 4, 1.5, |s| s.cache().is_fresh(4, 1.5));

        assert_eq!(scheduler.displayed_page(), Some(4));
        assert_eq!(scheduler.cache().pages(), vec![4]);
    }
}
