//! Render worker - runs in separate thread(s)
//!
//! Workers pull requests from a shared MPMC queue, drive their own engine
//! instance, and push responses back. Cancellation is acknowledged but
//! advisory; the scheduler's discard-on-mismatch rule is what keeps stale
//! results off the screen.

use flume::{Receiver, Sender};

use super::engine::EngineFactory;
use super::request::{RenderFault, RenderParams, RenderRequest, RenderResponse, RequestId};
use super::types::PageEntry;

/// Main worker function - runs in a dedicated thread
pub fn render_worker(
    factory: &EngineFactory,
    requests: &Receiver<RenderRequest>,
    responses: &Sender<RenderResponse>,
) {
    let mut engine = match factory() {
        Ok(engine) => engine,
        Err(fault) => {
            let _ = responses.send(RenderResponse::Error {
                id: RequestId::new(0),
                fault,
            });
            return;
        }
    };

    for request in requests {
        match request {
            RenderRequest::Page { id, page, params }
            | RenderRequest::Prefetch { id, page, params } => {
                let response = match render_entry(engine.as_mut(), page, &params) {
                    Ok(entry) => RenderResponse::Page { id, page, entry },
                    Err(fault) => RenderResponse::Error { id, fault },
                };
                let _ = responses.send(response);
            }

            RenderRequest::ExtractText { id, page } => {
                let response = match engine.extract_text(page) {
                    Ok(spans) => RenderResponse::TextSpans { id, page, spans },
                    Err(fault) => RenderResponse::Error { id, fault },
                };
                let _ = responses.send(response);
            }

            RenderRequest::Cancel(id) => {
                let _ = responses.send(RenderResponse::Cancelled(id));
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn render_entry(
    engine: &mut dyn super::engine::RenderEngine,
    page: u32,
    params: &RenderParams,
) -> Result<PageEntry, RenderFault> {
    let count = engine.page_count();
    if page == 0 || page > count {
        return Err(RenderFault::PageOutOfRange { page, count });
    }

    let raster = engine.render_page(page, params)?;
    Ok(PageEntry::new(page, raster, params.scale))
}
