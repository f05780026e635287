//! Page rendering, caching, and selection infrastructure

pub mod cache;
pub mod coords;
pub mod engine;
pub mod request;
pub mod scheduler;
pub mod selection;
pub mod session;
pub mod state;
pub mod types;
pub mod worker;
pub mod zoom;

pub use cache::PageCache;
pub use coords::{ClientPoint, DocPoint, DocRect, ViewPoint, ViewRect};
pub use engine::{EngineFactory, RenderEngine};
pub use request::{RenderFault, RenderParams, RenderRequest, RenderResponse, RequestId};
pub use scheduler::{RenderScheduler, SchedulerConfig, SchedulerEvent};
pub use selection::{PendingSelection, SelectionController, SelectionOutcome, Tool};
pub use session::ViewerSession;
pub use state::{Command, Effect, ViewerState};
pub use types::{PageEntry, RasterData, TextSpan, Viewport};
pub use zoom::Zoom;

/// Default number of render worker threads
pub const DEFAULT_WORKERS: usize = 2;

/// Default page cache capacity
pub const DEFAULT_CACHE_CAPACITY: usize = 5;

/// Default prefetch radius around the current page
pub const DEFAULT_PREFETCH_RADIUS: u32 = 2;

/// Minimum drag size, in viewport pixels, for a selection to count
pub const MIN_DRAG_PX: f32 = 5.0;
