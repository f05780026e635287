//! pagemark - document viewer core
//!
//! Orchestrates a document-rendering capability into an interactive
//! viewer: cancellable render scheduling, a bounded proximity cache of
//! rendered pages, coordinate mapping between pointer/viewport/document
//! space, and a selection-to-annotation pipeline with pluggable
//! persistence. Document parsing and rasterization stay behind the
//! [`viewer::RenderEngine`] trait.

pub mod annotations;
pub mod persistence;
pub mod viewer;

pub use annotations::{Annotation, AnnotationKind, AnnotationStore, Rgb};
pub use persistence::{AnnotationBackend, JsonFileBackend, MemoryBackend};
pub use viewer::{Command, RenderScheduler, SchedulerConfig, Tool, ViewerSession};
