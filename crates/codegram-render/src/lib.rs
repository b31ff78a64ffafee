#![forbid(unsafe_code)]

//! Format dispatch, renderer strategies and image export.
//!
//! A [`Dispatcher`] owns the single [`Viewer`]: every render hides it first, picks the
//! strategy for the source's [`DiagramFormat`](codegram_core::DiagramFormat), and shows the
//! resulting surface. Strategies report failures as data ([`RenderResult::Failed`]) and keep
//! the raw source, so nothing is lost when a diagram cannot be drawn.

pub mod dispatch;
pub mod engine;
pub mod export;
pub mod fetch;
pub mod raster;
pub mod strategy;
pub mod viewer;

pub use dispatch::{Dispatcher, RenderPhase};
pub use engine::{EngineError, MarkupEngine, default_engine};
pub use export::{ExportBlob, ExportError, ExportTarget};
pub use fetch::{FetchError, FetchedResource, HttpFetcher, ResourceFetcher};
pub use raster::{RasterError, RasterOptions};
pub use strategy::{FailureKind, RenderFailure, RenderResult, RendererStrategy};
pub use viewer::{Surface, Viewer, ViewerState};
