#![forbid(unsafe_code)]

//! `codegram` turns source code into UML diagrams through a generation service and renders
//! the result locally.
//!
//! - [`collect`]: pick supported source files out of a directory
//! - [`api`]: build requests, call the service, read its metadata
//! - [`render`] (feature `render`): show Mermaid, PlantUML and draw.io output and export images
//!
//! The diagram model, encoders and configuration are re-exported from `codegram-core`.

pub use codegram_core::*;

pub mod api;
pub mod collect;
pub mod error;

// Shadows the core `Error`/`Result`; core errors arrive wrapped in `Error::Core`.
pub use error::{Error, NetworkError, Result, ValidationError};

#[cfg(feature = "render")]
pub mod render {
    pub use codegram_render::*;
}
