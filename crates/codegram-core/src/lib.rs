#![forbid(unsafe_code)]

//! Diagram source model, payload encoders and client configuration (headless).
//!
//! Design goals:
//! - a closed set of diagram formats, so adding one is a compile-time-checked change
//! - deterministic, dependency-light encoders that can be tested without a network

pub mod config;
pub mod encode;
pub mod error;
pub mod format;

pub use config::ClientConfig;
pub use encode::{encode as encode_plantuml, encode_uri_component};
pub use error::{Error, Result};
pub use format::{AnalysisMethod, DiagramFormat, DiagramSource, DiagramType};
