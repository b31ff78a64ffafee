//! Turning the visible surface into downloadable bytes.

use crate::fetch::FetchError;
use crate::raster::RasterError;
use codegram_core::DiagramFormat;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportTarget {
    #[default]
    Png,
    Jpeg,
}

impl ExportTarget {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
        }
    }
}

impl fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        })
    }
}

impl FromStr for ExportTarget {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, ExportError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            _ => Err(ExportError::UnsupportedTarget(s.to_string())),
        }
    }
}

/// Image bytes produced by one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    pub bytes: Vec<u8>,
    pub mime: String,
    /// Suggested extension, with the leading dot.
    pub extension: String,
}

impl ExportBlob {
    /// `diagram.png`, `diagram.jpg`, ...
    pub fn file_name(&self) -> String {
        format!("diagram{}", self.extension)
    }
}

/// Maps a response content type to a file extension for verbatim exports.
pub(crate) fn extension_for_mime(mime: &str) -> &'static str {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/svg+xml" => ".svg",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/gif" => ".gif",
        _ => ".png",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no diagram has been rendered yet")]
    NoDiagramRendered,
    #[error("image export is not available for {} diagrams", .0.display_name())]
    ExportUnsupported(DiagramFormat),
    #[error("unsupported export target `{0}` (expected png or jpeg)")]
    UnsupportedTarget(String),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
