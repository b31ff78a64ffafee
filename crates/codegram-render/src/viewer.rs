//! The single visible display surface.
//!
//! Exactly one of [`ViewerState::None`] or [`ViewerState::Showing`] holds at any time. Only
//! the dispatcher mutates a [`Viewer`]; strategies hand it finished [`Surface`]s.

use codegram_core::DiagramFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    None,
    Showing(DiagramFormat),
}

/// Rendered output ready to be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    /// Vector markup produced by the embedded library.
    Svg { diagram_id: String, markup: String },
    /// Image loaded from the remote rendering host.
    RemoteImage {
        url: String,
        mime: String,
        bytes: Vec<u8>,
    },
    /// Preview link into the external viewer plus the verbatim XML for manual copy.
    Viewer { url: String, raw_xml: String },
}

impl Surface {
    pub fn format(&self) -> DiagramFormat {
        match self {
            Surface::Svg { .. } => DiagramFormat::Mermaid,
            Surface::RemoteImage { .. } => DiagramFormat::PlantUml,
            Surface::Viewer { .. } => DiagramFormat::DrawIo,
        }
    }

    /// External URL backing the surface, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            Surface::Svg { .. } => None,
            Surface::RemoteImage { url, .. } | Surface::Viewer { url, .. } => Some(url),
        }
    }
}

#[derive(Debug, Default)]
pub struct Viewer {
    shown: Option<Surface>,
}

impl Viewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide(&mut self) {
        if let Some(surface) = self.shown.take() {
            tracing::trace!(format = %surface.format(), "surface hidden");
        }
    }

    /// Replaces whatever is visible with `surface`, hiding the previous one first.
    pub fn show(&mut self, surface: Surface) {
        self.hide();
        tracing::trace!(format = %surface.format(), "surface shown");
        self.shown = Some(surface);
    }

    pub fn current(&self) -> ViewerState {
        match &self.shown {
            Some(surface) => ViewerState::Showing(surface.format()),
            None => ViewerState::None,
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.shown.as_ref()
    }

    pub fn visible_count(&self) -> usize {
        usize::from(self.shown.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg() -> Surface {
        Surface::Svg {
            diagram_id: "d1".to_string(),
            markup: "<svg/>".to_string(),
        }
    }

    #[test]
    fn switching_surfaces_keeps_one_visible() {
        let mut viewer = Viewer::new();
        assert_eq!(viewer.current(), ViewerState::None);

        viewer.show(svg());
        assert_eq!(viewer.current(), ViewerState::Showing(DiagramFormat::Mermaid));

        viewer.show(Surface::Viewer {
            url: "https://viewer.example/#R".to_string(),
            raw_xml: "<mxfile/>".to_string(),
        });
        assert_eq!(viewer.current(), ViewerState::Showing(DiagramFormat::DrawIo));
        assert_eq!(viewer.visible_count(), 1);

        viewer.hide();
        assert_eq!(viewer.current(), ViewerState::None);
        assert_eq!(viewer.visible_count(), 0);
    }

    #[test]
    fn url_is_exposed_for_remote_surfaces_only() {
        assert_eq!(svg().url(), None);
        let img = Surface::RemoteImage {
            url: "http://host/png/abc".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };
        assert_eq!(img.url(), Some("http://host/png/abc"));
    }
}
