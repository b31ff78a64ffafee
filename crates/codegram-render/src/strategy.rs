//! One rendering path per diagram format.
//!
//! Strategies never touch viewer visibility and never return errors: every failure becomes
//! [`RenderResult::Failed`] carrying the raw source so the user can recover it manually.

use crate::engine::{MarkupEngine, sanitize_svg_id};
use crate::fetch::ResourceFetcher;
use crate::viewer::Surface;
use codegram_core::config::{DrawIoConfig, PlantUmlConfig};
use codegram_core::{DiagramFormat, encode_plantuml, encode_uri_component};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::rc::Rc;

/// Query string of the external viewer; the markup follows as a `#R` fragment.
const VIEWER_QUERY: &str = "lightbox=1&highlight=0000ff&edit=_blank&layers=1&nav=1&title=diagram";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The embedded library rejected the source.
    Syntax,
    /// No embedded library is loaded.
    RendererUnavailable,
    /// The payload compressor failed.
    EncoderUnavailable,
    /// The remote image did not load.
    ImageLoad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    pub kind: FailureKind,
    pub message: String,
    /// The untouched diagram source, always kept for display and copy.
    pub raw_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    Rendered { surface: Surface },
    Failed(RenderFailure),
}

impl RenderResult {
    fn failed(kind: FailureKind, message: impl Into<String>, raw_source: &str) -> Self {
        Self::Failed(RenderFailure {
            kind,
            message: message.into(),
            raw_source: raw_source.to_string(),
        })
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }

    pub fn surface(&self) -> Option<&Surface> {
        match self {
            Self::Rendered { surface } => Some(surface),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RenderFailure> {
        match self {
            Self::Rendered { .. } => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// Shared capability of all renderers.
pub trait RendererStrategy {
    fn format(&self) -> DiagramFormat;

    fn render_into<'a>(
        &'a self,
        source: &'a str,
        diagram_id: &'a str,
    ) -> LocalBoxFuture<'a, RenderResult>;
}

/// Mermaid: hands the source to the embedded library.
pub struct EmbeddedLibraryStrategy {
    engine: Option<Box<dyn MarkupEngine>>,
}

impl EmbeddedLibraryStrategy {
    pub fn new(engine: Option<Box<dyn MarkupEngine>>) -> Self {
        Self { engine }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    fn render_now(&self, source: &str, diagram_id: &str) -> RenderResult {
        let Some(engine) = self.engine.as_deref() else {
            return RenderResult::failed(
                FailureKind::RendererUnavailable,
                "Mermaid library not loaded",
                source,
            );
        };
        let diagram_id = sanitize_svg_id(diagram_id);
        match engine.render(&diagram_id, source) {
            Ok(markup) => RenderResult::Rendered {
                surface: Surface::Svg { diagram_id, markup },
            },
            Err(err) => {
                tracing::warn!(%diagram_id, error = %err, "mermaid rendering failed");
                RenderResult::failed(
                    FailureKind::Syntax,
                    format!(
                        "Error rendering Mermaid diagram: {err}. Check the diagram syntax in the code view."
                    ),
                    source,
                )
            }
        }
    }
}

impl RendererStrategy for EmbeddedLibraryStrategy {
    fn format(&self) -> DiagramFormat {
        DiagramFormat::Mermaid
    }

    fn render_into<'a>(
        &'a self,
        source: &'a str,
        diagram_id: &'a str,
    ) -> LocalBoxFuture<'a, RenderResult> {
        async move { self.render_now(source, diagram_id) }.boxed_local()
    }
}

/// PlantUML: encodes the source into a URL on the rendering host and loads the image once.
pub struct RemoteImageStrategy {
    config: PlantUmlConfig,
    fetcher: Rc<dyn ResourceFetcher>,
}

impl RemoteImageStrategy {
    pub fn new(config: PlantUmlConfig, fetcher: Rc<dyn ResourceFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// `<server>/<image-format>/<payload>`; the payload is always the last path segment.
    pub fn image_url(&self, payload: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.server(),
            self.config.image_format,
            payload
        )
    }

    fn load_failed(&self, detail: &str, source: &str) -> RenderResult {
        RenderResult::failed(
            FailureKind::ImageLoad,
            format!(
                "Error loading the PlantUML diagram ({detail}). Check the connection or the \
                 PlantUML code, or open {} and paste the code manually.",
                self.config.editor_url()
            ),
            source,
        )
    }

    async fn render_async(&self, source: &str) -> RenderResult {
        let payload = match encode_plantuml(source) {
            Ok(payload) => payload,
            Err(err) => {
                return RenderResult::failed(
                    FailureKind::EncoderUnavailable,
                    format!("Error encoding PlantUML diagram: {err}"),
                    source,
                );
            }
        };
        let url = self.image_url(&payload);

        match self.fetcher.fetch(&url).await {
            Ok(resource) if resource.is_image() => {
                let mime = resource
                    .content_type
                    .clone()
                    .unwrap_or_else(|| self.config.image_mime().to_string());
                RenderResult::Rendered {
                    surface: Surface::RemoteImage {
                        url,
                        mime,
                        bytes: resource.bytes,
                    },
                }
            }
            Ok(resource) => {
                tracing::warn!(%url, status = resource.status, "rendering host returned no image");
                self.load_failed(&format!("HTTP {}", resource.status), source)
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "rendering host unreachable");
                self.load_failed(&err.to_string(), source)
            }
        }
    }
}

impl RendererStrategy for RemoteImageStrategy {
    fn format(&self) -> DiagramFormat {
        DiagramFormat::PlantUml
    }

    fn render_into<'a>(
        &'a self,
        source: &'a str,
        _diagram_id: &'a str,
    ) -> LocalBoxFuture<'a, RenderResult> {
        self.render_async(source).boxed_local()
    }
}

/// draw.io: builds a viewer link with the XML in the fragment. Best effort, never fails.
pub struct ExternalViewerStrategy {
    config: DrawIoConfig,
}

impl ExternalViewerStrategy {
    pub fn new(config: DrawIoConfig) -> Self {
        Self { config }
    }

    pub fn viewer_url(&self, xml: &str) -> String {
        let base = self.config.viewer_url.trim_end_matches('?');
        let sep = if base.contains('?') { '&' } else { '?' };
        format!("{base}{sep}{VIEWER_QUERY}#R{}", encode_uri_component(xml))
    }

    fn render_now(&self, source: &str) -> RenderResult {
        if let Err(err) = roxmltree::Document::parse(source) {
            tracing::warn!(error = %err, "draw.io markup is not well-formed XML; preview may not load");
        }
        RenderResult::Rendered {
            surface: Surface::Viewer {
                url: self.viewer_url(source),
                raw_xml: source.to_string(),
            },
        }
    }
}

impl RendererStrategy for ExternalViewerStrategy {
    fn format(&self) -> DiagramFormat {
        DiagramFormat::DrawIo
    }

    fn render_into<'a>(
        &'a self,
        source: &'a str,
        _diagram_id: &'a str,
    ) -> LocalBoxFuture<'a, RenderResult> {
        async move { self.render_now(source) }.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::fetch::{FetchError, FetchedResource};
    use futures::executor::block_on;
    use std::cell::RefCell;

    struct EchoEngine;

    impl MarkupEngine for EchoEngine {
        fn render(&self, diagram_id: &str, source: &str) -> Result<String, EngineError> {
            if source.contains("!!") {
                return Err(EngineError::new("Parse error on line 1"));
            }
            Ok(format!(r#"<svg id="{diagram_id}"><text>{source}</text></svg>"#))
        }
    }

    struct ScriptedFetcher {
        reply: Result<FetchedResource, FetchError>,
        seen: RefCell<Vec<String>>,
    }

    impl ResourceFetcher for ScriptedFetcher {
        fn fetch<'a>(
            &'a self,
            url: &'a str,
        ) -> LocalBoxFuture<'a, Result<FetchedResource, FetchError>> {
            self.seen.borrow_mut().push(url.to_string());
            let reply = self.reply.clone();
            async move { reply }.boxed_local()
        }
    }

    fn png_reply() -> Result<FetchedResource, FetchError> {
        Ok(FetchedResource {
            status: 200,
            content_type: Some("image/png".to_string()),
            bytes: b"\x89PNG\r\n\x1a\n".to_vec(),
        })
    }

    #[test]
    fn embedded_strategy_wraps_library_output() {
        let strategy = EmbeddedLibraryStrategy::new(Some(Box::new(EchoEngine)));
        let result = block_on(strategy.render_into("classDiagram\n  A --> B", "codegram-1-1"));
        let Some(Surface::Svg { diagram_id, markup }) = result.surface() else {
            panic!("expected svg surface, got {result:?}");
        };
        assert_eq!(diagram_id, "codegram-1-1");
        assert!(markup.contains("classDiagram\n  A --> B"));
    }

    #[test]
    fn embedded_strategy_reports_syntax_errors_with_source() {
        let strategy = EmbeddedLibraryStrategy::new(Some(Box::new(EchoEngine)));
        let result = block_on(strategy.render_into("graph !!", "id"));
        let failure = result.failure().expect("failure");
        assert_eq!(failure.kind, FailureKind::Syntax);
        assert!(failure.message.contains("Parse error on line 1"));
        assert_eq!(failure.raw_source, "graph !!");
    }

    #[test]
    fn embedded_strategy_without_library_is_unavailable() {
        let strategy = EmbeddedLibraryStrategy::new(None);
        assert!(!strategy.is_available());
        let result = block_on(strategy.render_into("graph TD", "id"));
        assert_eq!(
            result.failure().map(|f| f.kind),
            Some(FailureKind::RendererUnavailable)
        );
    }

    #[test]
    fn remote_strategy_puts_payload_in_last_segment() {
        let fetcher = Rc::new(ScriptedFetcher {
            reply: png_reply(),
            seen: RefCell::new(Vec::new()),
        });
        let strategy = RemoteImageStrategy::new(PlantUmlConfig::default(), fetcher.clone());
        let result = block_on(strategy.render_into("@startuml\nA->B\n@enduml", "id"));

        let Some(Surface::RemoteImage { url, mime, .. }) = result.surface() else {
            panic!("expected remote image, got {result:?}");
        };
        assert_eq!(mime, "image/png");
        let prefix = "http://www.plantuml.com/plantuml/png/";
        assert!(url.starts_with(prefix), "{url}");
        let payload = &url[prefix.len()..];
        assert!(!payload.is_empty());
        assert!(
            payload
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        );
        assert_eq!(fetcher.seen.borrow().as_slice(), [url.clone()]);
    }

    #[test]
    fn remote_strategy_failure_keeps_source_and_points_to_editor() {
        let fetcher = Rc::new(ScriptedFetcher {
            reply: Err(FetchError::Status {
                url: "u".to_string(),
                status: 404,
            }),
            seen: RefCell::new(Vec::new()),
        });
        let strategy = RemoteImageStrategy::new(PlantUmlConfig::default(), fetcher.clone());
        let result = block_on(strategy.render_into("@startuml\nA->B\n@enduml", "id"));
        let failure = result.failure().expect("failure");
        assert_eq!(failure.kind, FailureKind::ImageLoad);
        assert!(failure.message.contains("http://www.plantuml.com/plantuml/uml"));
        assert_eq!(failure.raw_source, "@startuml\nA->B\n@enduml");
        assert_eq!(fetcher.seen.borrow().len(), 1, "single attempt, no retry");
    }

    #[test]
    fn remote_strategy_rejects_non_image_bodies() {
        let fetcher = Rc::new(ScriptedFetcher {
            reply: Ok(FetchedResource {
                status: 200,
                content_type: Some("text/html".to_string()),
                bytes: b"<html>bad</html>".to_vec(),
            }),
            seen: RefCell::new(Vec::new()),
        });
        let strategy = RemoteImageStrategy::new(PlantUmlConfig::default(), fetcher);
        let result = block_on(strategy.render_into("@startuml\n@enduml", "id"));
        assert_eq!(result.failure().map(|f| f.kind), Some(FailureKind::ImageLoad));
    }

    #[test]
    fn viewer_strategy_builds_fragment_url() {
        let strategy = ExternalViewerStrategy::new(DrawIoConfig::default());
        let result = block_on(strategy.render_into("<mxfile></mxfile>", "id"));
        let Some(Surface::Viewer { url, raw_xml }) = result.surface() else {
            panic!("expected viewer surface");
        };
        assert_eq!(
            url,
            "https://viewer.diagrams.net/?lightbox=1&highlight=0000ff&edit=_blank&layers=1&nav=1&title=diagram#R%3Cmxfile%3E%3C%2Fmxfile%3E"
        );
        assert_eq!(raw_xml, "<mxfile></mxfile>");
    }

    #[test]
    fn viewer_strategy_accepts_malformed_xml() {
        let strategy = ExternalViewerStrategy::new(DrawIoConfig::default());
        let result = block_on(strategy.render_into("<mxfile><broken", "id"));
        assert!(result.is_rendered());
    }
}
