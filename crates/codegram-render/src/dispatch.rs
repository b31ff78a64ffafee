//! Routes a diagram source to its strategy and owns the viewer.

use crate::engine::{MarkupEngine, default_engine};
use crate::export::{ExportBlob, ExportError, ExportTarget, extension_for_mime};
use crate::fetch::{FetchError, HttpFetcher, ResourceFetcher};
use crate::raster::{self, RasterOptions};
use crate::strategy::{
    EmbeddedLibraryStrategy, ExternalViewerStrategy, RemoteImageStrategy, RenderResult,
    RendererStrategy,
};
use crate::viewer::{Surface, Viewer, ViewerState};
use codegram_core::{ClientConfig, DiagramFormat, DiagramSource};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Where the most recent render call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPhase {
    #[default]
    Idle,
    Dispatching,
    Rendering,
    Rendered,
    Failed,
}

/// Single-threaded render session: one viewer, one current source.
///
/// All methods take `&self`, so a render may start while another is still awaiting its
/// strategy. Only the newest render is ever shown.
pub struct Dispatcher {
    embedded: EmbeddedLibraryStrategy,
    remote: RemoteImageStrategy,
    external: ExternalViewerStrategy,
    fetcher: Rc<dyn ResourceFetcher>,
    raster: RasterOptions,
    viewer: RefCell<Viewer>,
    session: RefCell<Option<DiagramSource>>,
    generation: Cell<u64>,
    phase: Cell<RenderPhase>,
}

impl Dispatcher {
    pub fn new(
        config: &ClientConfig,
        engine: Option<Box<dyn MarkupEngine>>,
        fetcher: Rc<dyn ResourceFetcher>,
    ) -> Self {
        Self {
            embedded: EmbeddedLibraryStrategy::new(engine),
            remote: RemoteImageStrategy::new(config.plantuml.clone(), fetcher.clone()),
            external: ExternalViewerStrategy::new(config.drawio.clone()),
            fetcher,
            raster: RasterOptions::default(),
            viewer: RefCell::new(Viewer::new()),
            session: RefCell::new(None),
            generation: Cell::new(0),
            phase: Cell::new(RenderPhase::Idle),
        }
    }

    /// Compiled-in engine and a blocking HTTP fetcher.
    pub fn with_defaults(config: &ClientConfig) -> Self {
        Self::new(config, default_engine(), Rc::new(HttpFetcher::default()))
    }

    pub fn with_raster_options(mut self, raster: RasterOptions) -> Self {
        self.raster = raster;
        self
    }

    fn strategy_for(&self, format: DiagramFormat) -> &dyn RendererStrategy {
        match format {
            DiagramFormat::Mermaid => &self.embedded,
            DiagramFormat::PlantUml => &self.remote,
            DiagramFormat::DrawIo => &self.external,
        }
    }

    /// Hides the viewer, renders `source` with its format's strategy, and shows the surface
    /// unless a newer render started in the meantime.
    pub async fn render(&self, source: DiagramSource) -> RenderResult {
        self.viewer.borrow_mut().hide();
        self.phase.set(RenderPhase::Dispatching);

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let format = source.format();
        *self.session.borrow_mut() = Some(source.clone());

        let diagram_id = format!(
            "codegram-{}-{generation}",
            chrono::Utc::now().timestamp_millis()
        );
        tracing::debug!(%format, %diagram_id, "dispatching render");

        self.phase.set(RenderPhase::Rendering);
        let result = self
            .strategy_for(format)
            .render_into(source.text(), &diagram_id)
            .await;

        if self.generation.get() != generation {
            tracing::debug!(%diagram_id, "discarding stale render result");
            return result;
        }

        match &result {
            RenderResult::Rendered { surface } => {
                self.viewer.borrow_mut().show(surface.clone());
                self.phase.set(RenderPhase::Rendered);
            }
            RenderResult::Failed(failure) => {
                tracing::info!(%format, kind = ?failure.kind, "render failed");
                self.phase.set(RenderPhase::Failed);
            }
        }
        result
    }

    /// Parses the wire tag, then renders. An unknown tag still hides the viewer and
    /// supersedes any render in flight.
    pub async fn render_tagged(
        &self,
        text: &str,
        tag: &str,
    ) -> codegram_core::Result<RenderResult> {
        let source = match DiagramSource::from_tag(text, tag) {
            Ok(source) => source,
            Err(err) => {
                self.viewer.borrow_mut().hide();
                self.generation.set(self.generation.get() + 1);
                *self.session.borrow_mut() = None;
                self.phase.set(RenderPhase::Failed);
                tracing::info!(tag, "rejected unknown diagram format");
                return Err(err);
            }
        };
        Ok(self.render(source).await)
    }

    pub fn viewer_state(&self) -> ViewerState {
        self.viewer.borrow().current()
    }

    pub fn visible_surface(&self) -> Option<Surface> {
        self.viewer.borrow().surface().cloned()
    }

    pub fn current_source(&self) -> Option<DiagramSource> {
        self.session.borrow().clone()
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase.get()
    }

    /// Image of the visible diagram. `target` defaults to PNG and only applies to
    /// embedded-library renders; remote images are returned as served.
    pub async fn export_current(
        &self,
        target: Option<ExportTarget>,
    ) -> Result<ExportBlob, ExportError> {
        let session_format = self.session.borrow().as_ref().map(DiagramSource::format);
        if session_format == Some(DiagramFormat::DrawIo) {
            return Err(ExportError::ExportUnsupported(DiagramFormat::DrawIo));
        }
        let surface = self
            .visible_surface()
            .ok_or(ExportError::NoDiagramRendered)?;
        let target = target.unwrap_or_default();

        match surface {
            Surface::Svg { markup, .. } => {
                let bytes = match target {
                    ExportTarget::Png => raster::svg_to_png(&markup, &self.raster)?,
                    ExportTarget::Jpeg => raster::svg_to_jpeg(&markup, &self.raster)?,
                };
                Ok(ExportBlob {
                    bytes,
                    mime: target.mime().to_string(),
                    extension: target.extension().to_string(),
                })
            }
            Surface::RemoteImage { url, mime, .. } => {
                let resource = self.fetcher.fetch(&url).await?;
                if !resource.is_image() {
                    return Err(ExportError::Fetch(FetchError::Status {
                        url,
                        status: resource.status,
                    }));
                }
                let mime = resource.content_type.unwrap_or(mime);
                if extension_for_mime(&mime) != target.extension() {
                    tracing::debug!(%target, %mime, "exporting remote image in its served format");
                }
                Ok(ExportBlob {
                    extension: extension_for_mime(&mime).to_string(),
                    bytes: resource.bytes,
                    mime,
                })
            }
            Surface::Viewer { .. } => Err(ExportError::ExportUnsupported(DiagramFormat::DrawIo)),
        }
    }
}
