//! Diagram formats, diagram kinds and the immutable diagram source handed to renderers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three markup languages the generation API can return.
///
/// The wire tags (`mermaid`, `plantuml`, `drawio`) are what the API sends in the `format`
/// field of a response and what it expects in `output_format` of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramFormat {
    /// Lightweight graph-description markup rendered by an embedded library.
    Mermaid,
    /// UML markup rendered by a remote image host.
    #[serde(rename = "plantuml")]
    PlantUml,
    /// Graphical-editor XML previewed by an external viewer service.
    #[serde(rename = "drawio")]
    DrawIo,
}

impl DiagramFormat {
    pub const ALL: [DiagramFormat; 3] = [Self::Mermaid, Self::PlantUml, Self::DrawIo];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::PlantUml => "plantuml",
            Self::DrawIo => "drawio",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Mermaid => "Mermaid",
            Self::PlantUml => "PlantUML",
            Self::DrawIo => "Draw.io (XML)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Mermaid => "Compatible with Mermaid.js",
            Self::PlantUml => "Compatible with PlantUML tools",
            Self::DrawIo => "Compatible with Draw.io/Diagrams.net",
        }
    }

    /// File extension (with the leading dot) used when saving diagram code.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mermaid => ".mmd",
            Self::PlantUml => ".puml",
            Self::DrawIo => ".drawio",
        }
    }

    /// Guesses a format from a file extension such as `mmd`, `.puml` or `drawio`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "mmd" | "mermaid" => Some(Self::Mermaid),
            "puml" | "plantuml" | "pu" | "uml" => Some(Self::PlantUml),
            "drawio" | "xml" => Some(Self::DrawIo),
            _ => None,
        }
    }
}

impl fmt::Display for DiagramFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DiagramFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mermaid" => Ok(Self::Mermaid),
            "plantuml" => Ok(Self::PlantUml),
            "drawio" => Ok(Self::DrawIo),
            _ => Err(Error::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Diagram source text paired with its declared format.
///
/// Created once per successful generation and never mutated; a new generation replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSource {
    text: String,
    format: DiagramFormat,
}

impl DiagramSource {
    pub fn new(text: impl Into<String>, format: DiagramFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    /// Builds a source from a wire format tag, failing with [`Error::UnsupportedFormat`].
    pub fn from_tag(text: impl Into<String>, tag: &str) -> Result<Self> {
        Ok(Self::new(text, tag.parse()?))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> DiagramFormat {
        self.format
    }

    /// Name of the file the code is saved under, e.g. `diagram.puml`.
    pub fn file_name(&self) -> String {
        format!("diagram{}", self.format.extension())
    }
}

/// Kind of UML diagram requested from the generation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramType {
    Class,
    Sequence,
    UseCase,
    Activity,
    Component,
    Deployment,
    State,
    Object,
}

impl DiagramType {
    pub const ALL: [DiagramType; 8] = [
        Self::Class,
        Self::Sequence,
        Self::UseCase,
        Self::Activity,
        Self::Component,
        Self::Deployment,
        Self::State,
        Self::Object,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Sequence => "sequence",
            Self::UseCase => "use_case",
            Self::Activity => "activity",
            Self::Component => "component",
            Self::Deployment => "deployment",
            Self::State => "state",
            Self::Object => "object",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Class => "Class diagram",
            Self::Sequence => "Sequence diagram",
            Self::UseCase => "Use case diagram",
            Self::Activity => "Activity diagram",
            Self::Component => "Component diagram",
            Self::Deployment => "Deployment diagram",
            Self::State => "State diagram",
            Self::Object => "Object diagram",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Class => "Classes, attributes, methods and the relations between them",
            Self::Sequence => "Interactions between actors and objects in chronological order",
            Self::UseCase => "Actors and the use cases of the system",
            Self::Activity => "Workflow and control flow of the system",
            Self::Component => "Modules and their interfaces",
            Self::Deployment => "Physical nodes and software artifacts",
            Self::State => "Object states and the transitions between them",
            Self::Object => "Object instances and their links at a point in time",
        }
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DiagramType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == needle)
            .ok_or_else(|| Error::UnsupportedDiagramType {
                diagram_type: s.to_string(),
            })
    }
}

/// How the backend analyses the submitted code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    #[default]
    LlmDirect,
}

impl AnalysisMethod {
    pub fn tag(self) -> &'static str {
        match self {
            Self::LlmDirect => "llm_direct",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::LlmDirect => "AI Analysis (Gemini)",
        }
    }
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AnalysisMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "llm_direct" => Ok(Self::LlmDirect),
            _ => Err(Error::UnsupportedAnalysisMethod {
                method: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_tags_parse_case_insensitively() {
        assert_eq!(" Mermaid ".parse::<DiagramFormat>().unwrap(), DiagramFormat::Mermaid);
        assert_eq!("PLANTUML".parse::<DiagramFormat>().unwrap(), DiagramFormat::PlantUml);
        assert_eq!("drawio".parse::<DiagramFormat>().unwrap(), DiagramFormat::DrawIo);
    }

    #[test]
    fn unknown_format_tag_is_rejected() {
        let err = DiagramSource::from_tag("graph TD", "graphviz").unwrap_err();
        match err {
            Error::UnsupportedFormat { format } => assert_eq!(format, "graphviz"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn format_serde_uses_wire_tags() {
        let json = serde_json::to_string(&DiagramFormat::PlantUml).unwrap();
        assert_eq!(json, "\"plantuml\"");
        let back: DiagramFormat = serde_json::from_str("\"drawio\"").unwrap();
        assert_eq!(back, DiagramFormat::DrawIo);
    }

    #[test]
    fn file_name_follows_format_extension() {
        let src = DiagramSource::new("@startuml\n@enduml", DiagramFormat::PlantUml);
        assert_eq!(src.file_name(), "diagram.puml");
        assert_eq!(
            DiagramSource::new("", DiagramFormat::DrawIo).file_name(),
            "diagram.drawio"
        );
    }

    #[test]
    fn extensions_map_back_to_formats() {
        assert_eq!(DiagramFormat::from_extension(".mmd"), Some(DiagramFormat::Mermaid));
        assert_eq!(DiagramFormat::from_extension("PUML"), Some(DiagramFormat::PlantUml));
        assert_eq!(DiagramFormat::from_extension("txt"), None);
    }

    #[test]
    fn diagram_type_accepts_dashes() {
        assert_eq!("use-case".parse::<DiagramType>().unwrap(), DiagramType::UseCase);
        assert_eq!(
            serde_json::to_string(&DiagramType::UseCase).unwrap(),
            "\"use_case\""
        );
        assert!("mindmap".parse::<DiagramType>().is_err());
    }
}
