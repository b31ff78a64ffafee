//! Client for the diagram generation service.

use crate::error::{Error, NetworkError, Result, ValidationError};
use codegram_core::config::ApiConfig;
use codegram_core::{AnalysisMethod, DiagramFormat, DiagramSource, DiagramType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const UNKNOWN_GENERATION_ERROR: &str = "Unknown error during generation";

/// What the service should analyse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RequestSource {
    /// Relative path to file content.
    #[serde(rename = "code_files")]
    Files(BTreeMap<String, String>),
    #[serde(rename = "repo_url")]
    Repository(String),
}

/// Body of `POST <base_url><endpoint>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    #[serde(flatten)]
    pub source: RequestSource,
    pub diagram_type: DiagramType,
    pub output_format: DiagramFormat,
    pub analysis_method: AnalysisMethod,
    /// Reserved by the service; always sent as an empty object.
    pub filters: serde_json::Map<String, Value>,
}

impl GenerationRequest {
    pub fn from_files(
        files: BTreeMap<String, String>,
        diagram_type: DiagramType,
        output_format: DiagramFormat,
        analysis_method: AnalysisMethod,
    ) -> Self {
        Self {
            source: RequestSource::Files(files),
            diagram_type,
            output_format,
            analysis_method,
            filters: serde_json::Map::new(),
        }
    }

    /// Validates `repo_url` with [`validate_repo_url`] first.
    pub fn from_repo(
        repo_url: &str,
        diagram_type: DiagramType,
        output_format: DiagramFormat,
        analysis_method: AnalysisMethod,
    ) -> Result<Self> {
        Ok(Self {
            source: RequestSource::Repository(validate_repo_url(repo_url)?),
            diagram_type,
            output_format,
            analysis_method,
            filters: serde_json::Map::new(),
        })
    }
}

/// Accepts `http(s)://[www.]github.com/<owner>/<repo>[/...]`, returning the trimmed URL.
pub fn validate_repo_url(raw: &str) -> std::result::Result<String, ValidationError> {
    let trimmed = raw.trim();
    let invalid = || ValidationError::InvalidRepoUrl {
        url: trimmed.to_string(),
    };
    let url = url::Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    if !matches!(url.host_str(), Some("github.com" | "www.github.com")) {
        return Err(invalid());
    }
    let segments = url
        .path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).count())
        .unwrap_or(0);
    if segments < 2 {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationResponse {
    pub success: bool,
    pub diagram_code: Option<String>,
    pub format: Option<String>,
    pub metadata: Option<Metadata>,
    pub error: Option<String>,
}

/// Free-form analysis details returned alongside a diagram. Every field is optional.
///
/// The service forwards whatever its LLM provider produced, so decoding never fails: known
/// fields of an unexpected type are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub source: Option<SourceInfo>,
    pub files_analyzed: Option<u64>,
    pub analysis_method: Option<String>,
    pub llm_provider: Option<String>,
    pub languages: Vec<String>,
    pub elements_found: Option<Value>,
    pub llm_metadata: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceInfo {
    pub kind: Option<String>,
    pub repository_url: Option<String>,
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

impl SourceInfo {
    fn from_value(value: &Value) -> Self {
        Self {
            kind: string_field(value, "type"),
            repository_url: string_field(value, "repository_url"),
        }
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(|value| Self::from_value(&value))
    }
}

impl Metadata {
    /// Picks the known fields out of a metadata object.
    pub fn from_value(value: &Value) -> Self {
        let languages = value
            .get("languages")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            source: value
                .get("source")
                .filter(|v| !v.is_null())
                .map(SourceInfo::from_value),
            files_analyzed: value.get("files_analyzed").and_then(Value::as_u64),
            analysis_method: string_field(value, "analysis_method"),
            llm_provider: string_field(value, "llm_provider"),
            languages,
            elements_found: value.get("elements_found").filter(|v| !v.is_null()).cloned(),
            llm_metadata: string_field(value, "llm_metadata"),
            error: string_field(value, "error"),
        }
    }

    /// `Label: value` lines for display, skipping empty fields.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(source) = &self.source {
            match (&source.repository_url, &source.kind) {
                (Some(url), _) => lines.push(format!("Repository: {url}")),
                (None, Some(kind)) => lines.push(format!("Source: {kind}")),
                (None, None) => lines.push("Source: Local files".to_string()),
            }
        }
        if let Some(count) = self.files_analyzed.filter(|n| *n > 0) {
            lines.push(format!("Files analysed: {count}"));
        }
        if let Some(method) = self.analysis_method.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("Analysis method: {method}"));
        }
        if let Some(provider) = self.llm_provider.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("LLM provider: {provider}"));
        }
        if !self.languages.is_empty() {
            lines.push(format!("Languages detected: {}", self.languages.join(", ")));
        }
        match &self.elements_found {
            None | Some(Value::Null | Value::Bool(false)) => {}
            Some(Value::Number(n)) if n.as_u64() == Some(0) => {}
            Some(Value::String(s)) if s.is_empty() => {}
            Some(Value::String(s)) => lines.push(format!("Elements found: {s}")),
            Some(other) => lines.push(format!("Elements found: {other}")),
        }
        lines
    }

    /// The LLM's own analysis text, if it sent a non-blank one.
    pub fn analysis(&self) -> Option<&str> {
        self.llm_metadata.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// A successful generation: the diagram source plus whatever metadata came with it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDiagram {
    pub source: DiagramSource,
    pub metadata: Metadata,
}

impl GenerationResponse {
    /// Turns a decoded reply into a diagram, falling back to `requested` when the reply does
    /// not name a format.
    pub fn into_diagram(self, requested: DiagramFormat) -> Result<GeneratedDiagram> {
        if !self.success {
            let message = self
                .error
                .or_else(|| self.metadata.and_then(|m| m.error))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_GENERATION_ERROR.to_string());
            return Err(Error::Generation { message });
        }
        let code = self.diagram_code.unwrap_or_default();
        let source = match self.format.as_deref() {
            Some(tag) => DiagramSource::from_tag(code, tag)?,
            None => DiagramSource::new(code, requested),
        };
        Ok(GeneratedDiagram {
            source,
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Blocking client with a bounded per-request timeout. No retries.
pub struct ApiClient {
    config: ApiConfig,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .http_status_as_error(false)
            .build()
            .into();
        Self { config, agent }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn set_base_url(&mut self, url: &str) {
        self.config.set_base_url(url);
    }

    /// Sends `request` and decodes the reply, whatever its `success` flag says.
    pub fn send(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let url = self.config.generate_url();
        let body = serde_json::to_vec(request)
            .map_err(|err| NetworkError::Transport(err.to_string()))?;
        tracing::info!(
            %url,
            diagram_type = %request.diagram_type,
            format = %request.output_format,
            "requesting diagram generation"
        );

        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(&body[..])
            .map_err(map_ureq_error)?;
        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(map_ureq_error)?;
        tracing::debug!(status = status.as_u16(), bytes = text.len(), "generation reply received");

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| {
                    format!(
                        "HTTP {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or_default()
                    )
                });
            return Err(NetworkError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        serde_json::from_str(&text)
            .map_err(|err| NetworkError::InvalidResponse(err.to_string()).into())
    }

    /// Sends `request` and requires `success: true`.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDiagram> {
        self.send(request)?.into_diagram(request.output_format)
    }

    /// Generates a class diagram for a one-file sample; any failure counts as unreachable.
    pub fn test_connection(&self) -> bool {
        let mut files = BTreeMap::new();
        files.insert(
            "test.py".to_string(),
            "class TestClass:\n    def test_method(self):\n        pass".to_string(),
        );
        let request = GenerationRequest::from_files(
            files,
            DiagramType::Class,
            DiagramFormat::Mermaid,
            AnalysisMethod::LlmDirect,
        );
        match self.send(&request) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "connection test failed");
                false
            }
        }
    }
}

fn map_ureq_error(err: ureq::Error) -> NetworkError {
    match err {
        ureq::Error::Timeout(_) => NetworkError::Timeout,
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound | ureq::Error::Io(_) => {
            NetworkError::Connect
        }
        other => NetworkError::Transport(other.to_string()),
    }
}
