//! Client configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is a valid
//! configuration. Partial files only override what they mention.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_GENERATE_ENDPOINT: &str = "/generate-diagram";
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_PLANTUML_SERVER: &str = "http://www.plantuml.com/plantuml";
pub const DEFAULT_DRAWIO_VIEWER: &str = "https://viewer.diagrams.net/";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_MAX_TOTAL_FILES: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub plantuml: PlantUmlConfig,
    pub drawio: DrawIoConfig,
    pub files: FileConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub endpoint: String,
    /// Bounded wait for a generation call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            endpoint: DEFAULT_GENERATE_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ApiConfig {
    /// Sets the base URL, dropping a single trailing slash.
    pub fn set_base_url(&mut self, url: &str) {
        let url = url.trim();
        self.base_url = url.strip_suffix('/').unwrap_or(url).to_string();
    }

    pub fn generate_url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantUmlConfig {
    pub server_url: String,
    /// Image kind requested from the server: `png` or `svg`.
    pub image_format: String,
}

impl Default for PlantUmlConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_PLANTUML_SERVER.to_string(),
            image_format: "png".to_string(),
        }
    }
}

impl PlantUmlConfig {
    /// Server URL without a trailing slash.
    pub fn server(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    pub fn image_mime(&self) -> &'static str {
        match self.image_format.as_str() {
            "svg" => "image/svg+xml",
            _ => "image/png",
        }
    }

    /// Page of the online editor users can paste markup into when rendering fails.
    pub fn editor_url(&self) -> String {
        format!("{}/uml", self.server())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawIoConfig {
    pub viewer_url: String,
    /// Full editor, linked for manual import when the preview does not load.
    pub editor_url: String,
}

impl Default for DrawIoConfig {
    fn default() -> Self {
        Self {
            viewer_url: DEFAULT_DRAWIO_VIEWER.to_string(),
            editor_url: "https://app.diagrams.net/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Lower-case extensions including the leading dot.
    pub supported_extensions: Vec<String>,
    /// Per-file ceiling in bytes; larger files are skipped.
    pub max_file_size: u64,
    /// Maximum number of supported files in one submission.
    pub max_total_files: usize,
    /// Directory names never descended into (dot-directories are always skipped).
    pub skip_dirs: Vec<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        let exts = [
            ".py", ".js", ".ts", ".java", ".cpp", ".c", ".cs", ".php", ".rb", ".go", ".kt",
            ".swift", ".rs", ".scala", ".yaml", ".yml", ".tf", ".tfvars",
        ];
        let skip = [
            ".git",
            ".svn",
            "node_modules",
            "__pycache__",
            ".pytest_cache",
            "build",
            "dist",
            ".idea",
            ".vscode",
        ];
        Self {
            supported_extensions: exts.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_files: DEFAULT_MAX_TOTAL_FILES,
            skip_dirs: skip.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FileConfig {
    /// Whether `file_name` ends in one of the supported extensions (case-insensitive).
    pub fn is_supported(&self, file_name: &str) -> bool {
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return false;
        };
        let ext = format!(".{}", ext.to_ascii_lowercase());
        self.supported_extensions.iter().any(|e| *e == ext)
    }

    pub fn should_skip_dir(&self, dir_name: &str) -> bool {
        dir_name.starts_with('.')
            || self
                .skip_dirs
                .iter()
                .any(|d| d.eq_ignore_ascii_case(dir_name))
    }
}

impl ClientConfig {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text).map_err(|source| Error::ConfigJson {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded client configuration");
        Ok(config)
    }

    /// Checks URLs and enumerated values; called once after flags are applied.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("api.base_url", self.api.base_url.as_str()),
            ("plantuml.server_url", self.plantuml.server_url.as_str()),
            ("drawio.viewer_url", self.drawio.viewer_url.as_str()),
        ] {
            url::Url::parse(value).map_err(|err| Error::InvalidConfig {
                message: format!("{name} `{value}` is not a valid URL: {err}"),
            })?;
        }
        if !matches!(self.plantuml.image_format.as_str(), "png" | "svg") {
            return Err(Error::InvalidConfig {
                message: format!(
                    "plantuml.image_format must be `png` or `svg`, got `{}`",
                    self.plantuml.image_format
                ),
            });
        }
        if self.api.timeout_ms == 0 {
            return Err(Error::InvalidConfig {
                message: "api.timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
