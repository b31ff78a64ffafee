pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unsupported diagram format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Unsupported diagram type: {diagram_type}")]
    UnsupportedDiagramType { diagram_type: String },

    #[error("Unsupported analysis method: {method}")]
    UnsupportedAnalysisMethod { method: String },

    #[error("PlantUML encoder unavailable: {message}")]
    EncoderUnavailable { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to read configuration {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration JSON in {path}: {source}")]
    ConfigJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
