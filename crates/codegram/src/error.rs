pub use codegram_core::Error as CoreError;

pub type Result<T> = std::result::Result<T, Error>;

/// Problems with user input, reported before anything is sent.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("`{path}` is not a directory")]
    NotADirectory { path: String },
    #[error("No supported source files were found")]
    NoSupportedFiles,
    #[error("Too many files. Maximum allowed: {max} (found {found})")]
    TooManyFiles { found: usize, max: usize },
    #[error("The selected files could not be read")]
    NoReadableFiles,
    #[error("Please enter a valid GitHub URL (got `{url}`)")]
    InvalidRepoUrl { url: String },
}

/// Failures talking to the generation service. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("The request took too long. Try with fewer files.")]
    Timeout,
    #[error("Could not connect to the server. Check that it is running.")]
    Connect,
    /// Non-2xx reply; `message` is the body's `error` field or `HTTP <code>: <reason>`.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("invalid response from the server: {0}")]
    InvalidResponse(String),
    #[error("request failed: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// The service answered but reported `success: false`.
    #[error("{message}")]
    Generation { message: String },
    #[error(transparent)]
    Core(#[from] codegram_core::Error),
}
