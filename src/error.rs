use thiserror::Error;

/// Failures reported by a file directory service.
#[derive(Debug, Error)]
pub enum DriveError {
    /// The search query could not be executed
    #[error("search failed: {0}")]
    Search(String),

    /// The result sequence broke while it was being enumerated
    #[error("enumeration failed: {0}")]
    Enumeration(String),

    /// A folder id is invalid, trashed, not a folder or not accessible
    #[error("cannot resolve folder {id}: {reason}")]
    Resolution { id: String, reason: String },

    /// The service rejected a move
    #[error("cannot move file {id}: {reason}")]
    Move { id: String, reason: String },

    /// The file's name could not be read
    #[error("cannot read name of file {0}")]
    Name(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("drive api returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Failures that end a run without a tally.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to search Drive files: {0}")]
    Search(#[source] DriveError),

    #[error("critical error while processing files: {0}")]
    Enumeration(#[source] DriveError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
