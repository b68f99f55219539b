/// Result type used throughout the client.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller broke an operation's contract. Raised before any I/O.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The entity snapshots handed to the client do not form a valid graph
    /// (thread without a parent, channel pointing at an unknown guild).
    #[error("Broken entity graph: {0}")]
    BrokenEntityGraph(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Rest(#[from] RestError),
}

/// Failures reported by the REST layer. Passed through to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The remote answered with a non-success status.
    #[error("Remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
