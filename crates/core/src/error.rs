use thiserror::Error;

pub type Result<T, E = HubError> = std::result::Result<T, E>;

/// Errors surfaced by the hub client and snapshot downloads.
///
/// The `Display` text is shown to the user as-is, so variants carry enough
/// context to be understood without the surrounding log.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("invalid or expired token")]
    Unauthorized,

    #[error("model '{0}' not found on the hub")]
    NotFound(String),

    #[error("hub returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("refusing to write outside the model directory: {0}")]
    InvalidPath(String),

    #[error("{path}: expected {expected} bytes, got {actual}")]
    Incomplete {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("download cancelled")]
    Cancelled,
}

impl HubError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HubError::Cancelled)
    }
}
