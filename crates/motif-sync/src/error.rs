use thiserror::Error;

/// Failure of one sync call, after retries where they apply.
#[derive(Debug, Error)]
pub enum SyncError {
    /// 5xx, 429, timeout or connection failure that outlived every retry.
    #[error("backend unavailable on {path} (status {status:?}, {attempts} attempts): {body}")]
    TransientBackend {
        status:   Option<u16>,
        path:     String,
        body:     String,
        attempts: u32,
    },

    /// Any other 4xx. Never retried.
    #[error("{path} rejected the request with {status}: {body}")]
    ClientRejected { status: u16, path: String, body: String },

    /// A success status whose body is not the expected JSON.
    #[error("malformed response from {path}: {reason}; body: {body}")]
    MalformedResponse { path: String, body: String, reason: String },

    #[error("invalid sync configuration: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SyncError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::TransientBackend { status, .. } => *status,
            SyncError::ClientRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether trying again later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::TransientBackend { .. })
    }
}
