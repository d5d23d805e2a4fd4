use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReserveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
