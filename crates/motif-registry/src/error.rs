use motif_core::CoreError;
use motif_reserve::ReserveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("name reserve: {0}")]
    Reserve(#[from] ReserveError),

    #[error(transparent)]
    Feature(#[from] CoreError),
}
