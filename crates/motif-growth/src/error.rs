use motif_registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrowthError {
    #[error("invalid extraction job: {0}")]
    InvalidJob(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}
