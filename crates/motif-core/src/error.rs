use thiserror::Error;

use crate::domain::Domain;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {domain} features: {reason}")]
    InvalidFeature { domain: Domain, reason: String },

    #[error("unknown domain: {0}")]
    UnknownDomain(String),
}
