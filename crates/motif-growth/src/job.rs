use motif_core::Extraction;
use serde::{Deserialize, Serialize};

use crate::error::GrowthError;

/// One unit of work handed to a worker: an extraction plus the prompt that
/// produced the artifact it was extracted from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionJob {
    #[serde(default)]
    pub source_prompt: String,
    pub extraction:    Extraction,
}

/// Parse a job document.
pub fn parse_job(text: &str) -> Result<ExtractionJob, GrowthError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_job() {
        let job = parse_job(r#"{"extraction": {"color": {"dominant_rgb": [1, 2, 3]}}}"#).unwrap();
        assert_eq!(job.source_prompt, "");
        assert_eq!(job.extraction.color.and_then(|c| c.dominant_rgb), Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn rejects_missing_extraction() {
        assert!(matches!(parse_job(r#"{"source_prompt": "x"}"#), Err(GrowthError::InvalidJob(_))));
        assert!(parse_job("not json").is_err());
    }
}
