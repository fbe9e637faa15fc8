use crate::llm::Provider;
use std::fmt;

/// Named stages of response recovery, so a failure says where recovery gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStage {
    DelimiterScan,
    Repair,
    SchemaProjection,
    ItemProjection,
}

impl ExtractStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractStage::DelimiterScan => "delimiter_scan",
            ExtractStage::Repair => "repair",
            ExtractStage::SchemaProjection => "schema_projection",
            ExtractStage::ItemProjection => "item_projection",
        }
    }
}

impl fmt::Display for ExtractStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid planning request: {0}")]
    InvalidRequest(String),

    #[error("oracle error (provider={provider}, stage={stage}): {detail}")]
    Oracle {
        provider: Provider,
        stage: &'static str,
        detail: String,
        raw_output: Option<String>,
    },

    #[error("malformed oracle response (stage={stage}): {detail}")]
    MalformedResponse {
        stage: ExtractStage,
        detail: String,
        raw_output: String,
    },

    #[error("run cancelled while awaiting the oracle")]
    Cancelled,
}

impl PipelineError {
    pub fn malformed(stage: ExtractStage, detail: impl Into<String>, raw_output: &str) -> Self {
        PipelineError::MalformedResponse {
            stage,
            detail: detail.into(),
            raw_output: raw_output.to_string(),
        }
    }

    /// Raw oracle text attached to the error, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            PipelineError::Oracle { raw_output, .. } => raw_output.as_deref(),
            PipelineError::MalformedResponse { raw_output, .. } => Some(raw_output),
            _ => None,
        }
    }
}
