/// Error taxonomy shared by the record store and the execution pipeline
///
/// Every stage failure is reported as exactly one of these kinds. The payload
/// carries the underlying cause for server-side logs only; the HTTP layer
/// decides what the client sees.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required input field missing or empty
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown workflow id
    #[error("Workflow not found: {0}")]
    NotFound(i64),

    /// Remote content retrieval did not complete with a success status
    #[error("Failed to fetch content: {0}")]
    Fetch(String),

    /// Fetched document had no visible text
    #[error("No content found at {0}")]
    EmptyContent(String),

    /// Generation backend call failed (quota, bad request, timeout, network)
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Record store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    /// Short machine-readable kind, used in logs and tests
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Fetch(_) => "fetch",
            Self::EmptyContent(_) => "empty_content",
            Self::Generation(_) => "generation",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
