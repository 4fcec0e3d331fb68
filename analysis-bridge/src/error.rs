//! Error types shared by the dispatcher, the store and the HTTP handlers.

use thiserror::Error;

/// Failure talking to the policy analysis service.
#[derive(Debug, Error)]
pub enum AnalysisApiError {
    #[error("invalid analysis API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analysis API error: {status} - {body}")]
    Status { status: u16, body: String },
}

/// Failure reading or seeding the policy store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read policy seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse policy seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure preparing or sending a policy for analysis.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Policy not found")]
    PolicyNotFound,

    #[error("Policy has no attached file to analyze")]
    NoFile,

    #[error("Policy file path is not a plain object path: {0}")]
    InvalidStoragePath(String),

    #[error("Analysis is already in progress for this policy")]
    AlreadyInProgress,

    #[error("invalid file URL: {0}")]
    FileUrl(#[from] url::ParseError),

    #[error(transparent)]
    Api(#[from] AnalysisApiError),
}
