//! Azure Resource Manager error types

use thiserror::Error;
use vnetflow_cloud::CloudError;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Error body returned by ARM (`{"error": {"code", "message"}}`)
    #[error("({code}) {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A long-running operation ended in `Failed` or `Canceled`
    #[error("Operation {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AzureError>;

impl From<AzureError> for CloudError {
    fn from(err: AzureError) -> Self {
        match err {
            AzureError::NotFound(id) => CloudError::ResourceNotFound(id),
            AzureError::Unauthorized(msg) | AzureError::MissingEnvVar(msg) => {
                CloudError::AuthenticationFailed(msg)
            }
            AzureError::Json(e) => CloudError::Json(e),
            other => CloudError::ApiError(other.to_string()),
        }
    }
}
