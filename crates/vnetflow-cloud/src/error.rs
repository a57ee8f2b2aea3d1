//! Provisioning error types

use thiserror::Error;

/// Errors raised while resolving, normalizing or applying one unit of work
///
/// The message of each variant is what ends up in the `reason` field of a
/// failed record, so keep them short and user-facing.
#[derive(Error, Debug)]
pub enum CloudError {
    /// A required field is missing or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No declared resource group carries this name
    #[error("Subscription ID not found for resource group: {0}")]
    SubscriptionNotFound(String),

    /// A referenced remote entity (VNet, gateway, ...) is not declared
    #[error("Remote reference not found: {0}")]
    RemoteNotFound(String),

    /// The target resource group is absent at the control plane
    #[error("Resource group does not exist")]
    ResourceGroupMissing(String),

    /// The control plane has no resource at this identifier
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The control plane rejected or failed the request
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn missing_field(field: &str, context: impl std::fmt::Display) -> Self {
        CloudError::InvalidConfig(format!("missing field `{}` for {}", field, context))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
