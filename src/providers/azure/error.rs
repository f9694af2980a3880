use thiserror::Error;

/// Azure Resource Manager errors that can occur while reading autoscale settings.
///
/// SECURITY: Error messages must NEVER contain the bearer token.
#[derive(Debug, Error)]
pub enum AzureError {
    /// The token could not be turned into an authorization header
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// ARM answered with a non-success status that was not expected by the caller
    #[error("ARM error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Network-level error (connection refused, TLS, body decode)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request exceeded the configured per-call deadline
    #[error("request timed out after {seconds}s: {url}")]
    Timeout { seconds: u64, url: String },

    /// Payload did not match the autoscale setting schema
    #[error("failed to parse autoscale setting: {message}")]
    Parse { message: String },

    /// An ARM resource ID did not have the autoscale setting shape
    #[error("invalid autoscale setting ID '{id}': {reason}")]
    InvalidResourceId { id: String, reason: String },
}

impl From<AzureError> for crate::providers::ProviderError {
    fn from(err: AzureError) -> Self {
        match err {
            AzureError::Auth { message } => crate::providers::ProviderError::Auth(message),
            other => crate::providers::ProviderError::Azure(other.to_string()),
        }
    }
}
