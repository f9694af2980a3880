pub mod azure;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::resource::ResourceIdentity;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("azure error: {0}")]
    Azure(String),
}

/// What the backend answered for a single read. A non-2xx status is a
/// successful call at this layer; only transport failures are errors.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

/// Settings shared by every backend constructor. Populated from CLI flags
/// with environment fallbacks.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub subscription_id: Option<String>,
    pub token: Option<String>,
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            subscription_id: None,
            token: None,
            endpoint: None,
            timeout: azure::DEFAULT_TIMEOUT,
        }
    }
}

#[async_trait]
pub trait AutoscaleBackend: Send + Sync {
    fn name(&self) -> &str;
    /// Fully qualified backend ID for the identity, used in diagnostics.
    fn resource_id(&self, identity: &ResourceIdentity) -> String;
    async fn get(&self, identity: &ResourceIdentity) -> Result<BackendResponse, ProviderError>;
}

pub fn get_provider(
    name: &str,
    config: &BackendConfig,
) -> Result<Box<dyn AutoscaleBackend>, ProviderError> {
    match name {
        "azure" => Ok(Box::new(azure::AzureProvider::from_config(config)?)),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azure_config() -> BackendConfig {
        BackendConfig {
            subscription_id: Some("sub-1".to_string()),
            token: Some("token".to_string()),
            ..BackendConfig::default()
        }
    }

    #[test]
    fn test_get_provider_azure() {
        let provider = get_provider("azure", &azure_config()).unwrap();
        assert_eq!(provider.name(), "azure");
    }

    #[test]
    fn test_get_provider_unknown() {
        let result = get_provider("aws", &azure_config());
        match result {
            Err(ProviderError::UnknownProvider(name)) => assert_eq!(name, "aws"),
            _ => panic!("expected UnknownProvider error"),
        }
    }

    #[test]
    fn test_get_provider_azure_without_token() {
        let config = BackendConfig {
            token: None,
            ..azure_config()
        };
        match get_provider("azure", &config) {
            Err(ProviderError::Auth(msg)) => assert!(msg.contains("ARM_ACCESS_TOKEN")),
            _ => panic!("expected ProviderError::Auth"),
        }
    }

    #[test]
    fn test_get_provider_azure_without_subscription() {
        let config = BackendConfig {
            subscription_id: None,
            ..azure_config()
        };
        match get_provider("azure", &config) {
            Err(ProviderError::Config(msg)) => assert!(msg.contains("ARM_SUBSCRIPTION_ID")),
            _ => panic!("expected ProviderError::Config"),
        }
    }

    #[test]
    fn test_azure_resource_id() {
        let provider = get_provider("azure", &azure_config()).unwrap();
        let identity = ResourceIdentity::new("acctestautoscale-1", "acctestRG-1");
        assert_eq!(
            provider.resource_id(&identity),
            "/subscriptions/sub-1/resourceGroups/acctestRG-1/providers/microsoft.insights/autoscalesettings/acctestautoscale-1"
        );
    }

    #[test]
    fn test_default_config_timeout() {
        assert_eq!(BackendConfig::default().timeout, Duration::from_secs(30));
    }
}
