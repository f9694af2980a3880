mod client;
mod error;
mod types;

pub use client::{AutoscaleSettingsClient, DEFAULT_TIMEOUT, RawResponse};
pub use error::AzureError;
pub use types::{
    AutoscaleSettingId, AutoscaleSettingResource, CapacityBounds, CapacityWire, CloudError,
    NotificationWire, ProfileWire, RuleWire,
};

use async_trait::async_trait;

use super::{AutoscaleBackend, BackendConfig, BackendResponse, ProviderError};
use crate::resource::ResourceIdentity;

#[derive(Debug, Clone)]
pub struct AzureProvider {
    client: AutoscaleSettingsClient,
}

impl AzureProvider {
    pub fn new(client: AutoscaleSettingsClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ProviderError> {
        let token = config.token.as_deref().ok_or_else(|| {
            ProviderError::Auth(
                "No access token provided. Set ARM_ACCESS_TOKEN or use --token flag".to_string(),
            )
        })?;

        let subscription_id = config.subscription_id.clone().ok_or_else(|| {
            ProviderError::Config(
                "No subscription provided. Set ARM_SUBSCRIPTION_ID or use --subscription flag"
                    .to_string(),
            )
        })?;

        let client = match &config.endpoint {
            Some(endpoint) => AutoscaleSettingsClient::with_base_url(
                token,
                subscription_id,
                endpoint.clone(),
                config.timeout,
            )?,
            None => AutoscaleSettingsClient::new(token, subscription_id, config.timeout)?,
        };

        Ok(Self::new(client))
    }
}

#[async_trait]
impl AutoscaleBackend for AzureProvider {
    fn name(&self) -> &str {
        "azure"
    }

    fn resource_id(&self, identity: &ResourceIdentity) -> String {
        self.client
            .setting_id(&identity.resource_group, &identity.name)
            .to_string()
    }

    async fn get(&self, identity: &ResourceIdentity) -> Result<BackendResponse, ProviderError> {
        let raw = self
            .client
            .get_raw(&identity.resource_group, &identity.name)
            .await?;

        tracing::debug!(
            name = %identity.name,
            resource_group = %identity.resource_group,
            status = raw.status,
            "autoscale setting read"
        );

        Ok(BackendResponse {
            status: raw.status,
            body: raw.body,
        })
    }
}
