use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use super::AzureError;
use super::types::{AUTOSCALE_API_VERSION, AutoscaleSettingId, AutoscaleSettingResource, CloudError};

const ARM_API_BASE: &str = "https://management.azure.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and raw body of a single ARM read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn cloud_error(&self) -> Option<CloudError> {
        CloudError::from_body(&self.body)
    }
}

#[derive(Clone)]
pub struct AutoscaleSettingsClient {
    client: reqwest::Client,
    subscription_id: String,
    base_url: String,
    timeout: Duration,
}

impl AutoscaleSettingsClient {
    pub fn new(
        token: &str,
        subscription_id: String,
        timeout: Duration,
    ) -> Result<Self, AzureError> {
        Self::with_base_url(token, subscription_id, ARM_API_BASE.to_string(), timeout)
    }

    /// NOTE: Primarily used for testing with mock servers.
    pub fn with_base_url(
        token: &str,
        subscription_id: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, AzureError> {
        let mut headers = HeaderMap::new();
        let header_value =
            HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| AzureError::Auth {
                message: "Invalid token format".to_string(),
            })?;
        headers.insert(AUTHORIZATION, header_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(AzureError::Network)?;

        Ok(Self {
            client,
            subscription_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn setting_id(&self, resource_group: &str, name: &str) -> AutoscaleSettingId {
        AutoscaleSettingId::new(self.subscription_id.clone(), resource_group, name)
    }

    fn setting_url(&self, resource_group: &str, name: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.base_url,
            self.setting_id(resource_group, name).request_path(),
            AUTOSCALE_API_VERSION
        )
    }

    /// Issues the read and returns whatever ARM answered. Only transport
    /// failures are errors here; status interpretation belongs to the caller.
    pub async fn get_raw(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<RawResponse, AzureError> {
        let url = self.setting_url(resource_group, name);
        tracing::debug!(%url, "reading autoscale setting");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e, &url))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e, &url))?;

        Ok(RawResponse { status, body })
    }

    pub async fn get_setting(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<AutoscaleSettingResource, AzureError> {
        let raw = self.get_raw(resource_group, name).await?;

        if !raw.is_success() {
            let (code, message) = raw
                .cloud_error()
                .map(|e| (e.error.code, e.error.message))
                .unwrap_or_else(|| ("Unknown".to_string(), raw.body.clone()));
            return Err(AzureError::Api {
                status: raw.status,
                code,
                message,
            });
        }

        AutoscaleSettingResource::from_body(&raw.body)
    }

    fn classify(&self, err: reqwest::Error, url: &str) -> AzureError {
        if err.is_timeout() {
            AzureError::Timeout {
                seconds: self.timeout.as_secs(),
                url: url.to_string(),
            }
        } else {
            AzureError::Network(err)
        }
    }
}

impl std::fmt::Debug for AutoscaleSettingsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoscaleSettingsClient")
            .field("subscription_id", &self.subscription_id)
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
