//! Lifecycle checks for autoscale settings.
//!
//! Every check reduces a single backend read to [`ExistenceResult`] and then
//! decides pass or fail. Errors never count as proof of existence. The only
//! place an error can pass is the destroy check, where [`DestroyPolicy`]
//! controls whether an unrelated read failure is tolerated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::sleep;

use crate::providers::azure::{
    AutoscaleSettingId, AutoscaleSettingResource, CapacityBounds, CloudError,
};
use crate::providers::{AutoscaleBackend, BackendResponse, ProviderError};
use crate::resource::{AUTOSCALE_SETTING_TYPE, ExistenceResult, ReadFailure, ResourceIdentity};
use crate::terraform::state::{Attributes, StateError, TerraformState};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Bad: AutoScale Setting {identity} does not exist")]
    NotFound { identity: ResourceIdentity },

    #[error("AutoScale Setting {identity} still exists:\n{payload}")]
    StillExists {
        identity: ResourceIdentity,
        payload: String,
    },

    #[error("Bad: Get on AutoScale Setting {identity}: {detail}")]
    Transport {
        identity: ResourceIdentity,
        detail: String,
    },

    #[error(
        "A resource with the ID {id:?} already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for {resource_type:?} for more information."
    )]
    ImportConflict { id: String, resource_type: String },

    #[error("Bad: AutoScale Setting {identity} returned an unreadable payload: {detail}")]
    Malformed {
        identity: ResourceIdentity,
        detail: String,
    },

    #[error("AutoScale Setting {identity}: {detail}")]
    Mismatch {
        identity: ResourceIdentity,
        detail: String,
    },

    #[error("Not found: {0}")]
    NotInState(String),

    #[error("Bad: no name found in state for {0}")]
    MissingName(String),

    #[error("Bad: no resource group found in state for AutoScale Setting: {0}")]
    MissingResourceGroup(String),

    #[error(transparent)]
    State(StateError),
}

impl From<StateError> for VerifyError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::ResourceNotFound(address) => VerifyError::NotInState(address),
            other => VerifyError::State(other),
        }
    }
}

/// How the destroy check treats a read that failed for reasons other than
/// the resource or its parent being gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DestroyPolicy {
    /// The failure does not prove the resource still exists, so the check passes.
    #[default]
    Lenient,
    /// The failure fails the check.
    Strict,
}

pub struct LifecycleVerifier {
    backend: Arc<dyn AutoscaleBackend>,
    policy: DestroyPolicy,
    poll_interval: Duration,
    wait_timeout: Duration,
    wait_on_destroy: bool,
}

impl LifecycleVerifier {
    pub fn new(backend: Arc<dyn AutoscaleBackend>) -> Self {
        Self {
            backend,
            policy: DestroyPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            wait_on_destroy: false,
        }
    }

    pub fn with_destroy_policy(mut self, policy: DestroyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_polling(mut self, poll_interval: Duration, wait_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.wait_timeout = wait_timeout;
        self
    }

    /// Makes [`LifecycleVerifier::check_destroy_all`] poll each setting for
    /// up to `timeout` instead of checking it once.
    pub fn with_destroy_wait(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self.wait_on_destroy = true;
        self
    }

    pub fn destroy_policy(&self) -> DestroyPolicy {
        self.policy
    }

    pub async fn exists(&self, identity: &ResourceIdentity) -> ExistenceResult {
        let result = classify(self.backend.get(identity).await);
        tracing::debug!(
            name = %identity.name,
            resource_group = %identity.resource_group,
            result = result.label(),
            "autoscale setting read"
        );
        result
    }

    pub async fn destroyed(&self, identity: &ResourceIdentity) -> bool {
        self.check_destroyed(identity).await.is_ok()
    }

    pub async fn check_exists(&self, identity: &ResourceIdentity) -> Result<(), VerifyError> {
        match self.exists(identity).await {
            ExistenceResult::Found { .. } => {
                tracing::info!(
                    name = %identity.name,
                    resource_group = %identity.resource_group,
                    "autoscale setting exists"
                );
                Ok(())
            }
            ExistenceResult::NotFound => Err(VerifyError::NotFound {
                identity: identity.clone(),
            }),
            ExistenceResult::Error(failure) => Err(VerifyError::Transport {
                identity: identity.clone(),
                detail: failure.to_string(),
            }),
        }
    }

    pub async fn check_destroyed(&self, identity: &ResourceIdentity) -> Result<(), VerifyError> {
        match self.exists(identity).await {
            ExistenceResult::NotFound => Ok(()),
            ExistenceResult::Found { payload } => Err(VerifyError::StillExists {
                identity: identity.clone(),
                payload,
            }),
            ExistenceResult::Error(failure) if failure.parent_missing => {
                tracing::info!(
                    name = %identity.name,
                    resource_group = %identity.resource_group,
                    detail = %failure,
                    "parent container gone, treating autoscale setting as destroyed"
                );
                Ok(())
            }
            ExistenceResult::Error(failure) => match self.policy {
                DestroyPolicy::Lenient => {
                    tracing::warn!(
                        name = %identity.name,
                        resource_group = %identity.resource_group,
                        detail = %failure,
                        "read failed during destroy check, not treated as still existing"
                    );
                    Ok(())
                }
                DestroyPolicy::Strict => Err(VerifyError::Transport {
                    identity: identity.clone(),
                    detail: failure.to_string(),
                }),
            },
        }
    }

    /// Polls the destroy check until it passes or the wait timeout elapses.
    pub async fn wait_until_destroyed(
        &self,
        identity: &ResourceIdentity,
    ) -> Result<(), VerifyError> {
        let deadline = Instant::now() + self.wait_timeout;

        loop {
            match self.check_destroyed(identity).await {
                Ok(()) => return Ok(()),
                Err(VerifyError::StillExists { .. }) if Instant::now() < deadline => {
                    tracing::debug!(
                        name = %identity.name,
                        resource_group = %identity.resource_group,
                        "autoscale setting still present, polling"
                    );
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    sleep(self.poll_interval.min(remaining)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fails with [`VerifyError::ImportConflict`] when a resource is about to
    /// be declared for an identity the backend already holds.
    pub async fn require_absent(
        &self,
        identity: &ResourceIdentity,
        resource_type: &str,
    ) -> Result<(), VerifyError> {
        match self.exists(identity).await {
            ExistenceResult::NotFound => Ok(()),
            ExistenceResult::Error(failure) if failure.parent_missing => Ok(()),
            ExistenceResult::Found { .. } => Err(VerifyError::ImportConflict {
                id: self.backend.resource_id(identity),
                resource_type: resource_type.to_string(),
            }),
            ExistenceResult::Error(failure) => Err(VerifyError::Transport {
                identity: identity.clone(),
                detail: failure.to_string(),
            }),
        }
    }

    pub async fn read(
        &self,
        identity: &ResourceIdentity,
    ) -> Result<AutoscaleSettingResource, VerifyError> {
        let malformed = |detail: String| VerifyError::Malformed {
            identity: identity.clone(),
            detail,
        };

        match self.exists(identity).await {
            ExistenceResult::Found { payload } => {
                let setting = AutoscaleSettingResource::from_body(&payload)
                    .map_err(|e| malformed(e.to_string()))?;
                if let Some(id) = setting.id.as_deref() {
                    let parsed =
                        AutoscaleSettingId::parse(id).map_err(|e| malformed(e.to_string()))?;
                    if !parsed.describes(identity) {
                        return Err(VerifyError::Mismatch {
                            identity: identity.clone(),
                            detail: format!("backend returned a different setting: {}", id),
                        });
                    }
                }
                Ok(setting)
            }
            ExistenceResult::NotFound => Err(VerifyError::NotFound {
                identity: identity.clone(),
            }),
            ExistenceResult::Error(failure) => Err(VerifyError::Transport {
                identity: identity.clone(),
                detail: failure.to_string(),
            }),
        }
    }

    pub async fn check_capacity(
        &self,
        identity: &ResourceIdentity,
        profile: &str,
        expected: CapacityBounds,
    ) -> Result<(), VerifyError> {
        let setting = self.read(identity).await?;
        let mismatch = |detail: String| VerifyError::Mismatch {
            identity: identity.clone(),
            detail,
        };

        let found = setting
            .profile(profile)
            .ok_or_else(|| mismatch(format!("profile {:?} not found", profile)))?;
        let actual = found
            .capacity
            .bounds()
            .map_err(|e| mismatch(e.to_string()))?;

        if actual != expected {
            return Err(mismatch(format!(
                "profile {:?} capacity expected {:?}, got {:?}",
                profile, expected, actual
            )));
        }
        Ok(())
    }

    pub async fn check_profile_order(
        &self,
        identity: &ResourceIdentity,
        expected: &[&str],
    ) -> Result<(), VerifyError> {
        let setting = self.read(identity).await?;
        let actual = setting.profile_names();
        if actual != expected {
            return Err(VerifyError::Mismatch {
                identity: identity.clone(),
                detail: format!("profiles expected {:?}, got {:?}", expected, actual),
            });
        }
        Ok(())
    }

    pub async fn check_exists_in_state(
        &self,
        state: &TerraformState,
        address: &str,
    ) -> Result<ResourceIdentity, VerifyError> {
        let identity = identity_from_state(state, address)?;
        self.check_exists(&identity).await?;
        Ok(identity)
    }

    /// Runs the destroy check for every autoscale setting recorded in
    /// `state` and returns how many were checked.
    pub async fn check_destroy_all(&self, state: &TerraformState) -> Result<usize, VerifyError> {
        let mut checked = 0;

        for resource in state.resources_of_type(AUTOSCALE_SETTING_TYPE) {
            let address = resource.address();
            let identity = match resource
                .primary_attributes()
                .map_err(VerifyError::from)
                .and_then(|attrs| identity_from_attributes(&address, &attrs))
            {
                Ok(identity) => identity,
                Err(err) if self.policy == DestroyPolicy::Lenient => {
                    tracing::warn!(%address, error = %err, "skipping destroy check");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if self.wait_on_destroy {
                self.wait_until_destroyed(&identity).await?;
            } else {
                self.check_destroyed(&identity).await?;
            }
            checked += 1;
        }

        tracing::info!(checked, "destroy checks passed");
        Ok(checked)
    }
}

pub fn identity_from_state(
    state: &TerraformState,
    address: &str,
) -> Result<ResourceIdentity, VerifyError> {
    let attributes = state.attributes(address)?;
    identity_from_attributes(address, &attributes)
}

fn identity_from_attributes(
    address: &str,
    attributes: &Attributes,
) -> Result<ResourceIdentity, VerifyError> {
    let name = attributes
        .get("name")
        .ok_or_else(|| VerifyError::MissingName(address.to_string()))?;
    let resource_group = attributes
        .get("resource_group_name")
        .ok_or_else(|| VerifyError::MissingResourceGroup(name.to_string()))?;

    Ok(ResourceIdentity::new(name, resource_group))
}

/// 404 is absent, 2xx is present, everything else is an error.
pub fn classify(result: Result<BackendResponse, ProviderError>) -> ExistenceResult {
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            return ExistenceResult::Error(ReadFailure {
                status: None,
                code: None,
                detail: err.to_string(),
                parent_missing: false,
            });
        }
    };

    match response.status {
        200..=299 => ExistenceResult::Found {
            payload: response.body,
        },
        404 => ExistenceResult::NotFound,
        status => {
            let cloud_error = CloudError::from_body(&response.body);
            let parent_missing = cloud_error
                .as_ref()
                .is_some_and(CloudError::is_parent_missing);
            let (code, detail) = match cloud_error {
                Some(e) => (Some(e.error.code), e.error.message),
                None => (None, response.body),
            };

            ExistenceResult::Error(ReadFailure {
                status: Some(status),
                code,
                detail,
                parent_missing,
            })
        }
    }
}
