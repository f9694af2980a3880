//! scalecheck - autoscale setting lifecycle verification
//!
//! A library for confirming that Azure autoscale settings exist after apply,
//! carry the expected attributes, and are gone after destroy.

pub mod checks;
pub mod fixtures;
pub mod output;
pub mod providers;
pub mod resource;
pub mod terraform;
pub mod verifier;

mod error;

pub use error::ScalecheckError;
pub use providers::azure::{AutoscaleSettingsClient, AzureError, AzureProvider};
pub use providers::{AutoscaleBackend, BackendConfig, get_provider};
pub use resource::{ExistenceResult, ResourceIdentity};
pub use verifier::{DestroyPolicy, LifecycleVerifier, VerifyError};
