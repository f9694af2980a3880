use std::fmt;

use serde::{Deserialize, Serialize};

/// Terraform resource type verified by this crate.
pub const AUTOSCALE_SETTING_TYPE: &str = "azurerm_autoscale_setting";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceIdentity {
    pub name: String,
    pub resource_group: String,
}

impl ResourceIdentity {
    pub fn new(name: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_group: resource_group.into(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (Resource Group: {:?})", self.name, self.resource_group)
    }
}

/// Outcome of a single backend read.
#[derive(Debug, Clone, PartialEq)]
pub enum ExistenceResult {
    Found { payload: String },
    NotFound,
    Error(ReadFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadFailure {
    /// HTTP status when the backend answered; `None` for transport failures.
    pub status: Option<u16>,
    pub code: Option<String>,
    pub detail: String,
    /// The backend reported that the enclosing resource group or
    /// subscription no longer exists.
    pub parent_missing: bool,
}

impl ExistenceResult {
    pub fn is_found(&self) -> bool {
        matches!(self, ExistenceResult::Found { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExistenceResult::Found { .. } => "found",
            ExistenceResult::NotFound => "not found",
            ExistenceResult::Error(_) => "error",
        }
    }
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.code) {
            (Some(status), Some(code)) => write!(f, "({}) {}: {}", status, code, self.detail),
            (Some(status), None) => write!(f, "({}) {}", status, self.detail),
            (None, _) => write!(f, "{}", self.detail),
        }
    }
}
