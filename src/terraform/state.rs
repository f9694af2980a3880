//! Terraform state reader for post-apply assertions.
//!
//! Parses tfstate v4 files, resolves resources by address and flattens their
//! attributes into the `key.N.sub` form used by attribute checks.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const SUPPORTED_STATE_VERSION: u32 = 4;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse state: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(
        "unsupported state version {0}, expected {expected}",
        expected = SUPPORTED_STATE_VERSION
    )]
    UnsupportedVersion(u32),

    #[error("Not found: {0}")]
    ResourceNotFound(String),

    #[error("{0}: resource has no instances in state")]
    NoInstances(String),

    #[error("{address}: attribute '{key}' expected {expected:?}, got {}", display_actual(.actual))]
    AttributeMismatch {
        address: String,
        key: String,
        expected: String,
        actual: Option<String>,
    },

    #[error("{address}: attribute '{key}' found when not expected (value {value:?})")]
    UnexpectedAttribute {
        address: String,
        key: String,
        value: String,
    },
}

fn display_actual(actual: &Option<String>) -> String {
    match actual {
        Some(value) => format!("{:?}", value),
        None => "no value".to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerraformState {
    pub version: u32,
    #[serde(default)]
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub resources: Vec<StateResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateResource {
    #[serde(default)]
    pub module: Option<String>,
    pub mode: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
    #[serde(default)]
    pub instances: Vec<StateInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateInstance {
    #[serde(default)]
    pub index_key: Option<Value>,
    #[serde(default)]
    pub attributes: Value,
}

impl StateResource {
    pub fn address(&self) -> String {
        let local = match self.mode.as_str() {
            "data" => format!("data.{}.{}", self.type_, self.name),
            _ => format!("{}.{}", self.type_, self.name),
        };
        match &self.module {
            Some(module) => format!("{}.{}", module, local),
            None => local,
        }
    }

    pub fn is_root_managed(&self) -> bool {
        self.module.is_none() && self.mode == "managed"
    }

    /// The un-indexed instance, or the first one for counted resources.
    pub fn primary(&self) -> Option<&StateInstance> {
        self.instances
            .iter()
            .find(|i| i.index_key.is_none())
            .or_else(|| self.instances.first())
    }

    pub fn primary_attributes(&self) -> Result<Attributes, StateError> {
        self.primary()
            .map(|instance| Attributes::flatten(&instance.attributes))
            .ok_or_else(|| StateError::NoInstances(self.address()))
    }
}

impl TerraformState {
    pub fn from_json(input: &str) -> Result<Self, StateError> {
        let state: TerraformState = serde_json::from_str(input)?;
        if state.version != SUPPORTED_STATE_VERSION {
            return Err(StateError::UnsupportedVersion(state.version));
        }
        Ok(state)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Root-module lookup by `type.name` or `data.type.name`.
    pub fn resource(&self, address: &str) -> Option<&StateResource> {
        self.resources
            .iter()
            .filter(|r| r.module.is_none())
            .find(|r| r.address() == address)
    }

    pub fn resources_of_type<'a>(
        &'a self,
        type_: &'a str,
    ) -> impl Iterator<Item = &'a StateResource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.is_root_managed() && r.type_ == type_)
    }

    pub fn attributes(&self, address: &str) -> Result<Attributes, StateError> {
        self.resource(address)
            .ok_or_else(|| StateError::ResourceNotFound(address.to_string()))?
            .primary_attributes()
    }

    pub fn check_attr(&self, address: &str, key: &str, expected: &str) -> Result<(), StateError> {
        let attributes = self.attributes(address)?;
        let actual = attributes.get(key);

        // NOTE: an absent collection counter is the same as an empty collection
        if actual.is_none() && expected == "0" && (key.ends_with(".#") || key.ends_with(".%")) {
            return Ok(());
        }

        if actual == Some(expected) {
            return Ok(());
        }

        Err(StateError::AttributeMismatch {
            address: address.to_string(),
            key: key.to_string(),
            expected: expected.to_string(),
            actual: actual.map(str::to_string),
        })
    }

    pub fn check_no_attr(&self, address: &str, key: &str) -> Result<(), StateError> {
        let attributes = self.attributes(address)?;
        match attributes.get(key) {
            None => Ok(()),
            Some(value) if (key.ends_with(".#") || key.ends_with(".%")) && value == "0" => Ok(()),
            Some(value) => Err(StateError::UnexpectedAttribute {
                address: address.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Flattened resource attributes (`profile.0.capacity.0.minimum` = `"1"`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn flatten(value: &Value) -> Self {
        let mut out = BTreeMap::new();
        if let Value::Object(map) = value {
            for (key, value) in map {
                flatten_into(&mut out, key, value);
            }
        }
        Self(out)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), format_number(n));
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Array(items) => {
            out.insert(format!("{}.#", prefix), items.len().to_string());
            for (i, item) in items.iter().enumerate() {
                flatten_into(out, &format!("{}.{}", prefix, i), item);
            }
        }
        Value::Object(map) => {
            out.insert(format!("{}.%", prefix), map.len().to_string());
            for (key, item) in map {
                flatten_into(out, &format!("{}.{}", prefix, key), item);
            }
        }
    }
}

fn format_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
