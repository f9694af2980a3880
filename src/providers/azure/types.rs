use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::AzureError;
use crate::resource::ResourceIdentity;

pub const AUTOSCALE_API_VERSION: &str = "2015-04-01";
pub const AUTOSCALE_PROVIDER_NAMESPACE: &str = "microsoft.insights";
pub const AUTOSCALE_RESOURCE_KIND: &str = "autoscalesettings";

/// ARM error codes meaning the parent container of the setting is gone.
pub const PARENT_MISSING_CODES: &[&str] = &["ResourceGroupNotFound", "SubscriptionNotFound"];

/// Fully qualified ARM ID of an autoscale setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoscaleSettingId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl AutoscaleSettingId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    /// ARM compares resource group and setting names case-insensitively.
    pub fn describes(&self, identity: &ResourceIdentity) -> bool {
        self.name.eq_ignore_ascii_case(&identity.name)
            && self.resource_group.eq_ignore_ascii_case(&identity.resource_group)
    }

    /// Request path for this ID with every segment percent-encoded.
    pub fn request_path(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            urlencoding::encode(&self.subscription_id),
            urlencoding::encode(&self.resource_group),
            AUTOSCALE_PROVIDER_NAMESPACE,
            AUTOSCALE_RESOURCE_KIND,
            urlencoding::encode(&self.name)
        )
    }

    // NOTE: ARM treats segment keys case-insensitively; casing of values is preserved
    pub fn parse(id: &str) -> Result<Self, AzureError> {
        let invalid = |reason: &str| AzureError::InvalidResourceId {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = id.trim_matches('/').split('/').collect();
        if segments.len() != 8 {
            return Err(invalid("expected 8 path segments"));
        }

        let mut pairs = segments.chunks(2).map(|pair| (pair[0], pair[1]));
        let mut expect = |key: &str| -> Result<String, AzureError> {
            match pairs.next() {
                Some((k, v)) if k.eq_ignore_ascii_case(key) && !v.is_empty() => Ok(v.to_string()),
                _ => Err(invalid(&format!("missing {} segment", key))),
            }
        };

        let subscription_id = expect("subscriptions")?;
        let resource_group = expect("resourceGroups")?;
        let namespace = expect("providers")?;
        if !namespace.eq_ignore_ascii_case(AUTOSCALE_PROVIDER_NAMESPACE) {
            return Err(invalid("not a microsoft.insights resource"));
        }
        let name = expect(AUTOSCALE_RESOURCE_KIND)?;

        Ok(Self {
            subscription_id,
            resource_group,
            name,
        })
    }
}

impl fmt::Display for AutoscaleSettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id,
            self.resource_group,
            AUTOSCALE_PROVIDER_NAMESPACE,
            AUTOSCALE_RESOURCE_KIND,
            self.name
        )
    }
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudError {
    pub error: CloudErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl CloudError {
    /// Decodes an ARM error body, tolerating empty or non-JSON payloads.
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    pub fn is_parent_missing(&self) -> bool {
        PARENT_MISSING_CODES
            .iter()
            .any(|code| self.error.code.eq_ignore_ascii_case(code))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleSettingResource {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub properties: AutoscaleSettingProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleSettingProperties {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub target_resource_uri: Option<String>,
    #[serde(default)]
    pub profiles: Vec<ProfileWire>,
    #[serde(default)]
    pub notifications: Vec<NotificationWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileWire {
    pub name: String,
    pub capacity: CapacityWire,
    #[serde(default)]
    pub rules: Vec<RuleWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_date: Option<FixedDateWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceWire>,
}

/// ARM sends capacity numbers as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityWire {
    pub minimum: String,
    pub maximum: String,
    pub default: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityBounds {
    pub minimum: u32,
    pub maximum: u32,
    pub default: u32,
}

impl CapacityWire {
    pub fn bounds(&self) -> Result<CapacityBounds, AzureError> {
        let parse = |field: &str, value: &str| {
            value.trim().parse::<u32>().map_err(|e| AzureError::Parse {
                message: format!("capacity {} '{}': {}", field, value, e),
            })
        };

        Ok(CapacityBounds {
            minimum: parse("minimum", &self.minimum)?,
            maximum: parse("maximum", &self.maximum)?,
            default: parse("default", &self.default)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleWire {
    pub metric_trigger: MetricTriggerWire,
    pub scale_action: ScaleActionWire,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTriggerWire {
    pub metric_name: String,
    pub metric_resource_uri: String,
    pub time_grain: String,
    pub statistic: String,
    pub time_window: String,
    pub time_aggregation: String,
    pub operator: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleActionWire {
    pub direction: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub cooldown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedDateWire {
    #[serde(default)]
    pub time_zone: Option<String>,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceWire {
    pub frequency: String,
    pub schedule: RecurrentScheduleWire,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrentScheduleWire {
    pub time_zone: String,
    pub days: Vec<String>,
    pub hours: Vec<u8>,
    pub minutes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationWire {
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailNotificationWire>,
    #[serde(default)]
    pub webhooks: Vec<WebhookWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailNotificationWire {
    #[serde(default)]
    pub send_to_subscription_administrator: bool,
    #[serde(default)]
    pub send_to_subscription_co_administrators: bool,
    #[serde(default)]
    pub custom_emails: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookWire {
    pub service_uri: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl AutoscaleSettingResource {
    pub fn from_body(body: &str) -> Result<Self, AzureError> {
        serde_json::from_str(body).map_err(|e| AzureError::Parse {
            message: e.to_string(),
        })
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.properties
            .profiles
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn profile(&self, name: &str) -> Option<&ProfileWire> {
        self.properties.profiles.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTING_JSON: &str = r#"{
        "id": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/acctestRG-1/providers/microsoft.insights/autoscalesettings/acctestautoscale-1",
        "name": "acctestautoscale-1",
        "type": "Microsoft.Insights/autoscaleSettings",
        "location": "westeurope",
        "tags": {},
        "properties": {
            "enabled": true,
            "targetResourceUri": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/acctestRG-1/providers/Microsoft.Compute/virtualMachineScaleSets/acctvmss-1",
            "profiles": [
                {
                    "name": "primary",
                    "capacity": {"minimum": "1", "maximum": "30", "default": "1"},
                    "rules": [
                        {
                            "metricTrigger": {
                                "metricName": "Percentage CPU",
                                "metricNamespace": "",
                                "metricResourceUri": "/subscriptions/x/vmss",
                                "timeGrain": "PT1M",
                                "statistic": "Average",
                                "timeWindow": "PT5M",
                                "timeAggregation": "Average",
                                "operator": "GreaterThan",
                                "threshold": 75.0
                            },
                            "scaleAction": {
                                "direction": "Increase",
                                "type": "ChangeCount",
                                "value": "1",
                                "cooldown": "PT1M"
                            }
                        }
                    ]
                },
                {
                    "name": "secondary",
                    "capacity": {"minimum": "1", "maximum": "30", "default": "1"},
                    "rules": [],
                    "recurrence": {
                        "frequency": "Week",
                        "schedule": {
                            "timeZone": "Pacific Standard Time",
                            "days": ["Monday", "Wednesday", "Friday"],
                            "hours": [18],
                            "minutes": [0]
                        }
                    }
                }
            ],
            "notifications": []
        }
    }"#;

    #[test]
    fn test_setting_deserialization_preserves_profile_order() {
        let setting = AutoscaleSettingResource::from_body(SETTING_JSON).unwrap();
        assert_eq!(setting.name, "acctestautoscale-1");
        assert_eq!(setting.properties.enabled, Some(true));
        assert_eq!(setting.profile_names(), vec!["primary", "secondary"]);
    }

    #[test]
    fn test_setting_deserialization_reads_rules_and_recurrence() {
        let setting = AutoscaleSettingResource::from_body(SETTING_JSON).unwrap();
        let primary = setting.profile("primary").unwrap();
        assert_eq!(primary.rules.len(), 1);
        assert_eq!(primary.rules[0].scale_action.direction, "Increase");
        assert_eq!(primary.rules[0].scale_action.value.as_deref(), Some("1"));
        assert!(primary.recurrence.is_none());

        let secondary = setting.profile("secondary").unwrap();
        let schedule = &secondary.recurrence.as_ref().unwrap().schedule;
        assert_eq!(schedule.days, vec!["Monday", "Wednesday", "Friday"]);
        assert_eq!(schedule.hours, vec![18]);
        assert_eq!(schedule.minutes, vec![0]);
    }

    #[test]
    fn test_from_body_rejects_garbage() {
        let result = AutoscaleSettingResource::from_body("not json");
        assert!(matches!(result, Err(AzureError::Parse { .. })));
    }

    #[test]
    fn test_capacity_bounds_parse_strings() {
        let capacity = CapacityWire {
            minimum: "0".to_string(),
            maximum: "400".to_string(),
            default: "0".to_string(),
        };
        assert_eq!(
            capacity.bounds().unwrap(),
            CapacityBounds {
                minimum: 0,
                maximum: 400,
                default: 0
            }
        );
    }

    #[test]
    fn test_capacity_bounds_reject_non_numeric() {
        let capacity = CapacityWire {
            minimum: "one".to_string(),
            maximum: "3".to_string(),
            default: "2".to_string(),
        };
        let err = capacity.bounds().unwrap_err();
        assert!(err.to_string().contains("capacity minimum 'one'"));
    }

    #[test]
    fn test_setting_id_display() {
        let id = AutoscaleSettingId::new("sub-1", "acctestRG-1", "acctestautoscale-1");
        assert_eq!(
            id.to_string(),
            "/subscriptions/sub-1/resourceGroups/acctestRG-1/providers/microsoft.insights/autoscalesettings/acctestautoscale-1"
        );
    }

    #[test]
    fn test_setting_id_parse_is_case_insensitive_on_keys() {
        let id = AutoscaleSettingId::parse(
            "/Subscriptions/sub-1/resourcegroups/acctestRG-1/providers/Microsoft.Insights/autoScaleSettings/acctestautoscale-1",
        )
        .unwrap();
        assert_eq!(id.subscription_id, "sub-1");
        assert_eq!(id.resource_group, "acctestRG-1");
        assert_eq!(id.name, "acctestautoscale-1");
    }

    #[test]
    fn test_request_path_encodes_segments() {
        let id = AutoscaleSettingId::new("sub-1", "rg/other", "scale#1");
        assert_eq!(
            id.request_path(),
            "/subscriptions/sub-1/resourceGroups/rg%2Fother/providers/microsoft.insights/autoscalesettings/scale%231"
        );
    }

    #[test]
    fn test_setting_id_describes_identity_ignoring_case() {
        let id = AutoscaleSettingId::new("sub-1", "ACCTESTRG-1", "acctestautoscale-1");
        assert!(id.describes(&ResourceIdentity::new("acctestautoscale-1", "acctestRG-1")));
        assert!(!id.describes(&ResourceIdentity::new("acctestautoscale-2", "acctestRG-1")));
    }

    #[test]
    fn test_setting_id_parse_rejects_wrong_namespace() {
        let result = AutoscaleSettingId::parse(
            "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Compute/autoscalesettings/x",
        );
        assert!(matches!(result, Err(AzureError::InvalidResourceId { .. })));
    }

    #[test]
    fn test_setting_id_parse_rejects_short_id() {
        let result = AutoscaleSettingId::parse("/subscriptions/sub-1/resourceGroups/rg");
        assert!(matches!(result, Err(AzureError::InvalidResourceId { .. })));
    }

    #[test]
    fn test_cloud_error_parent_missing() {
        let err = CloudError::from_body(
            r#"{"error": {"code": "ResourceGroupNotFound", "message": "Resource group 'rg' could not be found."}}"#,
        )
        .unwrap();
        assert!(err.is_parent_missing());
    }

    #[test]
    fn test_cloud_error_other_code_is_not_parent_missing() {
        let err = CloudError::from_body(
            r#"{"error": {"code": "AuthorizationFailed", "message": "denied"}}"#,
        )
        .unwrap();
        assert!(!err.is_parent_missing());
    }

    #[test]
    fn test_cloud_error_from_empty_body() {
        assert!(CloudError::from_body("").is_none());
    }
}
