//! Typed `azurerm_autoscale_setting` configuration and its HCL rendering.
//!
//! The renderer emits one block per line group with `=` aligned inside each
//! block, which is the layout `terraform fmt` produces for these files.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::resource::AUTOSCALE_SETTING_TYPE;

/// Renders `address` as a Terraform interpolation.
pub fn reference(address: &str) -> String {
    format!("${{{}}}", address)
}

#[derive(Debug, Clone, PartialEq)]
pub enum HclValue {
    Str(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    List(Vec<HclValue>),
    Map(BTreeMap<String, String>),
}

impl HclValue {
    pub fn str(value: impl Into<String>) -> Self {
        HclValue::Str(value.into())
    }

    pub fn render(&self) -> String {
        match self {
            HclValue::Str(s) => quote(s),
            HclValue::Int(i) => i.to_string(),
            HclValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            HclValue::Number(n) => n.to_string(),
            HclValue::Bool(b) => b.to_string(),
            HclValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(HclValue::render).collect();
                format!("[{}]", rendered.join(", "))
            }
            HclValue::Map(map) if map.is_empty() => "{}".to_string(),
            HclValue::Map(map) => {
                let rendered: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, quote(v)))
                    .collect();
                format!("{{ {} }}", rendered.join(", "))
            }
        }
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[derive(Debug, Clone, PartialEq)]
pub struct HclBlock {
    header: String,
    attributes: Vec<(String, HclValue)>,
    blocks: Vec<HclBlock>,
}

impl HclBlock {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            attributes: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn resource(type_: &str, label: &str) -> Self {
        Self::new(format!("resource {} {}", quote(type_), quote(label)))
    }

    pub fn attr(mut self, key: &str, value: HclValue) -> Self {
        self.attributes.push((key.to_string(), value));
        self
    }

    pub fn block(mut self, block: HclBlock) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn blocks(mut self, blocks: impl IntoIterator<Item = HclBlock>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{}{} {{\n", indent, self.header));

        let width = self
            .attributes
            .iter()
            .map(|(k, _)| k.len())
            .max()
            .unwrap_or(0);
        for (key, value) in &self.attributes {
            out.push_str(&format!(
                "{}  {:<width$} = {}\n",
                indent,
                key,
                value.render(),
                width = width
            ));
        }

        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 || !self.attributes.is_empty() {
                out.push('\n');
            }
            block.write(out, depth + 1);
        }

        out.push_str(&format!("{}}}\n", indent));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub minimum: u32,
    pub maximum: u32,
    pub default: u32,
}

impl Capacity {
    pub fn new(minimum: u32, maximum: u32, default: u32) -> Self {
        Self {
            minimum,
            maximum,
            default,
        }
    }

    fn to_block(self) -> HclBlock {
        HclBlock::new("capacity")
            .attr("default", HclValue::Int(self.default.into()))
            .attr("minimum", HclValue::Int(self.minimum.into()))
            .attr("maximum", HclValue::Int(self.maximum.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    ChangeCount,
    ExactCount,
    PercentChangeCount,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Equals => "Equals",
            Operator::NotEquals => "NotEquals",
            Operator::GreaterThan => "GreaterThan",
            Operator::GreaterThanOrEqual => "GreaterThanOrEqual",
            Operator::LessThan => "LessThan",
            Operator::LessThanOrEqual => "LessThanOrEqual",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Increase => "Increase",
            Direction::Decrease => "Decrease",
        })
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeType::ChangeCount => "ChangeCount",
            ChangeType::ExactCount => "ExactCount",
            ChangeType::PercentChangeCount => "PercentChangeCount",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricTrigger {
    pub metric_name: String,
    pub metric_resource_id: String,
    pub time_grain: String,
    pub statistic: String,
    pub time_window: String,
    pub time_aggregation: String,
    pub operator: Operator,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleAction {
    pub direction: Direction,
    pub change_type: ChangeType,
    pub value: u32,
    pub cooldown: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub metric_trigger: MetricTrigger,
    pub scale_action: ScaleAction,
}

impl Rule {
    fn to_block(&self) -> HclBlock {
        let trigger = &self.metric_trigger;
        let action = &self.scale_action;

        HclBlock::new("rule")
            .block(
                HclBlock::new("metric_trigger")
                    .attr("metric_name", HclValue::str(&trigger.metric_name))
                    .attr("metric_resource_id", HclValue::str(&trigger.metric_resource_id))
                    .attr("time_grain", HclValue::str(&trigger.time_grain))
                    .attr("statistic", HclValue::str(&trigger.statistic))
                    .attr("time_window", HclValue::str(&trigger.time_window))
                    .attr("time_aggregation", HclValue::str(&trigger.time_aggregation))
                    .attr("operator", HclValue::str(trigger.operator.to_string()))
                    .attr("threshold", HclValue::Number(trigger.threshold)),
            )
            .block(
                HclBlock::new("scale_action")
                    .attr("direction", HclValue::str(action.direction.to_string()))
                    .attr("type", HclValue::str(action.change_type.to_string()))
                    .attr("value", HclValue::Int(action.value.into()))
                    .attr("cooldown", HclValue::str(&action.cooldown)),
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    pub timezone: String,
    pub days: Vec<String>,
    pub hours: Vec<u8>,
    pub minutes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedDate {
    pub timezone: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A profile runs either on a weekly recurrence or inside a fixed window,
/// never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    Recurrence(Recurrence),
    FixedDate(FixedDate),
}

impl Schedule {
    fn to_block(&self) -> HclBlock {
        match self {
            Schedule::Recurrence(r) => {
                let small = |values: &[u8]| {
                    HclValue::List(values.iter().map(|v| HclValue::Int((*v).into())).collect())
                };
                HclBlock::new("recurrence")
                    .attr("timezone", HclValue::str(&r.timezone))
                    .attr(
                        "days",
                        HclValue::List(r.days.iter().map(HclValue::str).collect()),
                    )
                    .attr("hours", small(&r.hours))
                    .attr("minutes", small(&r.minutes))
            }
            Schedule::FixedDate(d) => HclBlock::new("fixed_date")
                .attr("timezone", HclValue::str(&d.timezone))
                .attr(
                    "start",
                    HclValue::str(d.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                )
                .attr(
                    "end",
                    HclValue::str(d.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub capacity: Capacity,
    pub rules: Vec<Rule>,
    pub schedule: Option<Schedule>,
}

impl Profile {
    pub fn new(name: impl Into<String>, capacity: Capacity) -> Self {
        Self {
            name: name.into(),
            capacity,
            rules: Vec::new(),
            schedule: None,
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    fn to_block(&self) -> HclBlock {
        HclBlock::new("profile")
            .attr("name", HclValue::str(&self.name))
            .block(self.capacity.to_block())
            .blocks(self.rules.iter().map(Rule::to_block))
            .blocks(self.schedule.iter().map(Schedule::to_block))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailNotification {
    pub send_to_subscription_administrator: bool,
    pub send_to_subscription_co_administrator: bool,
    pub custom_emails: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Webhook {
    pub service_uri: String,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notification {
    pub email: Option<EmailNotification>,
    pub webhooks: Vec<Webhook>,
}

impl Notification {
    fn to_block(&self) -> HclBlock {
        let email = self.email.as_ref().map(|e| {
            let block = HclBlock::new("email")
                .attr(
                    "send_to_subscription_administrator",
                    HclValue::Bool(e.send_to_subscription_administrator),
                )
                .attr(
                    "send_to_subscription_co_administrator",
                    HclValue::Bool(e.send_to_subscription_co_administrator),
                );
            if e.custom_emails.is_empty() {
                block
            } else {
                block.attr(
                    "custom_emails",
                    HclValue::List(e.custom_emails.iter().map(HclValue::str).collect()),
                )
            }
        });

        let webhooks = self.webhooks.iter().map(|w| {
            let block = HclBlock::new("webhook").attr("service_uri", HclValue::str(&w.service_uri));
            if w.properties.is_empty() {
                block
            } else {
                block.attr("properties", HclValue::Map(w.properties.clone()))
            }
        });

        HclBlock::new("notification").blocks(email).blocks(webhooks)
    }
}

/// One `azurerm_autoscale_setting` resource. String fields are emitted
/// verbatim, so they may hold interpolations built with [`reference`].
#[derive(Debug, Clone, PartialEq)]
pub struct AutoscaleSettingConfig {
    pub label: String,
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub target_resource_id: String,
    pub enabled: Option<bool>,
    pub profiles: Vec<Profile>,
    pub notification: Option<Notification>,
}

impl AutoscaleSettingConfig {
    pub fn address(&self) -> String {
        format!("{}.{}", AUTOSCALE_SETTING_TYPE, self.label)
    }

    pub fn to_block(&self) -> HclBlock {
        let mut block = HclBlock::resource(AUTOSCALE_SETTING_TYPE, &self.label)
            .attr("name", HclValue::str(&self.name))
            .attr("resource_group_name", HclValue::str(&self.resource_group_name))
            .attr("location", HclValue::str(&self.location))
            .attr("target_resource_id", HclValue::str(&self.target_resource_id));

        if let Some(enabled) = self.enabled {
            block = block.attr("enabled", HclValue::Bool(enabled));
        }

        block
            .blocks(self.profiles.iter().map(Profile::to_block))
            .blocks(self.notification.iter().map(Notification::to_block))
    }

    pub fn render(&self) -> String {
        self.to_block().render()
    }
}

/// Resource group, network and scale set the autoscale setting targets.
#[derive(Debug, Clone, PartialEq)]
pub struct InfrastructureTemplate {
    pub random_integer: u64,
    pub location: String,
}

impl InfrastructureTemplate {
    pub const RESOURCE_GROUP: &'static str = "azurerm_resource_group.test";
    pub const SCALE_SET: &'static str = "azurerm_virtual_machine_scale_set.test";

    pub fn resource_group_attr(attribute: &str) -> String {
        reference(&format!("{}.{}", Self::RESOURCE_GROUP, attribute))
    }

    pub fn scale_set_attr(attribute: &str) -> String {
        reference(&format!("{}.{}", Self::SCALE_SET, attribute))
    }

    pub fn resource_group_name(&self) -> String {
        format!("acctestRG-{}", self.random_integer)
    }

    pub fn render(&self) -> String {
        let ri = self.random_integer;
        let rg_name = Self::resource_group_attr("name");
        let rg_location = Self::resource_group_attr("location");

        let resource_group = HclBlock::resource("azurerm_resource_group", "test")
            .attr("name", HclValue::str(self.resource_group_name()))
            .attr("location", HclValue::str(&self.location));

        let network = HclBlock::resource("azurerm_virtual_network", "test")
            .attr("name", HclValue::str(format!("acctvn-{}", ri)))
            .attr(
                "address_space",
                HclValue::List(vec![HclValue::str("10.0.0.0/16")]),
            )
            .attr("location", HclValue::str(&rg_location))
            .attr("resource_group_name", HclValue::str(&rg_name));

        let subnet = HclBlock::resource("azurerm_subnet", "test")
            .attr("name", HclValue::str("internal"))
            .attr("resource_group_name", HclValue::str(&rg_name))
            .attr(
                "virtual_network_name",
                HclValue::str(reference("azurerm_virtual_network.test.name")),
            )
            .attr("address_prefix", HclValue::str("10.0.2.0/24"));

        let scale_set = HclBlock::resource("azurerm_virtual_machine_scale_set", "test")
            .attr("name", HclValue::str(format!("acctvmss-{}", ri)))
            .attr("location", HclValue::str(&rg_location))
            .attr("resource_group_name", HclValue::str(&rg_name))
            .attr("upgrade_policy_mode", HclValue::str("Automatic"))
            .attr("single_placement_group", HclValue::str("false"))
            .block(
                HclBlock::new("sku")
                    .attr("name", HclValue::str("Standard_DS1_v2"))
                    .attr("tier", HclValue::str("Standard"))
                    .attr("capacity", HclValue::Int(30)),
            )
            .block(
                HclBlock::new("os_profile")
                    .attr("computer_name_prefix", HclValue::str(format!("testvm-{}", ri)))
                    .attr("admin_username", HclValue::str("myadmin"))
                    .attr("admin_password", HclValue::str("Passwword1234")),
            )
            .block(
                HclBlock::new("network_profile")
                    .attr("name", HclValue::str(format!("TestNetworkProfile-{}", ri)))
                    .attr("primary", HclValue::Bool(true))
                    .block(
                        HclBlock::new("ip_configuration")
                            .attr("name", HclValue::str("TestIPConfiguration"))
                            .attr("subnet_id", HclValue::str(reference("azurerm_subnet.test.id")))
                            .attr("primary", HclValue::Bool(true)),
                    ),
            )
            .block(
                HclBlock::new("storage_profile_os_disk")
                    .attr("name", HclValue::str(""))
                    .attr("caching", HclValue::str("ReadWrite"))
                    .attr("create_option", HclValue::str("FromImage"))
                    .attr("managed_disk_type", HclValue::str("StandardSSD_LRS")),
            )
            .block(
                HclBlock::new("storage_profile_image_reference")
                    .attr("publisher", HclValue::str("Canonical"))
                    .attr("offer", HclValue::str("UbuntuServer"))
                    .attr("sku", HclValue::str("16.04-LTS"))
                    .attr("version", HclValue::str("latest")),
            );

        [resource_group, network, subnet, scale_set]
            .iter()
            .map(HclBlock::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cpu_rule(direction: Direction) -> Rule {
        Rule {
            metric_trigger: MetricTrigger {
                metric_name: "Percentage CPU".to_string(),
                metric_resource_id: reference("azurerm_virtual_machine_scale_set.test.id"),
                time_grain: "PT1M".to_string(),
                statistic: "Average".to_string(),
                time_window: "PT5M".to_string(),
                time_aggregation: "Average".to_string(),
                operator: Operator::GreaterThan,
                threshold: 75.0,
            },
            scale_action: ScaleAction {
                direction,
                change_type: ChangeType::ChangeCount,
                value: 1,
                cooldown: "PT1M".to_string(),
            },
        }
    }

    fn setting(profiles: Vec<Profile>) -> AutoscaleSettingConfig {
        AutoscaleSettingConfig {
            label: "test".to_string(),
            name: "acctestautoscale-1".to_string(),
            resource_group_name: reference("azurerm_resource_group.test.name"),
            location: reference("azurerm_resource_group.test.location"),
            target_resource_id: reference("azurerm_virtual_machine_scale_set.test.id"),
            enabled: None,
            profiles,
            notification: None,
        }
    }

    #[test]
    fn test_reference_renders_interpolation() {
        assert_eq!(
            reference("azurerm_resource_group.test.name"),
            "${azurerm_resource_group.test.name}"
        );
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(HclValue::str("a\"b").render(), r#""a\"b""#);
        assert_eq!(HclValue::Number(75.0).render(), "75");
        assert_eq!(HclValue::Number(2.5).render(), "2.5");
        assert_eq!(
            HclValue::List(vec![HclValue::Int(18), HclValue::Int(20)]).render(),
            "[18, 20]"
        );
        let mut map = BTreeMap::new();
        map.insert("env".to_string(), "test".to_string());
        assert_eq!(HclValue::Map(map).render(), r#"{ env = "test" }"#);
        assert_eq!(HclValue::Map(BTreeMap::new()).render(), "{}");
    }

    #[test]
    fn test_block_aligns_attributes() {
        let rendered = Capacity::new(1, 30, 1).to_block().render();
        assert_eq!(
            rendered,
            "capacity {\n  default = 1\n  minimum = 1\n  maximum = 30\n}\n"
        );
    }

    #[test]
    fn test_basic_setting_rendering() {
        let profile = Profile::new("metricRules", Capacity::new(1, 30, 1))
            .with_rule(cpu_rule(Direction::Increase));
        let rendered = setting(vec![profile]).render();

        assert!(rendered.starts_with("resource \"azurerm_autoscale_setting\" \"test\" {\n"));
        assert!(rendered.contains("  name                = \"acctestautoscale-1\"\n"));
        assert!(rendered.contains(
            "  resource_group_name = \"${azurerm_resource_group.test.name}\"\n"
        ));
        assert!(rendered.contains("        direction = \"Increase\"\n"));
        assert!(rendered.contains("        threshold          = 75\n"));
        assert!(!rendered.contains("enabled"));
        assert!(!rendered.contains("notification"));
    }

    #[test]
    fn test_enabled_flag_rendered_when_set() {
        let mut config = setting(vec![Profile::new("metricRules", Capacity::new(1, 3, 2))]);
        config.enabled = Some(false);
        assert!(config.render().contains("  enabled             = false\n"));
    }

    #[test]
    fn test_profiles_render_in_order() {
        let rendered = setting(vec![
            Profile::new("primary", Capacity::new(1, 30, 1)),
            Profile::new("secondary", Capacity::new(1, 30, 1)),
        ])
        .render();
        let primary = rendered.find("\"primary\"").unwrap();
        let secondary = rendered.find("\"secondary\"").unwrap();
        assert!(primary < secondary);
    }

    #[test]
    fn test_recurrence_rendering() {
        let profile = Profile::new("recurrence", Capacity::new(1, 30, 1)).with_schedule(
            Schedule::Recurrence(Recurrence {
                timezone: "Pacific Standard Time".to_string(),
                days: vec!["Monday".to_string(), "Wednesday".to_string()],
                hours: vec![18],
                minutes: vec![0],
            }),
        );
        let rendered = setting(vec![profile]).render();
        assert!(rendered.contains("    recurrence {\n"));
        assert!(rendered.contains("      days     = [\"Monday\", \"Wednesday\"]\n"));
        assert!(rendered.contains("      hours    = [18]\n"));
        assert!(!rendered.contains("fixed_date"));
    }

    #[test]
    fn test_fixed_date_rendering() {
        let profile = Profile::new("fixedDate", Capacity::new(1, 30, 1)).with_schedule(
            Schedule::FixedDate(FixedDate {
                timezone: "Pacific Standard Time".to_string(),
                start: Utc.with_ymd_and_hms(2020, 6, 18, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2020, 6, 18, 23, 59, 59).unwrap(),
            }),
        );
        let rendered = setting(vec![profile]).render();
        assert!(rendered.contains("      start    = \"2020-06-18T00:00:00Z\"\n"));
        assert!(rendered.contains("      end      = \"2020-06-18T23:59:59Z\"\n"));
        assert!(!rendered.contains("recurrence"));
    }

    #[test]
    fn test_notification_rendering() {
        let mut config = setting(vec![]);
        let mut properties = BTreeMap::new();
        properties.insert("source".to_string(), "scalecheck".to_string());
        config.notification = Some(Notification {
            email: Some(EmailNotification {
                send_to_subscription_administrator: false,
                send_to_subscription_co_administrator: false,
                custom_emails: vec!["acctest1-1@example.com".to_string()],
            }),
            webhooks: vec![Webhook {
                service_uri: "https://example.com/hook".to_string(),
                properties,
            }],
        });

        let rendered = config.render();
        assert!(rendered.contains(
            "      custom_emails                         = [\"acctest1-1@example.com\"]\n"
        ));
        assert!(rendered.contains("    webhook {\n"));
        assert!(rendered.contains("      properties  = { source = \"scalecheck\" }\n"));
    }

    #[test]
    fn test_email_without_custom_emails_omits_list() {
        let mut config = setting(vec![]);
        config.notification = Some(Notification {
            email: Some(EmailNotification::default()),
            webhooks: vec![],
        });
        assert!(!config.render().contains("custom_emails"));
    }

    #[test]
    fn test_address() {
        assert_eq!(setting(vec![]).address(), "azurerm_autoscale_setting.test");
    }

    #[test]
    fn test_template_rendering() {
        let template = InfrastructureTemplate {
            random_integer: 42,
            location: "westeurope".to_string(),
        };
        let rendered = template.render();
        assert!(rendered.contains("  name     = \"acctestRG-42\"\n"));
        assert!(rendered.contains("  location = \"westeurope\"\n"));
        assert!(rendered.contains("resource \"azurerm_virtual_machine_scale_set\" \"test\" {"));
        assert!(rendered.contains("    computer_name_prefix = \"testvm-42\"\n"));
        assert!(rendered.contains("      subnet_id = \"${azurerm_subnet.test.id}\"\n"));
    }

    #[test]
    fn test_template_references() {
        assert_eq!(
            InfrastructureTemplate::scale_set_attr("id"),
            "${azurerm_virtual_machine_scale_set.test.id}"
        );
        assert_eq!(
            InfrastructureTemplate::resource_group_attr("name"),
            "${azurerm_resource_group.test.name}"
        );
    }
}
