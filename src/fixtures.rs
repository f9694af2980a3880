//! Configuration fixtures for the autoscale setting acceptance scenarios.
//!
//! Every fixture renders the shared infrastructure template followed by one
//! `azurerm_autoscale_setting` block named after the run's random integer.

use chrono::{TimeZone, Utc};

use crate::resource::{AUTOSCALE_SETTING_TYPE, ResourceIdentity};
use crate::terraform::config::{
    AutoscaleSettingConfig, Capacity, ChangeType, Direction, EmailNotification, FixedDate,
    InfrastructureTemplate, MetricTrigger, Notification, Operator, Profile, Recurrence, Rule,
    ScaleAction, Schedule, reference,
};

pub const DEFAULT_LOCATION: &str = "westeurope";
pub const SCHEDULE_TIMEZONE: &str = "Pacific Standard Time";

const SETTING_NAME_PREFIX: &str = "acctestautoscale-";

/// Per-run naming data. Identities derived from it are unique per run so
/// parallel scenarios never share backend resources.
#[derive(Debug, Clone, PartialEq)]
pub struct TestData {
    pub random_integer: u64,
    pub location: String,
    pub label: String,
}

impl TestData {
    pub fn new(location: impl Into<String>) -> Self {
        Self::with_random_integer(random_integer(), location)
    }

    pub fn with_random_integer(random_integer: u64, location: impl Into<String>) -> Self {
        Self {
            random_integer,
            location: location.into(),
            label: "test".to_string(),
        }
    }

    /// Recovers the run's data from a setting name produced by
    /// [`TestData::setting_name`].
    pub fn from_setting_name(name: &str, location: impl Into<String>) -> Option<Self> {
        let random_integer = name.strip_prefix(SETTING_NAME_PREFIX)?.parse().ok()?;
        Some(Self::with_random_integer(random_integer, location))
    }

    pub fn resource_name(&self) -> String {
        format!("{}.{}", AUTOSCALE_SETTING_TYPE, self.label)
    }

    pub fn setting_name(&self) -> String {
        format!("{}{}", SETTING_NAME_PREFIX, self.random_integer)
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(self.setting_name(), self.template().resource_group_name())
    }

    pub fn template(&self) -> InfrastructureTemplate {
        InfrastructureTemplate {
            random_integer: self.random_integer,
            location: self.location.clone(),
        }
    }

    pub fn custom_email(&self, n: u32) -> String {
        format!("acctest{}-{}@example.com", n, self.random_integer)
    }
}

/// `yyMMddHHmmss` in UTC followed by three random digits.
pub fn random_integer() -> u64 {
    let stamp: u64 = Utc::now()
        .format("%y%m%d%H%M%S")
        .to_string()
        .parse()
        .unwrap_or_default();
    let suffix = (uuid::Uuid::new_v4().as_u128() % 1000) as u64;
    stamp * 1000 + suffix
}

fn scale_set_id() -> String {
    InfrastructureTemplate::scale_set_attr("id")
}

fn cpu_rule(operator: Operator, threshold: f64, direction: Direction) -> Rule {
    Rule {
        metric_trigger: MetricTrigger {
            metric_name: "Percentage CPU".to_string(),
            metric_resource_id: scale_set_id(),
            time_grain: "PT1M".to_string(),
            statistic: "Average".to_string(),
            time_window: "PT5M".to_string(),
            time_aggregation: "Average".to_string(),
            operator,
            threshold,
        },
        scale_action: ScaleAction {
            direction,
            change_type: ChangeType::ChangeCount,
            value: 1,
            cooldown: "PT1M".to_string(),
        },
    }
}

fn scale_up_rule() -> Rule {
    cpu_rule(Operator::GreaterThan, 75.0, Direction::Increase)
}

fn default_capacity() -> Capacity {
    Capacity::new(1, 30, 1)
}

fn metric_profile(capacity: Capacity) -> Profile {
    Profile::new("metricRules", capacity).with_rule(scale_up_rule())
}

fn recurrence(days: &[&str], hour: u8, minute: u8) -> Schedule {
    Schedule::Recurrence(Recurrence {
        timezone: SCHEDULE_TIMEZONE.to_string(),
        days: days.iter().map(|d| d.to_string()).collect(),
        hours: vec![hour],
        minutes: vec![minute],
    })
}

fn quiet_email(custom_emails: Vec<String>) -> Notification {
    Notification {
        email: Some(EmailNotification {
            send_to_subscription_administrator: false,
            send_to_subscription_co_administrator: false,
            custom_emails,
        }),
        webhooks: Vec::new(),
    }
}

fn setting(data: &TestData, profiles: Vec<Profile>) -> AutoscaleSettingConfig {
    AutoscaleSettingConfig {
        label: data.label.clone(),
        name: data.setting_name(),
        resource_group_name: InfrastructureTemplate::resource_group_attr("name"),
        location: InfrastructureTemplate::resource_group_attr("location"),
        target_resource_id: scale_set_id(),
        enabled: None,
        profiles,
        notification: None,
    }
}

fn with_template(data: &TestData, setting: &AutoscaleSettingConfig) -> String {
    format!("{}\n{}", data.template().render(), setting.render())
}

pub fn basic(data: &TestData) -> String {
    with_template(data, &setting(data, vec![metric_profile(default_capacity())]))
}

/// The basic configuration plus a second resource claiming the same identity.
pub fn requires_import(data: &TestData) -> String {
    let existing = data.resource_name();
    let import = AutoscaleSettingConfig {
        label: "import".to_string(),
        name: reference(&format!("{}.name", existing)),
        resource_group_name: reference(&format!("{}.resource_group_name", existing)),
        location: reference(&format!("{}.location", existing)),
        target_resource_id: reference(&format!("{}.target_resource_id", existing)),
        enabled: None,
        profiles: vec![metric_profile(default_capacity())],
        notification: None,
    };
    format!("{}\n{}", basic(data), import.render())
}

pub fn multiple_profiles(data: &TestData) -> String {
    let primary = Profile::new("primary", default_capacity())
        .with_rule(scale_up_rule())
        .with_rule(cpu_rule(Operator::GreaterThan, 75.0, Direction::Decrease));
    let secondary = Profile::new("secondary", default_capacity())
        .with_schedule(recurrence(&["Monday", "Wednesday", "Friday"], 18, 0));

    with_template(data, &setting(data, vec![primary, secondary]))
}

pub fn multiple_rules(data: &TestData) -> String {
    let profile = metric_profile(default_capacity()).with_rule(cpu_rule(
        Operator::LessThan,
        25.0,
        Direction::Decrease,
    ));
    let mut config = setting(data, vec![profile]);
    config.enabled = Some(true);
    with_template(data, &config)
}

pub fn capacity(data: &TestData, minimum: u32, maximum: u32, default: u32) -> String {
    let mut config = setting(
        data,
        vec![metric_profile(Capacity::new(minimum, maximum, default))],
    );
    config.enabled = Some(false);
    with_template(data, &config)
}

pub fn email(data: &TestData) -> String {
    let mut config = setting(data, vec![metric_profile(default_capacity())]);
    config.notification = Some(quiet_email(vec![data.custom_email(1)]));
    with_template(data, &config)
}

pub fn email_updated(data: &TestData) -> String {
    let mut config = setting(data, vec![metric_profile(default_capacity())]);
    config.notification = Some(quiet_email(vec![data.custom_email(1), data.custom_email(2)]));
    with_template(data, &config)
}

fn recurrence_setting(data: &TestData, schedule: Schedule) -> String {
    let profile = Profile::new("recurrence", default_capacity()).with_schedule(schedule);
    let mut config = setting(data, vec![profile]);
    config.notification = Some(quiet_email(Vec::new()));
    with_template(data, &config)
}

pub fn recurrence_config(data: &TestData) -> String {
    recurrence_setting(data, recurrence(&["Monday", "Wednesday", "Friday"], 18, 0))
}

pub fn recurrence_updated(data: &TestData) -> String {
    recurrence_setting(data, recurrence(&["Monday", "Tuesday", "Wednesday"], 20, 15))
}

pub fn fixed_date(data: &TestData) -> String {
    let window = FixedDate {
        timezone: SCHEDULE_TIMEZONE.to_string(),
        start: Utc.with_ymd_and_hms(2020, 6, 18, 0, 0, 0).single().unwrap_or_default(),
        end: Utc.with_ymd_and_hms(2020, 6, 18, 23, 59, 59).single().unwrap_or_default(),
    };
    let profile =
        Profile::new("fixedDate", default_capacity()).with_schedule(Schedule::FixedDate(window));
    with_template(data, &setting(data, vec![profile]))
}
