//! Terminal rendering for check outcomes, scenarios and backend reads.

use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use crate::checks::{CheckOutcome, Scenario};
use crate::fixtures::{DEFAULT_LOCATION, TestData};
use crate::providers::azure::{AutoscaleSettingResource, ProfileWire, RuleWire};

#[derive(Debug, Tabled)]
struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    name: &'static str,
    #[tabled(rename = "Steps")]
    steps: usize,
    #[tabled(rename = "Description")]
    description: &'static str,
}

pub fn outcome_table(outcomes: &[CheckOutcome]) -> String {
    Table::new(outcomes).with(Style::rounded()).to_string()
}

pub fn scenario_table(scenarios: &[Scenario]) -> String {
    let data = TestData::with_random_integer(0, DEFAULT_LOCATION);
    let rows: Vec<ScenarioRow> = scenarios
        .iter()
        .map(|s| ScenarioRow {
            name: s.name,
            steps: s.steps(&data).len(),
            description: s.description,
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn setting_tree(setting: &AutoscaleSettingResource) -> Tree<String> {
    let properties = &setting.properties;
    let mut root = Tree::new(setting.name.clone());

    if let Some(enabled) = properties.enabled {
        root.push(Tree::new(format!("enabled: {}", enabled)));
    }
    if let Some(target) = &properties.target_resource_uri {
        root.push(Tree::new(format!("target: {}", target)));
    }

    let profiles = Tree::new("profiles".to_string())
        .with_leaves(properties.profiles.iter().map(profile_tree));
    root.push(profiles);

    let emails: Vec<String> = properties
        .notifications
        .iter()
        .filter_map(|n| n.email.as_ref())
        .flat_map(|email| email.custom_emails.iter().cloned())
        .collect();
    if !emails.is_empty() {
        root.push(Tree::new("custom emails".to_string()).with_leaves(emails));
    }

    root
}

fn profile_tree(profile: &ProfileWire) -> Tree<String> {
    let capacity = &profile.capacity;
    let mut node = Tree::new(profile.name.clone());
    node.push(Tree::new(format!(
        "capacity: min {} / max {} / default {}",
        capacity.minimum, capacity.maximum, capacity.default
    )));

    if let Some(recurrence) = &profile.recurrence {
        let schedule = &recurrence.schedule;
        node.push(Tree::new(format!(
            "recurrence: {} {:?} {:?}:{:?} ({})",
            recurrence.frequency,
            schedule.days,
            schedule.hours,
            schedule.minutes,
            schedule.time_zone
        )));
    }
    if let Some(fixed) = &profile.fixed_date {
        node.push(Tree::new(format!("fixed date: {} .. {}", fixed.start, fixed.end)));
    }
    if !profile.rules.is_empty() {
        node.push(Tree::new("rules".to_string()).with_leaves(profile.rules.iter().map(rule_line)));
    }

    node
}

fn rule_line(rule: &RuleWire) -> String {
    let trigger = &rule.metric_trigger;
    let action = &rule.scale_action;
    format!(
        "{} {} {} => {} {} {}",
        trigger.metric_name,
        trigger.operator,
        trigger.threshold,
        action.direction,
        action.type_,
        action.value.as_deref().unwrap_or("-")
    )
}
