//! Acceptance scenarios: the configuration applied at each step and the
//! checks expected to hold once it has been applied.

use tabled::Tabled;

use crate::fixtures::{self, TestData};
use crate::providers::azure::CapacityBounds;
use crate::resource::AUTOSCALE_SETTING_TYPE;
use crate::terraform::state::TerraformState;
use crate::verifier::{LifecycleVerifier, VerifyError, identity_from_state};

#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// The resource is recorded in state and the backend reports it present.
    Exists,
    Attr { key: String, value: String },
    NoAttr { key: String },
    /// Declaring the resource again must be refused as already existing.
    ImportConflict,
    /// The backend read reports exactly these bounds for the named profile.
    Capacity {
        profile: String,
        bounds: CapacityBounds,
    },
    ProfileOrder(Vec<String>),
}

impl Check {
    pub fn attr(key: &str, value: impl Into<String>) -> Self {
        Check::Attr {
            key: key.to_string(),
            value: value.into(),
        }
    }

    pub fn no_attr(key: &str) -> Self {
        Check::NoAttr {
            key: key.to_string(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Check::Exists => "exists".to_string(),
            Check::Attr { key, value } => format!("{} = {:?}", key, value),
            Check::NoAttr { key } => format!("{} absent", key),
            Check::ImportConflict => "requires import".to_string(),
            Check::Capacity { profile, bounds } => format!(
                "{} capacity {}/{}/{}",
                profile, bounds.minimum, bounds.maximum, bounds.default
            ),
            Check::ProfileOrder(names) => format!("profiles {}", names.join(", ")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub config: String,
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    build: fn(&TestData) -> Vec<Step>,
}

impl Scenario {
    pub fn steps(&self, data: &TestData) -> Vec<Step> {
        (self.build)(data)
    }
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct CheckOutcome {
    #[tabled(rename = "Check")]
    pub check: String,
    #[tabled(rename = "Passed")]
    pub passed: bool,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

impl CheckOutcome {
    fn pass(check: &Check) -> Self {
        Self {
            check: check.describe(),
            passed: true,
            detail: String::new(),
        }
    }

    fn fail(check: &Check, detail: impl Into<String>) -> Self {
        Self {
            check: check.describe(),
            passed: false,
            detail: detail.into(),
        }
    }
}

pub fn catalogue() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "basic",
            description: "single metric profile with one scale-up rule",
            build: basic_steps,
        },
        Scenario {
            name: "requires-import",
            description: "second declaration of an existing setting is refused",
            build: requires_import_steps,
        },
        Scenario {
            name: "multiple-profiles",
            description: "primary metric profile and secondary recurrence profile",
            build: multiple_profiles_steps,
        },
        Scenario {
            name: "update",
            description: "capacity bounds updated in place across three applies",
            build: update_steps,
        },
        Scenario {
            name: "multiple-rules",
            description: "a scale-down rule added next to the scale-up rule",
            build: multiple_rules_steps,
        },
        Scenario {
            name: "custom-emails",
            description: "notification custom emails grow from one to two",
            build: custom_emails_steps,
        },
        Scenario {
            name: "recurrence",
            description: "weekly recurrence profile with email notification",
            build: recurrence_steps,
        },
        Scenario {
            name: "recurrence-update",
            description: "recurrence days and time changed in place",
            build: recurrence_update_steps,
        },
        Scenario {
            name: "fixed-date",
            description: "profile bound to a fixed date window",
            build: fixed_date_steps,
        },
    ]
}

pub fn find(name: &str) -> Option<Scenario> {
    catalogue().into_iter().find(|s| s.name == name)
}

fn basic_checks() -> Vec<Check> {
    vec![
        Check::Exists,
        Check::attr("enabled", "true"),
        Check::attr("profile.#", "1"),
        Check::attr("profile.0.name", "metricRules"),
        Check::attr("profile.0.rule.#", "1"),
        Check::attr("notification.#", "0"),
    ]
}

fn basic_steps(data: &TestData) -> Vec<Step> {
    let mut checks = basic_checks();
    checks.push(Check::no_attr("tags.$type"));
    vec![Step {
        config: fixtures::basic(data),
        checks,
    }]
}

fn requires_import_steps(data: &TestData) -> Vec<Step> {
    vec![
        Step {
            config: fixtures::basic(data),
            checks: vec![Check::Exists],
        },
        Step {
            config: fixtures::requires_import(data),
            checks: vec![Check::ImportConflict],
        },
    ]
}

fn multiple_profiles_steps(data: &TestData) -> Vec<Step> {
    vec![Step {
        config: fixtures::multiple_profiles(data),
        checks: vec![
            Check::Exists,
            Check::attr("enabled", "true"),
            Check::attr("profile.#", "2"),
            Check::attr("profile.0.name", "primary"),
            Check::attr("profile.1.name", "secondary"),
            Check::ProfileOrder(vec!["primary".to_string(), "secondary".to_string()]),
        ],
    }]
}

fn capacity_step(data: &TestData, minimum: u32, maximum: u32, default: u32) -> Step {
    Step {
        config: fixtures::capacity(data, minimum, maximum, default),
        checks: vec![
            Check::Exists,
            Check::attr("enabled", "false"),
            Check::attr("profile.#", "1"),
            Check::attr("profile.0.capacity.0.minimum", minimum.to_string()),
            Check::attr("profile.0.capacity.0.maximum", maximum.to_string()),
            Check::attr("profile.0.capacity.0.default", default.to_string()),
            Check::Capacity {
                profile: "metricRules".to_string(),
                bounds: CapacityBounds {
                    minimum,
                    maximum,
                    default,
                },
            },
        ],
    }
}

fn update_steps(data: &TestData) -> Vec<Step> {
    vec![
        capacity_step(data, 1, 3, 2),
        capacity_step(data, 0, 400, 0),
        capacity_step(data, 2, 45, 3),
    ]
}

fn multiple_rules_steps(data: &TestData) -> Vec<Step> {
    let mut first = basic_checks();
    first.push(Check::attr(
        "profile.0.rule.0.scale_action.0.direction",
        "Increase",
    ));

    vec![
        Step {
            config: fixtures::basic(data),
            checks: first,
        },
        Step {
            config: fixtures::multiple_rules(data),
            checks: vec![
                Check::Exists,
                Check::attr("enabled", "true"),
                Check::attr("profile.#", "1"),
                Check::attr("profile.0.name", "metricRules"),
                Check::attr("profile.0.rule.#", "2"),
                Check::attr("profile.0.rule.0.scale_action.0.direction", "Increase"),
                Check::attr("profile.0.rule.1.scale_action.0.direction", "Decrease"),
                Check::attr("notification.#", "0"),
            ],
        },
    ]
}

fn custom_emails_steps(data: &TestData) -> Vec<Step> {
    vec![
        Step {
            config: fixtures::email(data),
            checks: vec![
                Check::Exists,
                Check::attr("notification.#", "1"),
                Check::attr("notification.0.email.#", "1"),
                Check::attr("notification.0.email.0.custom_emails.#", "1"),
                Check::attr("notification.0.email.0.custom_emails.0", data.custom_email(1)),
            ],
        },
        Step {
            config: fixtures::email_updated(data),
            checks: vec![
                Check::Exists,
                Check::attr("notification.#", "1"),
                Check::attr("notification.0.email.#", "1"),
                Check::attr("notification.0.email.0.custom_emails.#", "2"),
                Check::attr("notification.0.email.0.custom_emails.0", data.custom_email(1)),
                Check::attr("notification.0.email.0.custom_emails.1", data.custom_email(2)),
            ],
        },
    ]
}

fn recurrence_steps(data: &TestData) -> Vec<Step> {
    vec![Step {
        config: fixtures::recurrence_config(data),
        checks: vec![
            Check::Exists,
            Check::attr("enabled", "true"),
            Check::attr("profile.#", "1"),
            Check::attr("profile.0.name", "recurrence"),
            Check::attr("profile.0.recurrence.#", "1"),
            Check::attr("notification.#", "1"),
        ],
    }]
}

fn recurrence_update_steps(data: &TestData) -> Vec<Step> {
    vec![
        Step {
            config: fixtures::recurrence_config(data),
            checks: vec![
                Check::Exists,
                Check::attr("notification.#", "1"),
                Check::attr("profile.0.recurrence.0.days.#", "3"),
                Check::attr("profile.0.recurrence.0.days.0", "Monday"),
                Check::attr("profile.0.recurrence.0.days.1", "Wednesday"),
                Check::attr("profile.0.recurrence.0.days.2", "Friday"),
                Check::attr("profile.0.recurrence.0.hours.0", "18"),
                Check::attr("profile.0.recurrence.0.minutes.0", "0"),
            ],
        },
        Step {
            config: fixtures::recurrence_updated(data),
            checks: vec![
                Check::Exists,
                Check::attr("profile.0.recurrence.#", "1"),
                Check::attr("profile.0.recurrence.0.days.#", "3"),
                Check::attr("profile.0.recurrence.0.days.0", "Monday"),
                Check::attr("profile.0.recurrence.0.days.1", "Tuesday"),
                Check::attr("profile.0.recurrence.0.days.2", "Wednesday"),
                Check::attr("profile.0.recurrence.0.hours.0", "20"),
                Check::attr("profile.0.recurrence.0.minutes.0", "15"),
            ],
        },
    ]
}

fn fixed_date_steps(data: &TestData) -> Vec<Step> {
    vec![Step {
        config: fixtures::fixed_date(data),
        checks: vec![
            Check::Exists,
            Check::attr("enabled", "true"),
            Check::attr("profile.#", "1"),
            Check::attr("profile.0.name", "fixedDate"),
            Check::attr("profile.0.fixed_date.#", "1"),
            Check::attr("notification.#", "0"),
        ],
    }]
}

/// Rebuilds the run's [`TestData`] from the autoscale setting recorded at
/// the default address in `state`.
pub fn test_data_from_state(state: &TerraformState) -> Result<TestData, VerifyError> {
    let address = TestData::with_random_integer(0, fixtures::DEFAULT_LOCATION).resource_name();
    let identity = identity_from_state(state, &address)?;
    let location = state
        .attributes(&address)?
        .get("location")
        .unwrap_or(fixtures::DEFAULT_LOCATION)
        .to_string();

    TestData::from_setting_name(&identity.name, location).ok_or_else(|| VerifyError::Mismatch {
        detail: "name was not generated for an acceptance run".to_string(),
        identity,
    })
}

/// Evaluates every check against `address` and reports each outcome; a
/// failing check does not stop the remaining ones.
pub async fn run_checks(
    verifier: &LifecycleVerifier,
    state: &TerraformState,
    address: &str,
    checks: &[Check],
) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::with_capacity(checks.len());

    for check in checks {
        let outcome = match check {
            Check::Exists => match verifier.check_exists_in_state(state, address).await {
                Ok(_) => CheckOutcome::pass(check),
                Err(err) => CheckOutcome::fail(check, err.to_string()),
            },
            Check::Attr { key, value } => {
                outcome_of(check, state.check_attr(address, key, value).map_err(VerifyError::from))
            }
            Check::NoAttr { key } => {
                outcome_of(check, state.check_no_attr(address, key).map_err(VerifyError::from))
            }
            Check::ImportConflict => import_conflict_outcome(verifier, state, address, check).await,
            Check::Capacity { profile, bounds } => {
                let result = match identity_from_state(state, address) {
                    Ok(identity) => verifier.check_capacity(&identity, profile, *bounds).await,
                    Err(err) => Err(err),
                };
                outcome_of(check, result)
            }
            Check::ProfileOrder(names) => {
                let expected: Vec<&str> = names.iter().map(String::as_str).collect();
                let result = match identity_from_state(state, address) {
                    Ok(identity) => verifier.check_profile_order(&identity, &expected).await,
                    Err(err) => Err(err),
                };
                outcome_of(check, result)
            }
        };

        if !outcome.passed {
            tracing::warn!(
                %address,
                check = %outcome.check,
                detail = %outcome.detail,
                "check failed"
            );
        }
        outcomes.push(outcome);
    }

    outcomes
}

fn outcome_of(check: &Check, result: Result<(), VerifyError>) -> CheckOutcome {
    match result {
        Ok(()) => CheckOutcome::pass(check),
        Err(err) => CheckOutcome::fail(check, err.to_string()),
    }
}

async fn import_conflict_outcome(
    verifier: &LifecycleVerifier,
    state: &TerraformState,
    address: &str,
    check: &Check,
) -> CheckOutcome {
    let identity = match identity_from_state(state, address) {
        Ok(identity) => identity,
        Err(err) => return CheckOutcome::fail(check, err.to_string()),
    };

    match verifier.require_absent(&identity, AUTOSCALE_SETTING_TYPE).await {
        Err(err @ VerifyError::ImportConflict { .. }) => CheckOutcome {
            check: check.describe(),
            passed: true,
            detail: err.to_string(),
        },
        Ok(()) => CheckOutcome::fail(
            check,
            format!("{} is absent, nothing to conflict with", identity),
        ),
        Err(err) => CheckOutcome::fail(check, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> TestData {
        TestData::with_random_integer(42, fixtures::DEFAULT_LOCATION)
    }

    #[test]
    fn test_catalogue_names_are_unique() {
        let names: Vec<&str> = catalogue().iter().map(|s| s.name).collect();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_find_scenario() {
        assert!(find("update").is_some());
        assert!(find("nonexistent").is_none());
    }

    #[test]
    fn test_update_scenario_steps() {
        let steps = find("update").unwrap().steps(&data());
        assert_eq!(steps.len(), 3);
        assert!(
            steps[1]
                .checks
                .contains(&Check::attr("profile.0.capacity.0.maximum", "400"))
        );
        assert!(steps[1].config.contains("maximum = 400"));
        assert!(steps[2].checks.contains(&Check::Capacity {
            profile: "metricRules".to_string(),
            bounds: CapacityBounds {
                minimum: 2,
                maximum: 45,
                default: 3,
            },
        }));
    }

    #[test]
    fn test_requires_import_scenario_ends_with_conflict() {
        let steps = find("requires-import").unwrap().steps(&data());
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].checks, vec![Check::ImportConflict]);
    }

    #[test]
    fn test_custom_emails_use_random_integer() {
        let steps = find("custom-emails").unwrap().steps(&data());
        let second = Check::attr(
            "notification.0.email.0.custom_emails.1",
            "acctest2-42@example.com",
        );
        assert!(steps[1].checks.contains(&second));
    }

    #[test]
    fn test_every_step_checks_existence_first() {
        for scenario in catalogue() {
            for step in scenario.steps(&data()) {
                assert!(
                    matches!(step.checks[0], Check::Exists | Check::ImportConflict),
                    "{} does not start with an existence check",
                    scenario.name
                );
            }
        }
    }

    fn state_named(name: &str) -> TerraformState {
        let json = serde_json::json!({
            "version": 4,
            "resources": [{
                "mode": "managed",
                "type": "azurerm_autoscale_setting",
                "name": "test",
                "instances": [{"attributes": {
                    "name": name,
                    "resource_group_name": "acctestRG-42",
                    "location": "northeurope"
                }}]
            }]
        });
        TerraformState::from_json(&json.to_string()).unwrap()
    }

    #[test]
    fn test_data_recovered_from_state() {
        let data = test_data_from_state(&state_named("acctestautoscale-42")).unwrap();
        assert_eq!(data.random_integer, 42);
        assert_eq!(data.location, "northeurope");
    }

    #[test]
    fn test_data_from_state_rejects_foreign_names() {
        let err = test_data_from_state(&state_named("handmade")).unwrap_err();
        assert!(matches!(err, VerifyError::Mismatch { .. }));
    }

    #[test]
    fn test_check_descriptions() {
        assert_eq!(Check::Exists.describe(), "exists");
        assert_eq!(Check::attr("profile.#", "1").describe(), "profile.# = \"1\"");
        assert_eq!(Check::no_attr("tags.$type").describe(), "tags.$type absent");
        let capacity = Check::Capacity {
            profile: "metricRules".to_string(),
            bounds: CapacityBounds {
                minimum: 0,
                maximum: 400,
                default: 0,
            },
        };
        assert_eq!(capacity.describe(), "metricRules capacity 0/400/0");
    }
}
