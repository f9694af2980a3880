pub mod config;
pub mod state;

pub use config::{
    AutoscaleSettingConfig, Capacity, ChangeType, Direction, EmailNotification, FixedDate,
    InfrastructureTemplate, MetricTrigger, Notification, Operator, Profile, Recurrence, Rule,
    ScaleAction, Schedule, Webhook,
};
pub use state::{Attributes, StateError, TerraformState};
