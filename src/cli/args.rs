use std::path::PathBuf;

use clap::{Parser, Subcommand};

use scalecheck::fixtures::DEFAULT_LOCATION;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify autoscale settings against Azure Resource Manager
    Azure {
        #[command(subcommand)]
        command: AzureCommand,
    },
    /// Inspect the acceptance scenarios
    Scenario {
        #[command(subcommand)]
        command: ScenarioCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum AzureCommand {
    Exists(LookupArgs),
    Show(LookupArgs),
    CheckDestroy(CheckDestroyArgs),
    Verify(VerifyArgs),
}

#[derive(Subcommand, Debug)]
pub enum ScenarioCommand {
    List,
    Render(RenderArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct AzureArgs {
    #[arg(long, env = "ARM_SUBSCRIPTION_ID")]
    pub subscription: Option<String>,

    #[arg(long, env = "ARM_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Resource Manager base URL
    #[arg(long, env = "ARM_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "SCALECHECK_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout: u64,
}

#[derive(clap::Args, Debug)]
pub struct LookupArgs {
    #[command(flatten)]
    pub azure: AzureArgs,

    #[arg(long)]
    pub resource_group: String,

    #[arg(long)]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct CheckDestroyArgs {
    #[command(flatten)]
    pub azure: AzureArgs,

    /// Terraform state file (format version 4)
    #[arg(long)]
    pub state: PathBuf,

    /// Fail on read errors instead of treating them as destroyed
    #[arg(long)]
    pub strict: bool,

    /// Poll each setting for up to this many seconds before failing
    #[arg(long)]
    pub wait: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub azure: AzureArgs,

    #[arg(long)]
    pub state: PathBuf,

    #[arg(long)]
    pub scenario: String,

    /// 1-based step number
    #[arg(long, default_value_t = 1)]
    pub step: usize,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    pub scenario: String,

    #[arg(long, default_value_t = 1)]
    pub step: usize,

    /// Fixed random integer; a fresh one is generated when omitted
    #[arg(long)]
    pub random_integer: Option<u64>,

    #[arg(long, env = "ARM_TEST_LOCATION", default_value = DEFAULT_LOCATION)]
    pub location: String,
}
