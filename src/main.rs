mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

use cli::{
    AzureArgs, AzureCommand, CheckDestroyArgs, Cli, Command, LookupArgs, RenderArgs,
    ScenarioCommand, VerifyArgs,
};
use scalecheck::checks::{self, Scenario, Step};
use scalecheck::fixtures::TestData;
use scalecheck::terraform::TerraformState;
use scalecheck::{
    BackendConfig, DestroyPolicy, LifecycleVerifier, ResourceIdentity, ScalecheckError, output,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Azure { command } => match command {
            AzureCommand::Exists(args) => exists(args).await?,
            AzureCommand::Show(args) => show(args).await?,
            AzureCommand::CheckDestroy(args) => check_destroy(args).await?,
            AzureCommand::Verify(args) => verify(args).await?,
        },
        Command::Scenario { command } => match command {
            ScenarioCommand::List => println!("{}", output::scenario_table(&checks::catalogue())),
            ScenarioCommand::Render(args) => render(args)?,
        },
    }

    Ok(())
}

fn verifier_for(args: &AzureArgs) -> Result<LifecycleVerifier, ScalecheckError> {
    let config = BackendConfig {
        subscription_id: args.subscription.clone(),
        token: args.token.clone(),
        endpoint: args.endpoint.clone(),
        timeout: Duration::from_secs(args.timeout),
    };
    let backend = scalecheck::get_provider("azure", &config)?;
    Ok(LifecycleVerifier::new(Arc::from(backend)))
}

async fn exists(args: LookupArgs) -> Result<(), ScalecheckError> {
    let verifier = verifier_for(&args.azure)?;
    let identity = ResourceIdentity::new(args.name, args.resource_group);

    verifier.check_exists(&identity).await?;
    println!("AutoScale Setting {} exists", identity);
    Ok(())
}

async fn show(args: LookupArgs) -> Result<(), ScalecheckError> {
    let verifier = verifier_for(&args.azure)?;
    let identity = ResourceIdentity::new(args.name, args.resource_group);

    let setting = verifier.read(&identity).await?;
    println!("{}", output::setting_tree(&setting));
    Ok(())
}

async fn check_destroy(args: CheckDestroyArgs) -> Result<(), ScalecheckError> {
    let policy = if args.strict {
        DestroyPolicy::Strict
    } else {
        DestroyPolicy::Lenient
    };
    let mut verifier = verifier_for(&args.azure)?.with_destroy_policy(policy);
    if let Some(wait) = args.wait {
        verifier = verifier.with_destroy_wait(Duration::from_secs(wait));
    }
    let state = TerraformState::load(&args.state)?;

    let checked = verifier.check_destroy_all(&state).await?;
    println!(
        "{} AutoScale Setting(s) destroyed ({:?} policy)",
        checked,
        verifier.destroy_policy()
    );
    Ok(())
}

async fn verify(args: VerifyArgs) -> Result<(), ScalecheckError> {
    let scenario = find_scenario(&args.scenario)?;
    let verifier = verifier_for(&args.azure)?;
    let state = TerraformState::load(&args.state)?;

    let data = checks::test_data_from_state(&state)?;
    let step = select_step(&scenario, &data, args.step)?;
    let outcomes =
        checks::run_checks(&verifier, &state, &data.resource_name(), &step.checks).await;

    println!("{}", output::outcome_table(&outcomes));

    let failed = outcomes.iter().filter(|o| !o.passed).count();
    tracing::info!(
        scenario = scenario.name,
        step = args.step,
        passed = outcomes.len() - failed,
        failed,
        "verification complete"
    );
    if failed > 0 {
        return Err(ScalecheckError::ChecksFailed {
            failed,
            total: outcomes.len(),
        });
    }
    Ok(())
}

fn render(args: RenderArgs) -> Result<(), ScalecheckError> {
    let scenario = find_scenario(&args.scenario)?;
    let data = match args.random_integer {
        Some(ri) => TestData::with_random_integer(ri, args.location),
        None => TestData::new(args.location),
    };

    let step = select_step(&scenario, &data, args.step)?;
    println!("{}", step.config);
    Ok(())
}

fn find_scenario(name: &str) -> Result<Scenario, ScalecheckError> {
    checks::find(name)
        .ok_or_else(|| ScalecheckError::Config(format!("unknown scenario: {}", name)))
}

fn select_step(
    scenario: &Scenario,
    data: &TestData,
    step: usize,
) -> Result<Step, ScalecheckError> {
    let mut steps = scenario.steps(data);
    let count = steps.len();
    if step == 0 || step > count {
        return Err(ScalecheckError::Config(format!(
            "scenario {} has {} step(s), got step {}",
            scenario.name, count, step
        )));
    }
    Ok(steps.swap_remove(step - 1))
}
