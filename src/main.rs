//! sonic-reconcile CLI entrypoint.
//!
//! This is the main entrypoint for the sonic-reconcile command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use sonic_reconcile::cli::{Cli, Commands, OutputFormatter};
use sonic_reconcile::config::{ConfigParser, find_registry_file};
use sonic_reconcile::device::{FactCollector, FileFactCollector, RestClient, RestFactCollector, RestconfTranslator};
use sonic_reconcile::error::{ConfigError, Result};
use sonic_reconcile::reconciler::StateReconciler;
use sonic_reconcile::runner::{ModuleResult, ModuleRunner};
use sonic_reconcile::schema::{ResourceRegistry, SchemaValidator};
use sonic_reconcile::tree::normalize;

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    ConfigParser::new().load_dotenv()?;

    let registry = cli.registry.as_deref();
    let device = cli.device.as_deref();

    match cli.command {
        Commands::Resources => cmd_resources(registry, &formatter),
        Commands::Validate { resource, file } => {
            cmd_validate(registry, resource.as_deref().zip(file.as_deref()), &formatter)
        }
        Commands::Diff { resource, want, facts } => {
            cmd_diff(registry, device, &resource, &want, facts.as_deref(), &formatter).await
        }
        Commands::Plan { tasks, facts } => {
            cmd_plan(registry, device, &tasks, facts.as_deref(), &formatter).await
        }
        Commands::Facts { resource } => cmd_facts(registry, device, &resource, &formatter).await,
        Commands::Apply { tasks, yes } => cmd_apply(registry, device, &tasks, yes, &formatter).await,
    }
}

/// List registry resources.
fn cmd_resources(registry_path: Option<&Path>, formatter: &OutputFormatter) -> Result<()> {
    let registry = load_registry(registry_path)?;
    println!("{}", formatter.format_resources(&registry));
    Ok(())
}

/// Validate the registry and, optionally, one configuration tree.
fn cmd_validate(
    registry_path: Option<&Path>,
    tree: Option<(&str, &Path)>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let registry = load_registry(registry_path)?;
    eprintln!("Registry is valid ({} resource(s))", registry.len());

    let Some((resource, file)) = tree else {
        return Ok(());
    };

    let descriptor = registry.get(resource)?;
    let tree = normalize(&ConfigParser::new().load_tree(file)?);
    let violations = SchemaValidator::new(descriptor).violations(&tree);
    println!("{}", formatter.format_violations(resource, &violations));

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::validation_general(format!(
            "{} violates the '{resource}' schema",
            file.display()
        ))
        .into())
    }
}

/// Show the structural diff for one resource.
async fn cmd_diff(
    registry_path: Option<&Path>,
    device_path: Option<&Path>,
    resource: &str,
    want_path: &Path,
    facts_path: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let registry = load_registry(registry_path)?;
    let descriptor = registry.get(resource)?;
    let collector = create_collector(device_path, facts_path)?;

    let want = ConfigParser::new().load_tree(want_path)?;
    let have = collector.collect(descriptor).await?;

    let diff = StateReconciler::new(descriptor).diff(&want, &have)?;
    println!("{}", formatter.format_diff(resource, &diff));
    Ok(())
}

/// Show the operations a task file would produce.
async fn cmd_plan(
    registry_path: Option<&Path>,
    device_path: Option<&Path>,
    tasks_path: &Path,
    facts_path: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let registry = load_registry(registry_path)?;
    let collector = create_collector(device_path, facts_path)?;
    let runner = ModuleRunner::new(collector.as_ref(), &RestconfTranslator);

    let results = run_tasks(&runner, &registry, tasks_path, true).await?;
    println!("{}", formatter.format_results(&results));
    Ok(())
}

/// Show the current configuration of one resource.
async fn cmd_facts(
    registry_path: Option<&Path>,
    device_path: Option<&Path>,
    resource: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let registry = load_registry(registry_path)?;
    let descriptor = registry.get(resource)?;
    let collector = RestFactCollector::new(create_client(device_path)?);

    let facts = collector.collect(descriptor).await?;
    println!("{}", formatter.format_tree(&facts));
    Ok(())
}

/// Apply a task file.
async fn cmd_apply(
    registry_path: Option<&Path>,
    device_path: Option<&Path>,
    tasks_path: &Path,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let registry = load_registry(registry_path)?;
    let client = create_client(device_path)?;
    let collector = RestFactCollector::new(client.clone());
    let runner = ModuleRunner::new(&collector, &RestconfTranslator).with_sender(&client);

    // Plan first
    let planned = run_tasks(&runner, &registry, tasks_path, true).await?;
    if planned.iter().all(|r| !r.changed) {
        println!("{}", formatter.format_results(&planned));
        return Ok(());
    }

    if !auto_approve {
        eprintln!("{}", formatter.format_results(&planned));
        eprint!("\nDo you want to apply these changes? [y/N] ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(());
        }
    }

    let results = run_tasks(&runner, &registry, tasks_path, false).await?;
    println!("{}", formatter.format_results(&results));
    Ok(())
}

/// Runs every task of a task file in order.
async fn run_tasks(
    runner: &ModuleRunner<'_>,
    registry: &ResourceRegistry,
    tasks_path: &Path,
    check_mode: bool,
) -> Result<Vec<ModuleResult>> {
    let tasks = ConfigParser::new().load_tasks(tasks_path)?;
    let mut results = Vec::with_capacity(tasks.len());

    for task in &tasks {
        let descriptor = registry.get(&task.resource)?;
        let result = runner
            .run(descriptor, &task.config, task.state, check_mode)
            .await?;
        results.push(result);
    }

    Ok(results)
}

/// Loads the registry from the given path or the discovered default.
fn load_registry(path: Option<&Path>) -> Result<ResourceRegistry> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => find_registry_file(".")?,
    };
    ConfigParser::new().load_registry(path)
}

/// Creates the device REST client.
fn create_client(device_path: Option<&Path>) -> Result<RestClient> {
    let config = ConfigParser::new().load_device(device_path)?;
    info!("Connecting to {}", config.base_url());
    RestClient::new(&config)
}

/// Facts come from a file when one is given, otherwise from the device.
fn create_collector(
    device_path: Option<&Path>,
    facts_path: Option<&Path>,
) -> Result<Box<dyn FactCollector>> {
    match facts_path {
        Some(path) => {
            debug!("Reading facts from {}", path.display());
            Ok(Box::new(FileFactCollector::from_file(path)?))
        }
        None => Ok(Box::new(RestFactCollector::new(create_client(device_path)?))),
    }
}
