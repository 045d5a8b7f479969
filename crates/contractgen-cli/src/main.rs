//! contractgen CLI entrypoint
//! Parses command-line arguments and dispatches to the core pipeline.

mod watch;

// Internal imports (std, crate)
use std::path::{Path, PathBuf};
use std::time::Duration;

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use contractgen_core::{
    config::CONFIG_FILE_NAMES, contract, Config, DateLibrary, Pipeline, PipelineReport, Task,
    ValidationReport,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "contractgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root containing contractgen.yaml
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,
    /// Explicit configuration file (YAML or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Only process this contract (file name inside the contract directory); repeatable
    #[arg(long = "contract", global = true)]
    contracts: Vec<String>,
    /// Override the date library used for date and date-time schemas
    #[arg(long, global = true, value_enum)]
    date_library: Option<DateLibrary>,
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate every contract into the scratch directory
    OpenApiGenerate,
    /// Generate, then copy new sources into the generated tree
    MoveGeneratedSources,
    /// Generate, relocate, then delete the scratch directory
    CleanGeneratedDirectory,
    /// Refresh the generated tree from the contracts
    #[command(alias = "create-open-api")]
    UpdateOpenApiSpec,
    /// Refresh the generated tree, then run the compile commands
    Compile,
    /// Delete the generated tree and the scratch directory
    Clean,
    /// Validate the contracts
    Validate {
        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
        /// Report errors only
        #[arg(long)]
        no_recommend: bool,
    },
    /// Refresh the generated tree whenever a contract or template changes
    Watch {
        /// Quiet period before a change triggers a rebuild
        #[arg(long, default_value_t = 500)]
        debounce_ms: u64,
    },
    /// Write a default contractgen.yaml
    Init {
        /// Base package of the project
        #[arg(long, default_value = "com.example")]
        package: String,
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved configuration
    Config,
}

#[derive(Serialize)]
struct ValidationSummary {
    valid: bool,
    reports: Vec<ValidationReport>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging on stderr; RUST_LOG wins unless --verbose is given
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::OpenApiGenerate => run_task(&cli, Task::OpenApiGenerate).await?,
        Commands::MoveGeneratedSources => run_task(&cli, Task::MoveGeneratedSources).await?,
        Commands::CleanGeneratedDirectory => {
            run_task(&cli, Task::CleanGeneratedDirectory).await?
        }
        Commands::UpdateOpenApiSpec => run_task(&cli, Task::UpdateOpenApiSpec).await?,
        Commands::Compile => run_task(&cli, Task::Compile).await?,
        Commands::Clean => {
            let config = load_config(&cli).await?;
            let removed = contractgen_core::clean(&config)
                .await
                .context("Failed to clean generated sources")?;
            if removed {
                println!(
                    "✅ Removed generated sources in: {}",
                    config.generated_path().display()
                );
            } else {
                println!("Nothing to clean");
            }
        }
        Commands::Validate { json, no_recommend } => {
            let config = load_config(&cli).await?;
            let recommend = config.recommend && !no_recommend;
            let contracts = contract::resolve(&config).await?;
            let mut reports = Vec::with_capacity(contracts.len());
            for contract in &contracts {
                let report = contractgen_core::validate_contract(&contract.path, recommend)
                    .await
                    .with_context(|| format!("Failed to validate {}", contract.name))?;
                reports.push(report);
            }
            let valid = reports.iter().all(ValidationReport::is_valid);

            if *json {
                let summary = ValidationSummary { valid, reports };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_validation(&reports);
            }
            if !valid {
                anyhow::bail!("Contract validation failed");
            }
        }
        Commands::Watch { debounce_ms } => {
            let config = load_config(&cli).await?;
            watch::watch(config, Duration::from_millis(*debounce_ms)).await?;
        }
        Commands::Init { package, force } => {
            let path = cli.project_dir.join(CONFIG_FILE_NAMES[0]);
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists; use --force to overwrite it",
                    path.display()
                );
            }
            let config = Config::new(package.clone());
            config
                .validate()
                .with_context(|| format!("Invalid package '{}'", package))?;
            config
                .save(&path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Wrote configuration to: {}", path.display());
        }
        Commands::Config => {
            let config = load_config(&cli).await?;
            print!("{}", serde_yaml::to_string(&config)?);
        }
    }
    Ok(())
}

/// Resolve the configuration from `--config` or the project directory, then
/// apply command-line overrides.
async fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)
                .await
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            if config.project_root.is_relative() {
                config.project_root = cli.project_dir.join(&config.project_root);
            }
            config
        }
        None => Config::discover(&cli.project_dir)
            .await
            .context("Failed to load configuration")?,
    };

    if !cli.contracts.is_empty() {
        config.contracts = cli.contracts.clone();
    }
    if let Some(date_library) = cli.date_library {
        config.generator.options.date_library = date_library;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Build and run one pipeline task, printing a summary
async fn run_task(cli: &Cli, task: Task) -> anyhow::Result<()> {
    let config = load_config(cli).await?;
    let report = run_pipeline(config, task).await?;
    print_report(&report);
    Ok(())
}

pub(crate) async fn run_pipeline(config: Config, task: Task) -> anyhow::Result<PipelineReport> {
    let mut pipeline = Pipeline::new(config)
        .await
        .context("Failed to initialize pipeline")?;
    pipeline
        .run(task)
        .await
        .with_context(|| format!("Task {} failed", task))
}

fn print_report(report: &PipelineReport) {
    if let Some(generation) = &report.generation {
        println!(
            "Generated {} file(s) from {} contract(s)",
            generation.files.len(),
            generation.contracts.len()
        );
        for collision in &generation.collisions {
            println!(
                "⚠️  {} generated by both {} and {}; kept {}",
                collision.path.display(),
                collision.overwritten,
                collision.kept,
                collision.kept
            );
        }
    }
    if let Some(relocation) = &report.relocation {
        println!(
            "Relocated {} new file(s), kept {} existing file(s)",
            relocation.copied.len(),
            relocation.skipped_existing.len()
        );
        for path in &relocation.copied {
            println!("  + {}", path.display());
        }
    }
    if report.scratch_removed {
        println!("Removed scratch directory");
    }
    for command in &report.compiled {
        println!("Compiled with: {}", command);
    }
    println!("✅ {} finished", report.task);
}

fn print_validation(reports: &[ValidationReport]) {
    for report in reports {
        let name = display_name(&report.contract);
        if report.is_valid() {
            println!("✅ {} is valid", name);
        } else {
            println!("❌ {} has {} error(s)", name, report.errors.len());
        }
        for error in &report.errors {
            println!("  error: {}", error);
        }
        for recommendation in &report.recommendations {
            println!("  recommendation: {}", recommendation);
        }
    }
    if reports.is_empty() {
        println!("No contracts to validate");
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
