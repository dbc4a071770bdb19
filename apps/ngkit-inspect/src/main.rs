use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ngkit::{AssembleOptions, Assembly, InMemoryHost, MetadataStore, Registration};
use runtime::{AppConfig, CliArgs};
use serde::Serialize;
use std::path::PathBuf;

mod showcase;

/// ngkit inspector - assemble the sample modules and show what reaches the host
#[derive(Parser)]
#[command(name = "ngkit-inspect")]
#[command(about = "ngkit inspector - assemble the sample modules and show what reaches the host")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Fail when any declaration or provider lacks metadata
    #[arg(long)]
    strict: bool,

    /// Also assemble the module with undeclared entries
    #[arg(long)]
    with_drafts: bool,

    /// Output format of the registration plan
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    format: Format,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Print the registrations every module sends to the host
    Plan,
    /// Assemble and fail on any skipped declaration or provider
    Check,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Yaml,
    Json,
}

#[derive(Serialize)]
struct ModuleReport {
    name: String,
    requires: Vec<String>,
    registrations: Vec<Registration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
        strict: cli.strict,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, &config.home_path());
    tracing::debug!(strict = config.assembler.strict, "ngkit-inspect starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let store = MetadataStore::discover().context("collecting declarations")?;
    let host = showcase::EXTERNAL_MODULES
        .iter()
        .fold(InMemoryHost::new(), |host, name| host.with_external_module(*name));
    let options = AssembleOptions {
        strict: config.assembler.strict,
    };
    let assemblies = showcase::assemble_all(&host, &store, options, cli.with_drafts)?;

    match cli.command.unwrap_or(Commands::Plan) {
        Commands::Plan => print_plan(&host, &assemblies, cli.format),
        Commands::Check => check(&host, &assemblies),
    }
}

fn reports(host: &InMemoryHost, assemblies: &[Assembly]) -> Result<Vec<ModuleReport>> {
    assemblies
        .iter()
        .map(|assembly| {
            let name = assembly.handle().name();
            let module = host
                .get(name)
                .with_context(|| format!("module '{name}' missing from host"))?;
            Ok(ModuleReport {
                name: name.to_string(),
                requires: module.requires().to_vec(),
                registrations: module.registrations(),
                diagnostics: assembly
                    .diagnostics()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            })
        })
        .collect()
}

fn print_plan(host: &InMemoryHost, assemblies: &[Assembly], format: Format) -> Result<()> {
    let reports = reports(host, assemblies)?;
    let out = match format {
        Format::Yaml => serde_yaml::to_string(&reports).context("rendering plan as YAML")?,
        Format::Json => serde_json::to_string_pretty(&reports).context("rendering plan as JSON")?,
    };
    println!("{out}");
    Ok(())
}

fn check(host: &InMemoryHost, assemblies: &[Assembly]) -> Result<()> {
    let skipped: Vec<String> = assemblies
        .iter()
        .flat_map(|a| {
            a.diagnostics()
                .iter()
                .map(move |d| format!("{}: {d}", a.handle().name()))
        })
        .collect();
    if !skipped.is_empty() {
        anyhow::bail!(
            "{} entries skipped during assembly:\n{}",
            skipped.len(),
            skipped.join("\n")
        );
    }

    let registrations: usize = reports(host, assemblies)?
        .iter()
        .map(|r| r.registrations.len())
        .sum();
    tracing::info!(modules = assemblies.len(), registrations, "assembly check passed");
    println!(
        "OK: {} modules, {} registrations",
        assemblies.len(),
        registrations
    );
    Ok(())
}
