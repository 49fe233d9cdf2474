//! Registry Export CLI
//!
//! Runs the registry analysis once and writes the resulting tables as JSON
//! for the code generators, or prints a short summary with the table digest.

use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vk_registry_tables::config::OutputFormat;
use vk_registry_tables::{analyze_from_config, AnalysisConfig, RegistryTables};

#[derive(Parser)]
#[command(name = "registry-export")]
#[command(about = "Derive capture/replay tables from the Vulkan XML registry")]
struct Cli {
    /// Configuration file (layered over vkreg.toml and VKREG__* variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Main registry document (overrides config)
    #[arg(long)]
    primary: Option<PathBuf>,

    /// Video registry document (overrides config)
    #[arg(long)]
    secondary: Option<PathBuf>,

    /// Feature-detect header (overrides config)
    #[arg(long)]
    feature_detect: Option<PathBuf>,

    /// Target API name (overrides config)
    #[arg(long)]
    api: Option<String>,

    /// Skip features above this API version, e.g. "1.2"
    #[arg(long)]
    max_version: Option<String>,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compact JSON regardless of config
    #[arg(long)]
    compact: bool,

    /// Print table sizes and digest instead of JSON
    #[arg(long)]
    summary: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AnalysisConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);

    let base = std::env::current_dir().context("Failed to read current directory")?;
    let tables = analyze_from_config(&config, &base).context("Registry analysis failed")?;

    if cli.summary {
        print_summary(&tables)?;
        return Ok(());
    }

    let format = if cli.compact {
        OutputFormat::Compact
    } else {
        config.export.output_format
    };
    let json = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(&tables)?,
        OutputFormat::Compact => serde_json::to_string(&tables)?,
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("✅ Wrote tables to {} ({})", path.display(), tables.digest()?.short());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn apply_overrides(config: &mut AnalysisConfig, cli: &Cli) {
    if let Some(path) = &cli.primary {
        config.registry.primary = path.clone();
    }
    if let Some(path) = &cli.secondary {
        config.registry.secondary = path.clone();
    }
    if let Some(path) = &cli.feature_detect {
        config.registry.feature_detect = Some(path.clone());
    }
    if let Some(api) = &cli.api {
        config.target.api = api.clone();
    }
    if let Some(version) = &cli.max_version {
        config.target.max_version = Some(version.clone());
    }
}

fn print_summary(tables: &RegistryTables) -> anyhow::Result<()> {
    let summary = tables.summary();
    println!("📊 Registry Tables ({})", tables.target_api);
    println!("  Functions:          {}", summary.functions);
    println!("    instance chain:   {}", summary.instance_chain);
    println!("    device chain:     {}", summary.device_chain);
    println!("    special:          {}", summary.special);
    println!("  Create / destroy:   {} / {}", summary.create, summary.destroy);
    println!("  Query-twice:        {}", summary.query_twice);
    println!("  Externally synced:  {}", summary.externally_synchronized);
    println!("  Aliases:            {}", summary.aliases);
    println!("  Structures:         {}", summary.structures);
    println!("    extension:        {}", summary.extension_structs);
    println!("    feature:          {}", summary.feature_structs);
    println!("  Handles:            {}", summary.handles);
    println!("  Vendor excluded:    {}", summary.vendor_excluded);
    println!("  Disabled ext:       {}", summary.disabled_extensions);
    println!();
    println!("  Digest: {}", tables.digest()?);
    Ok(())
}
