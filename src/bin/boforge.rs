//! boforge CLI - business-object code generation
//!
//! Discovers `*_bo.rs` declarations, seals the schema they describe and keeps
//! the generated accessor, value-mapper, registry and front-end model files
//! in step with it.

use boforge::codegen::orchestration::{self, PackagePlan};
use boforge::codegen::BuildConfig;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "boforge")]
#[command(version, about = "Business-object schema and code generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate every package whose declarations changed
    Generate {
        /// Path to boforge.yaml
        #[arg(short, long, default_value = "boforge.yaml")]
        config: PathBuf,

        /// Regenerate every package, changed or not
        #[arg(short, long)]
        force: bool,
    },

    /// Discover and describe every class and seal the schema, writing nothing
    Check {
        /// Path to boforge.yaml
        #[arg(short, long, default_value = "boforge.yaml")]
        config: PathBuf,
    },

    /// List discovered packages and whether they need regenerating
    Discover {
        /// Path to boforge.yaml
        #[arg(short, long, default_value = "boforge.yaml")]
        config: PathBuf,
    },
}

fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate { config, force } => generate(&config, force),
        Commands::Check { config } => check(&config),
        Commands::Discover { config } => discover(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Load boforge.yaml with environment and CLI overrides applied
fn load_config(path: &Path, force: bool) -> Result<BuildConfig, String> {
    println!("📋 Loading configuration from {}...", path.display());

    let mut config = BuildConfig::from_file(path).map_err(|e| e.to_string())?;
    config.apply_env();
    if force {
        config.generation.force = true;
    }
    config.validate().map_err(|e| e.to_string())?;

    println!("  ✓ Configuration loaded: {}", config.project.name);
    Ok(config)
}

fn generate(path: &Path, force: bool) -> Result<(), String> {
    let config = load_config(path, force)?;
    println!("🔧 Generating from {}...", config.source_root().display());

    let report = orchestration::generate(&config).map_err(|e| e.to_string())?;

    for package in &report.packages {
        if package.decision.needs_regen() {
            println!(
                "  ✓ {}: {} ({} written, {} unchanged)",
                package.module,
                package.decision.summary(),
                package.written.len(),
                package.unchanged
            );
            for deleted in &package.deleted {
                println!("    - removed {}", deleted.display());
            }
        } else {
            println!("  ℹ {}: up to date", package.module);
        }
    }

    if report.patch_failures() > 0 {
        println!(
            "  ⚠ {} front-end model edits were skipped, see the log for details",
            report.patch_failures()
        );
    }

    println!("✨ Code generation complete!");
    Ok(())
}

fn check(path: &Path) -> Result<(), String> {
    let config = load_config(path, false)?;
    println!("🔍 Checking schema under {}...", config.source_root().display());

    let plans = orchestration::plan(&config).map_err(|e| e.to_string())?;
    let packages: Vec<_> = plans.into_iter().map(|p| p.package).collect();
    let model = orchestration::load_schema(&packages).map_err(|e| e.to_string())?;

    let mut classes: Vec<_> = model.schema.classes().collect();
    classes.sort_by(|a, b| a.name().cmp(b.name()));
    for class in classes {
        if class.is_interface() {
            println!("  {} (interface)", class.name());
        } else if class.is_not_persisted() {
            println!("  {} (not persisted)", class.name());
        } else {
            println!(
                "  {} [{}]: {}",
                class.name(),
                class.table_name(),
                class.column_names().join(", ")
            );
        }
    }

    println!("✅ Schema is consistent ({} classes)", model.schema.len());
    Ok(())
}

fn discover(path: &Path) -> Result<(), String> {
    let config = load_config(path, false)?;
    let plans = orchestration::plan(&config).map_err(|e| e.to_string())?;

    for PackagePlan { package, decision, .. } in &plans {
        println!("📦 {} ({})", package.module, package.dir.display());
        for class in &package.classes {
            let kind = if class.is_interface() { "interface" } else { "class" };
            println!("    {} {} @ {}", kind, class.name, class.modified_ms);
        }
        println!("    → {}", decision.summary());
    }

    println!("Found {} packages", plans.len());
    Ok(())
}
