//! High-level orchestration API for code generation.
//!
//! One run discovers every declaration package, decides per package whether
//! it needs regenerating, assembles and seals the whole schema (relationships
//! cross packages) and then rewrites the generated files of the stale
//! packages only.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::codegen::accessor::{accessor_file_name, render_accessor, render_values, values_file_name};
use crate::codegen::assemble::assemble;
use crate::codegen::change_detection::{decide, RegenDecision, RegistrySnapshot};
use crate::codegen::describe::{SourceDescriber, TypeDescriber};
use crate::codegen::discovery::{DiscoveryError, Discoverer, Package};
use crate::codegen::frontend::patch_model_file;
use crate::codegen::fs_utils;
use crate::codegen::project_config::{BuildConfig, ConfigError};
use crate::codegen::registry_file::{read_snapshot, render_registry};
use crate::codegen::types::ClassDescription;
use crate::schema::{Schema, SchemaError};

/// First characters of every fully generated file
pub const GENERATED_BANNER: &str = "// Code generated by boforge";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to render generated code")]
    Render(#[from] std::fmt::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> GenerateError + '_ {
    move |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A discovered package with its registry snapshot and regeneration decision
#[derive(Debug, Clone)]
pub struct PackagePlan {
    pub package: Package,
    pub registry_path: PathBuf,
    pub snapshot: RegistrySnapshot,
    pub decision: RegenDecision,
}

/// Every class description of the tree and the sealed schema built from them
#[derive(Debug)]
pub struct SchemaModel {
    pub descriptions: HashMap<String, ClassDescription>,
    /// Class name to package module
    pub modules: HashMap<String, String>,
    pub schema: Schema,
}

/// What one package's regeneration did
#[derive(Debug, Clone, Default)]
pub struct PackageReport {
    pub module: String,
    pub decision: RegenDecision,
    pub written: Vec<PathBuf>,
    pub unchanged: usize,
    pub deleted: Vec<PathBuf>,
    pub patch_failures: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub packages: Vec<PackageReport>,
}

impl GenerationReport {
    pub fn regenerated(&self) -> impl Iterator<Item = &PackageReport> {
        self.packages.iter().filter(|p| p.decision.needs_regen())
    }

    pub fn files_written(&self) -> usize {
        self.packages.iter().map(|p| p.written.len()).sum()
    }

    pub fn patch_failures(&self) -> usize {
        self.packages.iter().map(|p| p.patch_failures).sum()
    }
}

/// Discover every package and decide which ones need regenerating
pub fn plan(config: &BuildConfig) -> Result<Vec<PackagePlan>, GenerateError> {
    let discoverer = Discoverer::from_config(config);
    let packages = discoverer.discover(&config.source_root())?;

    let mut plans = Vec::with_capacity(packages.len());
    for package in packages {
        let registry_path = package.dir.join(&config.generation.registry_file);
        let snapshot = read_snapshot(&registry_path)?;
        let decision = decide(&package.classes, &package.module, &snapshot, config.generation.force);
        plans.push(PackagePlan {
            package,
            registry_path,
            snapshot,
            decision,
        });
    }
    Ok(plans)
}

/// Describe every discovered class and seal the resulting schema
pub fn load_schema(packages: &[Package]) -> Result<SchemaModel, GenerateError> {
    load_schema_with(&SourceDescriber, packages)
}

pub fn load_schema_with(
    describer: &dyn TypeDescriber,
    packages: &[Package],
) -> Result<SchemaModel, GenerateError> {
    let mut ordered = Vec::new();
    let mut modules = HashMap::new();
    for package in packages {
        for core in &package.classes {
            ordered.push(describer.describe(core)?);
            modules.insert(core.name.clone(), package.module.clone());
        }
    }

    let schema = assemble(&ordered)?;
    tracing::info!("Sealed schema with {} classes", schema.len());

    let descriptions = ordered.into_iter().map(|d| (d.name.clone(), d)).collect();
    Ok(SchemaModel {
        descriptions,
        modules,
        schema,
    })
}

/// Run the whole pipeline
pub fn generate(config: &BuildConfig) -> Result<GenerationReport, GenerateError> {
    config.validate()?;
    let plans = plan(config)?;

    if !plans.iter().any(|p| p.decision.needs_regen()) {
        tracing::info!("All {} packages are up to date", plans.len());
        let packages = plans
            .into_iter()
            .map(|p| PackageReport {
                module: p.package.module,
                decision: p.decision,
                ..PackageReport::default()
            })
            .collect();
        return Ok(GenerationReport { packages });
    }

    let packages: Vec<Package> = plans.iter().map(|p| p.package.clone()).collect();
    let model = load_schema(&packages)?;

    let mut report = GenerationReport::default();
    for plan in plans {
        let package_report = if plan.decision.needs_regen() {
            regenerate_package(config, &plan, &model)?
        } else {
            tracing::debug!("Package {} is up to date", plan.package.module);
            PackageReport {
                module: plan.package.module.clone(),
                decision: plan.decision.clone(),
                ..PackageReport::default()
            }
        };
        report.packages.push(package_report);
    }
    Ok(report)
}

fn regenerate_package(
    config: &BuildConfig,
    plan: &PackagePlan,
    model: &SchemaModel,
) -> Result<PackageReport, GenerateError> {
    let package = &plan.package;
    tracing::info!("Regenerating package {} ({})", package.module, plan.decision.summary());

    let mut report = PackageReport {
        module: package.module.clone(),
        decision: plan.decision.clone(),
        ..PackageReport::default()
    };

    for core in package.classes.iter().filter(|c| !c.is_interface()) {
        let Some(description) = model.descriptions.get(&core.name) else {
            continue;
        };
        let accessor = render_accessor(description, &package.module, &model.modules)?;
        write_generated(&mut report, &package.dir.join(accessor_file_name(&core.name)), &accessor)?;
        let values = render_values(description)?;
        write_generated(&mut report, &package.dir.join(values_file_name(&core.name)), &values)?;

        if let Some(models_dir) = config.models_dir() {
            let specs = model.schema.class(&core.name)?;
            let patch = patch_model_file(&models_dir, specs, &model.schema).map_err(io_error(&models_dir))?;
            report.patch_failures += patch.failures;
            if patch.written {
                report.written.push(patch.path);
            } else {
                report.unchanged += 1;
            }
        }
    }

    for removed in &plan.decision.removed {
        for name in [accessor_file_name(removed), values_file_name(removed)] {
            let path = package.dir.join(name);
            if remove_generated(&path)? {
                report.deleted.push(path);
            }
        }
    }

    if package.classes.is_empty() {
        if remove_generated(&plan.registry_path)? {
            report.deleted.push(plan.registry_path.clone());
        }
    } else {
        let registry = render_registry(package)?;
        write_generated(&mut report, &plan.registry_path, &registry)?;
    }

    if report.patch_failures > 0 {
        tracing::error!(
            "Package {}: {} model edits skipped",
            package.module,
            report.patch_failures
        );
    }
    Ok(report)
}

fn write_generated(report: &mut PackageReport, path: &Path, contents: &str) -> Result<(), GenerateError> {
    if fs_utils::write_if_changed(path, contents).map_err(io_error(path))? {
        tracing::debug!("Wrote {}", path.display());
        report.written.push(path.to_path_buf());
    } else {
        report.unchanged += 1;
    }
    Ok(())
}

/// Delete a stale generated file; files without the banner are left alone
fn remove_generated(path: &Path) -> Result<bool, GenerateError> {
    let Some(contents) = fs_utils::read_optional(path).map_err(io_error(path))? else {
        return Ok(false);
    };
    if !contents.starts_with(GENERATED_BANNER) {
        tracing::warn!("Keeping {}: not a generated file", path.display());
        return Ok(false);
    }
    std::fs::remove_file(path).map_err(io_error(path))?;
    tracing::debug!("Removed {}", path.display());
    Ok(true)
}
