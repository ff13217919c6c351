//! Discovery and code generation for business-object declarations.
//!
//! The pipeline runs in this order: discover `*_bo.rs` files, compare them
//! with each package's registry snapshot, describe the declared types,
//! assemble and seal the schema, then emit the generated files and patch the
//! front-end models of every stale package.

pub mod accessor;
pub mod assemble;
pub mod change_detection;
pub mod code_file;
pub mod dependency_graph;
pub mod describe;
pub mod discovery;
pub mod frontend;
pub mod fs_utils;
pub mod orchestration;
pub mod project_config;
pub mod registry_file;
pub mod templates;
pub mod types;
pub mod utils;

// Re-export key types
pub use change_detection::{decide, RegenDecision, RegistrySnapshot};
pub use code_file::{BlockKey, BlockKind, CodeBlock, CodeFile, LineEnding, PatchError};
pub use describe::{SourceDescriber, TypeDescriber};
pub use discovery::{ClassCore, ClassKind, DiscoveryError, Discoverer, Package};
pub use orchestration::{generate, GenerateError, GenerationReport, PackageReport};
pub use project_config::{BuildConfig, ConfigError};
pub use types::{ClassDescription, PropertyDescription, PropertyShape};

/// Run the whole pipeline from a boforge.yaml file
///
/// This is the entry point for build scripts.
///
/// # Example
///
/// ```rust,no_run
/// fn main() {
///     boforge::codegen::generate_from_yaml("boforge.yaml")
///         .expect("Code generation failed");
/// }
/// ```
pub fn generate_from_yaml(yaml_path: impl AsRef<std::path::Path>) -> Result<GenerationReport, GenerateError> {
    let mut config = BuildConfig::from_file(&yaml_path)?;
    config.apply_env();
    println!("cargo:rerun-if-changed={}", yaml_path.as_ref().display());
    println!("cargo:rerun-if-changed={}", config.source_root().display());
    generate(&config)
}
