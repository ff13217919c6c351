//! Per-package registry file: generation and read-back.
//!
//! The registry file is both the runtime entry point that registers every
//! class of the package and the snapshot change detection compares against.

use crate::codegen::change_detection::RegistrySnapshot;
use crate::codegen::discovery::{DiscoveryError, Package};
use crate::codegen::fs_utils;
use crate::codegen::utils::{escape_rust_string, to_snake_case};
use crate::schema::ClassEntry;
use std::fmt::{self, Write};
use std::path::Path;
use syn::visit::Visit;

/// Render the registry file of a package
pub fn render_registry(package: &Package) -> Result<String, fmt::Error> {
    let mut output = String::new();
    write_registry(&mut output, package)?;
    Ok(output)
}

pub fn write_registry<W: Write>(writer: &mut W, package: &Package) -> fmt::Result {
    writeln!(writer, "// Code generated by boforge. DO NOT EDIT.")?;
    writeln!(writer)?;
    writeln!(writer, "use boforge::schema::{{ClassEntry, ClassRegistry}};")?;

    let concrete: Vec<_> = package.classes.iter().filter(|c| !c.is_interface()).collect();
    if !concrete.is_empty() {
        writeln!(writer)?;
        for class in &concrete {
            writeln!(
                writer,
                "use super::{}_class::{}Class;",
                to_snake_case(&class.name),
                class.name
            )?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "/// Register every business object of `{}`", package.module)?;
    writeln!(writer, "pub fn init(registry: &mut ClassRegistry) {{")?;
    for class in &package.classes {
        let entry = format!(
            "ClassEntry::new(\"{}\", \"{}\", {})",
            escape_rust_string(&class.name),
            escape_rust_string(&package.module),
            class.modified_ms
        );
        if class.is_interface() {
            writeln!(writer, "    registry.register_interface({});", entry)?;
        } else {
            writeln!(writer, "    registry.register({}, {}Class::define);", entry, class.name)?;
        }
    }
    writeln!(writer, "}}")
}

/// Collects `ClassEntry::new("Name", "module", millis)` calls
#[derive(Default)]
struct EntryCollector {
    entries: Vec<ClassEntry>,
}

impl<'ast> Visit<'ast> for EntryCollector {
    fn visit_expr_call(&mut self, call: &'ast syn::ExprCall) {
        if let Some(entry) = class_entry(call) {
            self.entries.push(entry);
        }
        syn::visit::visit_expr_call(self, call);
    }
}

fn class_entry(call: &syn::ExprCall) -> Option<ClassEntry> {
    let syn::Expr::Path(func) = call.func.as_ref() else {
        return None;
    };
    let segments: Vec<String> = func.path.segments.iter().map(|s| s.ident.to_string()).collect();
    if !segments.ends_with(&["ClassEntry".to_string(), "new".to_string()]) || call.args.len() != 3 {
        return None;
    }

    let mut args = call.args.iter().map(|arg| match arg {
        syn::Expr::Lit(lit) => Some(&lit.lit),
        _ => None,
    });
    let (Some(Some(syn::Lit::Str(name))), Some(Some(syn::Lit::Str(module))), Some(Some(syn::Lit::Int(ms)))) =
        (args.next(), args.next(), args.next())
    else {
        return None;
    };
    let modified_ms = ms.base10_parse::<u64>().ok()?;
    Some(ClassEntry::new(&name.value(), &module.value(), modified_ms))
}

/// Parse registry file contents into a snapshot
pub fn parse_snapshot(path: &Path, contents: &str) -> Result<RegistrySnapshot, DiscoveryError> {
    let file = syn::parse_file(contents).map_err(|source| DiscoveryError::Syntax {
        path: path.to_path_buf(),
        source,
    })?;
    let mut collector = EntryCollector::default();
    collector.visit_file(&file);
    Ok(RegistrySnapshot::new(collector.entries))
}

/// Read the registry file of a package. A missing file is an empty snapshot.
pub fn read_snapshot(path: &Path) -> Result<RegistrySnapshot, DiscoveryError> {
    let contents = fs_utils::read_optional(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match contents {
        Some(contents) => parse_snapshot(path, &contents),
        None => Ok(RegistrySnapshot::default()),
    }
}
