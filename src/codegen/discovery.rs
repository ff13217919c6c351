//! Discovery of business-object declaration files.
//!
//! Walks a source tree, parses every file ending with the declaration suffix
//! and produces one `ClassCore` per file, grouped into packages (the
//! directories that contain declarations). A directory that only holds a
//! generated registry file is still a package, with no classes, so the
//! registry entries of its deleted declarations can be retired.

use crate::codegen::fs_utils;
use crate::codegen::project_config::BuildConfig;
use crate::codegen::utils::to_snake_case;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never scanned, whatever the configuration says
pub const ALWAYS_SKIPPED: &[&str] = &[".git", ".hg", ".svn", ".bzr", "vendor"];

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error("{} declares more than one business object: {}", .path.display(), .names.join(", "))]
    MultipleDeclarations { path: PathBuf, names: Vec<String> },

    #[error("{} declares no struct or trait", .path.display())]
    NoDeclaration { path: PathBuf },

    #[error("{} declares '{name}', so it must be named {expected}", .path.display())]
    NameMismatch {
        path: PathBuf,
        name: String,
        expected: String,
    },

    #[error("class '{name}' is declared in both {} and {}", .first.display(), .second.display())]
    DuplicateClass {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{} is outside the crate root {}", .path.display(), .crate_root.display())]
    OutsideCrateRoot { path: PathBuf, crate_root: PathBuf },

    #[error("{}: {message}", .path.display())]
    InvalidDeclaration { path: PathBuf, message: String },
}

/// Whether a declaration is a concrete class or an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Concrete,
    Interface,
}

/// What discovery knows about one declaration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCore {
    pub name: String,
    pub modified_ms: u64,
    pub path: PathBuf,
    pub kind: ClassKind,
}

impl ClassCore {
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }
}

/// A directory holding declaration files or a registry file
#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub dir: PathBuf,
    /// Module path relative to the crate root, `crate` for the root itself
    pub module: String,
    pub classes: Vec<ClassCore>,
}

impl Package {
    pub fn class(&self, name: &str) -> Option<&ClassCore> {
        self.classes.iter().find(|c| c.name == name)
    }
}

/// Finds declaration files under a source root
#[derive(Debug, Clone)]
pub struct Discoverer {
    suffix: String,
    skip_dirs: Vec<String>,
    crate_root: PathBuf,
    registry_file: Option<String>,
}

impl Discoverer {
    pub fn new(suffix: &str, skip_dirs: &[String], crate_root: impl Into<PathBuf>) -> Self {
        Self {
            suffix: suffix.to_string(),
            skip_dirs: skip_dirs.to_vec(),
            crate_root: crate_root.into(),
            registry_file: None,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(
            &config.discovery.suffix,
            &config.discovery.skip_dirs,
            config.crate_root(),
        )
        .with_registry_file(&config.generation.registry_file)
    }

    /// Also report directories holding `file_name` but no declarations
    pub fn with_registry_file(mut self, file_name: &str) -> Self {
        self.registry_file = Some(file_name.to_string());
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        ALWAYS_SKIPPED.contains(&name.as_ref()) || self.skip_dirs.iter().any(|d| *d == name)
    }

    fn is_registry(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_file()
            && self
                .registry_file
                .as_deref()
                .is_some_and(|name| entry.file_name().to_string_lossy() == name)
    }

    fn is_declaration(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_file()
            && entry.file_name().to_string_lossy().ends_with(&self.suffix)
    }

    /// Discover every package under `root`, in file-name order
    pub fn discover(&self, root: &Path) -> Result<Vec<Package>, DiscoveryError> {
        let mut by_dir: IndexMap<PathBuf, Vec<ClassCore>> = IndexMap::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut registry_dirs: Vec<PathBuf> = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_skipped(e));

        for entry in walker {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            if self.is_registry(&entry) {
                registry_dirs.push(entry.path().parent().unwrap_or(root).to_path_buf());
                continue;
            }
            if !self.is_declaration(&entry) {
                continue;
            }

            let core = self.read_core(entry.path())?;
            if let Some(first) = seen.get(&core.name) {
                return Err(DiscoveryError::DuplicateClass {
                    name: core.name.clone(),
                    first: first.clone(),
                    second: core.path.clone(),
                });
            }
            seen.insert(core.name.clone(), core.path.clone());

            tracing::debug!("Discovered {} in {}", core.name, core.path.display());
            let dir = entry.path().parent().unwrap_or(root).to_path_buf();
            by_dir.entry(dir).or_default().push(core);
        }

        for dir in registry_dirs {
            if !by_dir.contains_key(&dir) {
                tracing::debug!("Registry without declarations in {}", dir.display());
                by_dir.insert(dir, Vec::new());
            }
        }

        let mut packages = by_dir
            .into_iter()
            .map(|(dir, classes)| {
                Ok(Package {
                    module: self.module_path(&dir)?,
                    dir,
                    classes,
                })
            })
            .collect::<Result<Vec<_>, DiscoveryError>>()?;
        packages.sort_by(|a, b| a.dir.cmp(&b.dir));
        Ok(packages)
    }

    /// Parse one declaration file into its core descriptor
    pub fn read_core(&self, path: &Path) -> Result<ClassCore, DiscoveryError> {
        let io_error = |source| DiscoveryError::Io {
            path: path.to_path_buf(),
            source,
        };
        let contents = std::fs::read_to_string(path).map_err(io_error)?;
        let modified_ms = fs_utils::modified_millis(path).map_err(io_error)?;
        parse_core(path, &contents, modified_ms, &self.suffix)
    }

    /// `model::billing` for `<crate_root>/model/billing`
    pub fn module_path(&self, dir: &Path) -> Result<String, DiscoveryError> {
        let relative = dir
            .strip_prefix(&self.crate_root)
            .map_err(|_| DiscoveryError::OutsideCrateRoot {
                path: dir.to_path_buf(),
                crate_root: self.crate_root.clone(),
            })?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.is_empty() {
            Ok("crate".to_string())
        } else {
            Ok(segments.join("::"))
        }
    }
}

/// Extract the single struct or trait declared by a source file
pub fn parse_core(
    path: &Path,
    contents: &str,
    modified_ms: u64,
    suffix: &str,
) -> Result<ClassCore, DiscoveryError> {
    let file = syn::parse_file(contents).map_err(|source| DiscoveryError::Syntax {
        path: path.to_path_buf(),
        source,
    })?;

    let declarations: Vec<(String, ClassKind)> = file
        .items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Struct(s) => Some((s.ident.to_string(), ClassKind::Concrete)),
            syn::Item::Trait(t) => Some((t.ident.to_string(), ClassKind::Interface)),
            _ => None,
        })
        .collect();

    let (name, kind) = match declarations.as_slice() {
        [] => {
            return Err(DiscoveryError::NoDeclaration {
                path: path.to_path_buf(),
            })
        }
        [single] => single.clone(),
        many => {
            return Err(DiscoveryError::MultipleDeclarations {
                path: path.to_path_buf(),
                names: many.iter().map(|(n, _)| n.clone()).collect(),
            })
        }
    };

    let expected = format!("{}{}", to_snake_case(&name), suffix);
    let actual = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    if actual != expected {
        return Err(DiscoveryError::NameMismatch {
            path: path.to_path_buf(),
            name,
            expected,
        });
    }

    Ok(ClassCore {
        name,
        modified_ms,
        path: path.to_path_buf(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn discoverer(root: &Path) -> Discoverer {
        Discoverer::new("_bo.rs", &["target".to_string()], root)
    }

    #[test]
    fn test_parse_core_struct_and_trait() {
        let core = parse_core(
            Path::new("model/widget_bo.rs"),
            "use std::fmt;\npub struct Widget { name: String }\nimpl Widget {}\n",
            42,
            "_bo.rs",
        )
        .unwrap();
        assert_eq!(core.name, "Widget");
        assert_eq!(core.kind, ClassKind::Concrete);
        assert_eq!(core.modified_ms, 42);

        let core = parse_core(
            Path::new("model/commentable_bo.rs"),
            "pub trait Commentable {}\n",
            1,
            "_bo.rs",
        )
        .unwrap();
        assert!(core.is_interface());
    }

    #[test]
    fn test_parse_core_rejects_bad_files() {
        let two = parse_core(
            Path::new("widget_bo.rs"),
            "struct Widget {}\nstruct Gadget {}\n",
            0,
            "_bo.rs",
        );
        assert!(matches!(two, Err(DiscoveryError::MultipleDeclarations { .. })));

        let none = parse_core(Path::new("widget_bo.rs"), "fn main() {}\n", 0, "_bo.rs");
        assert!(matches!(none, Err(DiscoveryError::NoDeclaration { .. })));

        let mismatch = parse_core(Path::new("gadget_bo.rs"), "struct Widget {}\n", 0, "_bo.rs");
        match mismatch {
            Err(DiscoveryError::NameMismatch { expected, .. }) => {
                assert_eq!(expected, "widget_bo.rs")
            }
            other => panic!("unexpected: {:?}", other),
        }

        let broken = parse_core(Path::new("widget_bo.rs"), "struct Widget {", 0, "_bo.rs");
        assert!(matches!(broken, Err(DiscoveryError::Syntax { .. })));
    }

    #[test]
    fn test_discover_groups_packages_and_skips_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "model/widget_bo.rs", "pub struct Widget {}\n");
        write(root, "model/user_bo.rs", "pub struct User {}\n");
        write(root, "model/widget_class.rs", "// generated\n");
        write(root, "model/billing/invoice_bo.rs", "pub struct Invoice {}\n");
        write(root, "empty/nested/deep/order_bo.rs", "pub struct Order {}\n");
        write(root, ".git/stale_bo.rs", "pub struct Other {}\n");
        write(root, "vendor/lib_bo.rs", "pub struct Lib {}\n");
        write(root, "target/debug/build_bo.rs", "pub struct Build {}\n");

        let packages = discoverer(root).discover(root).unwrap();
        let modules: Vec<&str> = packages.iter().map(|p| p.module.as_str()).collect();
        assert_eq!(modules, vec!["empty::nested::deep", "model", "model::billing"]);

        let model = &packages[1];
        let names: Vec<&str> = model.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Widget"]);
        assert!(model.class("Widget").unwrap().modified_ms > 0);
    }

    #[test]
    fn test_registry_without_declarations_is_an_empty_package() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "model/widget_bo.rs", "pub struct Widget {}\n");
        write(root, "model/bo_registry.rs", "// generated\n");
        write(root, "retired/bo_registry.rs", "// generated\n");
        write(root, "retired/gadget_class.rs", "// generated\n");

        let packages = discoverer(root)
            .with_registry_file("bo_registry.rs")
            .discover(root)
            .unwrap();
        let modules: Vec<&str> = packages.iter().map(|p| p.module.as_str()).collect();
        assert_eq!(modules, vec!["model", "retired"]);
        assert_eq!(packages[0].classes.len(), 1);
        assert!(packages[1].classes.is_empty());

        // without a registry file name only declarations count
        assert_eq!(discoverer(root).discover(root).unwrap().len(), 1);
    }

    #[test]
    fn test_discover_rejects_duplicate_class_names() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "a/widget_bo.rs", "pub struct Widget {}\n");
        write(root, "b/widget_bo.rs", "pub struct Widget {}\n");

        let err = discoverer(root).discover(root).unwrap_err();
        assert!(matches!(err, DiscoveryError::DuplicateClass { ref name, .. } if name == "Widget"));
    }

    #[test]
    fn test_module_path() {
        let discoverer = discoverer(Path::new("/repo/src"));
        assert_eq!(discoverer.module_path(Path::new("/repo/src")).unwrap(), "crate");
        assert_eq!(
            discoverer.module_path(Path::new("/repo/src/model/billing")).unwrap(),
            "model::billing"
        );
        assert!(discoverer.module_path(Path::new("/elsewhere")).is_err());
    }
}
