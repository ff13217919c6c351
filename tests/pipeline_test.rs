//! End-to-end runs of the generation pipeline over a temporary project tree.

use boforge::codegen::orchestration::{self, GENERATED_BANNER};
use boforge::codegen::{generate, BuildConfig};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const USER: &str = r#"
use boforge::BusinessObject;

#[derive(BusinessObject)]
pub struct User {
    pub id: i64,
    #[bo(mandatory)]
    pub email: String,
    pub widgets: Vec<Widget>,
}
"#;

const WIDGET: &str = r#"
use boforge::BusinessObject;

#[derive(BusinessObject)]
#[bo(table = "widgets")]
pub struct Widget {
    pub id: i64,
    #[bo(mandatory, size(1, 64))]
    pub name: String,
    pub count: i32,
    #[bo(child_to_parent = "widgets")]
    pub owner: User,
}
"#;

struct Project {
    dir: TempDir,
    config: BuildConfig,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = BuildConfig::for_source_root("demo", dir.path().join("src"));
        config.paths.models_dir = Some(dir.path().join("web/models").to_string_lossy().into_owned());
        let project = Self { dir, config };
        project.write("src/model/user_bo.rs", USER);
        project.write("src/model/widget_bo.rs", WIDGET);
        project
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

fn touch_later(path: &Path) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(10))
        .unwrap();
}

#[test]
fn test_first_run_writes_every_artifact() {
    let project = Project::new();
    let report = generate(&project.config).unwrap();

    assert_eq!(report.packages.len(), 1);
    let package = &report.packages[0];
    assert_eq!(package.module, "model");
    assert_eq!(package.decision.added, vec!["User", "Widget"]);
    assert_eq!(report.patch_failures(), 0);

    for generated in [
        "src/model/user_class.rs",
        "src/model/user_values.rs",
        "src/model/widget_class.rs",
        "src/model/widget_values.rs",
        "src/model/bo_registry.rs",
    ] {
        assert!(project.read(generated).starts_with(GENERATED_BANNER), "{}", generated);
    }

    let accessor = project.read("src/model/widget_class.rs");
    assert!(accessor.contains("class.string_field(\"name\", false).set_mandatory().set_size(1, 64);"));
    assert!(accessor.contains("class.relationship(\"owner\", false, &[\"User\"]).set_child_to_parent(\"widgets\");"));

    let registry = project.read("src/model/bo_registry.rs");
    assert!(registry.contains("registry.register(ClassEntry::new(\"User\", \"model\", "));
    assert!(registry.contains("registry.register(ClassEntry::new(\"Widget\", \"model\", "));

    let model = project.read("web/models/widget.ts");
    assert!(model.contains("export const WIDGET_CLASS = \"Widget\"\n"));
    assert!(model.contains("  kind: \"child-to-parent\",\n"));
    assert!(project.read("web/models/user.ts").contains("  kind: \"parent-to-children\",\n"));
}

#[test]
fn test_unchanged_tree_is_left_alone() {
    let project = Project::new();
    generate(&project.config).unwrap();
    let accessor = project.path("src/model/widget_class.rs");
    let model = project.path("web/models/widget.ts");
    let before = (modified(&accessor), modified(&model));

    let report = generate(&project.config).unwrap();
    assert_eq!(report.regenerated().count(), 0);
    assert_eq!(report.files_written(), 0);
    assert_eq!(report.packages[0].decision.summary(), "up to date");
    assert_eq!((modified(&accessor), modified(&model)), before);
}

#[test]
fn test_forced_run_rewrites_nothing_that_is_current() {
    let project = Project::new();
    generate(&project.config).unwrap();
    let first = project.read("src/model/widget_class.rs");

    let mut forced = project.config.clone();
    forced.generation.force = true;
    let report = generate(&forced).unwrap();

    assert!(report.packages[0].decision.forced);
    assert_eq!(report.files_written(), 0);
    assert_eq!(project.read("src/model/widget_class.rs"), first);
}

#[test]
fn test_edited_declaration_patches_the_model_once() {
    let project = Project::new();
    generate(&project.config).unwrap();

    // hand edit inside a generated block
    let model = project.read("web/models/widget.ts");
    let edited = model.replacen("const count = {\n", "const count = {\n  // shown as a badge\n", 1);
    assert_ne!(model, edited);
    project.write("web/models/widget.ts", &edited);

    project.write(
        "src/model/widget_bo.rs",
        &WIDGET.replace("    pub count: i32,", "    #[bo(max = 100)]\n    pub count: i32,"),
    );
    touch_later(&project.path("src/model/widget_bo.rs"));

    let report = generate(&project.config).unwrap();
    assert_eq!(report.packages[0].decision.changed, vec!["Widget"]);
    assert!(project
        .read("src/model/widget_class.rs")
        .contains("class.int_field(\"count\", false).max(100.0);"));

    let mut forced = project.config.clone();
    forced.generation.force = true;
    generate(&forced).unwrap();

    let model = project.read("web/models/widget.ts");
    assert_eq!(model.matches("  max: 100,\n").count(), 1);
    assert!(model.contains("  // shown as a badge\n"));
    assert_eq!(report.patch_failures(), 0);
}

#[test]
fn test_removed_declaration_cleans_up_its_files() {
    let project = Project::new();
    project.write("src/model/gadget_bo.rs", "pub struct Gadget { pub label: String }\n");
    generate(&project.config).unwrap();
    assert!(project.path("src/model/gadget_class.rs").exists());

    fs::remove_file(project.path("src/model/gadget_bo.rs")).unwrap();
    let report = generate(&project.config).unwrap();

    assert_eq!(report.packages[0].decision.removed, vec!["Gadget"]);
    assert!(!project.path("src/model/gadget_class.rs").exists());
    assert!(!project.path("src/model/gadget_values.rs").exists());
    // front-end models are never deleted
    assert!(project.path("web/models/gadget.ts").exists());
}

#[test]
fn test_package_emptied_of_declarations_is_retired() {
    let project = Project::new();
    project.write("src/other/gadget_bo.rs", "pub struct Gadget { pub label: String }\n");
    generate(&project.config).unwrap();
    assert!(project.path("src/other/bo_registry.rs").exists());

    fs::remove_file(project.path("src/other/gadget_bo.rs")).unwrap();
    let report = generate(&project.config).unwrap();

    let other = report.packages.iter().find(|p| p.module == "other").unwrap();
    assert_eq!(other.decision.removed, vec!["Gadget"]);
    assert_eq!(report.regenerated().count(), 1);
    for retired in [
        "src/other/gadget_class.rs",
        "src/other/gadget_values.rs",
        "src/other/bo_registry.rs",
    ] {
        assert!(!project.path(retired).exists(), "{}", retired);
    }
    // the untouched package keeps its registry
    assert!(project.read("src/model/bo_registry.rs").contains("\"Widget\""));

    let again = generate(&project.config).unwrap();
    assert_eq!(again.regenerated().count(), 0);
    assert!(again.packages.iter().all(|p| p.module != "other"));
}

#[test]
fn test_inconsistent_schema_writes_nothing() {
    let project = Project::new();
    project.write(
        "src/model/widget_bo.rs",
        &WIDGET.replace("child_to_parent = \"widgets\"", "child_to_parent = \"gadgets\""),
    );

    let error = generate(&project.config).unwrap_err();
    assert!(error.to_string().contains("gadgets"), "{}", error);
    assert!(!project.path("src/model/bo_registry.rs").exists());
    assert!(!project.path("web/models").exists());
}

#[test]
fn test_config_file_paths_are_relative_to_the_file() {
    let project = Project::new();
    project.write(
        "boforge.yaml",
        "project:\n  name: demo\npaths:\n  source_root: src\n  models_dir: web/models\n",
    );

    let config = BuildConfig::from_file(project.path("boforge.yaml")).unwrap();
    assert_eq!(config.source_root(), project.path("src"));

    let plans = orchestration::plan(&config).unwrap();
    assert_eq!(plans.len(), 1);
    assert!(plans[0].decision.needs_regen());
    assert_eq!(plans[0].registry_path, project.path("src/model/bo_registry.rs"));
}
