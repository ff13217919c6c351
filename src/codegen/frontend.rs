//! Front-end model stubs (`<kebab>.ts`), created once and then patched.
//!
//! Every property gets a `const <name> = { ... }` block holding its
//! constraints, placed right above the `<camel>Fields` export, an entry in
//! that export and a slot in the `new<Class>()` factory. Properties named
//! after a reserved word get a `<name>_property` binding. Existing lines are updated in place, missing lines
//! are inserted and nothing is ever removed, so hand edits survive.

use crate::codegen::code_file::{BlockKey, BlockKind, CodeBlock, CodeFile, PatchError};
use crate::codegen::utils::{number_literal, to_camel_case, to_kebab_case, to_screaming_snake_case};
use crate::schema::{ClassSpecs, Field, Property, Relationship, Schema};
use std::io;
use std::path::{Path, PathBuf};

/// Words a `const` binding cannot take. Object keys may still use them.
const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "package", "private", "protected", "public", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Name of the `const` holding the constraints of `property`
pub fn binding_name(property: &str) -> String {
    if RESERVED_WORDS.contains(&property) {
        format!("{}_property", property)
    } else {
        property.to_string()
    }
}

/// File name of the model stub of `class`
pub fn model_file_name(class: &str) -> String {
    format!("{}.ts", to_kebab_case(class))
}

/// Name of the exported class-name constant (`USER_GROUP_CLASS`)
pub fn class_constant(class: &str) -> String {
    format!("{}_CLASS", to_screaming_snake_case(class))
}

/// Result of patching one model file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelPatch {
    pub path: PathBuf,
    pub written: bool,
    pub failures: usize,
}

/// Load, patch and save the model stub of `specs` inside `models_dir`
pub fn patch_model_file(models_dir: &Path, specs: &ClassSpecs, schema: &Schema) -> io::Result<ModelPatch> {
    let path = models_dir.join(model_file_name(specs.name()));
    let mut file = CodeFile::load(&path)?;
    let failures = patch_model(&mut file, specs, schema);
    let written = file.save(&path)?;
    if written {
        tracing::debug!("Patched {}", path.display());
    }
    Ok(ModelPatch {
        path,
        written,
        failures,
    })
}

/// Bring `file` in line with `specs`. Returns the number of edits that were
/// skipped because their anchor could not be found.
pub fn patch_model(file: &mut CodeFile, specs: &ClassSpecs, schema: &Schema) -> usize {
    let mut patcher = ModelPatcher {
        file,
        specs,
        schema,
        failures: 0,
    };
    patcher.run();
    patcher.failures
}

struct ModelPatcher<'a> {
    file: &'a mut CodeFile,
    specs: &'a ClassSpecs,
    schema: &'a Schema,
    failures: usize,
}

impl ModelPatcher<'_> {
    fn class(&self) -> &str {
        self.specs.name()
    }

    fn fields_key(&self) -> BlockKey {
        BlockKey::export_const(format!("{}Fields", to_camel_case(self.class())))
    }

    fn factory_key(&self) -> BlockKey {
        BlockKey::export_function(format!("new{}", self.class()))
    }

    fn record(&mut self, result: Result<(), PatchError>) {
        if let Err(e) = result {
            tracing::error!("Skipping edit of the {} model: {}", self.class(), e);
            self.failures += 1;
        }
    }

    fn run(&mut self) {
        if self.file.is_empty() {
            self.scaffold();
        }
        let specs = self.specs;
        for property in specs.properties() {
            self.patch_property(property);
        }
    }

    fn scaffold(&mut self) {
        let class = self.class().to_string();
        let header = format!("// Model of {}, generated by boforge.", class);
        let constant = format!("export const {} = \"{}\"", class_constant(&class), class);
        let fields = format!("export const {}Fields = {{", to_camel_case(&class));
        let factory = format!("export function new{}() {{", class);

        let blocks = [
            CodeBlock::new(
                None,
                &[
                    &header,
                    "// Hand edits are kept: regeneration only adds and updates property lines.",
                    "",
                ],
            ),
            CodeBlock::keyed(BlockKey::export_const(class_constant(&class)), &[&constant, ""]),
            CodeBlock::keyed(self.fields_key(), &[&fields, "}", ""]),
            CodeBlock::keyed(self.factory_key(), &[&factory, "  return {", "  }", "}"]),
        ];
        for block in blocks {
            let result = self.file.append_block(block);
            self.record(result);
        }
    }

    fn patch_property(&mut self, property: &Property) {
        let name = property.name().to_string();
        let binding = binding_name(&name);
        let key = BlockKey::constant(binding.clone());
        let fields_key = self.fields_key();

        if !self.file.has_block(&key) {
            let opening = format!("const {} = {{", binding);
            let block = CodeBlock::keyed(key.clone(), &[&opening, "}", ""]);
            let result = self.file.insert_block_before(&fields_key, block);
            self.record(result);
        }

        let lines = match property {
            Property::Field(field) => self.field_lines(field),
            Property::Relationship(relationship) => self.relationship_lines(relationship),
        };
        for (prefix, line) in lines {
            let result = self.file.update_or_insert(&key, &prefix, &line, "}");
            self.record(result);
        }

        let (entry_prefix, entry) = if binding == name {
            (format!("{},", name), format!("  {},", name))
        } else {
            (format!("{}:", name), format!("  {}: {},", name, binding))
        };
        if !self.file.block_contains(&fields_key, &entry_prefix) {
            let result = self.file.insert_before(&fields_key, "}", &entry);
            self.record(result);
        }

        let factory_key = self.factory_key();
        if !self.file.block_contains(&factory_key, &format!("{}:", name)) {
            let initial = initial_value(property);
            let result = self
                .file
                .insert_before(&factory_key, "}", &format!("    {}: {},", name, initial));
            self.record(result);
        }
    }

    fn field_lines(&self, field: &Field) -> Vec<(String, String)> {
        let mut lines = vec![
            constraint("type", format!("\"{}\"", field.kind())),
            constraint("many", field.is_multiple().to_string()),
            constraint("mandatory", field.is_mandatory().to_string()),
        ];
        if let Some(min) = field.min_value() {
            lines.push(constraint("min", number_literal(min)));
        }
        if let Some(max) = field.max_value() {
            lines.push(constraint("max", number_literal(max)));
        }
        let (min_size, max_size) = field.size();
        if let Some(min_size) = min_size {
            lines.push(constraint("minSize", min_size.to_string()));
        }
        if let Some(max_size) = max_size {
            lines.push(constraint("maxSize", max_size.to_string()));
        }
        if !field.allowed_values().is_empty() {
            lines.push(constraint("values", json(&field.allowed_values())));
        }
        if let Some(default) = field.default_value() {
            lines.push(constraint("default", json(default)));
        }
        lines
    }

    fn relationship_lines(&mut self, relationship: &Relationship) -> Vec<(String, String)> {
        let mut lines = vec![
            constraint("type", "\"relationship\"".to_string()),
            constraint("many", relationship.is_multiple().to_string()),
            constraint("mandatory", relationship.is_mandatory().to_string()),
        ];

        let targets: Vec<String> = relationship
            .targets()
            .iter()
            .map(|target| self.target_reference(target))
            .collect();
        if relationship.is_polymorphic() {
            lines.push(constraint("targets", format!("[{}]", targets.join(", "))));
        } else if let Some(target) = targets.first() {
            lines.push(constraint("target", target.clone()));
        }
        if let Some(kind) = relationship.kind() {
            lines.push(constraint("kind", format!("\"{}\"", kind)));
        }
        lines
    }

    /// Imported constant for concrete classes, string literal for interfaces
    fn target_reference(&mut self, target: &str) -> String {
        if target == self.class() {
            return class_constant(target);
        }
        let is_interface = self.schema.get(target).is_some_and(|specs| specs.is_interface());
        if is_interface {
            return format!("\"{}\"", target);
        }
        self.ensure_import(target);
        class_constant(target)
    }

    fn ensure_import(&mut self, target: &str) {
        let constant = class_constant(target);
        let key = BlockKey::import(constant.clone());
        if self.file.has_block(&key) {
            return;
        }
        let line = format!(
            "import {{ {} }} from \"./{}\"",
            constant,
            to_kebab_case(target)
        );
        let result = match self.file.last_of_kind(BlockKind::Import).cloned() {
            Some(last) => self.file.insert_block_after(&last, CodeBlock::keyed(key, &[&line])),
            None => {
                let after_header = self
                    .file
                    .blocks()
                    .first()
                    .map_or(0, |block| usize::from(block.key.is_none()));
                self.file
                    .insert_block(after_header, CodeBlock::keyed(key, &[&line, ""]))
            }
        };
        self.record(result);
    }
}

/// `(prefix, line)` for one constraint line of a property block
fn constraint(name: &str, value: String) -> (String, String) {
    (format!("{}:", name), format!("  {}: {},", name, value))
}

fn json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn initial_value(property: &Property) -> String {
    if property.is_multiple() {
        return "[]".to_string();
    }
    property
        .as_field()
        .and_then(|field| field.default_value())
        .map_or_else(|| "null".to_string(), json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{define_interface, BusinessObjectClass, SchemaBuilder};

    fn schema(max: Option<f64>) -> Schema {
        let mut builder = SchemaBuilder::new();
        BusinessObjectClass::define_as(&mut builder, "User")
            .relationship("widgets", true, &["Widget"]);
        define_interface(&mut builder, "Commentable");
        let widget = BusinessObjectClass::define_as(&mut builder, "Widget");
        widget.string_field("name", false).set_mandatory().set_size(1, 64);
        let count = widget.int_field("count", false);
        if let Some(max) = max {
            count.max(max);
        }
        widget
            .relationship("owner", false, &["User"])
            .set_child_to_parent("widgets");
        widget.relationship("subject", false, &["Commentable", "User"]).set_one_way();
        builder.seal().unwrap()
    }

    fn patched(source: &str, schema: &Schema) -> (String, usize) {
        let mut file = CodeFile::parse(source).unwrap();
        let failures = patch_model(&mut file, schema.class("Widget").unwrap(), schema);
        (file.to_string(), failures)
    }

    #[test]
    fn test_scaffold_of_new_model() {
        let schema = schema(None);
        let (output, failures) = patched("", &schema);
        assert_eq!(failures, 0);
        assert!(output.starts_with("// Model of Widget, generated by boforge.\n"));
        assert!(output.contains("import { USER_CLASS } from \"./user\"\n\nexport const WIDGET_CLASS = \"Widget\"\n"));
        assert!(output.contains(
            "const name = {\n  type: \"string\",\n  many: false,\n  mandatory: true,\n  minSize: 1,\n  maxSize: 64,\n}\n"
        ));
        assert!(output.contains("  target: USER_CLASS,\n  kind: \"child-to-parent\",\n"));
        assert!(output.contains("  targets: [\"Commentable\", USER_CLASS],\n  kind: \"one-way\",\n"));
        assert!(output.contains("export const widgetFields = {\n  id,\n  name,\n  count,\n  owner,\n  subject,\n}\n"));
        assert!(output.ends_with("    subject: null,\n  }\n}\n"));

        // property blocks sit before the exports
        let name_at = output.find("const name = {").unwrap();
        let fields_at = output.find("export const widgetFields").unwrap();
        assert!(name_at < fields_at);
    }

    #[test]
    fn test_patching_is_idempotent() {
        let schema = schema(Some(100.0));
        let (first, _) = patched("", &schema);
        let (second, failures) = patched(&first, &schema);
        assert_eq!(failures, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_added_constraint_lands_once_and_hand_edits_survive() {
        let (first, _) = patched("", &schema(None));
        let edited = first.replace(
            "  mandatory: false,\n}\n\nconst owner",
            "  mandatory: false,\n  // shown as a badge\n}\n\nconst owner",
        );
        assert_ne!(first, edited);

        let with_max = schema(Some(100.0));
        let (second, _) = patched(&edited, &with_max);
        let (third, _) = patched(&second, &with_max);
        assert_eq!(second, third);
        assert_eq!(third.matches("  max: 100,\n").count(), 1);
        assert!(third.contains("  // shown as a badge\n  max: 100,\n}\n"));
    }

    #[test]
    fn test_missing_exports_are_counted_not_fatal() {
        let schema = schema(None);
        let source = "// hand written\nconst name = {\n  type: \"string\",\n}\n";
        let (output, failures) = patched(source, &schema);
        // no fields export to anchor new consts, no factory to patch
        assert!(failures > 0);
        assert!(output.contains("// hand written\n"));
        assert!(output.contains("  mandatory: true,\n"));
        assert!(!output.contains("const count"));
    }

    #[test]
    fn test_new_property_lands_above_the_fields_export() {
        let (first, _) = patched("", &schema(None));
        let edited = format!("{}\n// kept at the bottom\nexport function describeWidget() {{\n}}\n", first);

        let mut builder = SchemaBuilder::new();
        BusinessObjectClass::define_as(&mut builder, "User")
            .relationship("widgets", true, &["Widget"]);
        define_interface(&mut builder, "Commentable");
        let widget = BusinessObjectClass::define_as(&mut builder, "Widget");
        widget.string_field("name", false).set_mandatory().set_size(1, 64);
        widget.int_field("count", false);
        widget
            .relationship("owner", false, &["User"])
            .set_child_to_parent("widgets");
        widget.relationship("subject", false, &["Commentable", "User"]).set_one_way();
        widget.string_field("colour", false);
        let with_colour = builder.seal().unwrap();

        let (output, failures) = patched(&edited, &with_colour);
        assert_eq!(failures, 0);
        let colour_at = output.find("const colour = {").unwrap();
        let subject_at = output.find("const subject = {").unwrap();
        let fields_at = output.find("export const widgetFields").unwrap();
        assert!(subject_at < colour_at && colour_at < fields_at);
        assert!(output.ends_with("// kept at the bottom\nexport function describeWidget() {\n}\n"));
    }

    #[test]
    fn test_reserved_word_properties_get_a_safe_binding() {
        let mut builder = SchemaBuilder::new();
        let setting = BusinessObjectClass::define_as(&mut builder, "Setting");
        setting.string_field("default", false);
        setting.bool_field("new", false);
        let schema = builder.seal().unwrap();
        let specs = schema.class("Setting").unwrap();

        let mut file = CodeFile::parse("").unwrap();
        assert_eq!(patch_model(&mut file, specs, &schema), 0);
        let first = file.to_string();
        assert!(first.contains("const default_property = {\n  type: \"string\",\n"));
        assert!(first.contains("const new_property = {\n"));
        assert!(!first.contains("const default ="));
        assert!(first.contains("  default: default_property,\n  new: new_property,\n}\n"));
        assert!(first.contains("    default: null,\n    new: null,\n"));

        let mut again = CodeFile::parse(&first).unwrap();
        assert_eq!(patch_model(&mut again, specs, &schema), 0);
        assert_eq!(again.to_string(), first);
    }
}
