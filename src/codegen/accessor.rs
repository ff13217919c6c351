//! Template emitter for the fully generated per-class files.
//!
//! Emission is a pure function of the class description: the same description
//! always renders byte-identical output, which is what lets unchanged files
//! keep their modification times.

use crate::codegen::templates::{render, ACCESSOR_TEMPLATE, VALUES_TEMPLATE};
use crate::codegen::types::{ClassDescription, PropertyDescription, PropertyShape};
use crate::codegen::utils::{escape_rust_string, rust_ident, to_camel_case, to_snake_case};
use crate::schema::{BusinessObjectClass, FieldKind, RelationKind, Superclass, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Write};

/// Method names of generated accessor classes that properties must not shadow
const RESERVED_MEMBERS: &[&str] = &["bind", "bind_as", "define", "define_as", "specs", "superclass"];

/// File name of the accessor file of `class`
pub fn accessor_file_name(class: &str) -> String {
    format!("{}_class.rs", to_snake_case(class))
}

/// File name of the value-mapper file of `class`
pub fn values_file_name(class: &str) -> String {
    format!("{}_values.rs", to_snake_case(class))
}

/// Name of the struct member and accessor method generated for a property
pub fn member_name(property: &str) -> String {
    if RESERVED_MEMBERS.contains(&property) {
        format!("{}_property", property)
    } else {
        rust_ident(property)
    }
}

/// Module path of a generated accessor, seen from `current_module`
fn accessor_path(class: &str, current_module: &str, modules: &HashMap<String, String>) -> String {
    let item = format!("{}_class::{}Class", to_snake_case(class), class);
    match modules.get(class) {
        Some(module) if module == current_module => format!("super::{}", item),
        Some(module) if module == "crate" => format!("crate::{}", item),
        Some(module) => format!("crate::{}::{}", module, item),
        None => format!("super::{}", item),
    }
}

/// Render the accessor file of a concrete class.
///
/// `module` is the package module of the class and `modules` maps every class
/// of the schema to its package module, for cross-package parent imports.
pub fn render_accessor(
    description: &ClassDescription,
    module: &str,
    modules: &HashMap<String, String>,
) -> Result<String, fmt::Error> {
    let class = &description.name;
    let mut schema_imports: BTreeSet<&str> = ["ClassBuilder", "Schema", "SchemaBuilder", "SchemaError"]
        .into_iter()
        .collect();
    let mut parent_import = None;

    let (superclass, constructor) = match &description.superclass {
        Superclass::BusinessObject => {
            schema_imports.insert("BusinessObjectClass");
            (
                "BusinessObjectClass".to_string(),
                "BusinessObjectClass::define_as(builder, name)".to_string(),
            )
        }
        Superclass::QueryParams => {
            schema_imports.insert("QueryParamsClass");
            (
                "QueryParamsClass".to_string(),
                "QueryParamsClass::define_as(builder, name)".to_string(),
            )
        }
        Superclass::Class(parent) => {
            parent_import = Some(accessor_path(parent, module, modules));
            let parent_class = format!("{}Class", parent);
            let constructor = format!(
                "{}::define_as(builder, name).extends({}::NAME)",
                parent_class, parent_class
            );
            (parent_class, constructor)
        }
    };

    let mut declarations = String::new();
    let mut definitions = String::new();
    let mut initializations = String::new();
    let mut accessors = String::new();

    for property in &description.properties {
        let member = member_name(&property.name);
        let handle = if property.is_relationship() {
            schema_imports.insert("Relationship");
            "Relationship"
        } else {
            schema_imports.insert("Field");
            "Field"
        };
        let lookup = if property.is_relationship() { "relationship" } else { "field" };

        writeln!(declarations, "    {}: Arc<{}>,", member, handle)?;
        writeln!(definitions, "        {};", definition(property, &mut schema_imports)?)?;
        writeln!(
            initializations,
            "            {}: specs.{}(\"{}\")?,",
            member,
            lookup,
            escape_rust_string(&property.name)
        )?;
        write_accessor_method(&mut accessors, &member, handle)?;
    }

    let specs = if description.properties.is_empty() {
        String::new()
    } else {
        "        let specs = schema.class(name)?;\n".to_string()
    };

    let mut imports = String::new();
    write_imports(
        &mut imports,
        &schema_imports,
        !description.properties.is_empty(),
        parent_import.as_deref(),
    )?;

    let source = source_file_name(description);
    let camel = to_camel_case(class);
    let options = class_options(description)?;
    Ok(render(
        ACCESSOR_TEMPLATE,
        &[
            ("SOURCE", &source),
            ("IMPORTS", &imports),
            ("CLASS", class),
            ("CAMEL", &camel),
            ("SUPER_CONSTRUCTOR", &constructor),
            ("SUPER", &superclass),
            ("CLASS_OPTIONS", &options),
            ("DECLARATIONS", &declarations),
            ("DEFINITIONS", &definitions),
            ("SPECS", &specs),
            ("INITIALIZATIONS", &initializations),
            ("ACCESSORS", &accessors),
        ],
    ))
}

fn write_accessor_method<W: Write>(writer: &mut W, member: &str, handle: &str) -> fmt::Result {
    writeln!(writer)?;
    writeln!(writer, "    pub fn {}(&self) -> &Arc<{}> {{", member, handle)?;
    writeln!(writer, "        &self.{}", member)?;
    writeln!(writer, "    }}")
}

fn write_imports<W: Write>(
    writer: &mut W,
    schema_imports: &BTreeSet<&str>,
    uses_arc: bool,
    parent_import: Option<&str>,
) -> fmt::Result {
    let schema_imports: Vec<&str> = schema_imports.iter().copied().collect();
    writeln!(writer, "use boforge::schema::{{{}}};", schema_imports.join(", "))?;
    writeln!(writer, "use std::ops::Deref;")?;
    if uses_arc {
        writeln!(writer, "use std::sync::Arc;")?;
    }
    if let Some(parent_import) = parent_import {
        writeln!(writer)?;
        writeln!(writer, "use {};", parent_import)?;
    }
    writeln!(writer)
}

fn source_file_name(description: &ClassDescription) -> String {
    description
        .source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Chained class-level setters applied only by `define`
fn class_options(description: &ClassDescription) -> Result<String, fmt::Error> {
    let mut options = String::new();
    if let Some(table) = &description.table {
        write!(options, ".set_table(\"{}\")", escape_rust_string(table))?;
    }
    if let Some(database) = &description.database {
        write!(options, ".set_database(\"{}\")", escape_rust_string(database))?;
    }
    if description.transient {
        options.push_str(".set_not_persisted()");
    }
    if description.is_abstract {
        options.push_str(".set_abstract()");
    }
    Ok(options)
}

/// One definition statement (without the trailing `;`)
fn definition(property: &PropertyDescription, imports: &mut BTreeSet<&str>) -> Result<String, fmt::Error> {
    let name = escape_rust_string(&property.name);
    let mut line = match &property.shape {
        PropertyShape::Scalar(kind) => {
            format!("class.{}(\"{}\", {})", kind.constructor(), name, property.multiple)
        }
        PropertyShape::Class(targets) => {
            let targets: Vec<String> = targets
                .iter()
                .map(|t| format!("\"{}\"", escape_rust_string(t)))
                .collect();
            format!(
                "class.relationship(\"{}\", {}, &[{}])",
                name,
                property.multiple,
                targets.join(", ")
            )
        }
    };

    if property.mandatory {
        line.push_str(".set_mandatory()");
    }
    if property.transient {
        line.push_str(".set_not_persisted()");
    }
    if let Some(column) = &property.column {
        write!(line, ".set_column(\"{}\")", escape_rust_string(column))?;
    }
    if let Some(min) = property.min {
        write!(line, ".min({:?})", min)?;
    }
    if let Some(max) = property.max {
        write!(line, ".max({:?})", max)?;
    }
    if let Some((min, max)) = property.size {
        write!(line, ".set_size({}, {})", min, max)?;
    }
    if !property.only.is_empty() {
        let values: Vec<String> = property
            .only
            .iter()
            .map(|v| format!("\"{}\"", escape_rust_string(v)))
            .collect();
        write!(line, ".only(&[{}])", values.join(", "))?;
    }
    if let Some(default) = &property.default {
        imports.insert("Value");
        write!(line, ".set_default({})", value_literal(default))?;
    }
    if let Some(relation) = &property.relation {
        match (relation.kind, &relation.back_ref) {
            (RelationKind::OneWay, _) => line.push_str(".set_one_way()"),
            (kind, Some(back_ref)) => {
                write!(
                    line,
                    ".set_{}(\"{}\")",
                    to_snake_case(kind.variant()),
                    escape_rust_string(back_ref)
                )?;
            }
            (kind, None) => {
                imports.insert("RelationKind");
                write!(line, ".set_relation_kind(RelationKind::{})", kind.variant())?;
            }
        }
    }
    Ok(line)
}

/// Rust expression producing `value`
fn value_literal(value: &Value) -> String {
    match value {
        Value::Null => "Value::Null".to_string(),
        Value::Bool(b) => format!("Value::Bool({})", b),
        Value::String(s) => format!("Value::from(\"{}\")", escape_rust_string(s)),
        Value::Int(v) => format!("Value::Int({})", v),
        Value::BigInt(v) => format!("Value::BigInt({})", v),
        Value::Real(v) => format!("Value::Real({:?})", v),
        Value::Double(v) => format!("Value::Double({:?})", v),
        Value::Date(d) => format!("Value::date_from_millis({})", d.timestamp_millis()),
        Value::Enum(s) => format!("Value::Enum(\"{}\".to_string())", escape_rust_string(s)),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(value_literal).collect();
            format!("Value::List(vec![{}])", items.join(", "))
        }
    }
}

/// Render the value-mapper file of a concrete class
pub fn render_values(description: &ClassDescription) -> Result<String, fmt::Error> {
    let class = &description.name;
    let mut mapped: Vec<(String, bool)> = Vec::new();
    if description.has_identity_field {
        mapped.push((BusinessObjectClass::IDENTITY.to_string(), false));
    }
    for property in &description.properties {
        if property.mappable && !property.is_relationship() {
            mapped.push((
                property.name.clone(),
                property.field_kind() == Some(FieldKind::Enum),
            ));
        }
    }

    let mut get_value = String::new();
    let mut set_value = String::new();
    write_get_value(&mut get_value, &mapped)?;
    write_set_value(&mut set_value, &mapped)?;

    let schema_imports = if mapped.is_empty() {
        "SchemaError, Value, ValueMapper"
    } else {
        "FromValue, SchemaError, Value, ValueMapper"
    };
    let source = source_file_name(description);
    let source_module = description.source_module();
    Ok(render(
        VALUES_TEMPLATE,
        &[
            ("SOURCE_MODULE", &source_module),
            ("SOURCE", &source),
            ("SCHEMA_IMPORTS", schema_imports),
            ("CLASS", class),
            ("GET_VALUE", &get_value),
            ("SET_VALUE", &set_value),
        ],
    ))
}

const UNKNOWN_PROPERTY: &str = "SchemaError::unknown_property(Self::CLASS_NAME, property)";

/// `get_value` arms for `(property, is_enum)` pairs
fn write_get_value<W: Write>(writer: &mut W, mapped: &[(String, bool)]) -> fmt::Result {
    if mapped.is_empty() {
        writeln!(writer, "    fn get_value(&self, property: &str) -> Result<Value, SchemaError> {{")?;
        writeln!(writer, "        Err({})", UNKNOWN_PROPERTY)?;
        return writeln!(writer, "    }}");
    }

    writeln!(writer, "    #[allow(clippy::clone_on_copy)]")?;
    writeln!(writer, "    fn get_value(&self, property: &str) -> Result<Value, SchemaError> {{")?;
    writeln!(writer, "        match property {{")?;
    for (name, is_enum) in mapped {
        let conversion = if *is_enum { ".into_enum()" } else { "" };
        writeln!(
            writer,
            "            \"{}\" => Ok(Value::from(self.{}.clone()){}),",
            escape_rust_string(name),
            rust_ident(name),
            conversion
        )?;
    }
    writeln!(writer, "            _ => Err({}),", UNKNOWN_PROPERTY)?;
    writeln!(writer, "        }}")?;
    writeln!(writer, "    }}")
}

fn write_set_value<W: Write>(writer: &mut W, mapped: &[(String, bool)]) -> fmt::Result {
    if mapped.is_empty() {
        writeln!(writer, "    fn set_value(&mut self, property: &str, _value: Value) -> Result<(), SchemaError> {{")?;
        writeln!(writer, "        Err({})", UNKNOWN_PROPERTY)?;
        return writeln!(writer, "    }}");
    }

    writeln!(writer, "    fn set_value(&mut self, property: &str, value: Value) -> Result<(), SchemaError> {{")?;
    writeln!(writer, "        match property {{")?;
    for (name, _) in mapped {
        writeln!(
            writer,
            "            \"{}\" => self.{} = FromValue::from_value(value)?,",
            escape_rust_string(name),
            rust_ident(name)
        )?;
    }
    writeln!(writer, "            _ => return Err({}),", UNKNOWN_PROPERTY)?;
    writeln!(writer, "        }}")?;
    writeln!(writer, "        Ok(())")?;
    writeln!(writer, "    }}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::discovery::ClassKind;
    use crate::codegen::types::RelationDecl;

    fn widget() -> ClassDescription {
        let mut widget = ClassDescription::new("Widget", ClassKind::Concrete, "src/model/widget_bo.rs");
        let mut name = PropertyDescription::new("name", PropertyShape::Scalar(FieldKind::String), false);
        name.mandatory = true;
        name.size = Some((1, 64));
        let mut count = PropertyDescription::new("count", PropertyShape::Scalar(FieldKind::Int), false);
        count.max = Some(100.0);
        count.default = Some(Value::Int(1));
        let mut owner = PropertyDescription::new("owner", PropertyShape::Class(vec!["User".into()]), false);
        owner.relation = Some(RelationDecl {
            kind: RelationKind::ChildToParent,
            back_ref: Some("widgets".into()),
        });
        widget.properties = vec![name, count, owner];
        widget.has_identity_field = true;
        widget
    }

    fn modules() -> HashMap<String, String> {
        [("Widget", "model"), ("User", "model"), ("Person", "people")]
            .into_iter()
            .map(|(c, m)| (c.to_string(), m.to_string()))
            .collect()
    }


    struct RefusingWriter;

    impl Write for RefusingWriter {
        fn write_str(&mut self, _: &str) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn test_value_mapper_writers_report_failures() {
        let mapped = vec![("name".to_string(), false)];
        assert!(write_get_value(&mut RefusingWriter, &mapped).is_err());
        assert!(write_set_value(&mut RefusingWriter, &[]).is_err());

        let mut output = String::new();
        write_set_value(&mut output, &mapped).unwrap();
        assert!(output.contains("\"name\" => self.name = FromValue::from_value(value)?,"));
    }

    #[test]
    fn test_accessor_for_business_object() {
        let rendered = render_accessor(&widget(), "model", &modules()).unwrap();
        let expected = r#"// Code generated by boforge from widget_bo.rs. DO NOT EDIT.

use boforge::schema::{BusinessObjectClass, ClassBuilder, Field, Relationship, Schema, SchemaBuilder, SchemaError, Value};
use std::ops::Deref;
use std::sync::Arc;

/// Schema accessors for `Widget`
#[derive(Debug, Clone)]
pub struct WidgetClass {
    superclass: BusinessObjectClass,
    name: Arc<Field>,
    count: Arc<Field>,
    owner: Arc<Relationship>,
}

impl WidgetClass {
    pub const NAME: &'static str = "Widget";
    /// Resource name used in REST paths
    pub const RESOURCE: &'static str = "widget";

    /// Register `Widget` on a schema builder
    pub fn define(builder: &mut SchemaBuilder) {
        Self::define_as(builder, Self::NAME);
    }

    /// Define the class `name` with the properties of `Widget`, after those of its ancestors
    pub fn define_as<'b>(builder: &'b mut SchemaBuilder, name: &str) -> &'b mut ClassBuilder {
        let class = BusinessObjectClass::define_as(builder, name);
        class.string_field("name", false).set_mandatory().set_size(1, 64);
        class.int_field("count", false).max(100.0).set_default(Value::Int(1));
        class.relationship("owner", false, &["User"]).set_child_to_parent("widgets");
        class
    }

    pub fn bind(schema: &Schema) -> Result<Self, SchemaError> {
        Self::bind_as(schema, Self::NAME)
    }

    pub fn bind_as(schema: &Schema, name: &str) -> Result<Self, SchemaError> {
        let specs = schema.class(name)?;
        Ok(Self {
            superclass: BusinessObjectClass::bind_as(schema, name)?,
            name: specs.field("name")?,
            count: specs.field("count")?,
            owner: specs.relationship("owner")?,
        })
    }

    pub fn superclass(&self) -> &BusinessObjectClass {
        &self.superclass
    }

    pub fn name(&self) -> &Arc<Field> {
        &self.name
    }

    pub fn count(&self) -> &Arc<Field> {
        &self.count
    }

    pub fn owner(&self) -> &Arc<Relationship> {
        &self.owner
    }
}

impl Deref for WidgetClass {
    type Target = BusinessObjectClass;

    fn deref(&self) -> &Self::Target {
        &self.superclass
    }
}
"#;
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_accessor_for_subclass_in_other_package() {
        let mut employee = ClassDescription::new("Employee", ClassKind::Concrete, "src/model/employee_bo.rs");
        employee.superclass = Superclass::Class("Person".into());
        employee.table = Some("staff".into());
        employee.is_abstract = true;

        let rendered = render_accessor(&employee, "model", &modules()).unwrap();
        assert!(rendered.contains("use boforge::schema::{ClassBuilder, Schema, SchemaBuilder, SchemaError};\n"));
        assert!(rendered.contains("use crate::people::person_class::PersonClass;\n"));
        assert!(!rendered.contains("use std::sync::Arc;"));
        assert!(rendered.contains(
            "let class = PersonClass::define_as(builder, name).extends(PersonClass::NAME);\n        class\n"
        ));
        assert!(rendered.contains("Self::define_as(builder, Self::NAME).set_table(\"staff\").set_abstract();"));
        assert!(rendered.contains("superclass: PersonClass::bind_as(schema, name)?,"));
        assert!(!rendered.contains("let specs"));
        assert!(rendered.contains("type Target = PersonClass;"));
    }

    #[test]
    fn test_relation_kind_without_back_ref_and_reserved_names() {
        let mut search = ClassDescription::new("Search", ClassKind::Concrete, "search_bo.rs");
        search.superclass = Superclass::QueryParams;
        let mut parent = PropertyDescription::new("specs", PropertyShape::Class(vec!["User".into()]), true);
        parent.relation = Some(RelationDecl {
            kind: RelationKind::TargetToSource,
            back_ref: None,
        });
        search.properties.push(parent);
        search
            .properties
            .push(PropertyDescription::new("type", PropertyShape::Scalar(FieldKind::String), false));

        let rendered = render_accessor(&search, "crate", &HashMap::new()).unwrap();
        assert!(rendered.contains("QueryParamsClass, RelationKind, Relationship, Schema"));
        assert!(rendered.contains(
            "class.relationship(\"specs\", true, &[\"User\"]).set_relation_kind(RelationKind::TargetToSource);"
        ));
        assert!(rendered.contains("specs_property: specs.relationship(\"specs\")?,"));
        assert!(rendered.contains("pub fn r#type(&self) -> &Arc<Field> {"));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let first = render_accessor(&widget(), "model", &modules()).unwrap();
        let second = render_accessor(&widget(), "model", &modules()).unwrap();
        assert_eq!(first, second);
        assert_eq!(render_values(&widget()).unwrap(), render_values(&widget()).unwrap());
    }

    #[test]
    fn test_values_file() {
        let mut description = widget();
        let mut status = PropertyDescription::new("status", PropertyShape::Scalar(FieldKind::Enum), false);
        status.only = vec!["new".into(), "done".into()];
        description.properties.push(status);
        let mut label = PropertyDescription::new("label", PropertyShape::Scalar(FieldKind::String), false);
        label.mappable = false;
        description.properties.push(label);

        let rendered = render_values(&description).unwrap();
        assert!(rendered.starts_with("// Code generated by boforge from widget_bo.rs. DO NOT EDIT.\n"));
        assert!(rendered.contains("use boforge::schema::{FromValue, SchemaError, Value, ValueMapper};"));
        assert!(rendered.contains("use super::widget_bo::Widget;"));
        assert!(rendered.contains("\"id\" => Ok(Value::from(self.id.clone())),"));
        assert!(rendered.contains("\"status\" => Ok(Value::from(self.status.clone()).into_enum()),"));
        assert!(rendered.contains("\"count\" => self.count = FromValue::from_value(value)?,"));
        assert!(!rendered.contains("\"owner\""));
        assert!(!rendered.contains("\"label\""));
    }

    #[test]
    fn test_values_file_without_mapped_fields() {
        let description = ClassDescription::new("Marker", ClassKind::Concrete, "marker_bo.rs");
        let rendered = render_values(&description).unwrap();
        assert!(rendered.contains("use boforge::schema::{SchemaError, Value, ValueMapper};"));
        assert!(rendered.contains("_value: Value"));
        assert!(!rendered.contains("match property"));
    }
}
