//! Build a schema from class descriptions.
//!
//! Mirrors what the generated `XClass::define` functions do at runtime, so
//! the schema the generator checks is the schema the application will seal.

use crate::codegen::dependency_graph::DependencyGraph;
use crate::codegen::types::{ClassDescription, PropertyDescription, PropertyShape};
use crate::schema::{
    define_interface, BusinessObjectClass, ClassBuilder, QueryParamsClass, Schema, SchemaBuilder,
    SchemaError, Superclass,
};
use std::collections::HashMap;

/// Define every described class on a fresh builder, parents before children
pub fn build_schema(descriptions: &[ClassDescription]) -> Result<SchemaBuilder, SchemaError> {
    let graph = DependencyGraph::build(descriptions)?;
    let by_name: HashMap<&str, &ClassDescription> =
        descriptions.iter().map(|d| (d.name.as_str(), d)).collect();

    let mut builder = SchemaBuilder::new();
    for name in graph.processing_order() {
        let Some(description) = by_name.get(name.as_str()) else {
            continue;
        };
        if description.is_interface() {
            define_interface(&mut builder, &description.name);
            continue;
        }
        let class = define_as(&mut builder, description, &description.name, &by_name)?;
        apply_class_options(class, description);
    }
    Ok(builder)
}

/// Build and seal in one step
pub fn assemble(descriptions: &[ClassDescription]) -> Result<Schema, SchemaError> {
    build_schema(descriptions)?.seal()
}

fn define_as<'b>(
    builder: &'b mut SchemaBuilder,
    description: &ClassDescription,
    name: &str,
    by_name: &HashMap<&str, &ClassDescription>,
) -> Result<&'b mut ClassBuilder, SchemaError> {
    let class = match &description.superclass {
        Superclass::BusinessObject => BusinessObjectClass::define_as(builder, name),
        Superclass::QueryParams => QueryParamsClass::define_as(builder, name),
        Superclass::Class(parent) => {
            let parent_description =
                by_name
                    .get(parent.as_str())
                    .ok_or_else(|| SchemaError::UnknownSuperclass {
                        class: description.name.clone(),
                        parent: parent.clone(),
                    })?;
            define_as(builder, parent_description, name, by_name)?.extends(parent)
        }
    };

    for property in &description.properties {
        define_property(class, property);
    }
    Ok(class)
}

/// Class flags apply to the class being registered, never to its subclasses
fn apply_class_options(class: &mut ClassBuilder, description: &ClassDescription) {
    if let Some(table) = &description.table {
        class.set_table(table);
    }
    if let Some(database) = &description.database {
        class.set_database(database);
    }
    if description.transient {
        class.set_not_persisted();
    }
    if description.is_abstract {
        class.set_abstract();
    }
}

fn define_property(class: &mut ClassBuilder, property: &PropertyDescription) {
    match &property.shape {
        PropertyShape::Scalar(kind) => {
            let field = class.add_field(&property.name, *kind, property.multiple);
            if property.mandatory {
                field.set_mandatory();
            }
            if property.transient {
                field.set_not_persisted();
            }
            if let Some(column) = &property.column {
                field.set_column(column.clone());
            }
            if let Some(min) = property.min {
                field.min(min);
            }
            if let Some(max) = property.max {
                field.max(max);
            }
            if let Some((min, max)) = property.size {
                field.set_size(min, max);
            }
            if !property.only.is_empty() {
                let values: Vec<&str> = property.only.iter().map(String::as_str).collect();
                field.only(&values);
            }
            if let Some(default) = &property.default {
                field.set_default(default.clone());
            }
        }
        PropertyShape::Class(targets) => {
            let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
            let relationship = class.relationship(&property.name, property.multiple, &targets);
            if property.mandatory {
                relationship.set_mandatory();
            }
            if let Some(column) = &property.column {
                relationship.set_column(column.clone());
            }
            if let Some(relation) = &property.relation {
                relationship.set_kind(relation.kind, relation.back_ref.as_deref());
            }
        }
    }
}
