//! Type definitions for business-object declarations.
//!
//! These types describe what a declaration file says about its class and
//! are used to assemble the schema that drives code generation.

use crate::codegen::discovery::ClassKind;
use crate::schema::{FieldKind, RelationKind, Superclass, Value};
use serde::Serialize;
use std::path::PathBuf;

/// Semantic shape of one declared property
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyShape {
    /// A field of the given type family
    Scalar(FieldKind),
    /// A relationship to one or more classes
    Class(Vec<String>),
}

/// Relation kind written on a relationship declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationDecl {
    pub kind: RelationKind,
    pub back_ref: Option<String>,
}

/// One declared property of a class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDescription {
    pub name: String,
    pub shape: PropertyShape,
    pub multiple: bool,
    pub mandatory: bool,
    pub transient: bool,
    pub column: Option<String>,
    pub default: Option<Value>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub size: Option<(usize, usize)>,
    pub only: Vec<String>,
    pub relation: Option<RelationDecl>,
    /// Whether generated value-mapper code can convert this field directly
    pub mappable: bool,
}

impl PropertyDescription {
    pub fn new(name: &str, shape: PropertyShape, multiple: bool) -> Self {
        Self {
            name: name.to_string(),
            shape,
            multiple,
            mandatory: false,
            transient: false,
            column: None,
            default: None,
            min: None,
            max: None,
            size: None,
            only: Vec::new(),
            relation: None,
            mappable: true,
        }
    }

    pub fn field_kind(&self) -> Option<FieldKind> {
        match &self.shape {
            PropertyShape::Scalar(kind) => Some(*kind),
            PropertyShape::Class(_) => None,
        }
    }

    pub fn targets(&self) -> &[String] {
        match &self.shape {
            PropertyShape::Class(targets) => targets,
            PropertyShape::Scalar(_) => &[],
        }
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self.shape, PropertyShape::Class(_))
    }
}

/// Everything a declaration file says about its class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDescription {
    pub name: String,
    pub kind: ClassKind,
    pub superclass: Superclass,
    pub table: Option<String>,
    pub database: Option<String>,
    pub transient: bool,
    pub is_abstract: bool,
    /// The declared struct has its own identity field
    pub has_identity_field: bool,
    pub properties: Vec<PropertyDescription>,
    pub source: PathBuf,
}

impl ClassDescription {
    pub fn new(name: &str, kind: ClassKind, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            superclass: Superclass::BusinessObject,
            table: None,
            database: None,
            transient: false,
            is_abstract: false,
            has_identity_field: false,
            properties: Vec::new(),
            source: source.into(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn parent(&self) -> Option<&str> {
        self.superclass.class_name()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescription> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Module name of the declaration file (`widget_bo` for `widget_bo.rs`)
    pub fn source_module(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
