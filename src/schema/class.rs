//! Sealed, read-only schema of one business-object class.

use crate::codegen::utils::to_snake_case;
use crate::schema::error::SchemaError;
use crate::schema::field::Field;
use crate::schema::relationship::Relationship;
use crate::schema::types::Superclass;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};

/// A field or a relationship
#[derive(Debug, Clone)]
pub enum Property {
    Field(Arc<Field>),
    Relationship(Arc<Relationship>),
}

impl Property {
    pub fn name(&self) -> &str {
        match self {
            Property::Field(f) => f.name(),
            Property::Relationship(r) => r.name(),
        }
    }

    pub fn column_name(&self) -> &str {
        match self {
            Property::Field(f) => f.column_name(),
            Property::Relationship(r) => r.column_name(),
        }
    }

    pub fn is_multiple(&self) -> bool {
        match self {
            Property::Field(f) => f.is_multiple(),
            Property::Relationship(r) => r.is_multiple(),
        }
    }

    pub fn is_mandatory(&self) -> bool {
        match self {
            Property::Field(f) => f.is_mandatory(),
            Property::Relationship(r) => r.is_mandatory(),
        }
    }

    pub fn inherited_from(&self) -> Option<&str> {
        match self {
            Property::Field(f) => f.inherited_from(),
            Property::Relationship(r) => r.inherited_from(),
        }
    }

    /// Declared by this class itself rather than inherited
    pub fn is_local(&self) -> bool {
        self.inherited_from().is_none()
    }

    pub fn as_field(&self) -> Option<&Arc<Field>> {
        match self {
            Property::Field(f) => Some(f),
            Property::Relationship(_) => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Arc<Relationship>> {
        match self {
            Property::Relationship(r) => Some(r),
            Property::Field(_) => None,
        }
    }

    fn is_persisted(&self) -> bool {
        match self {
            Property::Field(f) => !f.is_not_persisted(),
            Property::Relationship(r) => r.needs_column(),
        }
    }
}

/// Class-level flags and overrides
#[derive(Debug, Clone, Default)]
pub struct ClassOptions {
    pub superclass: Superclass,
    pub table: Option<String>,
    pub database: Option<String>,
    pub not_persisted: bool,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub identity: Option<String>,
}

/// Schema of one class after sealing.
///
/// The derived views (`table_name`, `persisted_properties`,
/// `column_relationships`) are computed on first use and cached for the
/// lifetime of the schema.
#[derive(Debug)]
pub struct ClassSpecs {
    name: String,
    options: ClassOptions,
    properties: IndexMap<String, Property>,
    table_name: OnceLock<String>,
    persisted: OnceLock<Vec<Property>>,
    column_relationships: OnceLock<Vec<Arc<Relationship>>>,
}

impl ClassSpecs {
    pub(crate) fn new(
        name: String,
        options: ClassOptions,
        properties: IndexMap<String, Property>,
    ) -> Self {
        Self {
            name,
            options,
            properties,
            table_name: OnceLock::new(),
            persisted: OnceLock::new(),
            column_relationships: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> &Superclass {
        &self.options.superclass
    }

    pub fn database(&self) -> Option<&str> {
        self.options.database.as_deref()
    }

    pub fn is_not_persisted(&self) -> bool {
        self.options.not_persisted || self.options.is_interface
    }

    pub fn is_abstract(&self) -> bool {
        self.options.is_abstract
    }

    pub fn is_interface(&self) -> bool {
        self.options.is_interface
    }

    /// Snake-cased class name unless overridden
    pub fn table_name(&self) -> &str {
        self.table_name.get_or_init(|| {
            self.options
                .table
                .clone()
                .unwrap_or_else(|| to_snake_case(&self.name))
        })
    }

    /// All properties in declaration order, inherited ones first
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn fields(&self) -> impl Iterator<Item = &Arc<Field>> {
        self.properties.values().filter_map(Property::as_field)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Arc<Relationship>> {
        self.properties.values().filter_map(Property::as_relationship)
    }

    pub fn property(&self, name: &str) -> Result<&Property, SchemaError> {
        self.properties
            .get(name)
            .ok_or_else(|| SchemaError::unknown_property(&self.name, name))
    }

    pub fn field(&self, name: &str) -> Result<Arc<Field>, SchemaError> {
        self.property(name)?
            .as_field()
            .cloned()
            .ok_or_else(|| SchemaError::unknown_property(&self.name, name))
    }

    pub fn relationship(&self, name: &str) -> Result<Arc<Relationship>, SchemaError> {
        self.property(name)?
            .as_relationship()
            .cloned()
            .ok_or_else(|| SchemaError::unknown_property(&self.name, name))
    }

    /// Identity field, `None` for transient classes
    pub fn identity(&self) -> Option<Arc<Field>> {
        let name = self.options.identity.as_deref()?;
        self.properties.get(name)?.as_field().cloned()
    }

    /// Fields and column-bearing relationships stored on this class's table:
    /// identity first, then ascending by column name. Empty for transient
    /// classes.
    pub fn persisted_properties(&self) -> &[Property] {
        self.persisted.get_or_init(|| {
            if self.is_not_persisted() {
                return Vec::new();
            }
            let identity = self.options.identity.as_deref();
            let mut persisted: Vec<Property> = self
                .properties
                .values()
                .filter(|p| p.is_persisted())
                .cloned()
                .collect();
            persisted.sort_by(|a, b| {
                let a_id = Some(a.name()) == identity;
                let b_id = Some(b.name()) == identity;
                match (a_id, b_id) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => a.column_name().cmp(b.column_name()),
                }
            });
            persisted
        })
    }

    /// Single-valued relationships stored as a column, in column order
    pub fn column_relationships(&self) -> &[Arc<Relationship>] {
        self.column_relationships.get_or_init(|| {
            self.persisted_properties()
                .iter()
                .filter_map(Property::as_relationship)
                .cloned()
                .collect()
        })
    }

    /// Column names of the persisted properties, in table order
    pub fn column_names(&self) -> Vec<&str> {
        self.persisted_properties()
            .iter()
            .map(Property::column_name)
            .collect()
    }
}
