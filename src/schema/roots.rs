//! Root classes every generated class ultimately extends.
//!
//! Generated accessor classes call `define_as` on their superclass first, so a
//! class's definition always starts from one of these roots.

use crate::schema::builder::{ClassBuilder, Schema, SchemaBuilder};
use crate::schema::class::ClassSpecs;
use crate::schema::error::SchemaError;
use crate::schema::field::Field;
use crate::schema::types::Superclass;
use std::sync::Arc;

/// Root of persisted business objects; carries the `id` identity field
#[derive(Debug, Clone)]
pub struct BusinessObjectClass {
    specs: Arc<ClassSpecs>,
    id: Arc<Field>,
}

impl BusinessObjectClass {
    pub const NAME: &'static str = "BusinessObject";
    pub const IDENTITY: &'static str = "id";

    pub fn define_as<'b>(builder: &'b mut SchemaBuilder, name: &str) -> &'b mut ClassBuilder {
        let class = builder.define_class(name);
        class.set_superclass(Superclass::BusinessObject);
        class.bigint_field(Self::IDENTITY, false).set_mandatory();
        class.set_identity(Self::IDENTITY);
        class.inherit_all(Self::NAME);
        class
    }

    pub fn bind_as(schema: &Schema, name: &str) -> Result<Self, SchemaError> {
        let specs = schema.class(name)?;
        Ok(Self {
            specs: specs.clone(),
            id: specs.field(Self::IDENTITY)?,
        })
    }

    pub fn specs(&self) -> &Arc<ClassSpecs> {
        &self.specs
    }

    pub fn id(&self) -> &Arc<Field> {
        &self.id
    }
}

/// Root of transient URL-query-parameter objects; no identity, never persisted
#[derive(Debug, Clone)]
pub struct QueryParamsClass {
    specs: Arc<ClassSpecs>,
}

impl QueryParamsClass {
    pub const NAME: &'static str = "QueryParams";

    pub fn define_as<'b>(builder: &'b mut SchemaBuilder, name: &str) -> &'b mut ClassBuilder {
        let class = builder.define_class(name);
        class.set_superclass(Superclass::QueryParams);
        class.set_not_persisted();
        class
    }

    pub fn bind_as(schema: &Schema, name: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            specs: schema.class(name)?.clone(),
        })
    }

    pub fn specs(&self) -> &Arc<ClassSpecs> {
        &self.specs
    }
}

/// Define an interface: a relationship target with no properties of its own
pub fn define_interface<'b>(builder: &'b mut SchemaBuilder, name: &str) -> &'b mut ClassBuilder {
    let class = builder.define_class(name);
    class.set_interface();
    class
}
