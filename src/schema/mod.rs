//! Business-object schema metamodel.
//!
//! Classes are defined on a [`SchemaBuilder`] and sealed into an immutable
//! [`Schema`] whose [`ClassSpecs`] answer the questions every consumer asks:
//! table name, identity, persisted properties in column order, and the
//! relationships between classes.

pub mod builder;
pub mod class;
pub mod error;
pub mod external;
pub mod field;
pub mod registry;
pub mod relationship;
pub mod roots;
pub mod types;
pub mod value;

pub use builder::{ClassBuilder, Schema, SchemaBuilder};
pub use class::{ClassOptions, ClassSpecs, Property};
pub use error::SchemaError;
pub use external::{missing_columns, ColumnInfo, DatabaseHandle};
pub use field::Field;
pub use registry::{ClassEntry, ClassRegistry};
pub use relationship::{PropertyRef, Relationship};
pub use roots::{define_interface, BusinessObjectClass, QueryParamsClass};
pub use types::{FieldKind, Multiplicity, RelationKind, Superclass};
pub use value::{FromValue, Value, ValueMapper};
