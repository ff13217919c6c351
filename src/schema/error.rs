//! Errors raised while defining, sealing or using a schema.

use crate::schema::types::{FieldKind, RelationKind};

/// Schema-definition and schema-consistency errors.
///
/// Definition errors are fatal: a schema that fails to seal must not be used
/// to generate anything.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("class '{0}' is defined more than once")]
    DuplicateClass(String),

    #[error("unknown class '{0}'")]
    UnknownClass(String),

    #[error("class '{class}' has no property '{property}'")]
    UnknownProperty { class: String, property: String },

    #[error("property '{class}.{property}' is defined more than once")]
    DuplicateProperty { class: String, property: String },

    #[error("class '{class}' maps '{first}' and '{second}' to the same column '{column}'")]
    DuplicateColumn {
        class: String,
        column: String,
        first: String,
        second: String,
    },

    #[error("relationship '{class}.{relationship}' has no relation kind")]
    MissingRelationKind { class: String, relationship: String },

    #[error(
        "class '{class}' declares more than one child-to-parent relationship: {}",
        .relationships.join(", ")
    )]
    MultipleParents {
        class: String,
        relationships: Vec<String>,
    },

    #[error("relationship '{class}.{relationship}' has no target class")]
    MissingTarget { class: String, relationship: String },

    #[error("relationship '{class}.{relationship}' targets unknown class '{target}'")]
    UnknownTarget {
        class: String,
        relationship: String,
        target: String,
    },

    #[error(
        "relationship '{class}.{relationship}' declares back-reference '{back_ref}', \
         which is not a relationship of class '{target}'"
    )]
    UnknownBackReference {
        class: String,
        relationship: String,
        target: String,
        back_ref: String,
    },

    #[error(
        "relationship '{class}.{relationship}' is a one-to-one parent/child relationship, \
         which is not supported"
    )]
    OneToOneParentChild { class: String, relationship: String },

    #[error(
        "relationship '{class}.{relationship}' is declared {declared} \
         but its back-reference implies {implied}"
    )]
    ConflictingRelationKind {
        class: String,
        relationship: String,
        declared: RelationKind,
        implied: RelationKind,
    },

    #[error("inheritance cycle through class '{0}'")]
    InheritanceCycle(String),

    #[error("class '{class}' extends unknown class '{parent}'")]
    UnknownSuperclass { class: String, parent: String },

    #[error("'{value}' is not an allowed value of '{class}.{field}' (allowed: {})", .allowed.join(", "))]
    InvalidEnumValue {
        class: String,
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("cannot read '{value}' as {kind} for '{class}.{field}'")]
    InvalidValue {
        class: String,
        field: String,
        kind: FieldKind,
        value: String,
    },

    #[error("mandatory property '{class}.{field}' has no value")]
    MissingValue { class: String, field: String },

    #[error("value {value} of '{class}.{field}' is outside {bounds}")]
    OutOfBounds {
        class: String,
        field: String,
        value: String,
        bounds: String,
    },

    #[error("expected a {expected} value, found {found}")]
    ValueType { expected: String, found: String },
}

impl SchemaError {
    pub fn unknown_property(class: &str, property: &str) -> Self {
        SchemaError::UnknownProperty {
            class: class.to_string(),
            property: property.to_string(),
        }
    }
}
