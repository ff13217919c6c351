//! Type families, multiplicities and relation kinds of the metamodel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type family of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    String,
    Int,
    #[serde(rename = "bigint")]
    BigInt,
    Real,
    Double,
    Date,
    Enum,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Int => "int",
            FieldKind::BigInt => "bigint",
            FieldKind::Real => "real",
            FieldKind::Double => "double",
            FieldKind::Date => "date",
            FieldKind::Enum => "enum",
        }
    }

    /// Method name of the typed constructor on `ClassBuilder`
    pub fn constructor(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool_field",
            FieldKind::String => "string_field",
            FieldKind::Int => "int_field",
            FieldKind::BigInt => "bigint_field",
            FieldKind::Real => "real_field",
            FieldKind::Double => "double_field",
            FieldKind::Date => "date_field",
            FieldKind::Enum => "enum_field",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Int | FieldKind::BigInt | FieldKind::Real | FieldKind::Double
        )
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, FieldKind::String | FieldKind::Enum)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a property holds one value or a list of values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    #[default]
    Single,
    Many,
}

impl Multiplicity {
    pub fn from_multiple(multiple: bool) -> Self {
        if multiple {
            Multiplicity::Many
        } else {
            Multiplicity::Single
        }
    }

    pub fn is_many(&self) -> bool {
        *self == Multiplicity::Many
    }
}

/// Direction and ownership semantics of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    OneWay,
    SourceToTarget,
    TargetToSource,
    ParentToChildren,
    ChildToParent,
}

impl RelationKind {
    pub const ALL: [RelationKind; 5] = [
        RelationKind::OneWay,
        RelationKind::SourceToTarget,
        RelationKind::TargetToSource,
        RelationKind::ParentToChildren,
        RelationKind::ChildToParent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::OneWay => "one-way",
            RelationKind::SourceToTarget => "source-to-target",
            RelationKind::TargetToSource => "target-to-source",
            RelationKind::ParentToChildren => "parent-to-children",
            RelationKind::ChildToParent => "child-to-parent",
        }
    }

    /// Variant name, as written in generated Rust code
    pub fn variant(&self) -> &'static str {
        match self {
            RelationKind::OneWay => "OneWay",
            RelationKind::SourceToTarget => "SourceToTarget",
            RelationKind::TargetToSource => "TargetToSource",
            RelationKind::ParentToChildren => "ParentToChildren",
            RelationKind::ChildToParent => "ChildToParent",
        }
    }

    /// Kind carried by the back-reference of a relationship of this kind.
    /// One-way relationships have no back-reference.
    pub fn complement(&self) -> Option<RelationKind> {
        match self {
            RelationKind::OneWay => None,
            RelationKind::SourceToTarget => Some(RelationKind::TargetToSource),
            RelationKind::TargetToSource => Some(RelationKind::SourceToTarget),
            RelationKind::ParentToChildren => Some(RelationKind::ChildToParent),
            RelationKind::ChildToParent => Some(RelationKind::ParentToChildren),
        }
    }

    /// Whether a single-valued relationship of this kind is stored on the owner's table
    pub fn stores_column(&self) -> bool {
        matches!(
            self,
            RelationKind::OneWay | RelationKind::SourceToTarget | RelationKind::ChildToParent
        )
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a class extends
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Superclass {
    /// The persisted business-object root, which carries the identity field
    #[default]
    BusinessObject,
    /// The transient URL-query-parameter root
    QueryParams,
    /// Another generated class
    Class(String),
}

impl Superclass {
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Superclass::Class(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_is_symmetric() {
        for kind in RelationKind::ALL {
            if let Some(complement) = kind.complement() {
                assert_eq!(complement.complement(), Some(kind));
            }
        }
        assert_eq!(RelationKind::OneWay.complement(), None);
    }

    #[test]
    fn test_stores_column() {
        assert!(RelationKind::OneWay.stores_column());
        assert!(RelationKind::SourceToTarget.stores_column());
        assert!(RelationKind::ChildToParent.stores_column());
        assert!(!RelationKind::TargetToSource.stores_column());
        assert!(!RelationKind::ParentToChildren.stores_column());
    }

    #[test]
    fn test_relation_kind_serde_names() {
        let json = serde_json::to_string(&RelationKind::ParentToChildren).unwrap();
        assert_eq!(json, "\"parent-to-children\"");
        let kind: FieldKind = serde_json::from_str("\"bigint\"").unwrap();
        assert_eq!(kind, FieldKind::BigInt);
    }
}
