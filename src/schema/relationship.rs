//! Associations between classes.

use crate::codegen::utils::to_snake_case;
use crate::schema::types::{Multiplicity, RelationKind};
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Address of one property of one class
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PropertyRef {
    pub class: String,
    pub property: String,
}

impl PropertyRef {
    pub fn new(class: &str, property: &str) -> Self {
        Self {
            class: class.to_string(),
            property: property.to_string(),
        }
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.property)
    }
}

/// A typed, directional association from its owner class to one or more
/// target classes.
///
/// The declared kind and back-reference are what the declaration says. The
/// effective kind and the resolved back-references are filled in when the
/// schema is sealed: declaring `child_to_parent("widgets")` on `Widget.owner`
/// makes `User.widgets` a parent-to-children relationship pointing back at
/// `Widget.owner`.
#[derive(Debug, Clone)]
pub struct Relationship {
    owner: String,
    name: String,
    multiplicity: Multiplicity,
    targets: Vec<String>,
    declared_kind: Option<RelationKind>,
    declared_back_ref: Option<String>,
    kind: Option<RelationKind>,
    back_refs: Vec<PropertyRef>,
    column_override: Option<String>,
    column: OnceLock<String>,
    mandatory: bool,
    inherited_from: Option<String>,
}

impl Relationship {
    pub(crate) fn new(owner: &str, name: &str, multiple: bool, targets: &[&str]) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            multiplicity: Multiplicity::from_multiple(multiple),
            targets: targets.iter().map(|t| t.to_string()).collect(),
            declared_kind: None,
            declared_back_ref: None,
            kind: None,
            back_refs: Vec::new(),
            column_override: None,
            column: OnceLock::new(),
            mandatory: false,
            inherited_from: None,
        }
    }

    /// Set the relation kind and its back-reference. Calling it again replaces
    /// both; the complementary side is wired when the schema is sealed.
    pub fn set_kind(&mut self, kind: RelationKind, back_ref: Option<&str>) -> &mut Self {
        self.declared_kind = Some(kind);
        self.kind = Some(kind);
        self.declared_back_ref = match kind {
            RelationKind::OneWay => None,
            _ => back_ref.map(str::to_string),
        };
        self
    }

    /// Relation kind without a back-reference on the target side
    pub fn set_relation_kind(&mut self, kind: RelationKind) -> &mut Self {
        self.set_kind(kind, None)
    }

    pub fn set_one_way(&mut self) -> &mut Self {
        self.set_kind(RelationKind::OneWay, None)
    }

    pub fn set_source_to_target(&mut self, back_ref: &str) -> &mut Self {
        self.set_kind(RelationKind::SourceToTarget, Some(back_ref))
    }

    pub fn set_target_to_source(&mut self, back_ref: &str) -> &mut Self {
        self.set_kind(RelationKind::TargetToSource, Some(back_ref))
    }

    pub fn set_child_to_parent(&mut self, back_ref: &str) -> &mut Self {
        self.set_kind(RelationKind::ChildToParent, Some(back_ref))
    }

    pub fn set_parent_to_children(&mut self, back_ref: &str) -> &mut Self {
        self.set_kind(RelationKind::ParentToChildren, Some(back_ref))
    }

    pub fn set_mandatory(&mut self) -> &mut Self {
        self.mandatory = true;
        self
    }

    pub fn set_column(&mut self, column: impl Into<String>) -> &mut Self {
        self.column_override = Some(column.into());
        self.column = OnceLock::new();
        self
    }

    pub(crate) fn mark_inherited(&mut self, from: &str) {
        if self.inherited_from.is_none() {
            self.inherited_from = Some(from.to_string());
        }
    }

    /// Kind implied by the other side of a back-reference pair. Declared kinds
    /// are never overwritten.
    pub(crate) fn infer_kind(&mut self, kind: RelationKind) {
        if self.declared_kind.is_none() {
            self.kind = Some(kind);
        }
    }

    /// Record the other side of this relationship. Polymorphic relationships
    /// collect one back-reference per target; monomorphic ones keep the latest.
    pub(crate) fn register_back_ref(&mut self, back_ref: PropertyRef) {
        if self.is_polymorphic() {
            if !self.back_refs.contains(&back_ref) {
                self.back_refs.push(back_ref);
            }
        } else {
            self.back_refs = vec![back_ref];
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn is_multiple(&self) -> bool {
        self.multiplicity.is_many()
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn is_polymorphic(&self) -> bool {
        self.targets.len() > 1
    }

    /// Effective relation kind, declared or implied by a back-reference
    pub fn kind(&self) -> Option<RelationKind> {
        self.kind
    }

    pub fn declared_kind(&self) -> Option<RelationKind> {
        self.declared_kind
    }

    pub fn declared_back_ref(&self) -> Option<&str> {
        self.declared_back_ref.as_deref()
    }

    pub fn back_refs(&self) -> &[PropertyRef] {
        &self.back_refs
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn column_override(&self) -> Option<&str> {
        self.column_override.as_deref()
    }

    pub fn inherited_from(&self) -> Option<&str> {
        self.inherited_from.as_deref()
    }

    /// Whether this relationship is stored as a column on the owner's table
    pub fn needs_column(&self) -> bool {
        !self.is_multiple() && self.kind.is_some_and(|kind| kind.stores_column())
    }

    /// `<snake_name>_id` unless overridden
    pub fn column_name(&self) -> &str {
        self.column.get_or_init(|| {
            self.column_override
                .clone()
                .unwrap_or_else(|| format!("{}_id", to_snake_case(&self.name)))
        })
    }
}
