//! Mutable definition phase of a schema, and sealing into a `Schema`.
//!
//! Classes are defined on a `SchemaBuilder` (usually by generated
//! `XClass::define` functions), then `SchemaBuilder::seal` wires
//! back-references, runs the consistency checks and freezes everything into
//! an immutable `Schema`. The builder is consumed by sealing, so no
//! definition can happen afterwards.

use crate::schema::class::{ClassOptions, ClassSpecs, Property};
use crate::schema::error::SchemaError;
use crate::schema::field::Field;
use crate::schema::relationship::{PropertyRef, Relationship};
use crate::schema::types::{FieldKind, RelationKind, Superclass};
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Definition-time view of one class
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    options: ClassOptions,
    fields: IndexMap<String, Field>,
    relationships: IndexMap<String, Relationship>,
    order: Vec<String>,
    redefined: Vec<String>,
}

impl ClassBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: ClassOptions::default(),
            fields: IndexMap::new(),
            relationships: IndexMap::new(),
            order: Vec::new(),
            redefined: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bool_field(&mut self, name: &str, multiple: bool) -> &mut Field {
        self.add_field(name, FieldKind::Bool, multiple)
    }

    pub fn string_field(&mut self, name: &str, multiple: bool) -> &mut Field {
        self.add_field(name, FieldKind::String, multiple)
    }

    pub fn int_field(&mut self, name: &str, multiple: bool) -> &mut Field {
        self.add_field(name, FieldKind::Int, multiple)
    }

    pub fn bigint_field(&mut self, name: &str, multiple: bool) -> &mut Field {
        self.add_field(name, FieldKind::BigInt, multiple)
    }

    pub fn real_field(&mut self, name: &str, multiple: bool) -> &mut Field {
        self.add_field(name, FieldKind::Real, multiple)
    }

    pub fn double_field(&mut self, name: &str, multiple: bool) -> &mut Field {
        self.add_field(name, FieldKind::Double, multiple)
    }

    pub fn date_field(&mut self, name: &str, multiple: bool) -> &mut Field {
        self.add_field(name, FieldKind::Date, multiple)
    }

    pub fn enum_field(&mut self, name: &str, multiple: bool) -> &mut Field {
        self.add_field(name, FieldKind::Enum, multiple)
    }

    /// Typed constructor by kind
    pub fn add_field(&mut self, name: &str, kind: FieldKind, multiple: bool) -> &mut Field {
        self.track(name);
        self.relationships.shift_remove(name);
        let field = Field::new(&self.name, name, kind, multiple);
        match self.fields.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(field);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(field),
        }
    }

    pub fn relationship(&mut self, name: &str, multiple: bool, targets: &[&str]) -> &mut Relationship {
        self.track(name);
        self.fields.shift_remove(name);
        let relationship = Relationship::new(&self.name, name, multiple, targets);
        match self.relationships.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(relationship);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(relationship),
        }
    }

    /// Last write wins; the redefinition is reported when the schema is sealed
    fn track(&mut self, name: &str) {
        if self.order.iter().any(|existing| existing == name) {
            self.redefined.push(name.to_string());
        } else {
            self.order.push(name.to_string());
        }
    }

    /// Mark this class as extending another generated class. Every property
    /// defined so far came from the parent's definition.
    pub fn extends(&mut self, parent: &str) -> &mut Self {
        self.inherit_all(parent);
        self.options.superclass = Superclass::Class(parent.to_string());
        self
    }

    pub(crate) fn inherit_all(&mut self, from: &str) {
        for field in self.fields.values_mut() {
            field.mark_inherited(from);
        }
        for relationship in self.relationships.values_mut() {
            relationship.mark_inherited(from);
        }
    }

    pub(crate) fn set_superclass(&mut self, superclass: Superclass) -> &mut Self {
        self.options.superclass = superclass;
        self
    }

    pub(crate) fn set_interface(&mut self) -> &mut Self {
        self.options.is_interface = true;
        self
    }

    pub fn set_identity(&mut self, name: &str) -> &mut Self {
        self.options.identity = Some(name.to_string());
        self
    }

    pub fn set_table(&mut self, table: &str) -> &mut Self {
        self.options.table = Some(table.to_string());
        self
    }

    pub fn set_database(&mut self, database: &str) -> &mut Self {
        self.options.database = Some(database.to_string());
        self
    }

    pub fn set_not_persisted(&mut self) -> &mut Self {
        self.options.not_persisted = true;
        self
    }

    pub fn set_abstract(&mut self) -> &mut Self {
        self.options.is_abstract = true;
        self
    }

    pub fn superclass(&self) -> &Superclass {
        &self.options.superclass
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    pub fn relationship_mut(&mut self, name: &str) -> Option<&mut Relationship> {
        self.relationships.get_mut(name)
    }

    fn into_specs(self) -> ClassSpecs {
        let ClassBuilder {
            name,
            options,
            mut fields,
            mut relationships,
            order,
            ..
        } = self;
        let mut properties = IndexMap::new();
        for property in order {
            if let Some(field) = fields.shift_remove(&property) {
                properties.insert(property, Property::Field(Arc::new(field)));
            } else if let Some(relationship) = relationships.shift_remove(&property) {
                properties.insert(property, Property::Relationship(Arc::new(relationship)));
            }
        }
        ClassSpecs::new(name, options, properties)
    }
}

/// Collects class definitions until `seal`
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    classes: IndexMap<String, ClassBuilder>,
    duplicates: Vec<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the definition of a class. Defining the same name twice is a
    /// schema error reported by `seal`.
    pub fn define_class(&mut self, name: &str) -> &mut ClassBuilder {
        let class = ClassBuilder::new(name);
        match self.classes.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                self.duplicates.push(name.to_string());
                entry.insert(class);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(class),
        }
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassBuilder> {
        self.classes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Wire back-references, check consistency and freeze the schema
    pub fn seal(mut self) -> Result<Schema, SchemaError> {
        if let Some(duplicate) = self.duplicates.first() {
            return Err(SchemaError::DuplicateClass(duplicate.clone()));
        }
        self.check_inheritance()?;
        for class in self.classes.values() {
            if let Some(property) = class.redefined.first() {
                return Err(SchemaError::DuplicateProperty {
                    class: class.name.clone(),
                    property: property.clone(),
                });
            }
        }
        self.check_targets()?;
        self.wire_back_refs()?;
        self.check_relationships()?;

        let classes: IndexMap<String, Arc<ClassSpecs>> = self
            .classes
            .into_iter()
            .map(|(name, class)| (name, Arc::new(class.into_specs())))
            .collect();

        for specs in classes.values() {
            check_columns(specs)?;
        }

        tracing::debug!("Sealed schema with {} classes", classes.len());
        Ok(Schema { classes })
    }

    fn check_inheritance(&self) -> Result<(), SchemaError> {
        for class in self.classes.values() {
            let mut seen = HashSet::new();
            seen.insert(class.name.as_str());
            let mut current = class;
            while let Some(parent) = current.options.superclass.class_name() {
                if !seen.insert(parent) {
                    return Err(SchemaError::InheritanceCycle(class.name.clone()));
                }
                current = self.classes.get(parent).ok_or_else(|| SchemaError::UnknownSuperclass {
                    class: current.name.clone(),
                    parent: parent.to_string(),
                })?;
            }
        }
        Ok(())
    }

    fn check_targets(&self) -> Result<(), SchemaError> {
        for class in self.classes.values() {
            for relationship in class.relationships.values() {
                if relationship.targets().is_empty() {
                    return Err(SchemaError::MissingTarget {
                        class: class.name.clone(),
                        relationship: relationship.name().to_string(),
                    });
                }
                for target in relationship.targets() {
                    if !self.classes.contains_key(target) {
                        return Err(SchemaError::UnknownTarget {
                            class: class.name.clone(),
                            relationship: relationship.name().to_string(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Give every declared back-reference the complementary kind and link both
    /// sides. The result does not depend on the order classes were defined in.
    fn wire_back_refs(&mut self) -> Result<(), SchemaError> {
        let mut links = Vec::new();
        for class in self.classes.values() {
            for relationship in class.relationships.values() {
                let (Some(kind), Some(back_ref)) =
                    (relationship.declared_kind(), relationship.declared_back_ref())
                else {
                    continue;
                };
                let Some(complement) = kind.complement() else {
                    continue;
                };
                for target in relationship.targets() {
                    links.push((
                        PropertyRef::new(&class.name, relationship.name()),
                        PropertyRef::new(target, back_ref),
                        complement,
                    ));
                }
            }
        }

        for (source, back, complement) in links {
            let other = self
                .classes
                .get_mut(&back.class)
                .and_then(|class| class.relationships.get_mut(&back.property))
                .ok_or_else(|| SchemaError::UnknownBackReference {
                    class: source.class.clone(),
                    relationship: source.property.clone(),
                    target: back.class.clone(),
                    back_ref: back.property.clone(),
                })?;

            if let Some(existing) = other.kind() {
                if existing != complement {
                    return Err(SchemaError::ConflictingRelationKind {
                        class: back.class.clone(),
                        relationship: back.property.clone(),
                        declared: existing,
                        implied: complement,
                    });
                }
            }
            other.infer_kind(complement);
            other.register_back_ref(source.clone());

            if let Some(own) = self
                .classes
                .get_mut(&source.class)
                .and_then(|class| class.relationships.get_mut(&source.property))
            {
                own.register_back_ref(back);
            }
        }
        Ok(())
    }

    fn check_relationships(&self) -> Result<(), SchemaError> {
        for class in self.classes.values() {
            let mut parents = Vec::new();
            for relationship in class.relationships.values() {
                let kind = relationship.kind().ok_or_else(|| SchemaError::MissingRelationKind {
                    class: class.name.clone(),
                    relationship: relationship.name().to_string(),
                })?;

                let one_to_one = match kind {
                    RelationKind::ParentToChildren => !relationship.is_multiple(),
                    RelationKind::ChildToParent => {
                        relationship.back_refs().iter().any(|back| {
                            self.classes
                                .get(&back.class)
                                .and_then(|c| c.relationships.get(&back.property))
                                .is_some_and(|r| !r.is_multiple())
                        })
                    }
                    _ => false,
                };
                if one_to_one {
                    return Err(SchemaError::OneToOneParentChild {
                        class: class.name.clone(),
                        relationship: relationship.name().to_string(),
                    });
                }

                if kind == RelationKind::ChildToParent {
                    parents.push(relationship.name().to_string());
                }
            }
            if parents.len() > 1 {
                return Err(SchemaError::MultipleParents {
                    class: class.name.clone(),
                    relationships: parents,
                });
            }
        }
        Ok(())
    }
}

fn check_columns(specs: &ClassSpecs) -> Result<(), SchemaError> {
    let mut seen: IndexMap<&str, &str> = IndexMap::new();
    for property in specs.persisted_properties() {
        if let Some(first) = seen.insert(property.column_name(), property.name()) {
            return Err(SchemaError::DuplicateColumn {
                class: specs.name().to_string(),
                column: property.column_name().to_string(),
                first: first.to_string(),
                second: property.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Immutable set of sealed classes
#[derive(Debug, Clone, Default)]
pub struct Schema {
    classes: IndexMap<String, Arc<ClassSpecs>>,
}

impl Schema {
    pub fn class(&self, name: &str) -> Result<&Arc<ClassSpecs>, SchemaError> {
        self.classes
            .get(name)
            .ok_or_else(|| SchemaError::UnknownClass(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ClassSpecs>> {
        self.classes.get(name)
    }

    /// Classes in definition order
    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassSpecs>> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Resolve a property reference, such as a relationship's back-reference
    pub fn resolve(&self, reference: &PropertyRef) -> Result<&Property, SchemaError> {
        self.class(&reference.class)?.property(&reference.property)
    }
}
