//! Runtime class registry populated by generated `bo_registry.rs` files.

use crate::schema::builder::{Schema, SchemaBuilder};
use crate::schema::error::SchemaError;
use crate::schema::roots::define_interface;
use serde::Serialize;

/// One registration line of a generated registry file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassEntry {
    pub name: String,
    /// Rust module path of the declaring package, relative to the crate root
    pub module: String,
    /// Modification time of the declaration file, in milliseconds since the epoch
    pub modified_ms: u64,
    pub interface: bool,
}

impl ClassEntry {
    pub fn new(name: &str, module: &str, modified_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            module: module.to_string(),
            modified_ms,
            interface: false,
        }
    }
}

/// Injected, write-once store of class definitions.
///
/// Populated at startup by calling every package's generated `init`, then
/// sealed into a `Schema`. Sealing consumes the registry.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    builder: SchemaBuilder,
    entries: Vec<ClassEntry>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: ClassEntry, define: fn(&mut SchemaBuilder)) {
        tracing::debug!("Registering class {} from {}", entry.name, entry.module);
        define(&mut self.builder);
        self.entries.push(entry);
    }

    pub fn register_interface(&mut self, mut entry: ClassEntry) {
        tracing::debug!("Registering interface {} from {}", entry.name, entry.module);
        define_interface(&mut self.builder, &entry.name);
        entry.interface = true;
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ClassEntry] {
        &self.entries
    }

    pub fn seal(self) -> Result<Schema, SchemaError> {
        self.builder.seal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::roots::BusinessObjectClass;

    fn define_widget(builder: &mut SchemaBuilder) {
        BusinessObjectClass::define_as(builder, "Widget").string_field("name", false);
    }

    #[test]
    fn test_register_and_seal() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassEntry::new("Widget", "model", 10), define_widget);
        registry.register_interface(ClassEntry::new("Commentable", "model", 11));
        assert_eq!(registry.entries().len(), 2);
        assert!(registry.entries()[1].interface);

        let schema = registry.seal().unwrap();
        assert!(schema.class("Widget").unwrap().field("name").is_ok());
    }

    #[test]
    fn test_double_registration_fails_at_seal() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassEntry::new("Widget", "model", 10), define_widget);
        registry.register(ClassEntry::new("Widget", "model", 10), define_widget);
        assert_eq!(
            registry.seal().unwrap_err(),
            SchemaError::DuplicateClass("Widget".into())
        );
    }
}
