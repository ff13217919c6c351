//! Boundary to the database layer that consumes the metamodel.
//!
//! Migration and DDL generation live outside this crate. They read
//! `ClassSpecs::table_name` and `ClassSpecs::persisted_properties` and talk to
//! the database through this trait.

use crate::schema::class::ClassSpecs;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Column as reported by the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Database connection used by the migration layer
pub trait DatabaseHandle {
    fn name(&self) -> &str;

    fn execute_ddl(&mut self, statement: &str) -> Result<(), Box<dyn Error>>;

    /// Existing columns of a table, in table order. Empty if the table does not exist.
    fn column_metadata(&self, table: &str) -> Result<Vec<ColumnInfo>, Box<dyn Error>>;
}

/// Persisted columns of `specs` that its table does not have yet, in table order
pub fn missing_columns<'s>(
    specs: &'s ClassSpecs,
    handle: &dyn DatabaseHandle,
) -> Result<Vec<&'s str>, Box<dyn Error>> {
    let existing = handle.column_metadata(specs.table_name())?;
    Ok(specs
        .column_names()
        .into_iter()
        .filter(|column| !existing.iter().any(|info| info.name == *column))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BusinessObjectClass, SchemaBuilder};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryDatabase {
        tables: HashMap<String, Vec<ColumnInfo>>,
        statements: Vec<String>,
    }

    impl DatabaseHandle for MemoryDatabase {
        fn name(&self) -> &str {
            "memory"
        }

        fn execute_ddl(&mut self, statement: &str) -> Result<(), Box<dyn Error>> {
            self.statements.push(statement.to_string());
            Ok(())
        }

        fn column_metadata(&self, table: &str) -> Result<Vec<ColumnInfo>, Box<dyn Error>> {
            Ok(self.tables.get(table).cloned().unwrap_or_default())
        }
    }

    fn column(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: "text".to_string(),
            nullable: true,
        }
    }

    #[test]
    fn test_missing_columns() {
        let mut builder = SchemaBuilder::new();
        let widget = BusinessObjectClass::define_as(&mut builder, "Widget");
        widget.string_field("name", false);
        widget.int_field("count", false);
        let schema = builder.seal().unwrap();
        let specs = schema.class("Widget").unwrap();

        let mut database = MemoryDatabase::default();
        assert_eq!(
            missing_columns(specs, &database).unwrap(),
            vec!["id", "count", "name"]
        );

        database
            .tables
            .insert("widget".to_string(), vec![column("id"), column("name")]);
        assert_eq!(missing_columns(specs, &database).unwrap(), vec!["count"]);

        database.execute_ddl("ALTER TABLE widget ADD COLUMN count integer").unwrap();
        assert_eq!(database.statements.len(), 1);
        assert_eq!(database.name(), "memory");
    }
}
