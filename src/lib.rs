//! # boforge: business-object schemas and incremental code generation
//!
//! Business objects are declared as plain Rust structs in `*_bo.rs` files.
//! boforge turns them into a sealed, typed schema and keeps a set of derived
//! files in step with the declarations:
//!
//! - **Schema metamodel** (`schema`): fields, relationships with back-reference
//!   wiring, inheritance, persisted-column resolution and value conversion
//! - **Discovery** (`codegen::discovery`): one class per declaration file,
//!   globally unique names, per-package grouping
//! - **Incremental regeneration**: a package is regenerated only when one of
//!   its declarations was added, changed or removed
//! - **Generated files**: accessor classes, value mappers and a registry per
//!   package, plus front-end model stubs that are patched block by block so
//!   hand edits survive
//!
//! ## Example declaration
//!
//! ```rust,ignore
//! // src/model/widget_bo.rs
//! use boforge::BusinessObject;
//!
//! #[derive(BusinessObject)]
//! #[bo(table = "widgets")]
//! pub struct Widget {
//!     pub id: i64,
//!     #[bo(mandatory, size(1, 64))]
//!     pub name: String,
//!     #[bo(max = 100)]
//!     pub count: i32,
//!     #[bo(child_to_parent = "widgets")]
//!     pub owner: User,
//! }
//! ```

pub mod codegen;
pub mod schema;

pub use boforge_macros::BusinessObject;
pub use schema::{
    ClassRegistry, ClassSpecs, Field, Relationship, Schema, SchemaBuilder, SchemaError, Value,
    ValueMapper,
};
