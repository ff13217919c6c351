//! Fixed templates for the fully generated files.
//!
//! Placeholders are written `$$TOKEN$$` with an upper-case token. Rendering
//! is a single left-to-right pass, so substituted values are copied as they
//! are even when they contain `$$`.

/// Accessor file, one per concrete class
pub const ACCESSOR_TEMPLATE: &str = r#"// Code generated by boforge from $$SOURCE$$. DO NOT EDIT.

$$IMPORTS$$
/// Schema accessors for `$$CLASS$$`
#[derive(Debug, Clone)]
pub struct $$CLASS$$Class {
    superclass: $$SUPER$$,
$$DECLARATIONS$$}

impl $$CLASS$$Class {
    pub const NAME: &'static str = "$$CLASS$$";
    /// Resource name used in REST paths
    pub const RESOURCE: &'static str = "$$CAMEL$$";

    /// Register `$$CLASS$$` on a schema builder
    pub fn define(builder: &mut SchemaBuilder) {
        Self::define_as(builder, Self::NAME)$$CLASS_OPTIONS$$;
    }

    /// Define the class `name` with the properties of `$$CLASS$$`, after those of its ancestors
    pub fn define_as<'b>(builder: &'b mut SchemaBuilder, name: &str) -> &'b mut ClassBuilder {
        let class = $$SUPER_CONSTRUCTOR$$;
$$DEFINITIONS$$        class
    }

    pub fn bind(schema: &Schema) -> Result<Self, SchemaError> {
        Self::bind_as(schema, Self::NAME)
    }

    pub fn bind_as(schema: &Schema, name: &str) -> Result<Self, SchemaError> {
$$SPECS$$        Ok(Self {
            superclass: $$SUPER$$::bind_as(schema, name)?,
$$INITIALIZATIONS$$        })
    }

    pub fn superclass(&self) -> &$$SUPER$$ {
        &self.superclass
    }
$$ACCESSORS$$}

impl Deref for $$CLASS$$Class {
    type Target = $$SUPER$$;

    fn deref(&self) -> &Self::Target {
        &self.superclass
    }
}
"#;

/// Value-mapper file, one per concrete class
pub const VALUES_TEMPLATE: &str = r#"// Code generated by boforge from $$SOURCE$$. DO NOT EDIT.

use boforge::schema::{$$SCHEMA_IMPORTS$$};

use super::$$SOURCE_MODULE$$::$$CLASS$$;

impl ValueMapper for $$CLASS$$ {
    const CLASS_NAME: &'static str = "$$CLASS$$";

$$GET_VALUE$$
$$SET_VALUE$$}
"#;

fn is_token(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_uppercase() || b == b'_')
}

/// Substitute every `$$TOKEN$$` of `template`. Unknown tokens are kept.
pub fn render(template: &str, replacements: &[(&str, &str)]) -> String {
    let lookup = |token: &str| {
        replacements
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, value)| *value)
    };

    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("$$") {
        let after = &rest[start + 2..];
        let substitution = after
            .find("$$")
            .filter(|&end| is_token(&after[..end]))
            .and_then(|end| lookup(&after[..end]).map(|value| (end, value)));
        match substitution {
            Some((end, value)) => {
                result.push_str(&rest[..start]);
                result.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                result.push_str(&rest[..start + 2]);
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}
