//! Scalar, date and enum properties of a class.

use crate::codegen::utils::to_snake_case;
use crate::schema::error::SchemaError;
use crate::schema::types::{FieldKind, Multiplicity};
use crate::schema::value::Value;
use std::sync::OnceLock;

/// One scalar/date/enum property of a class.
///
/// Fields are created through the typed constructors of `ClassBuilder` and
/// configured with the chaining setters below while the schema is being
/// defined. Once the schema is sealed they are only reachable through
/// `Arc<Field>` and never change again.
#[derive(Debug, Clone)]
pub struct Field {
    owner: String,
    name: String,
    kind: FieldKind,
    multiplicity: Multiplicity,
    column_override: Option<String>,
    column: OnceLock<String>,
    mandatory: bool,
    not_persisted: bool,
    default: Option<Value>,
    min: Option<f64>,
    max: Option<f64>,
    min_size: Option<usize>,
    max_size: Option<usize>,
    only: Vec<String>,
    inherited_from: Option<String>,
}

impl Field {
    pub(crate) fn new(owner: &str, name: &str, kind: FieldKind, multiple: bool) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            kind,
            multiplicity: Multiplicity::from_multiple(multiple),
            column_override: None,
            column: OnceLock::new(),
            mandatory: false,
            not_persisted: false,
            default: None,
            min: None,
            max: None,
            min_size: None,
            max_size: None,
            only: Vec::new(),
            inherited_from: None,
        }
    }

    pub fn set_mandatory(&mut self) -> &mut Self {
        self.mandatory = true;
        self
    }

    pub fn set_not_persisted(&mut self) -> &mut Self {
        self.not_persisted = true;
        self
    }

    pub fn set_column(&mut self, column: impl Into<String>) -> &mut Self {
        self.column_override = Some(column.into());
        self.column = OnceLock::new();
        self
    }

    pub fn set_default(&mut self, value: impl Into<Value>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    pub fn min(&mut self, min: f64) -> &mut Self {
        self.min = Some(min);
        self
    }

    pub fn max(&mut self, max: f64) -> &mut Self {
        self.max = Some(max);
        self
    }

    /// Bounds on the character count of string values
    pub fn set_size(&mut self, min: usize, max: usize) -> &mut Self {
        self.min_size = Some(min);
        self.max_size = Some(max);
        self
    }

    /// Restrict an enum field to the given values
    pub fn only(&mut self, values: &[&str]) -> &mut Self {
        self.only = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub(crate) fn mark_inherited(&mut self, from: &str) {
        if self.inherited_from.is_none() {
            self.inherited_from = Some(from.to_string());
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn is_multiple(&self) -> bool {
        self.multiplicity.is_many()
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn is_not_persisted(&self) -> bool {
        self.not_persisted
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn min_value(&self) -> Option<f64> {
        self.min
    }

    pub fn max_value(&self) -> Option<f64> {
        self.max
    }

    pub fn size(&self) -> (Option<usize>, Option<usize>) {
        (self.min_size, self.max_size)
    }

    pub fn allowed_values(&self) -> &[String] {
        &self.only
    }

    pub fn column_override(&self) -> Option<&str> {
        self.column_override.as_deref()
    }

    /// Class this field was inherited from, `None` if declared by the owner itself
    pub fn inherited_from(&self) -> Option<&str> {
        self.inherited_from.as_deref()
    }

    /// Column name, derived once from the field name and cached
    pub fn column_name(&self) -> &str {
        self.column.get_or_init(|| {
            self.column_override
                .clone()
                .unwrap_or_else(|| to_snake_case(&self.name))
        })
    }

    /// Convert raw text (a query parameter, a CSV cell, a declared default)
    /// into a typed value of this field's family.
    pub fn parse_value(&self, raw: &str) -> Result<Value, SchemaError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() && self.kind != FieldKind::String {
            return Ok(Value::Null);
        }

        let invalid = || SchemaError::InvalidValue {
            class: self.owner.clone(),
            field: self.name.clone(),
            kind: self.kind,
            value: raw.to_string(),
        };

        match self.kind {
            FieldKind::Bool => match trimmed {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            FieldKind::String => Ok(Value::String(raw.to_string())),
            FieldKind::Int => trimmed.parse().map(Value::Int).map_err(|_| invalid()),
            FieldKind::BigInt => trimmed.parse().map(Value::BigInt).map_err(|_| invalid()),
            FieldKind::Real => trimmed.parse().map(Value::Real).map_err(|_| invalid()),
            FieldKind::Double => trimmed.parse().map(Value::Double).map_err(|_| invalid()),
            FieldKind::Date => Value::parse_date(trimmed).map(Value::Date).ok_or_else(invalid),
            FieldKind::Enum => {
                if self.only.iter().any(|allowed| allowed == trimmed) {
                    Ok(Value::Enum(trimmed.to_string()))
                } else {
                    Err(SchemaError::InvalidEnumValue {
                        class: self.owner.clone(),
                        field: self.name.clone(),
                        value: trimmed.to_string(),
                        allowed: self.only.clone(),
                    })
                }
            }
        }
    }

    /// Check a value against this field's constraints
    pub fn check_value(&self, value: &Value) -> Result<(), SchemaError> {
        match value {
            Value::Null => {
                if self.mandatory {
                    return Err(SchemaError::MissingValue {
                        class: self.owner.clone(),
                        field: self.name.clone(),
                    });
                }
                Ok(())
            }
            Value::List(items) if self.is_multiple() => {
                for item in items {
                    self.check_single(item)?;
                }
                Ok(())
            }
            single => self.check_single(single),
        }
    }

    fn check_single(&self, value: &Value) -> Result<(), SchemaError> {
        let compatible = match (self.kind, value) {
            (FieldKind::Enum, Value::String(_)) => true,
            (FieldKind::Double, Value::Real(_) | Value::Int(_)) => true,
            (FieldKind::BigInt, Value::Int(_)) => true,
            (kind, value) => value.kind() == Some(kind),
        };
        if !compatible {
            return Err(SchemaError::ValueType {
                expected: self.kind.to_string(),
                found: value.type_name().to_string(),
            });
        }

        if let Some(number) = value.as_f64() {
            let below = self.min.is_some_and(|min| number < min);
            let above = self.max.is_some_and(|max| number > max);
            if below || above {
                return Err(self.out_of_bounds(value, self.min, self.max));
            }
        }

        if let Some(text) = value.as_str() {
            if self.kind == FieldKind::Enum && !self.only.iter().any(|v| v == text) {
                return Err(SchemaError::InvalidEnumValue {
                    class: self.owner.clone(),
                    field: self.name.clone(),
                    value: text.to_string(),
                    allowed: self.only.clone(),
                });
            }
            let length = text.chars().count();
            let too_short = self.min_size.is_some_and(|min| length < min);
            let too_long = self.max_size.is_some_and(|max| length > max);
            if too_short || too_long {
                return Err(self.out_of_bounds(
                    &Value::BigInt(length as i64),
                    self.min_size.map(|v| v as f64),
                    self.max_size.map(|v| v as f64),
                ));
            }
        }

        Ok(())
    }

    fn out_of_bounds(&self, value: &Value, min: Option<f64>, max: Option<f64>) -> SchemaError {
        let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_else(|| "..".to_string());
        SchemaError::OutOfBounds {
            class: self.owner.clone(),
            field: self.name.clone(),
            value: value.to_string(),
            bounds: format!("[{}, {}]", bound(min), bound(max)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_name_is_cached_and_idempotent() {
        let field = Field::new("Widget", "FirstName", FieldKind::String, false);
        let first = field.column_name() as *const str;
        assert_eq!(field.column_name(), "first_name");
        assert_eq!(first, field.column_name() as *const str);
    }

    #[test]
    fn test_column_override() {
        let mut field = Field::new("Widget", "name", FieldKind::String, false);
        field.set_column("label");
        assert_eq!(field.column_name(), "label");
    }

    #[test]
    fn test_parse_enum_rejects_unknown_values() {
        let mut field = Field::new("Widget", "color", FieldKind::Enum, false);
        field.only(&["red", "green"]);
        assert_eq!(field.parse_value("red").unwrap(), Value::Enum("red".into()));
        let err = field.parse_value("blue").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidEnumValue { .. }));
    }

    #[test]
    fn test_parse_numeric_and_bool() {
        let count = Field::new("Widget", "count", FieldKind::Int, false);
        assert_eq!(count.parse_value(" 42 ").unwrap(), Value::Int(42));
        assert_eq!(count.parse_value("").unwrap(), Value::Null);
        assert!(count.parse_value("forty").is_err());

        let flag = Field::new("Widget", "active", FieldKind::Bool, false);
        assert_eq!(flag.parse_value("1").unwrap(), Value::Bool(true));
        assert!(flag.parse_value("yes").is_err());
    }

    #[test]
    fn test_check_value_bounds_and_mandatory() {
        let mut count = Field::new("Widget", "count", FieldKind::Int, false);
        count.set_mandatory().min(0.0).max(100.0);
        assert!(count.check_value(&Value::Int(100)).is_ok());
        assert!(matches!(
            count.check_value(&Value::Int(101)),
            Err(SchemaError::OutOfBounds { .. })
        ));
        assert!(matches!(
            count.check_value(&Value::Null),
            Err(SchemaError::MissingValue { .. })
        ));
        assert!(matches!(
            count.check_value(&Value::String("1".into())),
            Err(SchemaError::ValueType { .. })
        ));
    }

    #[test]
    fn test_check_value_size() {
        let mut name = Field::new("Widget", "name", FieldKind::String, false);
        name.set_size(1, 3);
        assert!(name.check_value(&Value::from("abc")).is_ok());
        assert!(name.check_value(&Value::from("")).is_err());
        assert!(name.check_value(&Value::from("abcd")).is_err());
    }
}
