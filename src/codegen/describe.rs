//! Type description of declaration files.
//!
//! This is the only place that looks inside declared types: the struct's
//! fields and `#[bo(...)]` attributes are turned into a `ClassDescription`
//! that the rest of the pipeline works from.

use crate::codegen::discovery::{ClassCore, ClassKind, DiscoveryError};
use crate::codegen::types::{ClassDescription, PropertyDescription, PropertyShape, RelationDecl};
use crate::schema::{BusinessObjectClass, FieldKind, RelationKind, Superclass, Value};
use quote::ToTokens;
use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, GenericArgument, Ident, Lit, LitStr, PathArguments, Token, Type, UnOp};

/// Describes the declared type behind a discovered class
pub trait TypeDescriber {
    fn describe(&self, core: &ClassCore) -> Result<ClassDescription, DiscoveryError>;
}

/// Describes classes by parsing their declaration source with syn
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceDescriber;

impl TypeDescriber for SourceDescriber {
    fn describe(&self, core: &ClassCore) -> Result<ClassDescription, DiscoveryError> {
        let contents = std::fs::read_to_string(&core.path).map_err(|source| DiscoveryError::Io {
            path: core.path.clone(),
            source,
        })?;
        describe_source(core, &contents)
    }
}

/// Describe the class `core.name` declared in `contents`
pub fn describe_source(core: &ClassCore, contents: &str) -> Result<ClassDescription, DiscoveryError> {
    let file = syn::parse_file(contents).map_err(|source| DiscoveryError::Syntax {
        path: core.path.clone(),
        source,
    })?;
    let invalid = |e: syn::Error| DiscoveryError::InvalidDeclaration {
        path: core.path.clone(),
        message: e.to_string(),
    };

    let mut description = ClassDescription::new(&core.name, core.kind, &core.path);
    for item in &file.items {
        match item {
            syn::Item::Struct(item) if item.ident == core.name => {
                describe_struct(item, &mut description).map_err(invalid)?;
                return Ok(description);
            }
            syn::Item::Trait(item) if item.ident == core.name => {
                description.kind = ClassKind::Interface;
                return Ok(description);
            }
            _ => {}
        }
    }

    Err(DiscoveryError::NoDeclaration {
        path: core.path.clone(),
    })
}

fn describe_struct(item: &syn::ItemStruct, description: &mut ClassDescription) -> syn::Result<()> {
    for attr in bo_attributes(&item.attrs) {
        parse_class_attr(attr, description)?;
    }

    let fields = match &item.fields {
        syn::Fields::Named(named) => &named.named,
        syn::Fields::Unit => return Ok(()),
        syn::Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                &item.ident,
                "business objects must use named fields",
            ))
        }
    };

    for field in fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = ident.to_string();
        let name = name.strip_prefix("r#").unwrap_or(&name).to_string();

        let mut attrs = FieldAttrs::default();
        for attr in bo_attributes(&field.attrs) {
            attrs.parse(attr)?;
        }
        if attrs.skip {
            continue;
        }

        if name == BusinessObjectClass::IDENTITY && description.superclass != Superclass::QueryParams {
            description.has_identity_field = true;
            continue;
        }

        let property = describe_property(&name, &field.ty, attrs)?;
        tracing::trace!("{}.{}: {:?}", description.name, property.name, property.shape);
        description.properties.push(property);
    }
    Ok(())
}

fn bo_attributes(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("bo"))
}

fn parse_class_attr(attr: &Attribute, description: &mut ClassDescription) -> syn::Result<()> {
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("extends") {
            let parent: LitStr = meta.value()?.parse()?;
            description.superclass = Superclass::Class(parent.value());
        } else if meta.path.is_ident("query_params") {
            description.superclass = Superclass::QueryParams;
        } else if meta.path.is_ident("table") {
            let table: LitStr = meta.value()?.parse()?;
            description.table = Some(table.value());
        } else if meta.path.is_ident("database") {
            let database: LitStr = meta.value()?.parse()?;
            description.database = Some(database.value());
        } else if meta.path.is_ident("transient") {
            description.transient = true;
        } else if meta.path.is_ident("abstract_class") {
            description.is_abstract = true;
        } else {
            return Err(meta.error(format!(
                "unknown class attribute `{}`",
                meta.path.to_token_stream()
            )));
        }
        Ok(())
    })
}

/// A literal written in a `default = ...` attribute
#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

#[derive(Debug, Default)]
struct FieldAttrs {
    skip: bool,
    mandatory: bool,
    transient: bool,
    column: Option<String>,
    default: Option<(Literal, Expr)>,
    min: Option<f64>,
    max: Option<f64>,
    size: Option<(usize, usize)>,
    only: Vec<String>,
    targets: Vec<String>,
    relation: Option<RelationDecl>,
}

impl FieldAttrs {
    fn parse(&mut self, attr: &Attribute) -> syn::Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                self.skip = true;
            } else if meta.path.is_ident("mandatory") {
                self.mandatory = true;
            } else if meta.path.is_ident("transient") {
                self.transient = true;
            } else if meta.path.is_ident("column") {
                let column: LitStr = meta.value()?.parse()?;
                self.column = Some(column.value());
            } else if meta.path.is_ident("default") {
                let expr: Expr = meta.value()?.parse()?;
                self.default = Some((parse_literal(&expr)?, expr));
            } else if meta.path.is_ident("min") {
                let expr: Expr = meta.value()?.parse()?;
                self.min = Some(parse_number(&expr)?);
            } else if meta.path.is_ident("max") {
                let expr: Expr = meta.value()?.parse()?;
                self.max = Some(parse_number(&expr)?);
            } else if meta.path.is_ident("size") {
                let content;
                syn::parenthesized!(content in meta.input);
                let bounds = Punctuated::<syn::LitInt, Token![,]>::parse_terminated(&content)?;
                let values: Vec<usize> = bounds
                    .iter()
                    .map(|b| b.base10_parse::<usize>())
                    .collect::<syn::Result<_>>()?;
                match values.as_slice() {
                    [min, max] if min <= max => self.size = Some((*min, *max)),
                    _ => return Err(meta.error("size expects two bounds: size(min, max)")),
                }
            } else if meta.path.is_ident("only") {
                let content;
                syn::parenthesized!(content in meta.input);
                let values = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                self.only = values.iter().map(LitStr::value).collect();
                if self.only.is_empty() {
                    return Err(meta.error("only(...) needs at least one value"));
                }
            } else if meta.path.is_ident("targets") {
                let content;
                syn::parenthesized!(content in meta.input);
                let targets = Punctuated::<Ident, Token![,]>::parse_terminated(&content)?;
                self.targets = targets.iter().map(Ident::to_string).collect();
            } else if let Some(kind) = relation_kind(&meta) {
                self.relation = Some(RelationDecl {
                    kind,
                    back_ref: parse_back_ref(&meta, kind)?,
                });
            } else {
                return Err(meta.error(format!(
                    "unknown field attribute `{}`",
                    meta.path.to_token_stream()
                )));
            }
            Ok(())
        })
    }
}

fn relation_kind(meta: &ParseNestedMeta) -> Option<RelationKind> {
    RelationKind::ALL
        .into_iter()
        .find(|kind| meta.path.is_ident(&kind.as_str().replace('-', "_")))
}

fn parse_back_ref(meta: &ParseNestedMeta, kind: RelationKind) -> syn::Result<Option<String>> {
    if !meta.input.peek(Token![=]) {
        return Ok(None);
    }
    let back_ref: LitStr = meta.value()?.parse()?;
    if kind == RelationKind::OneWay {
        return Err(syn::Error::new(
            back_ref.span(),
            "one-way relationships have no back-reference",
        ));
    }
    Ok(Some(back_ref.value()))
}

fn parse_literal(expr: &Expr) -> syn::Result<Literal> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(Literal::Str(s.value())),
            Lit::Int(i) => Ok(Literal::Int(i.base10_parse()?)),
            Lit::Float(f) => Ok(Literal::Float(f.base10_parse()?)),
            Lit::Bool(b) => Ok(Literal::Bool(b.value)),
            other => Err(syn::Error::new_spanned(other, "unsupported default literal")),
        },
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => {
            match parse_literal(&unary.expr)? {
                Literal::Int(i) => Ok(Literal::Int(-i)),
                Literal::Float(f) => Ok(Literal::Float(-f)),
                _ => Err(syn::Error::new_spanned(expr, "only numbers can be negated")),
            }
        }
        Expr::Group(group) => parse_literal(&group.expr),
        other => Err(syn::Error::new_spanned(other, "expected a literal")),
    }
}

fn parse_number(expr: &Expr) -> syn::Result<f64> {
    match parse_literal(expr)? {
        Literal::Int(i) => Ok(i as f64),
        Literal::Float(f) => Ok(f),
        _ => Err(syn::Error::new_spanned(expr, "expected a number")),
    }
}

/// Shape of a Rust property type after unwrapping `Option`, `Box` and `Vec`
#[derive(Debug)]
struct TypeInfo {
    shape: TypeShape,
    multiple: bool,
    mappable: bool,
}

#[derive(Debug, PartialEq)]
enum TypeShape {
    Scalar(FieldKind),
    Class(String),
}

fn classify(ty: &Type) -> syn::Result<TypeInfo> {
    let mut multiple = false;
    let mut mappable = true;
    let shape = classify_inner(ty, &mut multiple, &mut mappable)?;
    Ok(TypeInfo {
        shape,
        multiple,
        mappable,
    })
}

fn classify_inner(ty: &Type, multiple: &mut bool, mappable: &mut bool) -> syn::Result<TypeShape> {
    match ty {
        Type::Reference(reference) => {
            *mappable = false;
            classify_inner(&reference.elem, multiple, mappable)
        }
        Type::Paren(paren) => classify_inner(&paren.elem, multiple, mappable),
        Type::Group(group) => classify_inner(&group.elem, multiple, mappable),
        Type::TraitObject(object) => object
            .bounds
            .iter()
            .find_map(|bound| match bound {
                syn::TypeParamBound::Trait(t) => t.path.segments.last(),
                _ => None,
            })
            .map(|segment| TypeShape::Class(segment.ident.to_string()))
            .ok_or_else(|| syn::Error::new_spanned(ty, "trait object without a trait")),
        Type::Path(path) if path.qself.is_none() => {
            let segment = path
                .path
                .segments
                .last()
                .ok_or_else(|| syn::Error::new_spanned(ty, "empty type path"))?;
            let ident = segment.ident.to_string();
            match ident.as_str() {
                "Option" => classify_inner(type_argument(segment, ty)?, multiple, mappable),
                "Box" | "Arc" | "Rc" => {
                    *mappable = false;
                    classify_inner(type_argument(segment, ty)?, multiple, mappable)
                }
                "Vec" => {
                    if *multiple {
                        return Err(syn::Error::new_spanned(ty, "nested collections are not supported"));
                    }
                    *multiple = true;
                    classify_inner(type_argument(segment, ty)?, multiple, mappable)
                }
                "DateTime" => {
                    let utc = type_argument(segment, ty)
                        .ok()
                        .and_then(last_ident)
                        .is_some_and(|tz| tz == "Utc");
                    *mappable &= utc;
                    Ok(TypeShape::Scalar(FieldKind::Date))
                }
                "i128" | "u128" | "char" => Err(syn::Error::new_spanned(
                    ty,
                    format!("type `{}` has no schema type family", ident),
                )),
                "u64" | "usize" => Err(syn::Error::new_spanned(
                    ty,
                    format!("type `{}` does not fit a bigint, use i64", ident),
                )),
                _ => Ok(scalar_kind(&ident)
                    .map(TypeShape::Scalar)
                    .unwrap_or(TypeShape::Class(ident))),
            }
        }
        _ => Err(syn::Error::new_spanned(ty, "unsupported property type")),
    }
}

fn type_argument<'a>(segment: &'a syn::PathSegment, ty: &Type) -> syn::Result<&'a Type> {
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        for arg in &args.args {
            if let GenericArgument::Type(inner) = arg {
                return Ok(inner);
            }
        }
    }
    Err(syn::Error::new_spanned(ty, "missing type argument"))
}

fn last_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

fn scalar_kind(ident: &str) -> Option<FieldKind> {
    let kind = match ident {
        "bool" => FieldKind::Bool,
        "String" | "str" => FieldKind::String,
        "i8" | "i16" | "i32" | "u8" | "u16" => FieldKind::Int,
        "i64" | "u32" | "isize" => FieldKind::BigInt,
        "f32" => FieldKind::Real,
        "f64" => FieldKind::Double,
        "NaiveDate" | "NaiveDateTime" | "SystemTime" => FieldKind::Date,
        _ => return None,
    };
    Some(kind)
}

fn describe_property(name: &str, ty: &Type, attrs: FieldAttrs) -> syn::Result<PropertyDescription> {
    let info = classify(ty)?;
    let shape = match info.shape {
        TypeShape::Scalar(FieldKind::String) if !attrs.only.is_empty() => {
            PropertyShape::Scalar(FieldKind::Enum)
        }
        TypeShape::Scalar(_) if !attrs.only.is_empty() => {
            return Err(syn::Error::new_spanned(ty, "only(...) applies to string fields"))
        }
        TypeShape::Scalar(_) if !attrs.targets.is_empty() || attrs.relation.is_some() => {
            return Err(syn::Error::new_spanned(
                ty,
                "relationship attributes apply to class-typed properties",
            ))
        }
        TypeShape::Scalar(kind) => PropertyShape::Scalar(kind),
        TypeShape::Class(_) if !attrs.targets.is_empty() => PropertyShape::Class(attrs.targets.clone()),
        TypeShape::Class(class) => PropertyShape::Class(vec![class]),
    };

    let mut property = PropertyDescription::new(name, shape, info.multiple);
    property.mandatory = attrs.mandatory;
    property.column = attrs.column;
    property.mappable = info.mappable;

    match property.shape.clone() {
        PropertyShape::Scalar(kind) => {
            if (attrs.min.is_some() || attrs.max.is_some()) && !kind.is_numeric() {
                return Err(syn::Error::new_spanned(ty, "min/max apply to numeric fields"));
            }
            if attrs.size.is_some() && kind != FieldKind::String {
                return Err(syn::Error::new_spanned(ty, "size(...) applies to string fields"));
            }
            property.transient = attrs.transient;
            property.min = attrs.min;
            property.max = attrs.max;
            property.size = attrs.size;
            property.only = attrs.only;
            if let Some((literal, expr)) = attrs.default {
                let value = default_value(kind, literal, &property.only)
                    .map_err(|message| syn::Error::new_spanned(&expr, message))?;
                property.default = Some(value);
            }
        }
        PropertyShape::Class(_) => {
            if attrs.transient || attrs.default.is_some() || attrs.min.is_some() || attrs.max.is_some() {
                return Err(syn::Error::new_spanned(
                    ty,
                    "transient, default, min and max apply to fields only",
                ));
            }
            property.relation = attrs.relation;
            property.mappable = false;
        }
    }
    Ok(property)
}

fn default_value(kind: FieldKind, literal: Literal, only: &[String]) -> Result<Value, String> {
    let value = match (kind, literal) {
        (FieldKind::Bool, Literal::Bool(b)) => Value::Bool(b),
        (FieldKind::String, Literal::Str(s)) => Value::String(s),
        (FieldKind::Enum, Literal::Str(s)) => {
            if !only.contains(&s) {
                return Err(format!("default '{}' is not one of {}", s, only.join(", ")));
            }
            Value::Enum(s)
        }
        (FieldKind::Int, Literal::Int(i)) => {
            Value::Int(i32::try_from(i).map_err(|_| format!("default {} does not fit an int", i))?)
        }
        (FieldKind::BigInt, Literal::Int(i)) => Value::BigInt(i),
        (FieldKind::Real, Literal::Int(i)) => Value::Real(i as f32),
        (FieldKind::Real, Literal::Float(f)) => Value::Real(f as f32),
        (FieldKind::Double, Literal::Int(i)) => Value::Double(i as f64),
        (FieldKind::Double, Literal::Float(f)) => Value::Double(f),
        (FieldKind::Date, Literal::Str(s)) => Value::Date(
            Value::parse_date(&s).ok_or_else(|| format!("default '{}' is not a date", s))?,
        ),
        (FieldKind::Date, Literal::Int(ms)) => Value::date_from_millis(ms),
        (kind, literal) => {
            return Err(format!("default {:?} does not match type family {}", literal, kind))
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn core(name: &str, kind: ClassKind) -> ClassCore {
        ClassCore {
            name: name.to_string(),
            modified_ms: 1,
            path: PathBuf::from(format!("model/{}_bo.rs", name.to_lowercase())),
            kind,
        }
    }

    fn describe(source: &str) -> ClassDescription {
        describe_source(&core("Widget", ClassKind::Concrete), source).unwrap()
    }

    #[test]
    fn test_describe_scalar_fields() {
        let description = describe(
            r#"
            use chrono::NaiveDate;

            #[bo(table = "widgets")]
            pub struct Widget {
                pub id: i64,
                #[bo(mandatory, size(1, 64))]
                pub name: String,
                #[bo(min = 0, max = 100, default = 1)]
                pub count: i32,
                pub weight: Option<f64>,
                pub tags: Vec<String>,
                pub released: NaiveDate,
                #[bo(only("red", "green"), default = "red")]
                pub color: String,
                #[bo(skip)]
                pub cache: Vec<u8>,
                #[bo(transient, column = "seen")]
                pub seen_at: i64,
            }
            "#,
        );

        assert_eq!(description.table.as_deref(), Some("widgets"));
        assert!(description.has_identity_field);
        let names: Vec<&str> = description.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "count", "weight", "tags", "released", "color", "seen_at"]);

        let name = description.property("name").unwrap();
        assert_eq!(name.shape, PropertyShape::Scalar(FieldKind::String));
        assert!(name.mandatory);
        assert_eq!(name.size, Some((1, 64)));

        let count = description.property("count").unwrap();
        assert_eq!(count.min, Some(0.0));
        assert_eq!(count.max, Some(100.0));
        assert_eq!(count.default, Some(Value::Int(1)));

        assert_eq!(
            description.property("weight").unwrap().shape,
            PropertyShape::Scalar(FieldKind::Double)
        );
        assert!(description.property("tags").unwrap().multiple);
        assert_eq!(
            description.property("released").unwrap().field_kind(),
            Some(FieldKind::Date)
        );

        let color = description.property("color").unwrap();
        assert_eq!(color.field_kind(), Some(FieldKind::Enum));
        assert_eq!(color.default, Some(Value::Enum("red".into())));

        let seen = description.property("seen_at").unwrap();
        assert!(seen.transient);
        assert_eq!(seen.column.as_deref(), Some("seen"));
        assert_eq!(seen.field_kind(), Some(FieldKind::BigInt));
    }

    #[test]
    fn test_describe_relationships() {
        let description = describe(
            r#"
            #[bo(extends = "Product")]
            pub struct Widget {
                #[bo(child_to_parent = "widgets", mandatory)]
                pub owner: Box<User>,
                #[bo(one_way)]
                pub parts: Vec<Part>,
                #[bo(targets(Post, Photo), source_to_target)]
                pub subject: Option<Box<dyn Commentable>>,
                pub notes: Vec<Note>,
            }
            "#,
        );

        assert_eq!(description.superclass, Superclass::Class("Product".into()));
        let owner = description.property("owner").unwrap();
        assert_eq!(owner.targets(), &["User".to_string()]);
        assert!(!owner.multiple);
        assert!(owner.mandatory);
        assert_eq!(
            owner.relation,
            Some(RelationDecl {
                kind: RelationKind::ChildToParent,
                back_ref: Some("widgets".into())
            })
        );

        let parts = description.property("parts").unwrap();
        assert!(parts.multiple);
        assert_eq!(parts.relation.as_ref().unwrap().kind, RelationKind::OneWay);

        let subject = description.property("subject").unwrap();
        assert_eq!(subject.targets(), &["Post".to_string(), "Photo".to_string()]);
        assert_eq!(subject.relation.as_ref().unwrap().back_ref, None);

        assert!(description.property("notes").unwrap().relation.is_none());
    }

    #[test]
    fn test_describe_negative_bounds_and_query_params() {
        let description = describe(
            r#"
            #[bo(query_params)]
            pub struct Widget {
                #[bo(min = -10, max = 2.5)]
                pub offset: f32,
                pub id: String,
            }
            "#,
        );
        assert_eq!(description.superclass, Superclass::QueryParams);
        assert!(!description.has_identity_field);
        let offset = description.property("offset").unwrap();
        assert_eq!(offset.min, Some(-10.0));
        assert_eq!(offset.max, Some(2.5));
        assert!(description.property("id").is_some());
    }

    #[test]
    fn test_describe_interface() {
        let description = describe_source(
            &core("Commentable", ClassKind::Interface),
            "pub trait Commentable { fn title(&self) -> String; }",
        )
        .unwrap();
        assert!(description.is_interface());
        assert!(description.properties.is_empty());
    }

    #[test]
    fn test_describe_rejects_invalid_declarations() {
        let cases = [
            "pub struct Widget { pub big: u128 }",
            "pub struct Widget { pub hits: u64 }",
            "pub struct Widget { pub sizes: Vec<usize> }",
            "pub struct Widget { #[bo(only(\"a\"))] pub n: i32 }",
            "pub struct Widget { #[bo(max = 3)] pub name: String }",
            "pub struct Widget { #[bo(child_to_parent = \"x\")] pub name: String }",
            "pub struct Widget { #[bo(default = \"x\")] pub count: i32 }",
            "pub struct Widget { #[bo(one_way = \"x\")] pub owner: User }",
            "pub struct Widget { #[bo(frobnicate)] pub name: String }",
            "#[bo(sealed)] pub struct Widget {}",
            "pub struct Widget(String);",
        ];
        for source in cases {
            let result = describe_source(&core("Widget", ClassKind::Concrete), source);
            assert!(
                matches!(result, Err(DiscoveryError::InvalidDeclaration { .. })),
                "accepted: {}",
                source
            );
        }
    }

    #[test]
    fn test_value_mapper_compatibility() {
        let description = describe(
            r#"
            pub struct Widget {
                pub name: String,
                pub label: Box<String>,
                pub when: chrono::DateTime<chrono::Local>,
                pub owner: User,
            }
            "#,
        );
        assert!(description.property("name").unwrap().mappable);
        assert!(!description.property("label").unwrap().mappable);
        assert!(!description.property("when").unwrap().mappable);
        assert!(!description.property("owner").unwrap().mappable);
    }
}
