#![deny(missing_docs)]

//! # Type Model
//!
//! The closed set of type variants produced by schema resolution.
//!
//! Every value is immutable once constructed: structural identity (not
//! identity equality) is what matters for registration in the symbol table.
//! The only sanctioned mutation is the simple-name rewrite performed by the
//! disambiguation pass, exposed crate-internally via [`Type::rename`].

use crate::error::{AppError, AppResult};
use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

/// The primitive kinds representable by [`Type::Simple`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Primitive {
    /// A plain string.
    String,
    /// A 32-bit integer.
    Int,
    /// A 64-bit integer (`format: int64`).
    Long,
    /// A 32-bit float.
    Float,
    /// A 64-bit float (`format: double`).
    Double,
    /// A boolean.
    Bool,
    /// An opaque JSON value with no further structure.
    Json,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Primitive::String => "string",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bool => "bool",
            Primitive::Json => "json",
        };
        write!(f, "{}", label)
    }
}

/// The generated symbol of a named type: a `(package, simple)` pair.
///
/// Pairs are unique across the graph only after the disambiguation pass.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TypeName {
    /// Target namespace/package for the generated symbol.
    pub package: String,
    /// Simple (unqualified) name.
    pub simple: String,
}

impl TypeName {
    /// Creates a name in the given package.
    pub fn new(package: impl Into<String>, simple: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            simple: simple.into(),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.simple)
    }
}

/// A single object property: its resolved type plus documentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    /// Resolved property type.
    pub ty: Type,
    /// Description taken from the schema node, if any.
    pub doc: Option<String>,
}

/// A concrete object type with ordered properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectType {
    /// Generated symbol.
    pub name: TypeName,
    /// Properties in declaration order.
    pub properties: IndexMap<String, Property>,
    /// Names of required properties. Always a subset of `properties` keys.
    pub required: Vec<String>,
    /// Default literals per property name.
    pub defaults: IndexMap<String, JsonValue>,
}

impl ObjectType {
    /// Builds an object type, validating that every required name refers to
    /// a declared property.
    pub fn new(
        name: TypeName,
        properties: IndexMap<String, Property>,
        required: Vec<String>,
        defaults: IndexMap<String, JsonValue>,
    ) -> AppResult<Self> {
        for req in &required {
            if !properties.contains_key(req) {
                return Err(AppError::General(format!(
                    "Object '{}' marks '{}' required but declares no such property",
                    name, req
                )));
            }
        }
        Ok(Self {
            name,
            properties,
            required,
            defaults,
        })
    }
}

/// One branch of a polymorphic sum, tagged with its discriminator value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneOfVariant {
    /// The branch type (a `Reference` or an inline `Object`).
    pub ty: Type,
    /// The discriminator value selecting this branch at decode time.
    pub tag: String,
}

/// A polymorphic sum type (`oneOf` with a discriminator).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneOfType {
    /// Generated symbol.
    pub name: TypeName,
    /// Discriminator property name; `None` only when no explicit
    /// discriminator was declared.
    pub discriminator: Option<String>,
    /// Branches in declaration order.
    pub variants: Vec<OneOfVariant>,
}

impl OneOfType {
    /// Builds a sum type, validating that branch types are structurally
    /// distinct and that no discriminator value is duplicated.
    pub fn new(
        name: TypeName,
        discriminator: Option<String>,
        variants: Vec<OneOfVariant>,
    ) -> AppResult<Self> {
        for (idx, variant) in variants.iter().enumerate() {
            for earlier in &variants[..idx] {
                if earlier.tag == variant.tag {
                    return Err(AppError::General(format!(
                        "oneOf '{}' declares duplicate discriminator value '{}'",
                        name, variant.tag
                    )));
                }
                if earlier.ty == variant.ty {
                    return Err(AppError::General(format!(
                        "oneOf '{}' declares structurally identical branches for '{}' and '{}'",
                        name, earlier.tag, variant.tag
                    )));
                }
            }
        }
        Ok(Self {
            name,
            discriminator,
            variants,
        })
    }

    /// Looks up the branch tagged with the given discriminator value.
    pub fn variant(&self, tag: &str) -> Option<&OneOfVariant> {
        self.variants.iter().find(|v| v.tag == tag)
    }
}

/// A closed string enumeration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumType {
    /// Generated symbol.
    pub name: TypeName,
    /// Raw wire value to generated identifier, in declaration order.
    pub elements: IndexMap<String, String>,
    /// True only when the declared value set includes an explicit null.
    pub nullable: bool,
}

/// A transparent rename of another type.
///
/// Used for arrays at a component root (a component must always be nominal)
/// and for "no schema" placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasType {
    /// Generated symbol.
    pub name: TypeName,
    /// The aliased type.
    pub target: Box<Type>,
}

/// A synthesized nominal wrapper around a non-named type, so that a list or
/// primitive payload can be referenced uniformly as a response/error body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrapperType {
    /// Generated symbol.
    pub name: TypeName,
    /// The wrapped non-nominal type.
    pub wrapped: Box<Type>,
}

/// A resolved type descriptor.
///
/// `Reference` never holds content: it is resolved lazily, possibly
/// transitively, through the symbol table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Type {
    /// A primitive with an explicit nullability flag.
    Simple {
        /// Primitive kind.
        primitive: Primitive,
        /// Whether null is an admissible value.
        nullable: bool,
    },
    /// A homogeneous sequence.
    List {
        /// Element type (may itself be a list or reference).
        item: Box<Type>,
    },
    /// An unresolved pointer into the symbol table.
    Reference {
        /// The target pointer.
        target: String,
    },
    /// A concrete object.
    Object(ObjectType),
    /// A polymorphic sum.
    OneOf(OneOfType),
    /// A string enumeration.
    Enum(EnumType),
    /// A transparent rename.
    Alias(AliasType),
    /// A synthesized nominal wrapper.
    Wrapper(WrapperType),
}

impl Type {
    /// An opaque, non-nullable JSON value.
    pub fn json() -> Self {
        Type::Simple {
            primitive: Primitive::Json,
            nullable: false,
        }
    }

    /// A non-nullable primitive.
    pub fn simple(primitive: Primitive) -> Self {
        Type::Simple {
            primitive,
            nullable: false,
        }
    }

    /// The generated symbol, for named variants.
    pub fn name(&self) -> Option<&TypeName> {
        match self {
            Type::Object(o) => Some(&o.name),
            Type::OneOf(o) => Some(&o.name),
            Type::Enum(e) => Some(&e.name),
            Type::Alias(a) => Some(&a.name),
            Type::Wrapper(w) => Some(&w.name),
            Type::Simple { .. } | Type::List { .. } | Type::Reference { .. } => None,
        }
    }

    /// The reference target, when this is a `Reference`.
    pub fn reference_target(&self) -> Option<&str> {
        match self {
            Type::Reference { target } => Some(target),
            _ => None,
        }
    }

    /// Whether this variant carries a generated symbol.
    pub fn is_nominal(&self) -> bool {
        self.name().is_some()
    }

    /// Rewrites the simple name of a named variant. No-op otherwise.
    ///
    /// Reserved for the disambiguation pass; named types are immutable
    /// everywhere else.
    pub(crate) fn rename(&mut self, simple: String) {
        match self {
            Type::Object(o) => o.name.simple = simple,
            Type::OneOf(o) => o.name.simple = simple,
            Type::Enum(e) => e.name.simple = simple,
            Type::Alias(a) => a.name.simple = simple,
            Type::Wrapper(w) => w.name.simple = simple,
            Type::Simple { .. } | Type::List { .. } | Type::Reference { .. } => {}
        }
    }

    /// Compact human-readable rendering used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Type::Simple {
                primitive,
                nullable,
            } => {
                if *nullable {
                    format!("Simple({}?)", primitive)
                } else {
                    format!("Simple({})", primitive)
                }
            }
            Type::List { item } => format!("List({})", item.describe()),
            Type::Reference { target } => format!("Reference({})", target),
            Type::Object(o) => format!("Object({})", o.name),
            Type::OneOf(o) => format!("OneOf({})", o.name),
            Type::Enum(e) => format!("Enum({})", e.name),
            Type::Alias(a) => format!("Alias({} -> {})", a.name, a.target.describe()),
            Type::Wrapper(w) => format!("Wrapper({} -> {})", w.name, w.wrapped.describe()),
        }
    }
}

/// Derives a generated identifier for a raw enum value.
///
/// e.g. `in-progress` -> `InProgress`; values starting with a digit are
/// prefixed so the identifier stays valid in common target languages.
pub fn enum_identifier(raw: &str) -> String {
    let camel = raw.to_upper_camel_case();
    if camel.is_empty() {
        return "Empty".to_string();
    }
    if camel.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("V{}", camel)
    } else {
        camel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(simple: &str) -> TypeName {
        TypeName::new("models", simple)
    }

    #[test]
    fn test_object_required_must_be_declared() {
        let mut props = IndexMap::new();
        props.insert(
            "id".to_string(),
            Property {
                ty: Type::simple(Primitive::Int),
                doc: None,
            },
        );
        let err = ObjectType::new(
            name("User"),
            props,
            vec!["missing".to_string()],
            IndexMap::new(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_one_of_rejects_duplicate_tags() {
        let variants = vec![
            OneOfVariant {
                ty: Type::Reference {
                    target: "#/components/schemas/A".into(),
                },
                tag: "a".into(),
            },
            OneOfVariant {
                ty: Type::Reference {
                    target: "#/components/schemas/B".into(),
                },
                tag: "a".into(),
            },
        ];
        let err = OneOfType::new(name("AOrB"), Some("kind".into()), variants);
        assert!(err.is_err());
    }

    #[test]
    fn test_one_of_rejects_duplicate_branch_types() {
        let variants = vec![
            OneOfVariant {
                ty: Type::Reference {
                    target: "#/components/schemas/A".into(),
                },
                tag: "a".into(),
            },
            OneOfVariant {
                ty: Type::Reference {
                    target: "#/components/schemas/A".into(),
                },
                tag: "b".into(),
            },
        ];
        let err = OneOfType::new(name("AOrB"), Some("kind".into()), variants);
        assert!(err.is_err());
    }

    #[test]
    fn test_rename_only_touches_named_variants() {
        let mut simple = Type::simple(Primitive::Bool);
        simple.rename("Ignored".into());
        assert_eq!(simple, Type::simple(Primitive::Bool));

        let mut alias = Type::Alias(AliasType {
            name: name("Old"),
            target: Box::new(Type::json()),
        });
        alias.rename("New".into());
        assert_eq!(alias.name().unwrap().simple, "New");
    }

    #[test]
    fn test_enum_identifier_rules() {
        assert_eq!(enum_identifier("in-progress"), "InProgress");
        assert_eq!(enum_identifier("NOT_FOUND"), "NotFound");
        assert_eq!(enum_identifier("404"), "V404");
        assert_eq!(enum_identifier(""), "Empty");
    }

    #[test]
    fn test_model_serializes_for_emitters() {
        let mut props = IndexMap::new();
        props.insert(
            "id".to_string(),
            Property {
                ty: Type::simple(Primitive::Long),
                doc: Some("primary key".to_string()),
            },
        );
        let mut defaults = IndexMap::new();
        defaults.insert("id".to_string(), serde_json::json!(0));
        let ty = Type::Object(
            ObjectType::new(name("User"), props, vec!["id".to_string()], defaults).unwrap(),
        );

        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["Object"]["name"]["package"], "models");
        assert_eq!(json["Object"]["name"]["simple"], "User");
        assert_eq!(json["Object"]["required"][0], "id");
        assert_eq!(json["Object"]["defaults"]["id"], 0);
        let id = &json["Object"]["properties"]["id"];
        assert_eq!(id["doc"], "primary key");
        assert_eq!(id["ty"]["Simple"]["primitive"], "Long");
        assert_eq!(id["ty"]["Simple"]["nullable"], false);
    }

    #[test]
    fn test_describe_renders_chains() {
        let ty = Type::List {
            item: Box::new(Type::Reference {
                target: "#/components/schemas/User".into(),
            }),
        };
        assert_eq!(
            ty.describe(),
            "List(Reference(#/components/schemas/User))"
        );
    }
}
