#![deny(missing_docs)]

//! # Type Resolution
//!
//! The recursive `make_type` rule: converts one schema node into a [`Type`],
//! registering it (and every nested type) in the store as it goes.
//!
//! Reference nodes are tracked out-of-band by the [`ReferenceResolver`]; a
//! `$ref` produces a `Reference` without recursing into the target, which is
//! resolved independently under its own pointer.

use crate::analyzer::{pascal, Analyzer, WrapMode};
use crate::error::{AppError, AppResult};
use crate::model::{
    enum_identifier, AliasType, EnumType, ObjectType, OneOfType, OneOfVariant, Primitive,
    Property, Type,
};
use crate::refs::{component_name, join_pointer};
use crate::source::{CompositionKind, Discriminator, ReferenceResolver, SchemaSource, TypeKeyword};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde_json::Value as JsonValue;

/// Bound on node-level `$ref` hops when flattening composition branches.
const MAX_BRANCH_REF_HOPS: usize = 16;

/// Shape classification of one schema node, computed once and matched
/// exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SchemaShape {
    /// The node is a `$ref` to the given target.
    Reference(String),
    /// `type: array`.
    Array,
    /// `type: string` with declared `enum` values.
    StringEnum,
    /// A declared primitive type, with format hints applied.
    Primitive(Primitive),
    /// `type: object` with at least one property.
    Object,
    /// `type: object` without properties; nothing nominal to generate.
    EmptyObject,
    /// `oneOf` composition.
    OneOf,
    /// `allOf` composition.
    AllOf,
    /// `anyOf` composition.
    AnyOf,
    /// No declared type, no composition: a schema without structure.
    Unstructured,
}

impl SchemaShape {
    /// Whether the branch's declared type is primitive (polymorphism over
    /// primitives is not representable).
    fn is_primitive(&self) -> bool {
        matches!(self, SchemaShape::Primitive(_) | SchemaShape::StringEnum)
    }

    /// Whether the branch can carry a nominal identity as a sum variant.
    fn is_nameable_branch(&self) -> bool {
        matches!(
            self,
            SchemaShape::Reference(_) | SchemaShape::Object | SchemaShape::AllOf
        )
    }
}

impl<'a, S, R> Analyzer<'a, S, R>
where
    S: SchemaSource + Sync,
    R: ReferenceResolver + Sync,
{
    /// Classifies a schema node. `$ref` tracking comes from the resolver,
    /// never from the target's own declared type.
    pub(crate) fn classify(&self, pointer: &str) -> AppResult<SchemaShape> {
        if let Some(target) = self.refs.reference_target(pointer) {
            return Ok(SchemaShape::Reference(target));
        }

        // Nullability of the [T, "null"] form flows through nullable_flag;
        // classification only needs the concrete type name.
        let declared = match self.source.schema_type(pointer) {
            Some(TypeKeyword::Single(name)) | Some(TypeKeyword::Nullable(name)) => Some(name),
            Some(TypeKeyword::Unsupported(raw)) => {
                return Err(AppError::UnknownSchemaType {
                    keyword: raw,
                    pointer: pointer.to_string(),
                })
            }
            None => None,
        };

        match declared.as_deref() {
            Some("array") => Ok(SchemaShape::Array),
            Some("string") => {
                if self.source.enum_values(pointer).is_some() {
                    Ok(SchemaShape::StringEnum)
                } else {
                    Ok(SchemaShape::Primitive(Primitive::String))
                }
            }
            Some("boolean") => Ok(SchemaShape::Primitive(Primitive::Bool)),
            Some("integer") => {
                let primitive = match self.source.format(pointer).as_deref() {
                    Some("int64") => Primitive::Long,
                    _ => Primitive::Int,
                };
                Ok(SchemaShape::Primitive(primitive))
            }
            Some("number") => {
                let primitive = match self.source.format(pointer).as_deref() {
                    Some("double") => Primitive::Double,
                    _ => Primitive::Float,
                };
                Ok(SchemaShape::Primitive(primitive))
            }
            Some("object") => {
                if self.source.property_names(pointer).is_empty() {
                    Ok(SchemaShape::EmptyObject)
                } else {
                    Ok(SchemaShape::Object)
                }
            }
            Some(other) => Err(AppError::UnknownSchemaType {
                keyword: other.to_string(),
                pointer: pointer.to_string(),
            }),
            None => {
                if !self
                    .source
                    .branch_pointers(pointer, CompositionKind::OneOf)
                    .is_empty()
                {
                    Ok(SchemaShape::OneOf)
                } else if !self
                    .source
                    .branch_pointers(pointer, CompositionKind::AllOf)
                    .is_empty()
                {
                    Ok(SchemaShape::AllOf)
                } else if !self
                    .source
                    .branch_pointers(pointer, CompositionKind::AnyOf)
                    .is_empty()
                {
                    Ok(SchemaShape::AnyOf)
                } else {
                    Ok(SchemaShape::Unstructured)
                }
            }
        }
    }

    /// Converts the schema node at `pointer` into a [`Type`] and registers
    /// it. `hint` seeds generated names; `component_root` marks first-class
    /// `components.schemas` registration; `wrap` only influences how
    /// structureless nodes degrade (wrapping itself is applied at the
    /// response root by the caller).
    pub(crate) fn make_type(
        &self,
        pointer: &str,
        hint: &str,
        component_root: bool,
        wrap: WrapMode,
    ) -> AppResult<Type> {
        let ty = match self.classify(pointer)? {
            SchemaShape::Reference(target) => Type::Reference { target },
            SchemaShape::Array => self.make_list(pointer, hint, component_root, wrap)?,
            SchemaShape::StringEnum => self.make_enum(pointer, hint),
            SchemaShape::Primitive(primitive) => Type::Simple {
                primitive,
                nullable: self.source.nullable_flag(pointer),
            },
            SchemaShape::Object => self.make_object(pointer, hint, wrap)?,
            SchemaShape::EmptyObject => Type::Simple {
                primitive: Primitive::Json,
                nullable: self.source.nullable_flag(pointer),
            },
            SchemaShape::OneOf => self.make_one_of(pointer, hint, wrap)?,
            SchemaShape::AllOf => self.make_all_of(pointer, hint, wrap)?,
            SchemaShape::AnyOf => Type::json(),
            SchemaShape::Unstructured => {
                if component_root {
                    // The component is itself the object definition.
                    if self.source.property_names(pointer).is_empty() {
                        Type::json()
                    } else {
                        self.make_object(pointer, hint, wrap)?
                    }
                } else if wrap != WrapMode::None {
                    Type::json()
                } else {
                    Type::Alias(AliasType {
                        name: self.store.type_name(hint),
                        target: Box::new(Type::json()),
                    })
                }
            }
        };

        self.register_at(pointer, component_root, &ty)?;
        Ok(ty)
    }

    fn register_at(&self, pointer: &str, component_root: bool, ty: &Type) -> AppResult<()> {
        if component_root && component_name(pointer, "schemas").is_some() {
            self.store.register_component(pointer, ty.clone())
        } else {
            self.store.register(pointer, ty.clone())
        }
    }

    fn make_list(
        &self,
        pointer: &str,
        hint: &str,
        component_root: bool,
        wrap: WrapMode,
    ) -> AppResult<Type> {
        let items_ptr = format!("{}/items", pointer);
        let item = if self.source.exists(&items_ptr) {
            let child = self.make_type(&items_ptr, &format!("{}Item", hint), false, wrap)?;
            link(&items_ptr, child)
        } else {
            Type::json()
        };
        let list = Type::List {
            item: Box::new(item),
        };

        // A component must always be nominal, never an anonymous list.
        if component_root {
            Ok(Type::Alias(AliasType {
                name: self.store.type_name(hint),
                target: Box::new(list),
            }))
        } else {
            Ok(list)
        }
    }

    fn make_enum(&self, pointer: &str, hint: &str) -> Type {
        let values = self.source.enum_values(pointer).unwrap_or_default();
        let mut elements = IndexMap::new();
        let mut nullable = false;
        for value in values {
            match value {
                JsonValue::Null => nullable = true,
                JsonValue::String(raw) => {
                    let identifier = enum_identifier(&raw);
                    elements.insert(raw, identifier);
                }
                other => {
                    let raw = other.to_string();
                    let identifier = enum_identifier(&raw);
                    elements.insert(raw, identifier);
                }
            }
        }
        Type::Enum(EnumType {
            name: self.store.type_name(hint),
            elements,
            nullable,
        })
    }

    fn make_object(&self, pointer: &str, hint: &str, wrap: WrapMode) -> AppResult<Type> {
        let names = self.source.property_names(pointer);
        let resolved = names
            .par_iter()
            .map(|prop| {
                let prop_ptr = join_pointer(&format!("{}/properties", pointer), prop);
                let child =
                    self.make_type(&prop_ptr, &format!("{}{}", hint, pascal(prop)), false, wrap)?;
                let property = Property {
                    ty: link(&prop_ptr, child),
                    doc: self.source.description(&prop_ptr),
                };
                let default = self.source.default_value(&prop_ptr);
                Ok((prop.clone(), property, default))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let mut properties = IndexMap::new();
        let mut defaults = IndexMap::new();
        for (name, property, default) in resolved {
            if let Some(literal) = default {
                defaults.insert(name.clone(), literal);
            }
            properties.insert(name, property);
        }

        let object = ObjectType::new(
            self.store.type_name(hint),
            properties,
            self.source.required_names(pointer),
            defaults,
        )?;
        Ok(Type::Object(object))
    }

    fn make_one_of(&self, pointer: &str, hint: &str, wrap: WrapMode) -> AppResult<Type> {
        let branches = self.source.branch_pointers(pointer, CompositionKind::OneOf);
        let mut shapes = Vec::with_capacity(branches.len());
        for branch in &branches {
            shapes.push(self.classify(branch)?);
        }

        // Polymorphism over primitives is not representable; neither is an
        // undiscriminated sum. Both collapse to an opaque JSON value.
        if shapes.iter().any(SchemaShape::is_primitive) {
            return Ok(Type::json());
        }
        let Some(discriminator) = self.source.discriminator(pointer) else {
            return Ok(Type::json());
        };
        if !shapes.iter().all(SchemaShape::is_nameable_branch) {
            return Ok(Type::json());
        }

        let mut variants = Vec::with_capacity(branches.len());
        for (idx, branch) in branches.iter().enumerate() {
            let shape = &shapes[idx];
            let branch_hint = format!("{}Variant{}", hint, idx);
            let built = self.make_type(branch, &branch_hint, false, wrap)?;

            let tag = match shape {
                SchemaShape::Reference(target) => {
                    let inline = component_name(target, "schemas").ok_or_else(|| {
                        AppError::MisplacedReference {
                            pointer: branch.clone(),
                            detail: format!(
                                "oneOf branch $ref must target a component schema, got '{}'",
                                target
                            ),
                        }
                    })?;
                    mapping_tag(&discriminator, target).unwrap_or(inline)
                }
                _ => built
                    .name()
                    .map(|n| n.simple.clone())
                    .unwrap_or(branch_hint),
            };

            variants.push(OneOfVariant {
                ty: link(branch, built),
                tag,
            });
        }

        let one_of = OneOfType::new(
            self.store.type_name(hint),
            Some(discriminator.property_name),
            variants,
        )?;
        Ok(Type::OneOf(one_of))
    }

    /// Merges all `allOf` branches into a single synthetic object.
    ///
    /// Merge order is declaration order; later branches win on key
    /// collision, for properties and defaults alike. The required set is
    /// the union.
    fn make_all_of(&self, pointer: &str, hint: &str, wrap: WrapMode) -> AppResult<Type> {
        let branches = self.source.branch_pointers(pointer, CompositionKind::AllOf);

        let mut properties: IndexMap<String, Property> = IndexMap::new();
        let mut required: Vec<String> = Vec::new();
        let mut defaults: IndexMap<String, JsonValue> = IndexMap::new();

        for branch in &branches {
            let effective = self.follow_branch(branch)?;
            // Name nested types after the owning component so a merge and
            // the component's own task register identical content.
            let base = component_name(&effective, "schemas")
                .map(|name| pascal(&name))
                .unwrap_or_else(|| hint.to_string());

            for prop in self.source.property_names(&effective) {
                let prop_ptr = join_pointer(&format!("{}/properties", effective), &prop);
                let child =
                    self.make_type(&prop_ptr, &format!("{}{}", base, pascal(&prop)), false, wrap)?;
                let property = Property {
                    ty: link(&prop_ptr, child),
                    doc: self.source.description(&prop_ptr),
                };
                if let Some(literal) = self.source.default_value(&prop_ptr) {
                    defaults.insert(prop.clone(), literal);
                }
                properties.insert(prop, property);
            }
            for name in self.source.required_names(&effective) {
                if !required.contains(&name) {
                    required.push(name);
                }
            }
        }

        let object = ObjectType::new(self.store.type_name(hint), properties, required, defaults)?;
        Ok(Type::Object(object))
    }

    /// Follows node-level `$ref`s of a composition branch to the node whose
    /// content is merged.
    fn follow_branch(&self, pointer: &str) -> AppResult<String> {
        let mut current = pointer.to_string();
        for _ in 0..MAX_BRANCH_REF_HOPS {
            match self.refs.reference_target(&current) {
                Some(target) => current = target,
                None => {
                    if self.source.exists(&current) {
                        return Ok(current);
                    }
                    return Err(AppError::UnresolvedReference {
                        pointer: pointer.to_string(),
                        detail: format!("branch target '{}' not present in document", current),
                    });
                }
            }
        }
        Err(AppError::UnresolvedReference {
            pointer: pointer.to_string(),
            detail: format!("$ref chain exceeds {} hops", MAX_BRANCH_REF_HOPS),
        })
    }
}

/// Embeds a child type into its parent: nominal children are linked through
/// the symbol table rather than copied, so the disambiguation pass has a
/// single owner per name.
fn link(child_pointer: &str, child: Type) -> Type {
    if child.is_nominal() {
        Type::Reference {
            target: child_pointer.to_string(),
        }
    } else {
        child
    }
}

/// Looks up the discriminator value mapped to a branch target, accepting
/// both full `$ref` strings and bare component names in the mapping.
fn mapping_tag(discriminator: &Discriminator, target: &str) -> Option<String> {
    let short = component_name(target, "schemas");
    for (tag, mapped) in &discriminator.mapping {
        if mapped == target {
            return Some(tag.clone());
        }
        if short.as_deref() == Some(mapped.as_str()) {
            return Some(tag.clone());
        }
    }
    None
}
