#![deny(missing_docs)]

//! # Parameter and Request Body Resolution
//!
//! Resolves the merged parameter list and the request body of one
//! operation into the store's parameter index.
//!
//! Parameter lists merge path-item declarations with operation declarations:
//! the operation wins on a `(name, location)` collision, and path-item order
//! is preserved for the survivors.

use crate::analyzer::{body_type_name, pascal, Analyzer, WrapMode};
use crate::error::{AppError, AppResult};
use crate::model::{AliasType, Type};
use crate::refs::component_name;
use crate::source::{OperationKey, ParamLocation, ParamNode, ReferenceResolver, SchemaSource};
use crate::store::{OperationParam, RequestBody};
use indexmap::IndexMap;

const MAX_BODY_REF_HOPS: usize = 16;

impl<'a, S, R> Analyzer<'a, S, R>
where
    S: SchemaSource + Sync,
    R: ReferenceResolver + Sync,
{
    /// Resolves the merged parameter list of one operation.
    pub(crate) fn operation_params(&self, key: &OperationKey) -> AppResult<()> {
        let mut merged: IndexMap<(String, ParamLocation), ParamNode> = IndexMap::new();
        for node in self.source.path_item_parameters(&key.path)? {
            merged.insert((node.name.clone(), node.location), node);
        }
        for node in self.source.operation_parameters(key)? {
            merged.insert((node.name.clone(), node.location), node);
        }

        let mut params = Vec::with_capacity(merged.len());
        for node in merged.into_values() {
            let (ty, schema_pointer) = match &node.schema_pointer {
                Some(schema_ptr) => {
                    let hint = param_hint(&node);
                    let ty = self.make_type(schema_ptr, &hint, false, WrapMode::None)?;
                    (ty, Some(schema_ptr.clone()))
                }
                None => (Type::json(), None),
            };
            params.push(OperationParam {
                name: node.name,
                location: node.location,
                required: node.required,
                ty,
                schema_pointer,
            });
        }

        self.store.register_params(key, params)
    }

    /// Resolves the request body of one operation, if it declares one.
    pub(crate) fn operation_body(&self, key: &OperationKey) -> AppResult<()> {
        let Some(node_ptr) = self.source.request_body_pointer(key) else {
            return Ok(());
        };
        let effective = self.follow_body_refs(&node_ptr)?;
        let via_ref = effective != node_ptr;
        let required = self.source.body_required(&effective);

        let (ty, schema_pointer) = match self.source.media_schema_pointer(&effective) {
            Some(schema_ptr) => {
                // A shared component body must resolve to the same name no
                // matter which operation reaches it first.
                let hint = match component_name(&effective, "requestBodies") {
                    Some(name) if via_ref => pascal(&name),
                    _ => body_type_name(key),
                };
                let ty = self.make_type(&schema_ptr, &hint, false, WrapMode::None)?;
                (ty, Some(schema_ptr))
            }
            None => {
                // A schemaless body still gets a nominal placeholder,
                // registered at the operation's own node to keep it
                // per-operation.
                let ty = Type::Alias(AliasType {
                    name: self.store.type_name(body_type_name(key)),
                    target: Box::new(Type::json()),
                });
                self.store.register(&node_ptr, ty.clone())?;
                (ty, Some(node_ptr.clone()))
            }
        };

        self.store.register_request_body(
            key,
            RequestBody {
                ty,
                required,
                schema_pointer,
            },
        )
    }

    /// Follows request-body `$ref`s, which may only target
    /// `components.requestBodies`.
    fn follow_body_refs(&self, pointer: &str) -> AppResult<String> {
        let mut current = pointer.to_string();
        for _ in 0..MAX_BODY_REF_HOPS {
            match self.refs.reference_target(&current) {
                Some(target) => {
                    if component_name(&target, "requestBodies").is_none() {
                        return Err(AppError::MisplacedReference {
                            pointer: current,
                            detail: format!(
                                "requestBody $ref must target a component request body, got '{}'",
                                target
                            ),
                        });
                    }
                    current = target;
                }
                None => return Ok(current),
            }
        }
        Err(AppError::UnresolvedReference {
            pointer: pointer.to_string(),
            detail: format!("$ref chain exceeds {} hops", MAX_BODY_REF_HOPS),
        })
    }
}

/// Name hint for a parameter's schema: component parameters derive it from
/// the component name (stable across operations sharing the parameter),
/// inline parameters from the declared parameter name.
fn param_hint(node: &ParamNode) -> String {
    match component_name(&node.pointer, "parameters") {
        Some(name) => pascal(&name),
        None => pascal(&node.name),
    }
}
