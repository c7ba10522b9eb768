#![deny(missing_docs)]

//! # Response Resolution
//!
//! Resolves component responses and per-operation status-code payloads into
//! the store's response index, applying the wrap policy when an operation's
//! statuses are heterogeneous.

use crate::analyzer::{pascal, response_type_name, Analyzer, WrapMode};
use crate::error::{AppError, AppResult};
use crate::model::{AliasType, Type, WrapperType};
use crate::refs::component_name;
use crate::source::{OperationKey, ReferenceResolver, SchemaSource};
use crate::store::ResponseEntry;

const MAX_RESPONSE_REF_HOPS: usize = 16;

impl<'a, S, R> Analyzer<'a, S, R>
where
    S: SchemaSource + Sync,
    R: ReferenceResolver + Sync,
{
    /// Resolves one named response under `components.responses`.
    ///
    /// A response with a schema registers that schema's type; a schemaless
    /// response registers a named alias of opaque JSON at the response node
    /// itself, so operations referencing it still get a nominal payload.
    pub(crate) fn component_response(&self, name: &str) -> AppResult<()> {
        let node_ptr = self.source.component_response_pointer(name);
        match self.source.media_schema_pointer(&node_ptr) {
            Some(schema_ptr) => {
                self.make_type(&schema_ptr, &pascal(name), false, WrapMode::None)?;
            }
            None => {
                let placeholder = Type::Alias(AliasType {
                    name: self.store.type_name(pascal(name)),
                    target: Box::new(Type::json()),
                });
                self.store.register(&node_ptr, placeholder)?;
            }
        }
        Ok(())
    }

    /// Resolves one status code of an operation's responses.
    pub(crate) fn operation_response(
        &self,
        key: &OperationKey,
        status: &str,
        wrap: WrapMode,
    ) -> AppResult<()> {
        let node_ptr = self.source.response_node_pointer(key, status);
        let effective = self.follow_response_refs(&node_ptr)?;
        let via_ref = effective != node_ptr;
        let hint = response_type_name(key, status);

        // `registered` tracks whether make_type already stored the payload
        // under its own pointer; referenced payloads belong to the component
        // task and must not be re-registered here.
        let (pointer, ty, registered) = if !via_ref {
            match self.source.media_schema_pointer(&node_ptr) {
                Some(schema_ptr) => {
                    let ty = self.make_type(&schema_ptr, &hint, false, wrap)?;
                    (schema_ptr, ty, true)
                }
                None => {
                    // No schema at all. Under wrapping the wrapper itself
                    // supplies the name; otherwise synthesize an alias.
                    let ty = if wrap == WrapMode::None {
                        Type::Alias(AliasType {
                            name: self.store.type_name(&hint),
                            target: Box::new(Type::json()),
                        })
                    } else {
                        Type::json()
                    };
                    (node_ptr.clone(), ty, false)
                }
            }
        } else {
            // A $ref'd response resolves to whatever the component task
            // registered: the component's schema pointer when it has content,
            // the component node itself for the schemaless placeholder.
            let target = match self.source.media_schema_pointer(&effective) {
                Some(schema_ptr) => schema_ptr,
                None => effective,
            };
            let ty = Type::Reference { target };
            (node_ptr.clone(), ty, false)
        };

        let needs_wrapper = wrap != WrapMode::None
            && match &ty {
                Type::Simple { .. } | Type::List { .. } => true,
                Type::Reference { .. } => self.store.concretize(&ty)?.is_none(),
                _ => false,
            };

        let (pointer, final_ty) = if needs_wrapper {
            let wrapper = Type::Wrapper(WrapperType {
                name: self.store.type_name(&hint),
                wrapped: Box::new(ty),
            });
            self.store.register(&node_ptr, wrapper.clone())?;
            (node_ptr.clone(), wrapper)
        } else {
            if !registered {
                self.store.register(&pointer, ty.clone())?;
            }
            (pointer, ty)
        };

        if wrap == WrapMode::Exception {
            self.store.mark_error_root(&final_ty)?;
        }

        self.store.register_response(
            key,
            status,
            ResponseEntry {
                pointer,
                ty: final_ty,
            },
        )
    }

    /// Follows response-object `$ref`s, which may only target
    /// `components.responses`.
    fn follow_response_refs(&self, pointer: &str) -> AppResult<String> {
        let mut current = pointer.to_string();
        for _ in 0..MAX_RESPONSE_REF_HOPS {
            match self.refs.reference_target(&current) {
                Some(target) => {
                    if component_name(&target, "responses").is_none() {
                        return Err(AppError::MisplacedReference {
                            pointer: current,
                            detail: format!(
                                "response $ref must target a component response, got '{}'",
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
            detail: format!("$ref chain exceeds {} hops", MAX_RESPONSE_REF_HOPS),
        })
    }
}
