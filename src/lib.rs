#![deny(missing_docs)]

//! # Typegraph Core
//!
//! Schema resolution engine for OpenAPI 3 documents: converts the schemas
//! reachable from components and path operations into a graph of typed,
//! de-duplicated model descriptors, suitable for driving code generation.
//!
//! The entry point is [`analyze`], which runs the parallel resolution
//! passes over a [`JsonDocument`] and returns the finished [`Analysis`].

/// Shared error types.
pub mod error;

/// The resolved type model.
pub mod model;

/// `$ref` string and JSON Pointer handling.
pub mod refs;

/// Document access traits and the JSON-backed implementation.
pub mod source;

/// The concurrent symbol table and its auxiliary indices.
pub mod store;

/// The parallel schema analyzer.
pub mod analyzer;

pub use analyzer::{analyze, analyze_with, WrapMode, DEFAULT_PACKAGE};
pub use error::{AppError, AppResult};
pub use model::{
    enum_identifier, AliasType, EnumType, ObjectType, OneOfType, OneOfVariant, Primitive,
    Property, Type, TypeName, WrapperType,
};
pub use source::{
    CompositionKind, Discriminator, JsonDocument, OperationKey, ParamLocation, ParamNode,
    ReferenceResolver, SchemaSource, TypeKeyword,
};
pub use store::{
    is_error_status, is_success_status, Analysis, OperationParam, OperationResponses,
    ParameterIndex, RequestBody, ResponseEntry, ResponseIndex, TypeGraph, TypeStore,
};
