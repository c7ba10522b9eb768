#![deny(missing_docs)]

//! # Schema Analyzer
//!
//! Walks an OpenAPI document and builds the type graph, response index, and
//! parameter index inside a shared [`TypeStore`].
//!
//! Processing is split into phases with join barriers between them, each
//! internally parallel over its unit of work:
//!
//! 1. component schemas, then component responses (path-level schemas may
//!    reference either);
//! 2. every (path, verb) response status code, request body, and parameter
//!    list;
//! 3. single-threaded name disambiguation.
//!
//! Fan-out/fan-in uses `rayon`: each batch is a `par_iter` whose
//! `collect::<AppResult<_>>` is the join barrier. There is no ordering
//! between sibling units; the store serializes all shared mutation.

pub mod params;
pub mod responses;
pub mod types;

use crate::error::AppResult;
use crate::source::{JsonDocument, OperationKey, ReferenceResolver, SchemaSource};
use crate::store::{is_error_status, Analysis, TypeStore};
use heck::ToUpperCamelCase;
use rayon::prelude::*;

/// Default namespace for generated type names.
pub const DEFAULT_PACKAGE: &str = "models";

/// Policy for results that lack a nominal identity.
///
/// When response wrapping is requested (the operation's responses are
/// heterogeneous across status codes and must share one nominal return
/// type), a non-nominal result is wrapped in a synthesized wrapper type.
/// `Exception` additionally marks the nominal type as an error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// No wrapping; non-nominal results stay as-is.
    None,
    /// Wrap non-nominal results, without error semantics.
    Simple,
    /// Wrap non-nominal results and mark the nominal type as an error root.
    Exception,
}

/// One independent unit of work in the path phase.
enum PathUnit {
    Response {
        key: OperationKey,
        status: String,
        wrap: WrapMode,
    },
    Body {
        key: OperationKey,
    },
    Params {
        key: OperationKey,
    },
}

pub(crate) struct Analyzer<'a, S, R> {
    pub(crate) source: &'a S,
    pub(crate) refs: &'a R,
    pub(crate) store: &'a TypeStore,
}

/// Analyzes a JSON-backed document with the default package.
pub fn analyze(document: &JsonDocument) -> AppResult<Analysis> {
    analyze_with(document, document, DEFAULT_PACKAGE)
}

/// Analyzes a document through the collaborator traits.
///
/// `source` and `refs` are usually the same object; they are separate
/// parameters because reference tracking is an out-of-band concern of the
/// document parser.
pub fn analyze_with<S, R>(source: &S, refs: &R, package: &str) -> AppResult<Analysis>
where
    S: SchemaSource + Sync,
    R: ReferenceResolver + Sync,
{
    let mut store = TypeStore::new(package);

    {
        let analyzer = Analyzer {
            source,
            refs,
            store: &store,
        };

        // Phase 1: component schemas, then component responses.
        source
            .component_schema_names()
            .par_iter()
            .map(|name| analyzer.component_schema(name))
            .collect::<AppResult<Vec<_>>>()?;
        source
            .component_response_names()
            .par_iter()
            .map(|name| analyzer.component_response(name))
            .collect::<AppResult<Vec<_>>>()?;

        // Phase 2: every response status, request body, and parameter list.
        let mut units = Vec::new();
        for key in source.operation_keys() {
            let statuses = source.response_statuses(&key);
            let heterogeneous = statuses.len() > 1;
            for status in statuses {
                let wrap = if !heterogeneous {
                    WrapMode::None
                } else if is_error_status(&status) {
                    WrapMode::Exception
                } else {
                    WrapMode::Simple
                };
                units.push(PathUnit::Response {
                    key: key.clone(),
                    status,
                    wrap,
                });
            }
            units.push(PathUnit::Body { key: key.clone() });
            units.push(PathUnit::Params { key });
        }
        units
            .par_iter()
            .map(|unit| match unit {
                PathUnit::Response { key, status, wrap } => {
                    analyzer.operation_response(key, status, *wrap)
                }
                PathUnit::Body { key } => analyzer.operation_body(key),
                PathUnit::Params { key } => analyzer.operation_params(key),
            })
            .collect::<AppResult<Vec<_>>>()?;
    }

    // Phase 3: exclusive access is the barrier; no task still holds the store.
    store.disambiguate()?;
    store.into_analysis()
}

impl<'a, S, R> Analyzer<'a, S, R>
where
    S: SchemaSource + Sync,
    R: ReferenceResolver + Sync,
{
    /// Resolves one named schema under `components.schemas`.
    pub(crate) fn component_schema(&self, name: &str) -> AppResult<()> {
        let pointer = self.source.component_schema_pointer(name);
        self.make_type(&pointer, &pascal(name), true, WrapMode::None)?;
        Ok(())
    }
}

/// Converts an arbitrary key into an UpperCamelCase simple name.
pub(crate) fn pascal(raw: &str) -> String {
    raw.to_upper_camel_case()
}

/// Base words of an operation, e.g. `GET /users/{id}` -> `get users id`.
fn operation_words(key: &OperationKey) -> String {
    let cleaned = key.path.replace(['{', '}'], "").replace(['/', '-', '.'], " ");
    format!("{} {}", key.verb, cleaned.trim())
}

/// Synthesized name for one response payload of an operation,
/// e.g. `GET /users/{id}` + `200` -> `GetUsersId200Response`.
pub(crate) fn response_type_name(key: &OperationKey, status: &str) -> String {
    pascal(&format!("{} {} response", operation_words(key), status))
}

/// Synthesized name for an operation's request body,
/// e.g. `POST /users` -> `PostUsersRequest`.
pub(crate) fn body_type_name(key: &OperationKey) -> String {
    pascal(&format!("{} request", operation_words(key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_type_name_from_operation() {
        let key = OperationKey::new("/users/{id}", "get");
        assert_eq!(response_type_name(&key, "200"), "GetUsersId200Response");
        assert_eq!(
            response_type_name(&key, "default"),
            "GetUsersIdDefaultResponse"
        );
    }

    #[test]
    fn test_body_type_name_from_operation() {
        let key = OperationKey::new("/user-profiles", "post");
        assert_eq!(body_type_name(&key), "PostUserProfilesRequest");
    }
}
