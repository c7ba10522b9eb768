#![deny(missing_docs)]

//! # Symbol Table
//!
//! [`TypeStore`] is the registry from schema pointer to resolved [`Type`],
//! plus the auxiliary indices: per-operation response tables, request
//! bodies, ordered parameter lists, polymorphic error-root marking, and the
//! reverse index of types used in responses.
//!
//! The store is the only shared mutable resource of an analysis run. Every
//! logical index sits behind its own `Mutex`, so analyzer tasks racing on
//! different indices never serialize against each other. The disambiguation
//! pass takes `&mut self`: exclusive access is the synchronization barrier,
//! enforced by the borrow checker rather than a lock.

use crate::error::{AppError, AppResult};
use crate::model::{Type, TypeName};
use crate::source::{OperationKey, ParamLocation};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// Bound on `Reference` chain following; a longer chain is a `$ref` cycle.
const MAX_REFERENCE_DEPTH: usize = 64;

/// One resolved response payload: where it was registered, and its type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEntry {
    /// Pointer under which the payload type is registered.
    pub pointer: String,
    /// The payload type.
    pub ty: Type,
}

/// A resolved operation parameter with its location tag.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationParam {
    /// Parameter name as declared.
    pub name: String,
    /// Declared location (query/path/header/cookie).
    pub location: ParamLocation,
    /// Required flag.
    pub required: bool,
    /// Resolved parameter type.
    pub ty: Type,
    /// Pointer of the schema node the type was registered under, if any.
    pub schema_pointer: Option<String>,
}

/// A resolved request body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    /// Resolved body type.
    pub ty: Type,
    /// Whether the body is required.
    pub required: bool,
    /// Pointer of the schema node the type was registered under, if any.
    pub schema_pointer: Option<String>,
}

/// The disambiguated pointer -> type map plus the component pointer set.
#[derive(Debug, Default)]
pub struct TypeGraph {
    /// Every registered pointer and its resolved type.
    pub types: IndexMap<String, Type>,
    /// Pointers registered as first-class component schemas.
    pub components: BTreeSet<String>,
}

impl TypeGraph {
    /// Looks up a pointer.
    pub fn get(&self, pointer: &str) -> Option<&Type> {
        self.types.get(pointer)
    }

    /// Whether the pointer is a reusable component schema.
    pub fn is_component(&self, pointer: &str) -> bool {
        self.components.contains(pointer)
    }

    /// Iterates every named type in the graph.
    pub fn named_types(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.types.iter().filter(|(_, ty)| ty.is_nominal())
    }
}

/// Responses of a single operation plus interface synthesis markers.
#[derive(Debug, Default)]
pub struct OperationResponses {
    /// Status code -> resolved payload, in declaration order.
    pub by_status: IndexMap<String, ResponseEntry>,
    /// True when the operation has more than one distinct success payload
    /// type, so emitters should synthesize a shared success interface.
    pub success_interface: bool,
    /// True when the operation declares any error (4xx/5xx/default) payload.
    pub error_interface: bool,
}

/// (path, verb) -> (status -> type), plus the reverse roots index.
#[derive(Debug, Default)]
pub struct ResponseIndex {
    /// Per-operation response tables.
    pub operations: IndexMap<OperationKey, OperationResponses>,
    /// Names of every nominal type used as a response payload.
    pub roots: BTreeSet<TypeName>,
}

/// (path, verb) -> ordered parameter list and request body.
#[derive(Debug, Default)]
pub struct ParameterIndex {
    /// Ordered parameters per operation.
    pub parameters: IndexMap<OperationKey, Vec<OperationParam>>,
    /// Request body per operation.
    pub request_bodies: IndexMap<OperationKey, RequestBody>,
}

/// The finished output of one analysis run.
#[derive(Debug)]
pub struct Analysis {
    /// The disambiguated type graph.
    pub graph: TypeGraph,
    /// The response index.
    pub responses: ResponseIndex,
    /// The parameter index.
    pub parameters: ParameterIndex,
    /// Names marked as polymorphic error roots (exception payloads).
    pub error_roots: BTreeSet<TypeName>,
}

/// Registry from schema location to resolved type, with auxiliary indices.
///
/// Passed by reference into every analyzer task; never a singleton. Discarded
/// (consumed into [`Analysis`]) once one document's resolution completes.
pub struct TypeStore {
    package: String,
    types: Mutex<IndexMap<String, Type>>,
    components: Mutex<BTreeSet<String>>,
    responses: Mutex<IndexMap<OperationKey, IndexMap<String, ResponseEntry>>>,
    params: Mutex<IndexMap<OperationKey, Vec<OperationParam>>>,
    bodies: Mutex<IndexMap<OperationKey, RequestBody>>,
    error_roots: Mutex<BTreeSet<TypeName>>,
    response_roots: Mutex<BTreeSet<TypeName>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> AppResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::General(format!("{} lock poisoned", what)))
}

fn inner<T>(mutex: Mutex<T>, what: &str) -> AppResult<T> {
    mutex
        .into_inner()
        .map_err(|_| AppError::General(format!("{} lock poisoned", what)))
}

impl TypeStore {
    /// Creates an empty store generating names into the given package.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            types: Mutex::new(IndexMap::new()),
            components: Mutex::new(BTreeSet::new()),
            responses: Mutex::new(IndexMap::new()),
            params: Mutex::new(IndexMap::new()),
            bodies: Mutex::new(IndexMap::new()),
            error_roots: Mutex::new(BTreeSet::new()),
            response_roots: Mutex::new(BTreeSet::new()),
        }
    }

    /// The namespace/package generated names live in.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Creates a name in the store's package.
    pub fn type_name(&self, simple: impl Into<String>) -> TypeName {
        TypeName::new(self.package.clone(), simple)
    }

    /// Inserts or validates an idempotent re-insertion of `ty` at `pointer`.
    ///
    /// Structurally identical re-registration is a no-op; conflicting content
    /// is fatal. A `Reference` whose target is the registering pointer itself
    /// is silently dropped (known workaround, regression-tested).
    pub fn register(&self, pointer: &str, ty: Type) -> AppResult<()> {
        if ty.reference_target() == Some(pointer) {
            return Ok(());
        }

        let mut types = lock(&self.types, "type graph")?;
        match types.get(pointer) {
            None => {
                types.insert(pointer.to_string(), ty);
                Ok(())
            }
            Some(existing) if *existing == ty => Ok(()),
            Some(existing) => Err(AppError::TypeConflict {
                pointer: pointer.to_string(),
                existing: existing.describe(),
                new: ty.describe(),
            }),
        }
    }

    /// Registers a first-class, reusable component schema.
    pub fn register_component(&self, pointer: &str, ty: Type) -> AppResult<()> {
        let self_reference = ty.reference_target() == Some(pointer);
        self.register(pointer, ty)?;
        if !self_reference {
            lock(&self.components, "component set")?.insert(pointer.to_string());
        }
        Ok(())
    }

    /// Resolves a pointer to its registered type.
    ///
    /// Fails with `UnknownReference`, reporting the full known-pointer set,
    /// when the pointer was never registered.
    pub fn resolve(&self, pointer: &str) -> AppResult<Type> {
        let types = lock(&self.types, "type graph")?;
        match types.get(pointer) {
            Some(ty) => Ok(ty.clone()),
            None => {
                let mut known: Vec<&str> = types.keys().map(|k| k.as_str()).collect();
                known.sort_unstable();
                Err(AppError::UnknownReference {
                    pointer: pointer.to_string(),
                    known: known.join(", "),
                })
            }
        }
    }

    /// Follows `Reference` chains to the first concrete type.
    ///
    /// Returns `None` for list/simple endpoints (they carry no nominal
    /// identity), `Some` for named types. A chain longer than the cycle
    /// bound is a logic error in the document.
    pub fn concretize(&self, ty: &Type) -> AppResult<Option<Type>> {
        let mut current = ty.clone();
        let mut depth = 0usize;
        while let Type::Reference { target } = &current {
            depth += 1;
            if depth > MAX_REFERENCE_DEPTH {
                return Err(AppError::UnresolvedReference {
                    pointer: target.clone(),
                    detail: format!(
                        "reference chain exceeds {} links; $ref cycle suspected",
                        MAX_REFERENCE_DEPTH
                    ),
                });
            }
            current = self.resolve(target)?;
        }
        match current {
            Type::Simple { .. } | Type::List { .. } => Ok(None),
            concrete => Ok(Some(concrete)),
        }
    }

    /// Records one resolved response payload for an operation.
    ///
    /// Serializes per-operation table updates; concurrent status codes of the
    /// same operation land in one map. Also maintains the reverse index of
    /// nominal types used in responses.
    pub fn register_response(
        &self,
        key: &OperationKey,
        status: &str,
        entry: ResponseEntry,
    ) -> AppResult<()> {
        if let Some(nominal) = self.concretize(&entry.ty)? {
            if let Some(name) = nominal.name() {
                lock(&self.response_roots, "response roots")?.insert(name.clone());
            }
        }

        let mut responses = lock(&self.responses, "response index")?;
        let table = responses.entry(key.clone()).or_default();
        match table.get(status) {
            None => {
                table.insert(status.to_string(), entry);
                Ok(())
            }
            Some(existing) if *existing == entry => Ok(()),
            Some(existing) => Err(AppError::TypeConflict {
                pointer: entry.pointer.clone(),
                existing: existing.ty.describe(),
                new: entry.ty.describe(),
            }),
        }
    }

    /// Response table of one operation, if any responses were registered.
    pub fn response_mapping(&self, key: &OperationKey) -> AppResult<Option<IndexMap<String, ResponseEntry>>> {
        Ok(lock(&self.responses, "response index")?.get(key).cloned())
    }

    /// Records the ordered parameter list of an operation.
    pub fn register_params(&self, key: &OperationKey, list: Vec<OperationParam>) -> AppResult<()> {
        lock(&self.params, "parameter index")?.insert(key.clone(), list);
        Ok(())
    }

    /// Ordered parameters of an operation.
    pub fn params(&self, key: &OperationKey) -> AppResult<Option<Vec<OperationParam>>> {
        Ok(lock(&self.params, "parameter index")?.get(key).cloned())
    }

    /// Records the request body of an operation.
    pub fn register_request_body(&self, key: &OperationKey, body: RequestBody) -> AppResult<()> {
        lock(&self.bodies, "request body index")?.insert(key.clone(), body);
        Ok(())
    }

    /// Marks a nominal type (directly named, or named through a reference
    /// chain) as an error-response root needing exception semantics.
    pub fn mark_error_root(&self, ty: &Type) -> AppResult<()> {
        let nominal = match ty.name() {
            Some(name) => name.clone(),
            None => match self.concretize(ty)? {
                Some(concrete) => concrete
                    .name()
                    .cloned()
                    .ok_or_else(|| {
                        AppError::General(format!(
                            "cannot mark non-nominal type {} as error root",
                            concrete.describe()
                        ))
                    })?,
                None => {
                    return Err(AppError::General(format!(
                        "cannot mark non-nominal type {} as error root",
                        ty.describe()
                    )))
                }
            },
        };
        lock(&self.error_roots, "error roots")?.insert(nominal);
        Ok(())
    }

    /// Whether a type was marked as an error-response root.
    pub fn is_error_root(&self, ty: &Type) -> AppResult<bool> {
        let Some(name) = ty.name() else {
            return Ok(false);
        };
        Ok(lock(&self.error_roots, "error roots")?.contains(name))
    }

    /// Every registered pointer, sorted.
    pub fn known_pointers(&self) -> AppResult<Vec<String>> {
        let types = lock(&self.types, "type graph")?;
        let mut known: Vec<String> = types.keys().cloned().collect();
        known.sort_unstable();
        Ok(known)
    }

    /// Human-readable dump of the current contents, for diagnostics.
    pub fn dump(&self) -> AppResult<String> {
        let types = lock(&self.types, "type graph")?;
        let mut lines: Vec<String> = types
            .iter()
            .map(|(ptr, ty)| format!("{} => {}", ptr, ty.describe()))
            .collect();
        lines.sort_unstable();
        Ok(lines.join("\n"))
    }

    /// Detects generated-name collisions and deterministically renames
    /// duplicates.
    ///
    /// Groups named types by `(package, simple)`; every member of a group of
    /// size > 1 gets its zero-based index (in pointer lexical order) appended
    /// to the simple name. Auxiliary indices holding copies of renamed types
    /// are refreshed from the graph via their registration pointers.
    ///
    /// Takes `&mut self`: all concurrent registration must have completed.
    pub fn disambiguate(&mut self) -> AppResult<()> {
        let types = self
            .types
            .get_mut()
            .map_err(|_| AppError::General("type graph lock poisoned".into()))?;

        let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
        for (pointer, ty) in types.iter() {
            if let Some(name) = ty.name() {
                groups
                    .entry((name.package.clone(), name.simple.clone()))
                    .or_default()
                    .push(pointer.clone());
            }
        }

        let mut renamed_pointers: BTreeSet<String> = BTreeSet::new();
        let mut renames: Vec<(TypeName, TypeName)> = Vec::new();
        for ((package, simple), mut pointers) in groups {
            if pointers.len() < 2 {
                continue;
            }
            pointers.sort_unstable();
            for (idx, pointer) in pointers.iter().enumerate() {
                let new_simple = format!("{}{}", simple, idx);
                if let Some(ty) = types.get_mut(pointer) {
                    ty.rename(new_simple.clone());
                }
                renamed_pointers.insert(pointer.clone());
                renames.push((
                    TypeName::new(package.clone(), simple.clone()),
                    TypeName::new(package.clone(), new_simple),
                ));
            }
        }

        if renames.is_empty() {
            return Ok(());
        }

        // Refresh copies held by the auxiliary indices.
        let responses = self
            .responses
            .get_mut()
            .map_err(|_| AppError::General("response index lock poisoned".into()))?;
        for table in responses.values_mut() {
            for entry in table.values_mut() {
                if renamed_pointers.contains(&entry.pointer) {
                    if let Some(ty) = types.get(&entry.pointer) {
                        entry.ty = ty.clone();
                    }
                }
            }
        }

        let params = self
            .params
            .get_mut()
            .map_err(|_| AppError::General("parameter index lock poisoned".into()))?;
        for list in params.values_mut() {
            for param in list.iter_mut() {
                if let Some(ptr) = &param.schema_pointer {
                    if renamed_pointers.contains(ptr) {
                        if let Some(ty) = types.get(ptr) {
                            param.ty = ty.clone();
                        }
                    }
                }
            }
        }

        let bodies = self
            .bodies
            .get_mut()
            .map_err(|_| AppError::General("request body index lock poisoned".into()))?;
        for body in bodies.values_mut() {
            if let Some(ptr) = &body.schema_pointer {
                if renamed_pointers.contains(ptr) {
                    if let Some(ty) = types.get(ptr) {
                        body.ty = ty.clone();
                    }
                }
            }
        }

        let error_roots = self
            .error_roots
            .get_mut()
            .map_err(|_| AppError::General("error roots lock poisoned".into()))?;
        let rewritten = rewrite_name_set(error_roots, &renames);
        *error_roots = rewritten;

        let response_roots = self
            .response_roots
            .get_mut()
            .map_err(|_| AppError::General("response roots lock poisoned".into()))?;
        let rewritten = rewrite_name_set(response_roots, &renames);
        *response_roots = rewritten;

        Ok(())
    }

    /// Consumes the store into the finished analysis output, computing the
    /// per-operation interface synthesis markers.
    pub fn into_analysis(self) -> AppResult<Analysis> {
        let types = inner(self.types, "type graph")?;
        let components = inner(self.components, "component set")?;
        let responses = inner(self.responses, "response index")?;
        let params = inner(self.params, "parameter index")?;
        let bodies = inner(self.bodies, "request body index")?;
        let error_roots = inner(self.error_roots, "error roots")?;
        let response_roots = inner(self.response_roots, "response roots")?;

        let mut operations = IndexMap::new();
        for (key, by_status) in responses {
            let mut success_types: Vec<&Type> = Vec::new();
            let mut error_interface = false;
            for (status, entry) in &by_status {
                if is_success_status(status) {
                    if !success_types.contains(&&entry.ty) {
                        success_types.push(&entry.ty);
                    }
                } else if is_error_status(status) {
                    error_interface = true;
                }
            }
            let success_interface = success_types.len() > 1;
            operations.insert(
                key,
                OperationResponses {
                    by_status,
                    success_interface,
                    error_interface,
                },
            );
        }

        Ok(Analysis {
            graph: TypeGraph { types, components },
            responses: ResponseIndex {
                operations,
                roots: response_roots,
            },
            parameters: ParameterIndex {
                parameters: params,
                request_bodies: bodies,
            },
            error_roots,
        })
    }
}

/// True for concrete 2xx codes and the 2XX range.
pub fn is_success_status(status: &str) -> bool {
    status.starts_with('2')
}

/// True for 4xx/5xx codes, their ranges, and `default`.
pub fn is_error_status(status: &str) -> bool {
    status.starts_with('4') || status.starts_with('5') || status == "default"
}

fn rewrite_name_set(
    set: &BTreeSet<TypeName>,
    renames: &[(TypeName, TypeName)],
) -> BTreeSet<TypeName> {
    let mut out = BTreeSet::new();
    for name in set {
        let successors: Vec<&TypeName> = renames
            .iter()
            .filter(|(old, _)| old == name)
            .map(|(_, new)| new)
            .collect();
        if successors.is_empty() {
            out.insert(name.clone());
        } else {
            // A marked name that collided maps to every renamed member of
            // its group; the original marking cannot tell them apart.
            for new in successors {
                out.insert(new.clone());
            }
        }
    }
    out
}
