#![deny(missing_docs)]

//! # Document Access
//!
//! The in-process seam between the resolution engine and the OpenAPI parser
//! collaborator: [`SchemaSource`] exposes named collections and per-node
//! schema accessors, [`ReferenceResolver`] reports `$ref` targets out-of-band
//! (the analyzer never inspects a reference's target content to classify the
//! referencing node).
//!
//! [`JsonDocument`] implements both traits over an already parsed
//! `serde_json::Value`, honouring OAS 3.2 `$self` when normalizing absolute
//! references to local pointers.

use crate::error::{AppError, AppResult};
use crate::refs::{join_pointer, normalize_ref_to_local, pointer_segments};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// HTTP verbs recognized under a path item, in canonical order.
const VERBS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Identifies one operation: a (path, verb) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationKey {
    /// URL path template, e.g. `/users/{id}`.
    pub path: String,
    /// Lower-case HTTP verb, e.g. `get`.
    pub verb: String,
}

impl OperationKey {
    /// Creates a key from path and verb.
    pub fn new(path: impl Into<String>, verb: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            verb: verb.into(),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb.to_uppercase(), self.path)
    }
}

/// The source location of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    /// Query string.
    Query,
    /// Path template segment.
    Path,
    /// HTTP header.
    Header,
    /// Cookie.
    Cookie,
}

impl ParamLocation {
    /// Parses the OpenAPI `in` keyword.
    pub fn parse(keyword: &str, pointer: &str) -> AppResult<Self> {
        match keyword {
            "query" => Ok(ParamLocation::Query),
            "path" => Ok(ParamLocation::Path),
            "header" => Ok(ParamLocation::Header),
            "cookie" => Ok(ParamLocation::Cookie),
            other => Err(AppError::General(format!(
                "Unknown parameter location '{}' at {}",
                other, pointer
            ))),
        }
    }
}

/// A parameter as declared in the document, before schema resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamNode {
    /// Parameter name.
    pub name: String,
    /// Declared location.
    pub location: ParamLocation,
    /// Required flag (path parameters are implicitly required).
    pub required: bool,
    /// Pointer of the parameter's schema node, if one is declared.
    pub schema_pointer: Option<String>,
    /// Pointer of the (ref-resolved) parameter node itself.
    pub pointer: String,
}

/// A declared discriminator: property name plus explicit value mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    /// The property carrying the discriminator value.
    pub property_name: String,
    /// Explicit value -> `$ref` mapping (may be empty).
    pub mapping: IndexMap<String, String>,
}

/// The declared `type` keyword of a schema node.
///
/// OAS 3.1 allows an array-valued `type`; the only array form the analyzer
/// models is one concrete type paired with `"null"`. Anything else is
/// reported as `Unsupported` and becomes fatal at classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKeyword {
    /// A single type name, e.g. `type: string`.
    Single(String),
    /// One type paired with `"null"`, e.g. `type: [string, "null"]`.
    Nullable(String),
    /// A `type` value the analyzer cannot interpret: non-string entries,
    /// several non-null types, or a lone `"null"`. Carries the raw
    /// rendering for diagnostics.
    Unsupported(String),
}

/// The three JSON-Schema composition keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionKind {
    /// `oneOf`
    OneOf,
    /// `allOf`
    AllOf,
    /// `anyOf`
    AnyOf,
}

impl CompositionKind {
    /// The schema keyword for this composition kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            CompositionKind::OneOf => "oneOf",
            CompositionKind::AllOf => "allOf",
            CompositionKind::AnyOf => "anyOf",
        }
    }
}

/// Named-collection and per-node accessors over an OpenAPI document.
///
/// All pointers are `#/`-style locators as produced by [`join_pointer`];
/// implementations must return data without resolving schema-level `$ref`s
/// (that is the analyzer's job, via [`ReferenceResolver`]).
pub trait SchemaSource {
    /// Names under `components.schemas`, in declaration order.
    fn component_schema_names(&self) -> Vec<String>;

    /// Names under `components.responses`, in declaration order.
    fn component_response_names(&self) -> Vec<String>;

    /// Every (path, verb) operation in the document.
    fn operation_keys(&self) -> Vec<OperationKey>;

    /// Status codes declared for one operation, in declaration order.
    fn response_statuses(&self, key: &OperationKey) -> Vec<String>;

    /// Selects the JSON-preferring media type under a node's `content` map
    /// and returns the pointer of its schema, if one is declared.
    fn media_schema_pointer(&self, node_pointer: &str) -> Option<String>;

    /// Pointer of the `requestBody` node for an operation, if declared.
    fn request_body_pointer(&self, key: &OperationKey) -> Option<String>;

    /// The `required` flag of a request body node.
    fn body_required(&self, node_pointer: &str) -> bool;

    /// Parameters declared at path-item level.
    fn path_item_parameters(&self, path: &str) -> AppResult<Vec<ParamNode>>;

    /// Parameters declared at operation level.
    fn operation_parameters(&self, key: &OperationKey) -> AppResult<Vec<ParamNode>>;

    /// Whether a node exists at the pointer.
    fn exists(&self, pointer: &str) -> bool;

    /// The declared `type` keyword, classified. `None` only when the node
    /// declares no `type` at all.
    fn schema_type(&self, pointer: &str) -> Option<TypeKeyword>;

    /// The declared `format` keyword.
    fn format(&self, pointer: &str) -> Option<String>;

    /// Whether the node admits null: the OAS 3.0 `nullable` keyword, or the
    /// OAS 3.1 `type: [T, "null"]` form.
    fn nullable_flag(&self, pointer: &str) -> bool;

    /// Property names in declaration order.
    fn property_names(&self, pointer: &str) -> Vec<String>;

    /// The `required` name list.
    fn required_names(&self, pointer: &str) -> Vec<String>;

    /// The `default` literal.
    fn default_value(&self, pointer: &str) -> Option<JsonValue>;

    /// The `description` string.
    fn description(&self, pointer: &str) -> Option<String>;

    /// Declared `enum` values, if any.
    fn enum_values(&self, pointer: &str) -> Option<Vec<JsonValue>>;

    /// The declared discriminator, if any.
    fn discriminator(&self, pointer: &str) -> Option<Discriminator>;

    /// Pointers of the branches of a composition keyword.
    fn branch_pointers(&self, pointer: &str, kind: CompositionKind) -> Vec<String>;

    /// Canonical pointer of a component schema.
    fn component_schema_pointer(&self, name: &str) -> String {
        join_pointer("#/components/schemas", name)
    }

    /// Canonical pointer of a component response.
    fn component_response_pointer(&self, name: &str) -> String {
        join_pointer("#/components/responses", name)
    }

    /// Canonical pointer of one response node of an operation.
    fn response_node_pointer(&self, key: &OperationKey, status: &str) -> String {
        let path_ptr = join_pointer("#/paths", &key.path);
        join_pointer(&format!("{}/{}/responses", path_ptr, key.verb), status)
    }
}

/// Out-of-band `$ref` tracking, supplied by the document parser.
pub trait ReferenceResolver {
    /// If the node at `pointer` is a `$ref`, its normalized target pointer.
    fn reference_target(&self, pointer: &str) -> Option<String>;
}

/// An OpenAPI document backed by a raw `serde_json::Value`.
///
/// The `$ref` index is built once at construction by scanning the raw tree,
/// normalizing absolute targets that match the document's `$self` URI.
pub struct JsonDocument {
    root: JsonValue,
    refs: HashMap<String, String>,
}

impl JsonDocument {
    /// Wraps an already parsed JSON document.
    pub fn from_json(root: JsonValue) -> Self {
        let self_uri = root
            .get("$self")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let mut refs = HashMap::new();
        collect_refs(&root, "#", self_uri.as_deref(), &mut refs);
        Self { root, refs }
    }

    /// Parses a YAML document. Convenience for tests and YAML-first callers.
    pub fn from_yaml(yaml: &str) -> AppResult<Self> {
        let root: JsonValue = serde_yaml::from_str(yaml)
            .map_err(|e| AppError::General(format!("Failed to parse OpenAPI YAML: {}", e)))?;
        Ok(Self::from_json(root))
    }

    /// Looks up the raw value at a `#/`-style pointer.
    pub fn value(&self, pointer: &str) -> Option<&JsonValue> {
        let mut current = &self.root;
        for segment in pointer_segments(pointer) {
            current = match current {
                JsonValue::Object(map) => map.get(&segment)?,
                JsonValue::Array(items) => {
                    let idx: usize = segment.parse().ok()?;
                    items.get(idx)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    fn object_keys(&self, pointer: &str) -> Vec<String> {
        self.value(pointer)
            .and_then(|v| v.as_object())
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn string_at(&self, pointer: &str, key: &str) -> Option<String> {
        self.value(pointer)?
            .get(key)?
            .as_str()
            .map(|s| s.to_string())
    }

    /// Follows parameter/request-body level `$ref`s to the effective node.
    fn effective_node(&self, pointer: &str) -> AppResult<String> {
        let mut current = pointer.to_string();
        for _ in 0..MAX_NODE_REF_HOPS {
            match self.refs.get(&current) {
                Some(target) => current = target.clone(),
                None => return Ok(current),
            }
        }
        Err(AppError::UnresolvedReference {
            pointer: pointer.to_string(),
            detail: format!("$ref chain exceeds {} hops", MAX_NODE_REF_HOPS),
        })
    }

    fn parse_parameter_list(&self, list_pointer: &str) -> AppResult<Vec<ParamNode>> {
        let Some(JsonValue::Array(items)) = self.value(list_pointer) else {
            return Ok(Vec::new());
        };

        let mut params = Vec::new();
        for idx in 0..items.len() {
            let item_ptr = format!("{}/{}", list_pointer, idx);
            let node_ptr = self.effective_node(&item_ptr)?;
            let Some(node) = self.value(&node_ptr) else {
                return Err(AppError::UnresolvedReference {
                    pointer: item_ptr,
                    detail: format!("parameter $ref target '{}' not present", node_ptr),
                });
            };

            let name = node
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    AppError::General(format!("Parameter at {} has no name", node_ptr))
                })?
                .to_string();
            let location_kw = node.get("in").and_then(|v| v.as_str()).ok_or_else(|| {
                AppError::General(format!("Parameter '{}' at {} has no location", name, node_ptr))
            })?;
            let location = ParamLocation::parse(location_kw, &node_ptr)?;
            let required = location == ParamLocation::Path
                || node
                    .get("required")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
            let schema_pointer = node
                .get("schema")
                .map(|_| format!("{}/schema", node_ptr));

            params.push(ParamNode {
                name,
                location,
                required,
                schema_pointer,
                pointer: node_ptr,
            });
        }
        Ok(params)
    }
}

const MAX_NODE_REF_HOPS: usize = 16;

impl SchemaSource for JsonDocument {
    fn component_schema_names(&self) -> Vec<String> {
        self.object_keys("#/components/schemas")
    }

    fn component_response_names(&self) -> Vec<String> {
        self.object_keys("#/components/responses")
    }

    fn operation_keys(&self) -> Vec<OperationKey> {
        let mut keys = Vec::new();
        for path in self.object_keys("#/paths") {
            let path_ptr = join_pointer("#/paths", &path);
            for verb in VERBS {
                if self.value(&format!("{}/{}", path_ptr, verb)).is_some() {
                    keys.push(OperationKey::new(path.clone(), verb));
                }
            }
        }
        keys
    }

    fn response_statuses(&self, key: &OperationKey) -> Vec<String> {
        let path_ptr = join_pointer("#/paths", &key.path);
        self.object_keys(&format!("{}/{}/responses", path_ptr, key.verb))
    }

    fn media_schema_pointer(&self, node_pointer: &str) -> Option<String> {
        let content_ptr = format!("{}/content", node_pointer);
        let content = self.value(&content_ptr)?.as_object()?;

        // Preference order: application/json, any +json, application/*, */*, first.
        let media = if content.contains_key("application/json") {
            "application/json".to_string()
        } else if let Some((k, _)) = content.iter().find(|(k, _)| k.ends_with("+json")) {
            k.clone()
        } else if content.contains_key("application/*") {
            "application/*".to_string()
        } else if content.contains_key("*/*") {
            "*/*".to_string()
        } else {
            content.keys().next()?.clone()
        };

        let schema_ptr = format!("{}/schema", join_pointer(&content_ptr, &media));
        if self.value(&schema_ptr).is_some() {
            Some(schema_ptr)
        } else {
            None
        }
    }

    fn request_body_pointer(&self, key: &OperationKey) -> Option<String> {
        let path_ptr = join_pointer("#/paths", &key.path);
        let body_ptr = format!("{}/{}/requestBody", path_ptr, key.verb);
        if self.value(&body_ptr).is_some() {
            Some(body_ptr)
        } else {
            None
        }
    }

    fn body_required(&self, node_pointer: &str) -> bool {
        self.value(node_pointer)
            .and_then(|v| v.get("required"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn path_item_parameters(&self, path: &str) -> AppResult<Vec<ParamNode>> {
        let path_ptr = join_pointer("#/paths", path);
        self.parse_parameter_list(&format!("{}/parameters", path_ptr))
    }

    fn operation_parameters(&self, key: &OperationKey) -> AppResult<Vec<ParamNode>> {
        let path_ptr = join_pointer("#/paths", &key.path);
        self.parse_parameter_list(&format!("{}/{}/parameters", path_ptr, key.verb))
    }

    fn exists(&self, pointer: &str) -> bool {
        self.value(pointer).is_some()
    }

    fn schema_type(&self, pointer: &str) -> Option<TypeKeyword> {
        let declared = self.value(pointer)?.get("type")?;
        match declared {
            JsonValue::String(name) => Some(TypeKeyword::Single(name.clone())),
            JsonValue::Array(entries) => {
                let mut names = Vec::new();
                let mut saw_null = false;
                for entry in entries {
                    match entry.as_str() {
                        Some("null") => saw_null = true,
                        Some(name) => names.push(name.to_string()),
                        None => return Some(TypeKeyword::Unsupported(declared.to_string())),
                    }
                }
                match (names.len(), saw_null) {
                    (1, true) => Some(TypeKeyword::Nullable(names.remove(0))),
                    (1, false) => Some(TypeKeyword::Single(names.remove(0))),
                    _ => Some(TypeKeyword::Unsupported(declared.to_string())),
                }
            }
            other => Some(TypeKeyword::Unsupported(other.to_string())),
        }
    }

    fn format(&self, pointer: &str) -> Option<String> {
        self.string_at(pointer, "format")
    }

    fn nullable_flag(&self, pointer: &str) -> bool {
        if let Some(TypeKeyword::Nullable(_)) = self.schema_type(pointer) {
            return true;
        }
        self.value(pointer)
            .and_then(|v| v.get("nullable"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn property_names(&self, pointer: &str) -> Vec<String> {
        self.object_keys(&format!("{}/properties", pointer))
    }

    fn required_names(&self, pointer: &str) -> Vec<String> {
        self.value(pointer)
            .and_then(|v| v.get("required"))
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn default_value(&self, pointer: &str) -> Option<JsonValue> {
        self.value(pointer)?.get("default").cloned()
    }

    fn description(&self, pointer: &str) -> Option<String> {
        self.string_at(pointer, "description")
    }

    fn enum_values(&self, pointer: &str) -> Option<Vec<JsonValue>> {
        self.value(pointer)?
            .get("enum")?
            .as_array()
            .map(|items| items.to_vec())
    }

    fn discriminator(&self, pointer: &str) -> Option<Discriminator> {
        let node = self.value(pointer)?.get("discriminator")?;
        let property_name = node.get("propertyName")?.as_str()?.to_string();
        let mut mapping = IndexMap::new();
        if let Some(map) = node.get("mapping").and_then(|v| v.as_object()) {
            for (tag, target) in map {
                if let Some(target) = target.as_str() {
                    mapping.insert(tag.clone(), target.to_string());
                }
            }
        }
        Some(Discriminator {
            property_name,
            mapping,
        })
    }

    fn branch_pointers(&self, pointer: &str, kind: CompositionKind) -> Vec<String> {
        let list_ptr = format!("{}/{}", pointer, kind.keyword());
        match self.value(&list_ptr) {
            Some(JsonValue::Array(items)) => (0..items.len())
                .map(|idx| format!("{}/{}", list_ptr, idx))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl ReferenceResolver for JsonDocument {
    fn reference_target(&self, pointer: &str) -> Option<String> {
        self.refs.get(pointer).cloned()
    }
}

/// Walks the raw tree recording every `$ref` node's normalized target.
///
/// Keys of a `$ref` object other than `$ref` itself are ignored, matching
/// OpenAPI reference-object semantics.
fn collect_refs(
    value: &JsonValue,
    pointer: &str,
    self_uri: Option<&str>,
    out: &mut HashMap<String, String>,
) {
    match value {
        JsonValue::Object(map) => {
            if let Some(target) = map.get("$ref").and_then(|v| v.as_str()) {
                let normalized = normalize_ref_to_local(target, self_uri)
                    .unwrap_or_else(|| target.to_string());
                out.insert(pointer.to_string(), normalized);
                return;
            }
            for (key, child) in map {
                collect_refs(child, &join_pointer(pointer, key), self_uri, out);
            }
        }
        JsonValue::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                collect_refs(child, &format!("{}/{}", pointer, idx), self_uri, out);
            }
        }
        _ => {}
    }
}
