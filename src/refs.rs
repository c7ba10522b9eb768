#![deny(missing_docs)]

//! # Pointer Utilities
//!
//! Shared helpers for JSON Pointer construction and for normalizing `$ref`
//! targets with respect to OAS 3.2 `$self`.
//!
//! These utilities are intentionally lightweight: they never fetch external
//! documents, but allow absolute or relative references to be treated as
//! local when the document part matches the current document's `$self` URI.

use percent_encoding::percent_decode_str;
use std::path::Path;
use url::Url;

/// Classification of a `$ref` target string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `#/components/...` — local to the current document.
    Local,
    /// A relative path to another document.
    Relative,
    /// An absolute URI.
    Remote,
}

/// A `$ref` string split into its document and fragment parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference<'a> {
    /// The document part (empty for local references).
    pub document: &'a str,
    /// The fragment following `#` (without the `#`).
    pub fragment: Option<&'a str>,
    /// Classification of the reference.
    pub kind: ReferenceKind,
}

/// Splits a `$ref` into document and fragment parts and classifies it.
pub fn parse_reference(ref_str: &str) -> ParsedReference<'_> {
    let (document, fragment) = match ref_str.split_once('#') {
        Some((doc, frag)) => (doc, Some(frag)),
        None => (ref_str, None),
    };

    let kind = if document.is_empty() {
        ReferenceKind::Local
    } else if document.contains("://") {
        ReferenceKind::Remote
    } else {
        ReferenceKind::Relative
    };

    ParsedReference {
        document,
        fragment,
        kind,
    }
}

/// Normalizes a `$ref` to a local JSON Pointer (e.g. `#/components/...`) if it
/// targets the current document as identified by `$self`.
///
/// Returns `None` if the reference is external or lacks a fragment.
pub fn normalize_ref_to_local(ref_str: &str, self_uri: Option<&str>) -> Option<String> {
    if let Some(fragment) = ref_str.strip_prefix('#') {
        return Some(format!("#{}", decode_fragment(fragment)));
    }

    let parsed = parse_reference(ref_str);
    match parsed.kind {
        ReferenceKind::Local => Some(ref_str.to_string()),
        ReferenceKind::Relative | ReferenceKind::Remote => {
            let frag = parsed.fragment?;
            let self_uri = self_uri?;
            if ref_doc_matches_self(parsed.document, self_uri) {
                return Some(format!("#{}", decode_fragment(frag)));
            }
            None
        }
    }
}

/// Percent-decodes a URI fragment before it is used as a JSON Pointer.
///
/// Decoding happens exactly once, at the `$ref` boundary; raw document keys
/// keep their percent escapes verbatim.
fn decode_fragment(fragment: &str) -> String {
    percent_decode_str(fragment).decode_utf8_lossy().into_owned()
}

/// Encodes a raw key into a JSON Pointer segment (handles `~` and `/`).
pub fn encode_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Decodes a JSON Pointer segment (handles `~1` and `~0`).
///
/// Percent escapes are NOT decoded here: a document key may legitimately
/// contain a literal escape sequence, and fragments arriving via `$ref` are
/// already decoded by [`normalize_ref_to_local`].
pub fn decode_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Appends a raw key to a `#/`-style pointer, escaping the key.
pub fn join_pointer(base: &str, key: &str) -> String {
    format!("{}/{}", base, encode_pointer_segment(key))
}

/// Splits a `#/`-style pointer into decoded segments.
pub fn pointer_segments(pointer: &str) -> Vec<String> {
    let trimmed = pointer.trim_start_matches('#').trim_start_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(decode_pointer_segment).collect()
}

/// Extracts the component name from a pointer of the form
/// `#/components/{section}/{name}`, or `None` for any other shape.
pub fn component_name(pointer: &str, section: &str) -> Option<String> {
    let segments = pointer_segments(pointer);
    if segments.len() != 3 {
        return None;
    }
    if segments[0] != "components" || segments[1] != section {
        return None;
    }
    if segments[2].is_empty() {
        None
    } else {
        Some(segments[2].clone())
    }
}

fn ref_doc_matches_self(ref_doc: &str, self_uri: &str) -> bool {
    if ref_doc == self_uri {
        return true;
    }

    match (Url::parse(ref_doc), Url::parse(self_uri)) {
        (Ok(ref_url), Ok(self_url)) => {
            return ref_url.scheme() == self_url.scheme()
                && ref_url.host() == self_url.host()
                && ref_url.port() == self_url.port()
                && ref_url.path() == self_url.path();
        }
        _ => {}
    }

    // If `$self` is an absolute-path reference (e.g. "/api/openapi"), compare path.
    if self_uri.starts_with('/') {
        if let Ok(ref_url) = Url::parse(ref_doc) {
            return ref_url.path() == self_uri;
        }
    }

    // Fallback: compare raw relative paths.
    if !self_uri.contains("://") && !ref_doc.contains("://") {
        return Path::new(ref_doc) == Path::new(self_uri);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ref_local_passthrough() {
        let normalized = normalize_ref_to_local("#/components/schemas/User", None).unwrap();
        assert_eq!(normalized, "#/components/schemas/User");
    }

    #[test]
    fn test_normalize_ref_self_absolute_match() {
        let self_uri = Some("https://example.com/openapi.yaml");
        let ref_str = "https://example.com/openapi.yaml#/components/schemas/User";
        let normalized = normalize_ref_to_local(ref_str, self_uri).unwrap();
        assert_eq!(normalized, "#/components/schemas/User");
    }

    #[test]
    fn test_normalize_ref_self_path_match() {
        let self_uri = Some("/api/openapi.yaml");
        let ref_str = "https://example.com/api/openapi.yaml#/components/schemas/User";
        let normalized = normalize_ref_to_local(ref_str, self_uri).unwrap();
        assert_eq!(normalized, "#/components/schemas/User");
    }

    #[test]
    fn test_normalize_ref_foreign_document() {
        let self_uri = Some("https://example.com/openapi.yaml");
        let ref_str = "https://other.example/openapi.yaml#/components/schemas/User";
        assert!(normalize_ref_to_local(ref_str, self_uri).is_none());
    }

    #[test]
    fn test_pointer_segment_round_trip() {
        let encoded = encode_pointer_segment("/users/{id}");
        assert_eq!(encoded, "~1users~1{id}");
        assert_eq!(decode_pointer_segment(&encoded), "/users/{id}");
    }

    #[test]
    fn test_decode_pointer_segment_keeps_percent_escapes() {
        let decoded = decode_pointer_segment("a%20b~1details");
        assert_eq!(decoded, "a%20b/details");
    }

    #[test]
    fn test_normalize_ref_decodes_percent_escaped_fragment() {
        let normalized =
            normalize_ref_to_local("#/components/schemas/User%20Profile", None).unwrap();
        assert_eq!(normalized, "#/components/schemas/User Profile");

        let self_uri = Some("https://example.com/openapi.yaml");
        let ref_str = "https://example.com/openapi.yaml#/components/schemas/User%20Profile";
        let normalized = normalize_ref_to_local(ref_str, self_uri).unwrap();
        assert_eq!(normalized, "#/components/schemas/User Profile");
    }

    #[test]
    fn test_join_pointer_escapes_keys() {
        let joined = join_pointer("#/paths", "/users/{id}");
        assert_eq!(joined, "#/paths/~1users~1{id}");
    }

    #[test]
    fn test_component_name_extraction() {
        let name = component_name("#/components/schemas/User", "schemas").unwrap();
        assert_eq!(name, "User");
        assert!(component_name("#/components/responses/User", "schemas").is_none());
        assert!(component_name("#/components/schemas/User/properties/id", "schemas").is_none());
    }
}
