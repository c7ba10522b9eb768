#![deny(missing_docs)]

//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the crate.
//!
//! Every failure during resolution is unrecoverable for the document as a
//! whole: the analyzer aborts and surfaces the offending pointer, and for
//! lookup failures a dump of the symbol table contents, so spec authors can
//! locate the malformed schema node.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// A schema declared a `type` keyword the analyzer does not support.
    #[from(ignore)]
    #[display("Unknown schema type '{keyword}' at {pointer}")]
    UnknownSchemaType {
        /// The unsupported `type` value.
        keyword: String,
        /// Pointer of the offending schema node.
        pointer: String,
    },

    /// A `$ref` appeared in a position the composition dispatch does not
    /// expect. Indicates a malformed spec or an unhandled OpenAPI idiom.
    #[from(ignore)]
    #[display("Misplaced $ref at {pointer}: {detail}")]
    MisplacedReference {
        /// Pointer of the offending node.
        pointer: String,
        /// What was expected at this position.
        detail: String,
    },

    /// A reference chain could not be followed to a concrete type, either
    /// because a link is missing or the chain exceeded the cycle bound.
    #[from(ignore)]
    #[display("Unresolved reference chain starting at {pointer}: {detail}")]
    UnresolvedReference {
        /// Pointer where chain following started or stalled.
        pointer: String,
        /// Why the chain could not be completed.
        detail: String,
    },

    /// A pointer lookup failed. Carries the full known-pointer set so the
    /// caller can locate the missing registration.
    #[from(ignore)]
    #[display("Unknown reference '{pointer}'; known pointers: [{known}]")]
    UnknownReference {
        /// The pointer that was requested.
        pointer: String,
        /// Comma-separated dump of every registered pointer.
        known: String,
    },

    /// The same pointer was registered with structurally different content
    /// by two tasks.
    #[from(ignore)]
    #[display("Type conflict at {pointer}: existing = {existing}, new = {new}")]
    TypeConflict {
        /// The contested pointer.
        pointer: String,
        /// Debug rendering of the first-registered type.
        existing: String,
        /// Debug rendering of the rejected type.
        new: String,
    },

    /// Generic errors (document shape problems, fixture parsing).
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;
