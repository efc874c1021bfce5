use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any failure raised while registering a schema or building a node tree.
///
/// Every validation variant names the offending field or key and the node
/// type it belongs to, so the message alone is enough to locate the problem
/// in the source document. All errors are raised synchronously during
/// construction; no partial tree is ever returned.
#[derive(Debug, Error)]
pub enum Error {
    /// A closed node received a key that matches no declared field.
    #[error("invalid field '{field}' for '{node}'")]
    UndefinedField { field: String, node: String },
    /// A bare scalar was given to a node type with no field marked brief.
    #[error("node '{node}' is given in brief syntax but no field is marked brief")]
    NoBriefField { node: String },
    /// A node was handed a raw value of a kind it can never be built from.
    #[error("node '{node}' cannot be built from a {kind} value")]
    BadNodeValue { node: String, kind: &'static str },
    /// A value failed scalar type checking, or a container field received a
    /// raw value of the wrong shape.
    #[error("field '{field}' of '{node}': expected {expected}, got {actual}")]
    WrongType {
        field: String,
        node: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// A custom validator returned false for the field's value.
    #[error("field '{field}' of '{node}' failed validation")]
    FailedValidator { field: String, node: String },
    /// A required reference key was not found in its target collection.
    #[error("reference '{key}' in field '{field}' of '{node}' does not resolve to a '{target}'")]
    UnresolvedReference {
        key: String,
        field: String,
        node: String,
        target: String,
    },
    /// A schema declaration is inconsistent: duplicate field names, more than
    /// one identity or brief field, a hook naming an undeclared field, or a
    /// keyed collection whose element type has no identity field.
    #[error("schema '{schema}': {reason}")]
    InvalidSchema { schema: String, reason: String },
    /// The document layer failed to parse or render a document.
    #[error("document error: {0}")]
    BadDocument(String),
}
