use crate::{node::StorageError, schema::NxdlError};
use glob::{GlobError, PatternError};
use std::path::PathBuf;
use thiserror::Error;

pub type NexusAccessorResult<T> = Result<T, NexusAccessorError>;

/// Errors raised by schema-bound access. Each variant names the class and
/// the field or child involved, and the storage path where it happened.
#[derive(Debug, Error)]
pub enum NexusAccessorError {
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("NXDL Error: {0}")]
    Nxdl(#[from] NxdlError),
    #[error("NXDL Error in {path}: {error}")]
    NxdlFile { path: PathBuf, error: NxdlError },
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Glob Pattern Error: {0}")]
    GlobPattern(#[from] PatternError),
    #[error("Glob Error: {0}")]
    Glob(#[from] GlobError),
    #[error("Cannot Convert Path {0:?} to a Glob Pattern")]
    CannotConvertPath(PathBuf),
    #[error("Unknown NeXus Class {0}")]
    UnknownClass(String),
    #[error("Cyclic Inheritance Detected While Resolving {0}")]
    CyclicInheritance(String),
    #[error("Unknown Field '{field}' in Schema of {class}")]
    UnknownSchemaField { class: String, field: String },
    #[error("Unknown Field '{field}' of {class} at {path}")]
    UnknownField {
        class: String,
        field: String,
        path: String,
    },
    #[error("Missing Field '{field}' of {class} at {path}")]
    MissingField {
        class: String,
        field: String,
        path: String,
    },
    #[error("Type Mismatch for '{field}' of {class}: expected {expected}, found {actual} at {path}")]
    TypeMismatch {
        class: String,
        field: String,
        expected: String,
        actual: String,
        path: String,
    },
    #[error("Cardinality Error for '{field}' of {class}: expected one element, found {found} at {path}")]
    Cardinality {
        class: String,
        field: String,
        found: usize,
        path: String,
    },
    #[error("Enumeration Violation for '{field}' of {class}: '{value}' is not one of [{0}] at {path}", allowed.join(", "))]
    EnumViolation {
        class: String,
        field: String,
        value: String,
        allowed: Vec<String>,
        path: String,
    },
    #[error("Missing Child {child_class} '{0}' of {class} at {path}", name.as_deref().unwrap_or("*"))]
    MissingChild {
        class: String,
        child_class: String,
        name: Option<String>,
        path: String,
    },
    #[error("Undeclared Child {child_class} of {class} at {path}")]
    UndeclaredChild {
        class: String,
        child_class: String,
        path: String,
    },
    #[error("Too Many Children: {class} holds at most {max} {child_class} at {path}")]
    TooManyChildren {
        class: String,
        child_class: String,
        max: usize,
        path: String,
    },
    #[error("Duplicate Name '{name}' for {child_class} in {class} at {path}")]
    DuplicateName {
        class: String,
        child_class: String,
        name: String,
        path: String,
    },
    #[error("Class Mismatch: expected {expected}, found {0} at {path}", found.as_deref().unwrap_or("[No NX_class]"))]
    ClassMismatch {
        expected: String,
        found: Option<String>,
        path: String,
    },
    #[error("Deprecated {item} of {class}: {message} at {path}")]
    Deprecated {
        class: String,
        item: String,
        message: String,
        path: String,
    },
}
