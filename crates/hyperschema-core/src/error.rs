//! # Error Types: Structured Diagnostics
//!
//! Defines the error types shared by the parser, the reference expander
//! and the validator. All errors use `thiserror` for derive-based
//! `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Every error names the schema node it concerns through that node's
//!   JSON Pointer, and renders as one line: `"{pointer}: {message}"`.
//! - Every error carries a machine-readable [`ErrorKind`] tag.
//! - Parsing and expansion collect errors and report them together;
//!   an empty list is the only success signal.
//! - Validation errors additionally carry the data path, the offending
//!   value, and (for composition failures) per-branch sub-errors.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::ConfigError;
use crate::identity::NodeId;
use crate::pointer::escape_token;

/// The broad family an [`ErrorKind`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    /// Parse-time problem with the shape of a schema document.
    Structural,
    /// Expand-time problem resolving a `$ref`.
    Resolution,
    /// Data that does not satisfy a schema.
    Validation,
}

/// Machine-readable error tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    // Structural.
    /// A keyword value has the wrong JSON kind.
    InvalidType,
    /// A `type` member is not one of the known simple types.
    UnknownType,
    /// A `format` is neither built in nor registered.
    UnknownFormat,
    /// A pattern was rejected by the configured regex validator or
    /// could not be compiled.
    RegexInvalid,
    /// A value in schema position is not an object.
    SchemaNotFound,

    // Resolution.
    /// A reference URI or pointer could not be resolved.
    UnresolvedPointer,
    /// A reference requires fetching over a network scheme.
    SchemeNotSupported,
    /// A reference chain refers back to itself without concrete content.
    LoopDetected,
    /// References were left unresolved after expansion.
    UnresolvedReferences,

    // Validation.
    /// The instance matches none of the node's `type` entries.
    TypeFailed,
    AllOfFailed,
    AnyOfFailed,
    OneOfFailed,
    NotFailed,
    InvalidEnum,
    MinItemsFailed,
    MaxItemsFailed,
    UniqueItemsFailed,
    MinFailed,
    MaxFailed,
    MultipleOfFailed,
    InvalidKeys,
    RequiredFailed,
    MinPropertiesFailed,
    MaxPropertiesFailed,
    InvalidFormat,
    MinLengthFailed,
    MaxLengthFailed,
    PatternFailed,
}

impl ErrorKind {
    /// The kebab-case tag for this kind (e.g. `"loop-detected"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidType => "invalid-type",
            ErrorKind::UnknownType => "unknown-type",
            ErrorKind::UnknownFormat => "unknown-format",
            ErrorKind::RegexInvalid => "regex-invalid",
            ErrorKind::SchemaNotFound => "schema-not-found",
            ErrorKind::UnresolvedPointer => "unresolved-pointer",
            ErrorKind::SchemeNotSupported => "scheme-not-supported",
            ErrorKind::LoopDetected => "loop-detected",
            ErrorKind::UnresolvedReferences => "unresolved-references",
            ErrorKind::TypeFailed => "type-failed",
            ErrorKind::AllOfFailed => "all-of-failed",
            ErrorKind::AnyOfFailed => "any-of-failed",
            ErrorKind::OneOfFailed => "one-of-failed",
            ErrorKind::NotFailed => "not-failed",
            ErrorKind::InvalidEnum => "invalid-enum",
            ErrorKind::MinItemsFailed => "min-items-failed",
            ErrorKind::MaxItemsFailed => "max-items-failed",
            ErrorKind::UniqueItemsFailed => "unique-items-failed",
            ErrorKind::MinFailed => "min-failed",
            ErrorKind::MaxFailed => "max-failed",
            ErrorKind::MultipleOfFailed => "multiple-of-failed",
            ErrorKind::InvalidKeys => "invalid-keys",
            ErrorKind::RequiredFailed => "required-failed",
            ErrorKind::MinPropertiesFailed => "min-properties-failed",
            ErrorKind::MaxPropertiesFailed => "max-properties-failed",
            ErrorKind::InvalidFormat => "invalid-format",
            ErrorKind::MinLengthFailed => "min-length-failed",
            ErrorKind::MaxLengthFailed => "max-length-failed",
            ErrorKind::PatternFailed => "pattern-failed",
        }
    }

    /// Which family of failure this kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::InvalidType
            | ErrorKind::UnknownType
            | ErrorKind::UnknownFormat
            | ErrorKind::RegexInvalid
            | ErrorKind::SchemaNotFound => ErrorCategory::Structural,
            ErrorKind::UnresolvedPointer
            | ErrorKind::SchemeNotSupported
            | ErrorKind::LoopDetected
            | ErrorKind::UnresolvedReferences => ErrorCategory::Resolution,
            _ => ErrorCategory::Validation,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural (parse-time) or resolution (expand-time) error.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{pointer}: {message}")]
pub struct SchemaError {
    /// Pointer of the offending schema node.
    pub pointer: String,
    /// Human-readable description.
    pub message: String,
    /// Machine-readable tag.
    pub kind: ErrorKind,
}

impl SchemaError {
    pub fn new(pointer: impl Into<String>, message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            pointer: pointer.into(),
            message: message.into(),
            kind,
        }
    }
}

/// One step of a [`DataPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(&escape_token(key)),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Location of a value inside the data being validated, relative to the
/// validation root. Renders as `#` followed by `/`-joined segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DataPath(Vec<PathSegment>);

impl DataPath {
    /// The path of the validation root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.0.push(PathSegment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.0.push(PathSegment::Index(index));
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("#")?;
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Data did not satisfy a schema rule.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{pointer}: {message}")]
pub struct ValidationError {
    /// The schema node whose rule failed.
    pub schema: NodeId,
    /// Pointer of that schema node.
    pub pointer: String,
    /// Where in the data the failure occurred.
    pub path: DataPath,
    /// Human-readable description.
    pub message: String,
    /// Machine-readable tag.
    pub kind: ErrorKind,
    /// The offending value.
    pub data: Value,
    /// Per-branch errors for `allOf`/`anyOf`/`oneOf` failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_errors: Option<Vec<Vec<ValidationError>>>,
}

/// An ordered collection of errors reported by one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorList<E> {
    errors: Vec<E>,
}

impl<E> ErrorList<E> {
    pub fn new(errors: Vec<E>) -> Self {
        Self { errors }
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns a slice of all errors, in the order they were found.
    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.errors.iter()
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<E> {
        self.errors
    }
}

impl<E> From<Vec<E>> for ErrorList<E> {
    fn from(errors: Vec<E>) -> Self {
        Self::new(errors)
    }
}

impl<E> IntoIterator for ErrorList<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<E: fmt::Display> fmt::Display for ErrorList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ErrorList<E> {}

/// Error adding a schema to a document store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Only schemas with a URI can be registered.
    #[error("{pointer}: cannot add a schema without a URI to the document store")]
    MissingUri {
        /// Pointer of the rejected node.
        pointer: String,
    },
}

/// Error looking up a keyword on a schema node by name.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeywordError {
    /// The name is not a JSON Schema keyword (e.g. an internal field).
    #[error("\"{0}\" is not a JSON Schema keyword")]
    NotAKeyword(String),
}

/// Top-level error type for the orchestration layer.
#[derive(Error, Debug)]
pub enum HyperschemaError {
    /// The schema document is structurally invalid.
    #[error("schema is invalid:\n{0}")]
    Parse(ErrorList<SchemaError>),

    /// References in the schema could not be expanded.
    #[error("schema references could not be expanded:\n{0}")]
    Expand(ErrorList<SchemaError>),

    /// A schema could not be registered.
    #[error("document store error: {0}")]
    Store(#[from] StoreError),

    /// The data did not conform to the schema.
    #[error("data is invalid:\n{0}")]
    Validation(ErrorList<ValidationError>),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
